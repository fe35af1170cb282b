//! Fabric model for the Strata legalization engine.
//!
//! This crate provides the [`SiteCatalog`]: a read-only view of the
//! placement fabric assembled by the external physical database. The
//! catalog enumerates sites on an integer grid, their per-area-type
//! capacities, region (fence) geometry with member lists, clock-region
//! topology with clock-net budgets, and the area-type name registry.
//!
//! # Usage
//!
//! Use [`SiteCatalogBuilder`] to assemble a catalog:
//!
//! ```
//! use strata_fabric::SiteCatalogBuilder;
//!
//! let mut b = SiteCatalogBuilder::new(8, 8);
//! let lut = b.add_area_type("LUT", false);
//! let slice = b.add_site_kind("SLICE", vec![1]);
//! for x in 0..8 {
//!     for y in 0..8 {
//!         b.add_site(x, y, slice);
//!     }
//! }
//! let catalog = b.build().unwrap();
//! assert_eq!(catalog.sites_with_capacity(lut).len(), 64);
//! ```

#![warn(missing_docs)]

pub mod ids;
pub mod types;

pub use ids::{AreaTypeId, ClockRegionId, InstId, RegionId, SiteId, SiteKindId};
pub use types::{AreaType, ClockRegion, Region, Site, SiteKind};

use strata_common::{BBox, InternalError, StrataResult};

/// A read-only view of the placement fabric.
///
/// Construct with [`SiteCatalogBuilder`]. All lookups are by opaque ID or
/// by grid coordinates; nothing in the catalog changes during legalization.
#[derive(Debug, Clone)]
pub struct SiteCatalog {
    width: u32,
    height: u32,
    area_types: Vec<AreaType>,
    kinds: Vec<SiteKind>,
    sites: Vec<Site>,
    /// Row-major `(x, y)` → site index, `u32::MAX` for empty cells.
    grid: Vec<u32>,
    regions: Vec<Region>,
    clock_regions: Vec<ClockRegion>,
    half_column_budget: Option<u32>,
}

impl SiteCatalog {
    /// Returns the grid width in sites.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the grid height in sites.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the die outline as a box.
    pub fn die_bbox(&self) -> BBox {
        BBox::new(0.0, 0.0, self.width as f32, self.height as f32)
    }

    /// Returns the number of declared area types.
    pub fn num_area_types(&self) -> usize {
        self.area_types.len()
    }

    /// Returns the area type with the given ID.
    pub fn area_type(&self, id: AreaTypeId) -> &AreaType {
        &self.area_types[id.as_raw() as usize]
    }

    /// Returns all declared area types.
    pub fn area_types(&self) -> &[AreaType] {
        &self.area_types
    }

    /// Looks up an area type by name.
    ///
    /// This is the name-to-numeric-id mapping consumed from the physical
    /// database; legalizer stages work with IDs only.
    pub fn area_type_id(&self, name: &str) -> Option<AreaTypeId> {
        self.area_types
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.id)
    }

    /// Returns the site kind with the given ID.
    pub fn kind(&self, id: SiteKindId) -> &SiteKind {
        &self.kinds[id.as_raw() as usize]
    }

    /// Returns the number of sites.
    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    /// Returns the site with the given ID.
    pub fn site(&self, id: SiteId) -> &Site {
        &self.sites[id.as_raw() as usize]
    }

    /// Returns all sites, in ID order.
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Returns the site occupying grid cell `(x, y)`, if any.
    pub fn site_at(&self, x: u32, y: u32) -> Option<&Site> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.grid[(y * self.width + x) as usize];
        if idx == u32::MAX {
            None
        } else {
            Some(&self.sites[idx as usize])
        }
    }

    /// Returns the capacity of the given site for the given area type.
    pub fn site_capacity(&self, site: SiteId, area_type: AreaTypeId) -> u32 {
        self.kind(self.site(site).kind).capacity_of(area_type)
    }

    /// Returns all sites accepting the given area type, in site-ID order.
    ///
    /// Site-ID order is the deterministic tie-break order used by every
    /// legalizer stage.
    pub fn sites_with_capacity(&self, area_type: AreaTypeId) -> Vec<SiteId> {
        self.sites
            .iter()
            .filter(|s| self.kind(s.kind).accepts(area_type))
            .map(|s| s.id)
            .collect()
    }

    /// Returns the number of regions.
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    /// Returns the region with the given ID.
    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.as_raw() as usize]
    }

    /// Returns all regions.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Returns all clock regions.
    pub fn clock_regions(&self) -> &[ClockRegion] {
        &self.clock_regions
    }

    /// Returns the clock region containing the point `(x, y)`, if any.
    pub fn clock_region_at(&self, x: f32, y: f32) -> Option<ClockRegionId> {
        self.clock_regions
            .iter()
            .find(|cr| cr.bbox.contains(x, y))
            .map(|cr| cr.id)
    }

    /// Returns the per-half-column clock-net budget, if one is declared.
    pub fn half_column_budget(&self) -> Option<u32> {
        self.half_column_budget
    }
}

/// Assembles a [`SiteCatalog`] from physical-database data.
///
/// The builder checks grid bounds and cell uniqueness at [`build`](Self::build)
/// time and computes site-to-region and site-to-clock-region membership
/// from box containment.
#[derive(Debug)]
pub struct SiteCatalogBuilder {
    width: u32,
    height: u32,
    area_types: Vec<AreaType>,
    kinds: Vec<SiteKind>,
    sites: Vec<Site>,
    regions: Vec<Region>,
    clock_regions: Vec<ClockRegion>,
    half_column_budget: Option<u32>,
}

impl SiteCatalogBuilder {
    /// Creates a builder for a `width × height` site grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            area_types: Vec::new(),
            kinds: Vec::new(),
            sites: Vec::new(),
            regions: Vec::new(),
            clock_regions: Vec::new(),
            half_column_budget: None,
        }
    }

    /// Declares an area type and returns its ID.
    pub fn add_area_type(&mut self, name: &str, is_io: bool) -> AreaTypeId {
        let id = AreaTypeId::from_raw(self.area_types.len() as u32);
        self.area_types.push(AreaType {
            id,
            name: name.to_string(),
            is_io,
        });
        id
    }

    /// Declares a site kind with per-area-type capacities and returns its ID.
    pub fn add_site_kind(&mut self, name: &str, capacity: Vec<u32>) -> SiteKindId {
        let id = SiteKindId::from_raw(self.kinds.len() as u32);
        self.kinds.push(SiteKind {
            id,
            name: name.to_string(),
            capacity,
        });
        id
    }

    /// Adds a site at grid cell `(x, y)` and returns its ID.
    pub fn add_site(&mut self, x: u32, y: u32, kind: SiteKindId) -> SiteId {
        let id = SiteId::from_raw(self.sites.len() as u32);
        self.sites.push(Site {
            id,
            x,
            y,
            kind,
            region: None,
            clock_region: None,
        });
        id
    }

    /// Declares a region with its box and member instances; returns its ID.
    pub fn add_region(&mut self, bbox: BBox, members: Vec<InstId>) -> RegionId {
        let id = RegionId::from_raw(self.regions.len() as u32);
        self.regions.push(Region { id, bbox, members });
        id
    }

    /// Declares a clock region with its box and clock-net budget; returns its ID.
    pub fn add_clock_region(&mut self, bbox: BBox, max_clock_nets: u32) -> ClockRegionId {
        let id = ClockRegionId::from_raw(self.clock_regions.len() as u32);
        self.clock_regions.push(ClockRegion {
            id,
            bbox,
            max_clock_nets,
        });
        id
    }

    /// Sets the per-half-column clock-net budget.
    pub fn half_column_budget(&mut self, budget: u32) {
        self.half_column_budget = Some(budget);
    }

    /// Finalizes the catalog.
    ///
    /// # Errors
    ///
    /// Returns `InternalError` if a site lies outside the grid or two sites
    /// occupy the same cell — both indicate corrupt physical-database data.
    pub fn build(mut self) -> StrataResult<SiteCatalog> {
        let mut grid = vec![u32::MAX; (self.width * self.height) as usize];
        for site in &mut self.sites {
            if site.x >= self.width || site.y >= self.height {
                return Err(InternalError::new(format!(
                    "site {} at ({}, {}) lies outside the {}x{} grid",
                    site.id, site.x, site.y, self.width, self.height
                )));
            }
            let cell = (site.y * self.width + site.x) as usize;
            if grid[cell] != u32::MAX {
                return Err(InternalError::new(format!(
                    "two sites occupy grid cell ({}, {})",
                    site.x, site.y
                )));
            }
            grid[cell] = site.id.as_raw();

            let cx = site.x as f32 + 0.5;
            let cy = site.y as f32 + 0.5;
            site.region = self
                .regions
                .iter()
                .find(|r| r.bbox.contains(cx, cy))
                .map(|r| r.id);
            site.clock_region = self
                .clock_regions
                .iter()
                .find(|cr| cr.bbox.contains(cx, cy))
                .map(|cr| cr.id);
        }

        Ok(SiteCatalog {
            width: self.width,
            height: self.height,
            area_types: self.area_types,
            kinds: self.kinds,
            sites: self.sites,
            grid,
            regions: self.regions,
            clock_regions: self.clock_regions,
            half_column_budget: self.half_column_budget,
        })
    }
}
