//! Shared data types for the fabric model.
//!
//! This module defines the structural elements of the placement fabric:
//! area types, site kinds (capacity profiles), sites, regions (fences), and
//! clock regions. These types are assembled into a [`SiteCatalog`](crate::SiteCatalog)
//! by the external physical database and are immutable during legalization.

use crate::ids::{AreaTypeId, ClockRegionId, InstId, RegionId, SiteId, SiteKindId};
use serde::{Deserialize, Serialize};
use strata_common::BBox;

/// A resource/area type: a category of device primitive with its own site pool.
///
/// Examples: LUT, FF, DSP, BRAM, IO. Instances and site capacities are both
/// expressed in terms of area types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaType {
    /// The unique ID of this area type.
    pub id: AreaTypeId,
    /// The canonical name (e.g., "LUT", "DSP", "IO").
    pub name: String,
    /// Whether instances of this type live on the fabric boundary (I/O pads).
    pub is_io: bool,
}

/// A site kind: the capacity profile shared by all sites of one flavor.
///
/// `capacity[t]` is the number of instances of area type `t` a site of this
/// kind accepts. A SLICE-style kind might accept 8 LUTs and 16 FFs; a DSP
/// kind accepts exactly one DSP instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteKind {
    /// The unique ID of this site kind.
    pub id: SiteKindId,
    /// The kind name (e.g., "SLICE", "DSP", "IOB").
    pub name: String,
    /// Per-area-type instance capacity, indexed by `AreaTypeId`.
    pub capacity: Vec<u32>,
}

impl SiteKind {
    /// Returns the capacity of this kind for the given area type.
    pub fn capacity_of(&self, area_type: AreaTypeId) -> u32 {
        self.capacity
            .get(area_type.as_raw() as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Returns whether this kind accepts any instance of the given area type.
    pub fn accepts(&self, area_type: AreaTypeId) -> bool {
        self.capacity_of(area_type) > 0
    }
}

/// A site: one discrete placement location on the fabric grid.
///
/// Each site occupies the unit cell `[x, x+1) × [y, y+1)` and accepts
/// instances according to its kind's capacity profile. Sites are immutable
/// during legalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    /// The unique ID of this site.
    pub id: SiteId,
    /// Grid column of the site (0-based, left to right).
    pub x: u32,
    /// Grid row of the site (0-based, bottom to top).
    pub y: u32,
    /// The capacity profile of this site.
    pub kind: SiteKindId,
    /// The region containing this site, if any.
    pub region: Option<RegionId>,
    /// The clock region containing this site, if any.
    pub clock_region: Option<ClockRegionId>,
}

/// A region (fence): a rectangular area restricting a subset of instances.
///
/// Member instances must end up inside `bbox` after legalization. The
/// member list is supplied by the physical database; membership is not
/// recomputed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    /// The unique ID of this region.
    pub id: RegionId,
    /// The region's bounding box in site units.
    pub bbox: BBox,
    /// Instances confined to this region.
    pub members: Vec<InstId>,
}

/// A clock region: a rectangular section of the fabric with a clock-net budget.
///
/// The number of distinct clock nets used by instances inside the region
/// must not exceed `max_clock_nets`. Half-column budgets subdivide the
/// region per site column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockRegion {
    /// The unique ID of this clock region.
    pub id: ClockRegionId,
    /// The clock region's bounding box in site units.
    pub bbox: BBox,
    /// Maximum number of distinct clock nets allowed in the region.
    pub max_clock_nets: u32,
}
