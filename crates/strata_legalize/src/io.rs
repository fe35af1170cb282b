//! Edge/IO assignment legalization.
//!
//! I/O pads live on boundary sites that accept several pads per site
//! (sub-site slots). Each boundary area type — an I/O bank — is an
//! independent sub-problem: fixed pads are separated out first and act as
//! occupied obstacles, reducing the remaining slot capacity of their
//! sites; the movable pads are then assigned by the exact flow engine over
//! the bank's remaining capacity, and each lands on the smallest free slot
//! of its assigned site.

use crate::config::CostMetric;
use crate::data::{Design, InstClass, Positions};
use crate::error::LegalizeResult;
use crate::flow::{assign_min_cost, FlowInst, FlowSite};
use crate::pipeline::StageOutput;
use std::collections::HashMap;
use strata_diagnostics::{Event, Stage};
use strata_fabric::{AreaTypeId, InstId, SiteCatalog, SiteId};

/// Per-site slot occupancy for a multi-capacity site.
#[derive(Debug, Clone)]
struct SiteSlots {
    slots: Vec<Option<InstId>>,
}

impl SiteSlots {
    fn new(capacity: u32) -> Self {
        Self {
            slots: vec![None; capacity as usize],
        }
    }

    /// Occupies slot `z`. Returns `false` if `z` is out of range or taken.
    fn occupy(&mut self, z: u32, inst: InstId) -> bool {
        match self.slots.get_mut(z as usize) {
            Some(slot @ None) => {
                *slot = Some(inst);
                true
            }
            _ => false,
        }
    }

    fn occupied(&self) -> u32 {
        self.slots.iter().filter(|s| s.is_some()).count() as u32
    }

    fn smallest_free(&self) -> Option<u32> {
        self.slots.iter().position(|s| s.is_none()).map(|i| i as u32)
    }
}

/// Legalizes one I/O bank (one boundary area type).
///
/// Returns the computed position updates without touching the shared
/// buffer; the pipeline merges them. Fixed pads found off-grid, on an
/// incompatible site, or stacked on an already-taken slot are reported as
/// error events and skipped as obstacles.
///
/// # Errors
///
/// Propagates [`InfeasibleAssignment`](crate::LegalizeError::InfeasibleAssignment)
/// when the bank has fewer free slots than movable pads.
pub(crate) fn legalize_io_bank(
    design: &Design,
    catalog: &SiteCatalog,
    positions: &Positions,
    metric: CostMetric,
    area_type: AreaTypeId,
) -> LegalizeResult<StageOutput> {
    let mut out = StageOutput::default();

    let mut movable = Vec::new();
    let mut fixed = Vec::new();
    for inst in design.instances_of_type(area_type) {
        match inst.class {
            InstClass::Movable => movable.push(inst.id),
            InstClass::Fixed => fixed.push(inst.id),
            InstClass::Filler => {}
        }
    }

    let bank_sites = catalog.sites_with_capacity(area_type);
    let mut slots: HashMap<SiteId, SiteSlots> = bank_sites
        .iter()
        .map(|&id| (id, SiteSlots::new(catalog.site_capacity(id, area_type))))
        .collect();

    // Fixed pads pre-occupy their slots and shrink the bank's capacity.
    for &inst in &fixed {
        let (x, y, z) = positions.xyz(inst);
        let site = catalog
            .site_at(x.round() as u32, y.round() as u32)
            .filter(|s| catalog.kind(s.kind).accepts(area_type));
        let Some(site) = site else {
            out.events.push(
                Event::error(
                    Stage::Io,
                    format!(
                        "fixed pad {} at ({x}, {y}) is not on a compatible bank site",
                        design.instance(inst).name
                    ),
                )
                .with_insts([inst]),
            );
            continue;
        };
        let taken = slots.get_mut(&site.id).map(|s| !s.occupy(z, inst));
        if taken == Some(true) {
            out.events.push(
                Event::error(
                    Stage::Io,
                    format!(
                        "fixed pad {} stacks on occupied slot ({}, {}, {z})",
                        design.instance(inst).name,
                        site.x,
                        site.y
                    ),
                )
                .with_insts([inst]),
            );
        }
    }

    if movable.is_empty() {
        return Ok(out);
    }

    let flow_insts: Vec<FlowInst> = movable
        .iter()
        .map(|&id| {
            let (x, y) = positions.xy(id);
            FlowInst { inst: id, x, y }
        })
        .collect();
    let flow_sites: Vec<FlowSite> = bank_sites
        .iter()
        .filter_map(|&id| {
            let site = catalog.site(id);
            let remaining = catalog.site_capacity(id, area_type) - slots[&id].occupied();
            (remaining > 0).then_some(FlowSite {
                site: id,
                x: site.x as f32,
                y: site.y as f32,
                capacity: remaining,
            })
        })
        .collect();

    let assignment = assign_min_cost(area_type, &flow_insts, &flow_sites, metric)?;
    for &(inst, site_id) in &assignment.pairs {
        let site = catalog.site(site_id);
        let bank = slots.get_mut(&site_id).unwrap();
        let z = bank
            .smallest_free()
            .expect("assigned site has a free slot by capacity construction");
        bank.occupy(z, inst);
        out.updates.push((inst, site.x as f32, site.y as f32, z));
        out.locks.push(inst);
    }
    out.events.push(Event::note(
        Stage::Io,
        format!(
            "bank {area_type}: {} movable pads over {} sites, displacement {:.2}",
            movable.len(),
            flow_sites.len(),
            assignment.total_cost
        ),
    ));

    Ok(out)
}
