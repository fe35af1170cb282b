//! Region-aware legalization.
//!
//! Two families of area types are handled here. Single-site single-resource
//! (SSR) types — DSP and RAM style blocks where each instance occupies
//! exactly one site of one resource — are legalized per area type by the
//! exact flow engine, with region-bound instances restricted to candidate
//! sites inside their region box and fixed instances acting as obstacles.
//! Mixed-size types — heterogeneous footprints pre-assigned to regions —
//! are legalized per region by the abacus packer, restricted to the
//! region's member list and box.
//!
//! Both paths raise lock flags on every legalized instance and on the
//! processed area types, so subsequent placement stages treat them as
//! fixed. Instances of mixed types outside any declared region are left to
//! other stages.

use crate::abacus::{pack_row, PackItem};
use crate::config::CostMetric;
use crate::data::{Design, InstClass, Positions};
use crate::error::{LegalizeError, LegalizeResult};
use crate::flow::{assign_min_cost_with, FlowInst, FlowSite};
use crate::pipeline::StageOutput;
use std::collections::HashMap;
use strata_diagnostics::{Event, Stage};
use strata_fabric::{AreaTypeId, SiteCatalog, SiteId};

/// Legalizes one SSR area type by exact flow assignment.
///
/// Movable instances of the type compete for the type's sites; fixed
/// instances shrink per-site capacity; region-bound instances only receive
/// arcs to sites inside their region box. Fillers are skipped but the area
/// type is still locked afterward.
///
/// # Errors
///
/// Propagates [`InfeasibleAssignment`](crate::LegalizeError::InfeasibleAssignment)
/// when the type's movable demand exceeds the remaining site supply.
pub(crate) fn legalize_ssr_type(
    design: &Design,
    catalog: &SiteCatalog,
    positions: &Positions,
    metric: CostMetric,
    area_type: AreaTypeId,
) -> LegalizeResult<StageOutput> {
    let mut out = StageOutput::default();
    out.lock_types.push(area_type);

    let mut movable = Vec::new();
    let mut fixed_count: HashMap<SiteId, u32> = HashMap::new();
    for inst in design.instances_of_type(area_type) {
        match inst.class {
            InstClass::Movable if inst.chain.is_none() => movable.push(inst),
            InstClass::Movable => {
                // Chain members are placed and locked by the chain stage.
            }
            InstClass::Filler => {
                // Placeholders skip assignment but fall under the lock.
                out.locks.push(inst.id);
            }
            InstClass::Fixed => {
                let (x, y, _) = positions.xyz(inst.id);
                if let Some(site) = catalog.site_at(x.round() as u32, y.round() as u32) {
                    *fixed_count.entry(site.id).or_insert(0) += 1;
                }
            }
        }
    }
    if movable.is_empty() {
        return Ok(out);
    }

    let flow_insts: Vec<FlowInst> = movable
        .iter()
        .map(|inst| {
            let (x, y) = positions.xy(inst.id);
            FlowInst {
                inst: inst.id,
                x,
                y,
            }
        })
        .collect();
    let flow_sites: Vec<FlowSite> = catalog
        .sites_with_capacity(area_type)
        .into_iter()
        .filter_map(|id| {
            let site = catalog.site(id);
            let taken = fixed_count.get(&id).copied().unwrap_or(0);
            let remaining = catalog.site_capacity(id, area_type).saturating_sub(taken);
            (remaining > 0).then_some(FlowSite {
                site: id,
                x: site.x as f32,
                y: site.y as f32,
                capacity: remaining,
            })
        })
        .collect();

    let allow = |i: usize, j: usize| -> bool {
        match movable[i].region {
            None => true,
            Some(region) => {
                let site = &flow_sites[j];
                catalog
                    .region(region)
                    .bbox
                    .contains(site.x + 0.5, site.y + 0.5)
            }
        }
    };
    let assignment = assign_min_cost_with(area_type, &flow_insts, &flow_sites, metric, allow)?;

    let mut next_slot: HashMap<SiteId, u32> = HashMap::new();
    for &(inst, site_id) in &assignment.pairs {
        let site = catalog.site(site_id);
        let fixed = fixed_count.get(&site_id).copied().unwrap_or(0);
        let slot = next_slot.entry(site_id).or_insert(fixed);
        out.updates.push((inst, site.x as f32, site.y as f32, *slot));
        *slot += 1;
        out.locks.push(inst);
    }
    out.events.push(Event::note(
        Stage::SsrFlow,
        format!(
            "area type {area_type}: {} instances over {} sites, displacement {:.2}",
            flow_insts.len(),
            flow_sites.len(),
            assignment.total_cost
        ),
    ));

    Ok(out)
}

/// Legalizes mixed-size, region-bound instances by per-region packing.
///
/// Each region is independent: its member instances of the given area
/// types are snapped to the site row nearest their current position and
/// packed in x within the region box. A row whose members cannot fit is
/// reported via [`RegionCapacityExceeded`](crate::LegalizeError::RegionCapacityExceeded)
/// and left unpacked; other rows and regions are unaffected.
pub(crate) fn legalize_mixed_regions(
    design: &Design,
    catalog: &SiteCatalog,
    positions: &Positions,
    area_types: &[AreaTypeId],
) -> StageOutput {
    let mut out = StageOutput::default();
    out.lock_types.extend_from_slice(area_types);

    for region in catalog.regions() {
        let bbox = region.bbox;
        // Bucket movable members into the site row nearest their position.
        let mut rows: HashMap<i64, Vec<PackItem>> = HashMap::new();
        for &member in &region.members {
            let inst = design.instance(member);
            if !inst.is_movable() || inst.chain.is_some() {
                continue;
            }
            if !area_types.contains(&inst.area_type) {
                continue;
            }
            let (x, y) = positions.xy(member);
            let max_row = (bbox.yh - inst.height).max(bbox.yl);
            let row = y.round().max(bbox.yl).min(max_row) as i64;
            rows.entry(row).or_default().push(PackItem {
                inst: member,
                target: x,
                width: inst.width,
                weight: 1.0,
            });
        }

        let mut row_ids: Vec<i64> = rows.keys().copied().collect();
        row_ids.sort_unstable();
        for row in row_ids {
            let items = &rows[&row];
            match pack_row(bbox.xl, bbox.xh, items) {
                Ok(result) => {
                    for (item, &x) in items.iter().zip(&result.positions) {
                        out.updates.push((item.inst, x.floor(), row as f32, 0));
                        out.locks.push(item.inst);
                    }
                }
                Err(overflow) => {
                    let failure = LegalizeError::RegionCapacityExceeded {
                        region: region.id,
                        required: overflow.required,
                        available: overflow.available,
                    };
                    out.events.push(
                        Event::error(Stage::MixedRegion, failure.to_string())
                            .with_insts(items.iter().map(|it| it.inst)),
                    );
                    out.failures.push(failure);
                }
            }
        }
    }
    out
}
