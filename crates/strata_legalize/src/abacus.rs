//! Abacus-style row packer.
//!
//! Eliminates overlap among instances arranged along one axis while
//! minimizing total weighted displacement. Instances are sorted by their
//! desired coordinate and scanned once; each instance joins a running
//! cluster, and clusters that collide are merged and re-placed at their
//! closed-form optimal position (the weighted mean of member targets),
//! clamped into the row bounds. Merging propagates leftward until no two
//! clusters overlap.
//!
//! The row primitive works in continuous coordinates; mapping packed
//! positions back onto integer site coordinates is the caller's concern.
//! [`legalize_dense_type`] builds on it to legalize a whole dense area
//! type (LUTs, flip-flops): instances are distributed to site rows in
//! y-order, dealt across the sites' sub-site slots, and packed per row.

use crate::data::{Design, InstClass, Positions};
use crate::error::{LegalizeError, LegalizeResult};
use crate::pipeline::StageOutput;
use std::collections::BTreeMap;
use strata_diagnostics::{Event, Stage};
use strata_fabric::{AreaTypeId, InstId, SiteCatalog};

/// One instance to pack, described along the packing axis.
#[derive(Debug, Clone, Copy)]
pub struct PackItem {
    /// The instance being packed.
    pub inst: InstId,
    /// Desired coordinate along the packing axis.
    pub target: f32,
    /// Extent along the packing axis, in site units.
    pub width: f32,
    /// Displacement weight of this instance.
    pub weight: f32,
}

/// The result of packing one row.
#[derive(Debug, Clone)]
pub struct PackResult {
    /// Packed coordinates, parallel to the input item slice.
    pub positions: Vec<f32>,
    /// Total weighted L1 displacement from the targets.
    pub total_cost: f64,
}

/// The row cannot hold its items: summed widths exceed the span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overflow {
    /// Site units required by the items.
    pub required: f32,
    /// Site units available in the row.
    pub available: f32,
}

/// A maximal run of items placed back to back.
///
/// `e` is the accumulated weight, `q` the weighted sum of (target − offset
/// within cluster), and `w` the total width; the optimal cluster position
/// is `q / e`.
#[derive(Debug, Clone, Copy)]
struct Cluster {
    e: f64,
    q: f64,
    w: f64,
    /// Index into the sorted order of the first member.
    first: usize,
}

impl Cluster {
    fn position(&self, lower: f64, upper: f64) -> f64 {
        (self.q / self.e).max(lower).min(upper - self.w)
    }
}

/// Packs `items` into `[lower, upper)` without overlap, minimizing total
/// weighted displacement.
///
/// Ties between equal targets resolve by instance ID, so packing is
/// deterministic for any input order.
///
/// # Errors
///
/// Returns [`Overflow`] when the summed item widths exceed the row span;
/// positions are not produced in that case.
pub fn pack_row(lower: f32, upper: f32, items: &[PackItem]) -> Result<PackResult, Overflow> {
    if items.is_empty() {
        return Ok(PackResult {
            positions: Vec::new(),
            total_cost: 0.0,
        });
    }

    let span = (upper - lower) as f64;
    let required: f64 = items.iter().map(|it| it.width as f64).sum();
    if required > span {
        return Err(Overflow {
            required: required as f32,
            available: span as f32,
        });
    }

    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| {
        items[a]
            .target
            .total_cmp(&items[b].target)
            .then(items[a].inst.cmp(&items[b].inst))
    });

    let lower = lower as f64;
    let upper = upper as f64;
    let mut clusters: Vec<Cluster> = Vec::new();
    for (k, &idx) in order.iter().enumerate() {
        let item = &items[idx];
        clusters.push(Cluster {
            e: item.weight as f64,
            q: item.weight as f64 * item.target as f64,
            w: item.width as f64,
            first: k,
        });
        // Collapse while the new cluster overlaps its predecessor.
        while clusters.len() >= 2 {
            let cur = clusters[clusters.len() - 1];
            let prev = clusters[clusters.len() - 2];
            if prev.position(lower, upper) + prev.w <= cur.position(lower, upper) {
                break;
            }
            let merged = Cluster {
                e: prev.e + cur.e,
                q: prev.q + cur.q - cur.e * prev.w,
                w: prev.w + cur.w,
                first: prev.first,
            };
            clusters.pop();
            *clusters.last_mut().unwrap() = merged;
        }
    }

    let mut positions = vec![0.0f32; items.len()];
    let mut total_cost = 0.0f64;
    for (c, cluster) in clusters.iter().enumerate() {
        let end = clusters
            .get(c + 1)
            .map(|next| next.first)
            .unwrap_or(order.len());
        let mut x = cluster.position(lower, upper);
        for &idx in &order[cluster.first..end] {
            let item = &items[idx];
            positions[idx] = x as f32;
            total_cost += item.weight as f64 * (x - item.target as f64).abs();
            x += item.width as f64;
        }
    }

    Ok(PackResult {
        positions,
        total_cost,
    })
}

/// A maximal run of free cells within one slot plane of a site row.
#[derive(Debug, Clone)]
struct Segment {
    z: u32,
    lower: u32,
    /// One past the last free cell.
    upper: u32,
    members: Vec<(InstId, f32)>,
}

impl Segment {
    fn capacity(&self) -> usize {
        (self.upper - self.lower) as usize
    }
    fn center(&self) -> f32 {
        (self.lower + self.upper) as f32 * 0.5
    }
}

/// One site row of a dense area type, split into free segments per slot
/// plane around fixed obstacles and grid gaps.
struct DenseRow {
    y: u32,
    segments: Vec<Segment>,
}

/// Legalizes a dense, uniform-footprint area type (LUTs, flip-flops) by
/// row packing.
///
/// Instances are distributed to site rows in y-order (nearest row with
/// remaining capacity), then within a row to the free segment closest to
/// their position, and each segment is packed in x by [`pack_row`]. Fixed
/// instances stay put and act as segment boundaries; fillers are skipped;
/// chain members are left to the chain legalizer.
///
/// # Errors
///
/// Propagates [`LegalizeError::InfeasibleAssignment`] when the type has
/// more movable instances than free cells.
pub(crate) fn legalize_dense_type(
    design: &Design,
    catalog: &SiteCatalog,
    positions: &Positions,
    area_type: AreaTypeId,
) -> LegalizeResult<StageOutput> {
    let mut out = StageOutput::default();

    let mut movable = Vec::new();
    let mut fixed_cells: Vec<(u32, u32, u32)> = Vec::new();
    for inst in design.instances_of_type(area_type) {
        match inst.class {
            InstClass::Movable if inst.chain.is_none() => movable.push(inst.id),
            InstClass::Fixed => {
                let (x, y, z) = positions.xyz(inst.id);
                fixed_cells.push((x.round() as u32, y.round() as u32, z));
            }
            _ => {}
        }
    }

    // Free cells per (row, slot plane), with fixed obstacles carved out,
    // merged into maximal segments.
    let mut cells: BTreeMap<(u32, u32), Vec<u32>> = BTreeMap::new();
    for id in catalog.sites_with_capacity(area_type) {
        let site = catalog.site(id);
        for z in 0..catalog.kind(site.kind).capacity_of(area_type) {
            if fixed_cells.contains(&(site.x, site.y, z)) {
                continue;
            }
            cells.entry((site.y, z)).or_default().push(site.x);
        }
    }
    let mut rows: BTreeMap<u32, DenseRow> = BTreeMap::new();
    for ((y, z), mut xs) in cells {
        xs.sort_unstable();
        let row = rows.entry(y).or_insert(DenseRow {
            y,
            segments: Vec::new(),
        });
        let mut run_start = xs[0];
        let mut prev = xs[0];
        for &x in &xs[1..] {
            if x != prev + 1 {
                row.segments.push(Segment {
                    z,
                    lower: run_start,
                    upper: prev + 1,
                    members: Vec::new(),
                });
                run_start = x;
            }
            prev = x;
        }
        row.segments.push(Segment {
            z,
            lower: run_start,
            upper: prev + 1,
            members: Vec::new(),
        });
    }

    let demand = movable.len();
    let supply: usize = rows
        .values()
        .map(|r| r.segments.iter().map(Segment::capacity).sum::<usize>())
        .sum();
    if demand > supply {
        return Err(LegalizeError::InfeasibleAssignment {
            area_type,
            demand,
            supply,
        });
    }
    if demand == 0 {
        return Ok(out);
    }

    // Nearest row with remaining capacity, walking instances bottom-up so
    // the greedy choice does not depend on instance ID order.
    movable.sort_by(|&a, &b| {
        let pa = positions.xy(a);
        let pb = positions.xy(b);
        pa.1.total_cmp(&pb.1)
            .then(pa.0.total_cmp(&pb.0))
            .then(a.cmp(&b))
    });
    let mut remaining: BTreeMap<u32, usize> = rows
        .iter()
        .map(|(&y, r)| (y, r.segments.iter().map(Segment::capacity).sum()))
        .collect();
    for &inst in &movable {
        let (x, y) = positions.xy(inst);
        let row_y = remaining
            .iter()
            .filter(|&(_, &cap)| cap > 0)
            .map(|(&ry, _)| ry)
            .min_by(|&a, &b| {
                let da = (a as f32 - y).abs();
                let db = (b as f32 - y).abs();
                da.total_cmp(&db).then(a.cmp(&b))
            })
            .expect("supply covers demand, so a row with capacity remains");
        *remaining.get_mut(&row_y).unwrap() -= 1;
        // Within the row, the nearest segment with room.
        let row = rows.get_mut(&row_y).unwrap();
        let seg = row
            .segments
            .iter_mut()
            .filter(|s| s.members.len() < s.capacity())
            .min_by(|a, b| {
                let da = (a.center() - x).abs();
                let db = (b.center() - x).abs();
                da.total_cmp(&db).then(a.z.cmp(&b.z)).then(a.lower.cmp(&b.lower))
            })
            .expect("row with remaining capacity has a non-full segment");
        seg.members.push((inst, x));
    }

    let mut total_cost = 0.0;
    for row in rows.values_mut() {
        for seg in &mut row.segments {
            if seg.members.is_empty() {
                continue;
            }
            let items: Vec<PackItem> = seg
                .members
                .iter()
                .map(|&(inst, x)| PackItem {
                    inst,
                    target: x,
                    width: 1.0,
                    weight: 1.0,
                })
                .collect();
            // Segment fill is capped at capacity, so packing cannot overflow.
            let result = pack_row(seg.lower as f32, seg.upper as f32, &items)
                .expect("segment load is bounded by its capacity");
            total_cost += result.total_cost;
            for (item, &x) in items.iter().zip(&result.positions) {
                out.updates.push((item.inst, x.floor(), row.y as f32, seg.z));
                out.locks.push(item.inst);
            }
        }
    }
    out.events.push(Event::note(
        Stage::DensePack,
        format!(
            "area type {area_type}: {demand} instances packed over {} rows, displacement {total_cost:.2}",
            rows.len()
        ),
    ));

    Ok(out)
}
