//! Alignment post-processors.
//!
//! Two cheap projection passes run after the combinatorial legalizers.
//! Shape alignment snaps every member of a shape group to its anchor plus
//! the stored offset; region alignment clamps every movable instance into
//! its region's box (or the whole die for unfenced instances). Both are
//! pure projections — no search, no failure modes — and running either
//! twice produces the same result as running it once.

use crate::data::{Design, Positions};
use strata_fabric::SiteCatalog;

/// Snaps every non-anchor shape member to anchor position + stored offset.
///
/// Slot offsets below zero clamp to slot 0; x/y offsets are applied
/// exactly, so the shape invariant holds bit-for-bit afterward.
pub fn align_shapes(design: &Design, positions: &mut Positions) {
    for shape in &design.shapes {
        let Some((&anchor, rest)) = shape.members.split_first() else {
            continue;
        };
        let (ax, ay, az) = positions.xyz(anchor);
        for (&member, offset) in rest.iter().zip(&shape.offsets[1..]) {
            let z = (az as i64 + offset.dz as i64).max(0) as u32;
            positions.set_xyz(member, ax + offset.dx, ay + offset.dy, z);
        }
    }
}

/// Clamps every movable instance into its region's box, per axis.
///
/// Instances without a region assignment clamp against a pseudo-region
/// equal to the whole die, which guarantees containment even when the
/// upstream analytic placement pushed an instance off the fabric. Fixed
/// instances and fillers are untouched.
pub fn align_regions(design: &Design, catalog: &SiteCatalog, positions: &mut Positions) {
    let die = catalog.die_bbox();
    for inst in &design.instances {
        if !inst.is_movable() {
            continue;
        }
        let bbox = match inst.region {
            Some(region) => catalog.region(region).bbox,
            None => die,
        };
        let (x, y) = positions.xy(inst.id);
        let (cx, cy) = bbox.clamp(x, y, inst.width, inst.height);
        positions.set_xy(inst.id, cx, cy);
    }
}
