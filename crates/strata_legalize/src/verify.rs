//! Post-legalization legality audit.
//!
//! A pure read-only pass over the final positions: occupancy is re-derived
//! per `(site, slot, area type)` and every constraint class is re-checked —
//! grid alignment, resource compatibility, overlap, capacity, shape
//! offsets, region containment, and (when enabled) clock-region and
//! half-column clock-net budgets. Nothing is ever fixed here; fixing is the
//! legalizers' job. An empty report is the only confirmation of success.

use crate::config::LegalizeConfig;
use crate::data::{Design, InstClass, Positions};
use crate::ids::ShapeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use strata_fabric::{AreaTypeId, ClockRegionId, InstId, RegionId, SiteCatalog, SiteId};

/// One legality violation found by the audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Violation {
    /// An instance is off the site grid or overhangs missing sites.
    OffGrid {
        /// The misplaced instance.
        inst: InstId,
        /// Its offending x coordinate.
        x: f32,
        /// Its offending y coordinate.
        y: f32,
    },
    /// An instance sits on a site that does not accept its area type, or
    /// on a slot index beyond the site's capacity.
    TypeMismatch {
        /// The mismatched instance.
        inst: InstId,
        /// The site it sits on.
        site: SiteId,
    },
    /// Two or more instances of one area type share a `(site, slot)` pair.
    Overlap {
        /// The contested site.
        site: SiteId,
        /// The contested slot.
        z: u32,
        /// All instances claiming the pair.
        insts: Vec<InstId>,
    },
    /// More instances of an area type on a site than the site accepts.
    CapacityExceeded {
        /// The overloaded site.
        site: SiteId,
        /// The area type whose demand overflows.
        area_type: AreaTypeId,
        /// Instances of that type on the site.
        demand: u32,
        /// The site's capacity for that type.
        capacity: u32,
    },
    /// A shape member is not at anchor position + stored offset.
    ShapeOffset {
        /// The violated shape group.
        shape: ShapeId,
        /// The out-of-place member.
        inst: InstId,
    },
    /// A region member lies outside its region's box.
    RegionContainment {
        /// The violated region.
        region: RegionId,
        /// The escaped member.
        inst: InstId,
    },
    /// A clock region uses more distinct clock nets than budgeted.
    ClockRegionBudget {
        /// The overloaded clock region.
        clock_region: ClockRegionId,
        /// Distinct clock nets used inside the region.
        used: u32,
        /// The region's budget.
        budget: u32,
    },
    /// One site column within a clock region exceeds the half-column budget.
    HalfColumnBudget {
        /// The clock region containing the column.
        clock_region: ClockRegionId,
        /// The overloaded site column.
        column: u32,
        /// Distinct clock nets used in the column.
        used: u32,
        /// The half-column budget.
        budget: u32,
    },
}

/// The verifier's structured pass/fail result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegalityReport {
    /// Every violation found, in deterministic order.
    pub violations: Vec<Violation>,
}

impl LegalityReport {
    /// Returns whether the placement passed every check.
    pub fn is_legal(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Audits the final placement against every constraint class.
///
/// Fillers are exempt: they are density placeholders the caller drops
/// after legalization. Clock budgets are only checked when
/// `config.check_clock_budgets` is set and the catalog declares clock
/// regions.
pub fn verify(
    design: &Design,
    catalog: &SiteCatalog,
    config: &LegalizeConfig,
    positions: &Positions,
) -> LegalityReport {
    let mut report = LegalityReport::default();

    // Occupancy per (site, slot, area type), derived from scratch.
    let mut occupancy: HashMap<(SiteId, u32, AreaTypeId), Vec<InstId>> = HashMap::new();
    // Demand per (anchor site, area type) for the capacity check.
    let mut demand: HashMap<(SiteId, AreaTypeId), u32> = HashMap::new();

    for inst in &design.instances {
        if inst.class == InstClass::Filler {
            continue;
        }
        let (x, y, z) = positions.xyz(inst.id);
        if x.fract() != 0.0 || y.fract() != 0.0 || x < 0.0 || y < 0.0 {
            report.violations.push(Violation::OffGrid {
                inst: inst.id,
                x,
                y,
            });
            continue;
        }
        let (ix, iy) = (x as u32, y as u32);
        let Some(anchor) = catalog.site_at(ix, iy) else {
            report.violations.push(Violation::OffGrid {
                inst: inst.id,
                x,
                y,
            });
            continue;
        };

        let capacity = catalog.kind(anchor.kind).capacity_of(inst.area_type);
        if capacity == 0 || z >= capacity {
            report.violations.push(Violation::TypeMismatch {
                inst: inst.id,
                site: anchor.id,
            });
            continue;
        }
        *demand.entry((anchor.id, inst.area_type)).or_insert(0) += 1;

        // Register every covered cell so wide macros collide correctly.
        let (w, h) = (inst.width.ceil() as u32, inst.height.ceil() as u32);
        let mut covered_ok = true;
        for dx in 0..w.max(1) {
            for dy in 0..h.max(1) {
                match catalog.site_at(ix + dx, iy + dy) {
                    Some(site) => occupancy
                        .entry((site.id, z, inst.area_type))
                        .or_default()
                        .push(inst.id),
                    None => covered_ok = false,
                }
            }
        }
        if !covered_ok {
            report.violations.push(Violation::OffGrid {
                inst: inst.id,
                x,
                y,
            });
        }
    }

    let mut overlaps: Vec<(SiteId, u32, Vec<InstId>)> = occupancy
        .into_iter()
        .filter(|(_, insts)| insts.len() > 1)
        .map(|((site, z, _), mut insts)| {
            insts.sort();
            (site, z, insts)
        })
        .collect();
    overlaps.sort_by_key(|&(site, z, _)| (site, z));
    for (site, z, insts) in overlaps {
        report.violations.push(Violation::Overlap { site, z, insts });
    }

    let mut overloaded: Vec<(SiteId, AreaTypeId, u32)> = demand
        .into_iter()
        .filter(|&((site, area_type), count)| count > catalog.site_capacity(site, area_type))
        .map(|((site, area_type), count)| (site, area_type, count))
        .collect();
    overloaded.sort_by_key(|&(site, area_type, _)| (site, area_type));
    for (site, area_type, count) in overloaded {
        report.violations.push(Violation::CapacityExceeded {
            site,
            area_type,
            demand: count,
            capacity: catalog.site_capacity(site, area_type),
        });
    }

    check_shapes(design, positions, &mut report);
    check_regions(design, catalog, positions, &mut report);
    if config.check_clock_budgets {
        check_clock_budgets(design, catalog, positions, &mut report);
    }

    report
}

fn check_shapes(design: &Design, positions: &Positions, report: &mut LegalityReport) {
    for shape in &design.shapes {
        let Some(&anchor) = shape.members.first() else {
            continue;
        };
        let (ax, ay, az) = positions.xyz(anchor);
        for (&member, offset) in shape.members.iter().zip(&shape.offsets).skip(1) {
            let (mx, my, mz) = positions.xyz(member);
            let expect_z = (az as i64 + offset.dz as i64).max(0) as u32;
            if mx != ax + offset.dx || my != ay + offset.dy || mz != expect_z {
                report.violations.push(Violation::ShapeOffset {
                    shape: shape.id,
                    inst: member,
                });
            }
        }
    }
}

fn check_regions(
    design: &Design,
    catalog: &SiteCatalog,
    positions: &Positions,
    report: &mut LegalityReport,
) {
    for region in catalog.regions() {
        let bbox = region.bbox;
        for &member in &region.members {
            let inst = design.instance(member);
            if inst.class == InstClass::Filler {
                continue;
            }
            let (x, y) = positions.xy(member);
            let inside = x >= bbox.xl
                && x + inst.width <= bbox.xh
                && y >= bbox.yl
                && y + inst.height <= bbox.yh;
            if !inside {
                report.violations.push(Violation::RegionContainment {
                    region: region.id,
                    inst: member,
                });
            }
        }
    }
}

fn check_clock_budgets(
    design: &Design,
    catalog: &SiteCatalog,
    positions: &Positions,
    report: &mut LegalityReport,
) {
    // Distinct clock nets per clock region and per (region, column).
    let mut region_nets: HashMap<ClockRegionId, BTreeSet<u32>> = HashMap::new();
    let mut column_nets: HashMap<(ClockRegionId, u32), BTreeSet<u32>> = HashMap::new();
    for inst in &design.instances {
        if inst.class == InstClass::Filler || inst.clock_nets.is_empty() {
            continue;
        }
        let (x, y) = positions.xy(inst.id);
        let Some(cr) = catalog.clock_region_at(x + 0.5, y + 0.5) else {
            continue;
        };
        region_nets
            .entry(cr)
            .or_default()
            .extend(inst.clock_nets.iter().copied());
        column_nets
            .entry((cr, x as u32))
            .or_default()
            .extend(inst.clock_nets.iter().copied());
    }

    for cr in catalog.clock_regions() {
        if let Some(nets) = region_nets.get(&cr.id) {
            if nets.len() as u32 > cr.max_clock_nets {
                report.violations.push(Violation::ClockRegionBudget {
                    clock_region: cr.id,
                    used: nets.len() as u32,
                    budget: cr.max_clock_nets,
                });
            }
        }
    }
    if let Some(budget) = catalog.half_column_budget() {
        let mut columns: Vec<_> = column_nets.into_iter().collect();
        columns.sort_by_key(|&((cr, col), _)| (cr, col));
        for ((cr, col), nets) in columns {
            if nets.len() as u32 > budget {
                report.violations.push(Violation::HalfColumnBudget {
                    clock_region: cr,
                    column: col,
                    used: nets.len() as u32,
                    budget,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GroupOffset;
    use crate::data::Instance;
    use strata_common::BBox;
    use strata_fabric::SiteCatalogBuilder;

    fn catalog() -> SiteCatalog {
        let mut b = SiteCatalogBuilder::new(4, 4);
        b.add_area_type("LUT", false);
        let kind = b.add_site_kind("SLICE", vec![2]);
        for x in 0..4 {
            for y in 0..4 {
                b.add_site(x, y, kind);
            }
        }
        b.build().unwrap()
    }

    fn lut(name: &str) -> Instance {
        Instance {
            id: InstId::from_raw(0),
            name: name.into(),
            area_type: AreaTypeId::from_raw(0),
            width: 1.0,
            height: 1.0,
            class: InstClass::Movable,
            region: None,
            shape: None,
            chain: None,
            clock_nets: Vec::new(),
        }
    }

    #[test]
    fn legal_placement_passes() {
        let catalog = catalog();
        let mut design = Design::new();
        let a = design.add_instance(lut("a"));
        let b = design.add_instance(lut("b"));
        let mut positions = Positions::new(2);
        positions.set_xyz(a, 1.0, 1.0, 0);
        positions.set_xyz(b, 1.0, 1.0, 1);
        let report = verify(&design, &catalog, &LegalizeConfig::default(), &positions);
        assert!(report.is_legal());
    }

    #[test]
    fn off_grid_detected() {
        let catalog = catalog();
        let mut design = Design::new();
        let a = design.add_instance(lut("a"));
        let b = design.add_instance(lut("b"));
        let mut positions = Positions::new(2);
        positions.set_xyz(a, 1.5, 1.0, 0);
        positions.set_xyz(b, 9.0, 0.0, 0);
        let report = verify(&design, &catalog, &LegalizeConfig::default(), &positions);
        assert_eq!(report.violations.len(), 2);
        assert!(matches!(report.violations[0], Violation::OffGrid { inst, .. } if inst == a));
        assert!(matches!(report.violations[1], Violation::OffGrid { inst, .. } if inst == b));
    }

    #[test]
    fn overlap_detected() {
        let catalog = catalog();
        let mut design = Design::new();
        let a = design.add_instance(lut("a"));
        let b = design.add_instance(lut("b"));
        let mut positions = Positions::new(2);
        positions.set_xyz(a, 2.0, 2.0, 0);
        positions.set_xyz(b, 2.0, 2.0, 0);
        let report = verify(&design, &catalog, &LegalizeConfig::default(), &positions);
        assert_eq!(report.violations.len(), 1);
        match &report.violations[0] {
            Violation::Overlap { z, insts, .. } => {
                assert_eq!(*z, 0);
                assert_eq!(insts, &vec![a, b]);
            }
            other => panic!("unexpected violation {other:?}"),
        }
    }

    #[test]
    fn slot_beyond_capacity_is_type_mismatch() {
        let catalog = catalog();
        let mut design = Design::new();
        let a = design.add_instance(lut("a"));
        let mut positions = Positions::new(1);
        positions.set_xyz(a, 2.0, 2.0, 5);
        let report = verify(&design, &catalog, &LegalizeConfig::default(), &positions);
        assert!(matches!(
            report.violations[0],
            Violation::TypeMismatch { inst, .. } if inst == a
        ));
    }

    #[test]
    fn foreign_type_detected() {
        let catalog = catalog();
        let mut design = Design::new();
        let mut dsp = lut("dsp");
        dsp.area_type = AreaTypeId::from_raw(3);
        let a = design.add_instance(dsp);
        let positions = Positions::new(1);
        let report = verify(&design, &catalog, &LegalizeConfig::default(), &positions);
        assert!(matches!(
            report.violations[0],
            Violation::TypeMismatch { inst, .. } if inst == a
        ));
    }

    #[test]
    fn shape_offset_violation_detected() {
        let catalog = catalog();
        let mut design = Design::new();
        let a = design.add_instance(lut("a"));
        let b = design.add_instance(lut("b"));
        let shape = design.add_shape(
            vec![a, b],
            vec![GroupOffset::ZERO, GroupOffset::new(1.0, 0.0, 0)],
        );
        let mut positions = Positions::new(2);
        positions.set_xyz(a, 0.0, 0.0, 0);
        positions.set_xyz(b, 2.0, 0.0, 0);
        let report = verify(&design, &catalog, &LegalizeConfig::default(), &positions);
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::ShapeOffset { shape: s, inst } if *s == shape && *inst == b)));
    }

    #[test]
    fn region_containment_violation_detected() {
        let mut b = SiteCatalogBuilder::new(4, 4);
        b.add_area_type("LUT", false);
        let kind = b.add_site_kind("SLICE", vec![2]);
        for x in 0..4 {
            for y in 0..4 {
                b.add_site(x, y, kind);
            }
        }
        let region = b.add_region(BBox::new(0.0, 0.0, 2.0, 2.0), vec![InstId::from_raw(0)]);
        let catalog = b.build().unwrap();

        let mut design = Design::new();
        let mut fenced = lut("fenced");
        fenced.region = Some(region);
        let a = design.add_instance(fenced);
        let mut positions = Positions::new(1);
        positions.set_xyz(a, 3.0, 3.0, 0);
        let report = verify(&design, &catalog, &LegalizeConfig::default(), &positions);
        assert!(matches!(
            report.violations[0],
            Violation::RegionContainment { region: r, inst } if r == region && inst == a
        ));
    }

    #[test]
    fn fillers_are_exempt() {
        let catalog = catalog();
        let mut design = Design::new();
        let a = design.add_instance(lut("a"));
        let mut filler = lut("filler");
        filler.class = InstClass::Filler;
        let f = design.add_instance(filler);
        let mut positions = Positions::new(2);
        positions.set_xyz(a, 2.0, 2.0, 0);
        // Filler stacked on the same slot, and off-grid to boot.
        positions.set_xyz(f, 2.0, 2.0, 0);
        let report = verify(&design, &catalog, &LegalizeConfig::default(), &positions);
        assert!(report.is_legal());
    }

    #[test]
    fn clock_budget_checked_when_enabled() {
        let mut b = SiteCatalogBuilder::new(4, 4);
        b.add_area_type("LUT", false);
        let kind = b.add_site_kind("SLICE", vec![2]);
        for x in 0..4 {
            for y in 0..4 {
                b.add_site(x, y, kind);
            }
        }
        let cr = b.add_clock_region(BBox::new(0.0, 0.0, 4.0, 4.0), 2);
        b.half_column_budget(1);
        let catalog = b.build().unwrap();

        let mut design = Design::new();
        for i in 0..3 {
            let mut inst = lut(&format!("l{i}"));
            inst.clock_nets = vec![i];
            design.add_instance(inst);
        }
        let mut positions = Positions::new(3);
        positions.set_xyz(InstId::from_raw(0), 0.0, 0.0, 0);
        positions.set_xyz(InstId::from_raw(1), 0.0, 1.0, 0);
        positions.set_xyz(InstId::from_raw(2), 1.0, 0.0, 0);

        // Disabled by default: no clock violations.
        let report = verify(&design, &catalog, &LegalizeConfig::default(), &positions);
        assert!(report.is_legal());

        let config = LegalizeConfig {
            check_clock_budgets: true,
            ..LegalizeConfig::default()
        };
        let report = verify(&design, &catalog, &config, &positions);
        // 3 distinct nets > region budget 2; column 0 carries 2 nets > 1.
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::ClockRegionBudget { clock_region, used: 3, budget: 2 } if *clock_region == cr)));
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::HalfColumnBudget { column: 0, used: 2, budget: 1, .. })));
    }

    #[test]
    fn wide_macro_collision_detected() {
        let catalog = catalog();
        let mut design = Design::new();
        let mut wide = lut("wide");
        wide.width = 2.0;
        let a = design.add_instance(wide);
        let b = design.add_instance(lut("b"));
        let mut positions = Positions::new(2);
        positions.set_xyz(a, 0.0, 0.0, 0);
        // b sits on the cell covered by a's second column.
        positions.set_xyz(b, 1.0, 0.0, 0);
        let report = verify(&design, &catalog, &LegalizeConfig::default(), &positions);
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::Overlap { .. })));
    }

    #[test]
    fn report_serde_roundtrip() {
        let report = LegalityReport {
            violations: vec![Violation::Overlap {
                site: SiteId::from_raw(1),
                z: 0,
                insts: vec![InstId::from_raw(2), InstId::from_raw(3)],
            }],
        };
        let json = serde_json::to_string(&report).unwrap();
        let restored: LegalityReport = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.violations, report.violations);
        assert!(!restored.is_legal());
    }
}
