//! Chain legalization by radius-expanding search.
//!
//! Chains are rigid multi-site groups (carry chains, cascades) whose
//! members must land on a contiguous run of compatible sites. Each chain is
//! placed as one body: starting from the chain's current anchor position,
//! candidate anchor sites are examined in Manhattan-distance rings whose
//! radius grows by a fixed increment per iteration. The increment is
//! derived from the die dimensions so the whole die is covered within the
//! iteration budget; the budget is the sole bounded-retry mechanism in the
//! pipeline. Escalating the radius linearly favors locality — most chains
//! resolve within a few small rings when local capacity suffices.
//!
//! Chains are processed sequentially in a deterministic order (descending
//! member count, then ascending chain id) against the shared claimed-site
//! set, so results are reproducible run to run.

use crate::config::LegalizeConfig;
use crate::context::LegalizationContext;
use crate::data::{ChainGroup, Design, Positions};
use crate::error::LegalizeError;
use strata_diagnostics::{Event, EventSink, Stage};
use strata_fabric::{Site, SiteCatalog};

/// A candidate anchor site at a known Manhattan distance.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist: i64,
    site: u32,
}

/// Legalizes every chain in the design.
///
/// Successful chains move rigidly onto their anchor site (member offsets
/// preserved exactly), their `(site, slot)` pairs are claimed in the
/// context, and their members are locked. A chain that exhausts the search
/// budget is reported — as an error event and in the returned failure list
/// — without affecting the other chains.
pub fn legalize_chains(
    design: &Design,
    catalog: &SiteCatalog,
    config: &LegalizeConfig,
    positions: &mut Positions,
    ctx: &mut LegalizationContext,
    sink: &EventSink,
) -> Vec<LegalizeError> {
    let mut order: Vec<&ChainGroup> = design.chains.iter().collect();
    order.sort_by(|a, b| {
        b.members
            .len()
            .cmp(&a.members.len())
            .then(a.id.cmp(&b.id))
    });

    let max_iter = config.chain_max_iterations.max(1) as i64;
    let die_span = (catalog.width() + catalog.height()) as i64;
    // Worst-case ring must reach every site within the budget.
    let increment = (die_span + max_iter - 1) / max_iter;
    let increment = increment.max(1);

    let mut failures = Vec::new();
    for chain in order {
        if chain.members.is_empty() {
            continue;
        }
        match place_chain(chain, design, catalog, positions, ctx, max_iter, increment) {
            Some(()) => {}
            None => {
                let failure = LegalizeError::ChainLegalizationFailure {
                    chain: chain.id,
                    iterations: max_iter as u32,
                };
                sink.emit(
                    Event::error(Stage::Chain, failure.to_string())
                        .with_insts(chain.members.iter().copied()),
                );
                failures.push(failure);
            }
        }
    }
    failures
}

/// Searches outward from the chain's anchor and commits the first feasible
/// placement. Returns `None` when the budget is exhausted.
fn place_chain(
    chain: &ChainGroup,
    design: &Design,
    catalog: &SiteCatalog,
    positions: &mut Positions,
    ctx: &mut LegalizationContext,
    max_iter: i64,
    increment: i64,
) -> Option<()> {
    let anchor_type = design.instance(chain.members[0]).area_type;
    let (ax, ay) = positions.xy(chain.members[0]);
    let (ax, ay) = (ax.round() as i64, ay.round() as i64);

    let mut candidates: Vec<Candidate> = catalog
        .sites_with_capacity(anchor_type)
        .into_iter()
        .map(|id| {
            let site = catalog.site(id);
            Candidate {
                dist: (site.x as i64 - ax).abs() + (site.y as i64 - ay).abs(),
                site: id.as_raw(),
            }
        })
        .collect();
    candidates.sort_by_key(|c| (c.dist, c.site));

    let mut next = 0usize;
    for iter in 0..=max_iter {
        let radius = iter * increment;
        while next < candidates.len() && candidates[next].dist <= radius {
            let anchor = catalog.site(strata_fabric::SiteId::from_raw(candidates[next].site));
            next += 1;
            if let Some(slots) = chain_fits(chain, design, catalog, ctx, anchor) {
                commit(chain, positions, ctx, &slots);
                return Some(());
            }
        }
        if next >= candidates.len() {
            break;
        }
    }
    None
}

/// Checks that every member offset lands on an existing, compatible,
/// unclaimed `(site, slot)` pair relative to `anchor`.
///
/// Returns the member placements `(x, y, z, site)` on success.
fn chain_fits<'a>(
    chain: &ChainGroup,
    design: &Design,
    catalog: &'a SiteCatalog,
    ctx: &LegalizationContext,
    anchor: &Site,
) -> Option<Vec<(u32, u32, u32, &'a Site)>> {
    let mut slots = Vec::with_capacity(chain.members.len());
    for (&member, offset) in chain.members.iter().zip(&chain.offsets) {
        let tx = anchor.x as i64 + offset.dx.round() as i64;
        let ty = anchor.y as i64 + offset.dy.round() as i64;
        if tx < 0 || ty < 0 || offset.dz < 0 {
            return None;
        }
        let site = catalog.site_at(tx as u32, ty as u32)?;
        let area_type = design.instance(member).area_type;
        let z = offset.dz as u32;
        if catalog.kind(site.kind).capacity_of(area_type) <= z {
            return None;
        }
        if ctx.is_claimed(site.id, z) {
            return None;
        }
        slots.push((tx as u32, ty as u32, z, site));
    }
    Some(slots)
}

/// Moves the chain rigidly onto the found run, claiming and locking.
fn commit(
    chain: &ChainGroup,
    positions: &mut Positions,
    ctx: &mut LegalizationContext,
    slots: &[(u32, u32, u32, &Site)],
) {
    for (&member, &(x, y, z, site)) in chain.members.iter().zip(slots) {
        positions.set_xyz(member, x as f32, y as f32, z);
        ctx.claim(site.id, z);
        ctx.lock_inst(member);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GroupOffset, InstClass, Instance};
    use strata_fabric::{AreaTypeId, InstId, SiteCatalogBuilder};

    fn uniform_catalog(width: u32, height: u32) -> SiteCatalog {
        let mut b = SiteCatalogBuilder::new(width, height);
        b.add_area_type("CARRY", false);
        let kind = b.add_site_kind("SLICE", vec![1]);
        for x in 0..width {
            for y in 0..height {
                b.add_site(x, y, kind);
            }
        }
        b.build().unwrap()
    }

    fn movable(name: &str) -> Instance {
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

    fn horizontal_chain(design: &mut Design, len: u32) -> Vec<InstId> {
        let members: Vec<InstId> = (0..len)
            .map(|i| design.add_instance(movable(&format!("c{i}"))))
            .collect();
        let offsets: Vec<GroupOffset> = (0..len)
            .map(|i| GroupOffset::new(i as f32, 0.0, 0))
            .collect();
        design.add_chain(members.clone(), offsets);
        members
    }

    #[test]
    fn chain_stays_when_already_legal() {
        let catalog = uniform_catalog(8, 8);
        let mut design = Design::new();
        let members = horizontal_chain(&mut design, 4);
        let mut positions = Positions::new(design.num_instances());
        for (i, &m) in members.iter().enumerate() {
            positions.set_xy(m, 2.0 + i as f32, 3.0);
        }
        let mut ctx = LegalizationContext::new(design.num_instances(), 1);
        let sink = EventSink::new();
        let failures = legalize_chains(
            &design,
            &catalog,
            &LegalizeConfig::default(),
            &mut positions,
            &mut ctx,
            &sink,
        );
        assert!(failures.is_empty());
        for (i, &m) in members.iter().enumerate() {
            assert_eq!(positions.xyz(m), (2.0 + i as f32, 3.0, 0));
            assert!(ctx.is_inst_locked(m));
        }
    }

    #[test]
    fn chain_moves_rigidly_to_nearest_free_run() {
        let catalog = uniform_catalog(8, 8);
        let mut design = Design::new();
        let members = horizontal_chain(&mut design, 4);
        let mut positions = Positions::new(design.num_instances());
        for (i, &m) in members.iter().enumerate() {
            positions.set_xy(m, 2.0 + i as f32, 3.0);
        }
        let mut ctx = LegalizationContext::new(design.num_instances(), 1);
        // Occupy the whole target row so the chain must move off it.
        for x in 0..8 {
            let site = catalog.site_at(x, 3).unwrap();
            ctx.claim(site.id, 0);
        }
        let sink = EventSink::new();
        let failures = legalize_chains(
            &design,
            &catalog,
            &LegalizeConfig::default(),
            &mut positions,
            &mut ctx,
            &sink,
        );
        assert!(failures.is_empty());
        // The nearest free run is one row away; offsets stay rigid.
        let (x0, y0, _) = positions.xyz(members[0]);
        assert!((y0 - 3.0).abs() == 1.0);
        for (i, &m) in members.iter().enumerate() {
            let (x, y, z) = positions.xyz(m);
            assert_eq!(x, x0 + i as f32);
            assert_eq!(y, y0);
            assert_eq!(z, 0);
        }
    }

    #[test]
    fn chains_do_not_share_sites() {
        let catalog = uniform_catalog(4, 2);
        let mut design = Design::new();
        let a = horizontal_chain(&mut design, 4);
        let b = horizontal_chain(&mut design, 4);
        let mut positions = Positions::new(design.num_instances());
        for (i, &m) in a.iter().enumerate() {
            positions.set_xy(m, i as f32, 0.0);
        }
        for (i, &m) in b.iter().enumerate() {
            positions.set_xy(m, i as f32, 0.0);
        }
        let mut ctx = LegalizationContext::new(design.num_instances(), 1);
        let sink = EventSink::new();
        let failures = legalize_chains(
            &design,
            &catalog,
            &LegalizeConfig::default(),
            &mut positions,
            &mut ctx,
            &sink,
        );
        assert!(failures.is_empty());
        // Equal length: ascending chain id, so chain a keeps row 0.
        assert_eq!(positions.xyz(a[0]), (0.0, 0.0, 0));
        assert_eq!(positions.xyz(b[0]), (0.0, 1.0, 0));
    }

    #[test]
    fn longer_chains_place_first() {
        let catalog = uniform_catalog(4, 2);
        let mut design = Design::new();
        let short = horizontal_chain(&mut design, 2);
        let long = horizontal_chain(&mut design, 4);
        let mut positions = Positions::new(design.num_instances());
        // Both want row 0.
        for (i, &m) in short.iter().enumerate() {
            positions.set_xy(m, i as f32, 0.0);
        }
        for (i, &m) in long.iter().enumerate() {
            positions.set_xy(m, i as f32, 0.0);
        }
        let mut ctx = LegalizationContext::new(design.num_instances(), 1);
        let sink = EventSink::new();
        legalize_chains(
            &design,
            &catalog,
            &LegalizeConfig::default(),
            &mut positions,
            &mut ctx,
            &sink,
        );
        // The 4-long chain went first and took row 0.
        assert_eq!(positions.xyz(long[0]), (0.0, 0.0, 0));
        assert_eq!(positions.xyz(short[0]), (0.0, 1.0, 0));
    }

    #[test]
    fn budget_exhaustion_is_reported_per_chain() {
        // A 2x1 die cannot host a 4-long horizontal chain at all.
        let catalog = uniform_catalog(2, 1);
        let mut design = Design::new();
        let doomed = horizontal_chain(&mut design, 4);
        let fine = horizontal_chain(&mut design, 2);
        let mut positions = Positions::new(design.num_instances());
        let mut ctx = LegalizationContext::new(design.num_instances(), 1);
        let sink = EventSink::new();
        let failures = legalize_chains(
            &design,
            &catalog,
            &LegalizeConfig::default(),
            &mut positions,
            &mut ctx,
            &sink,
        );
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0],
            LegalizeError::ChainLegalizationFailure { .. }
        ));
        assert!(sink.has_errors());
        // The independent chain still legalized.
        assert!(ctx.is_inst_locked(fine[0]));
        assert!(!ctx.is_inst_locked(doomed[0]));
    }

    #[test]
    fn search_covers_whole_die_within_budget() {
        // Die span 16+16; increment ceil(32 / 50) = 1, so a chain in one
        // corner must still reach the single free site in the opposite
        // corner within the budget.
        let catalog = uniform_catalog(16, 16);
        let mut design = Design::new();
        let members = horizontal_chain(&mut design, 1);
        let mut positions = Positions::new(design.num_instances());
        positions.set_xy(members[0], 0.0, 0.0);
        let mut ctx = LegalizationContext::new(design.num_instances(), 1);
        for site in catalog.sites() {
            if (site.x, site.y) != (15, 15) {
                ctx.claim(site.id, 0);
            }
        }
        let sink = EventSink::new();
        let failures = legalize_chains(
            &design,
            &catalog,
            &LegalizeConfig::default(),
            &mut positions,
            &mut ctx,
            &sink,
        );
        assert!(failures.is_empty());
        assert_eq!(positions.xyz(members[0]), (15.0, 15.0, 0));
    }

    #[test]
    fn vertical_offsets_with_slots() {
        let mut b = SiteCatalogBuilder::new(2, 2);
        b.add_area_type("RAM", false);
        let kind = b.add_site_kind("RAMB", vec![2]);
        for x in 0..2 {
            for y in 0..2 {
                b.add_site(x, y, kind);
            }
        }
        let catalog = b.build().unwrap();

        let mut design = Design::new();
        let a = design.add_instance(movable("a"));
        let c = design.add_instance(movable("b"));
        design.add_chain(
            vec![a, c],
            vec![GroupOffset::ZERO, GroupOffset::new(0.0, 0.0, 1)],
        );
        let mut positions = Positions::new(2);
        positions.set_xy(a, 1.0, 1.0);
        positions.set_xy(c, 1.0, 1.0);
        let mut ctx = LegalizationContext::new(2, 1);
        let sink = EventSink::new();
        let failures = legalize_chains(
            &design,
            &catalog,
            &LegalizeConfig::default(),
            &mut positions,
            &mut ctx,
            &sink,
        );
        assert!(failures.is_empty());
        assert_eq!(positions.xyz(a), (1.0, 1.0, 0));
        assert_eq!(positions.xyz(c), (1.0, 1.0, 1));
    }
}
