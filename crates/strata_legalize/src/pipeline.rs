//! Pipeline assembly and the parallel type-legalizer fan-out.
//!
//! At build time each declared area type is classified into exactly one
//! legalizer variant — edge/IO flow, SSR flow, dense row packing, or
//! mixed-size region packing — producing a tagged list instead of a
//! trait-object hierarchy. The variants operate on disjoint instance and
//! site sets, so they run on worker threads; each returns a batch of
//! position updates that the caller merges serially into the shared
//! buffer. No stage ever mutates shared state from inside the fan-out.

use crate::config::LegalizeConfig;
use crate::data::{Design, InstClass, Positions};
use crate::error::{LegalizeError, LegalizeResult};
use crate::{abacus, io, region};
use rayon::prelude::*;
use strata_diagnostics::Event;
use strata_fabric::{AreaTypeId, InstId, SiteCatalog};

/// The batch of results a type legalizer hands back for serial merging.
#[derive(Debug, Default)]
pub(crate) struct StageOutput {
    /// Position updates `(inst, x, y, z)`.
    pub updates: Vec<(InstId, f32, f32, u32)>,
    /// Instances to mark locked.
    pub locks: Vec<InstId>,
    /// Area types to mark locked.
    pub lock_types: Vec<AreaTypeId>,
    /// Recoverable failures encountered by the stage.
    pub failures: Vec<LegalizeError>,
    /// Events to forward to the sink.
    pub events: Vec<Event>,
}

/// One resource-type-specific legalizer, selected at pipeline-build time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LegalizerKind {
    /// Boundary area type: fixed pads as obstacles, movable pads by flow.
    Io(AreaTypeId),
    /// Single-site single-resource type: exact flow over capacity-1 sites.
    Ssr(AreaTypeId),
    /// Dense uniform-footprint type: row packing over multi-slot sites.
    Dense(AreaTypeId),
    /// Mixed-size, region-bound types: per-region packing.
    MixedRegion(Vec<AreaTypeId>),
}

/// Classifies every area type with instances into its legalizer variant.
///
/// IO types go to the edge legalizer. Non-IO types whose instances all
/// have a 1x1 footprint go to SSR flow when every accepting site kind has
/// capacity 1, and to dense row packing otherwise. Types with any larger
/// footprint are mixed-size and handled per region.
pub(crate) fn build_legalizers(design: &Design, catalog: &SiteCatalog) -> Vec<LegalizerKind> {
    let mut kinds = Vec::new();
    let mut mixed = Vec::new();
    for area_type in catalog.area_types() {
        let mut has_insts = false;
        let mut uniform = true;
        for inst in design.instances_of_type(area_type.id) {
            if inst.class == InstClass::Filler {
                continue;
            }
            has_insts = true;
            if inst.width != 1.0 || inst.height != 1.0 {
                uniform = false;
            }
        }
        if !has_insts {
            continue;
        }
        if area_type.is_io {
            kinds.push(LegalizerKind::Io(area_type.id));
        } else if !uniform {
            mixed.push(area_type.id);
        } else {
            let single_slot = catalog
                .sites_with_capacity(area_type.id)
                .iter()
                .all(|&s| catalog.site_capacity(s, area_type.id) == 1);
            if single_slot {
                kinds.push(LegalizerKind::Ssr(area_type.id));
            } else {
                kinds.push(LegalizerKind::Dense(area_type.id));
            }
        }
    }
    if !mixed.is_empty() {
        kinds.push(LegalizerKind::MixedRegion(mixed));
    }
    kinds
}

/// Runs every type legalizer, fanning out across worker threads.
///
/// Outputs come back in legalizer order regardless of scheduling, so the
/// serial merge is deterministic. The first fatal error aborts the whole
/// fan-out.
pub(crate) fn run_type_legalizers(
    design: &Design,
    catalog: &SiteCatalog,
    positions: &Positions,
    config: &LegalizeConfig,
    kinds: &[LegalizerKind],
) -> LegalizeResult<Vec<StageOutput>> {
    kinds
        .par_iter()
        .map(|kind| match kind {
            LegalizerKind::Io(at) => {
                io::legalize_io_bank(design, catalog, positions, config.cost_metric, *at)
            }
            LegalizerKind::Ssr(at) => {
                region::legalize_ssr_type(design, catalog, positions, config.cost_metric, *at)
            }
            LegalizerKind::Dense(at) => {
                abacus::legalize_dense_type(design, catalog, positions, *at)
            }
            LegalizerKind::MixedRegion(types) => {
                Ok(region::legalize_mixed_regions(design, catalog, positions, types))
            }
        })
        .collect()
}
