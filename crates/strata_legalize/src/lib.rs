//! Placement legalization engine for the Strata toolchain.
//!
//! This crate takes the continuous, possibly overlapping positions produced
//! by an analytic global placer and repairs them into an integer,
//! non-overlapping, type-correct, shape-preserving, region-respecting
//! layout over a [`SiteCatalog`](strata_fabric::SiteCatalog), then audits
//! the result. The output is the same position buffer, legalized in place,
//! plus lock masks and a structured report.
//!
//! # Pipeline
//!
//! 1. **Classify** — each declared area type is matched to one legalizer
//!    variant (edge/IO flow, SSR flow, dense row packing, mixed-size
//!    region packing)
//! 2. **Assign** — the type legalizers run in parallel over disjoint
//!    instance sets; their position updates merge serially into the buffer
//! 3. **Chains** — rigid chain groups are placed sequentially by
//!    radius-expanding search over the claimed-site set
//! 4. **Align** — shape members snap to their anchor offsets; region
//!    members clamp into their fences
//! 5. **Verify** — a read-only audit re-checks every constraint class
//!
//! # Usage
//!
//! ```ignore
//! use strata_legalize::{legalize, LegalizationContext, LegalizeConfig};
//!
//! let config = LegalizeConfig::default();
//! let mut ctx = LegalizationContext::new(design.num_instances(), catalog.num_area_types());
//! let report = legalize(&design, &catalog, &config, &mut positions, &mut ctx, &sink)?;
//! assert!(report.is_clean());
//! ```
//!
//! Success is confirmed only by an empty verifier report: a call that
//! returns `Ok` may still carry per-chain or per-region failures in the
//! report, with the remaining instances legalized normally.

#![warn(missing_docs)]

pub mod abacus;
pub mod align;
pub mod chain;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod flow;
pub mod ids;
mod io;
mod pipeline;
mod region;
pub mod verify;

pub use align::{align_regions, align_shapes};
pub use config::{CostMetric, LegalizeConfig};
pub use context::LegalizationContext;
pub use data::{ChainGroup, Design, GroupOffset, InstClass, Instance, Positions, ShapeGroup};
pub use error::{LegalizeError, LegalizeResult};
pub use ids::{ChainId, ShapeId};
pub use verify::{LegalityReport, Violation};

use strata_diagnostics::{Event, EventSink, Stage};
use strata_fabric::SiteCatalog;

/// The caller-facing result of a legalization run.
///
/// `failures` lists recoverable per-group conditions (failed chains,
/// overflowing regions); `legality` is the verifier's audit of the final
/// buffer. The position buffer itself is mutated in place and is returned
/// even when failures occurred, so the caller can inspect partial results.
#[derive(Debug, Clone)]
pub struct LegalizeReport {
    /// Recoverable failures, in stage order.
    pub failures: Vec<LegalizeError>,
    /// The verifier's structured audit result.
    pub legality: LegalityReport,
}

impl LegalizeReport {
    /// Returns whether the run completed with no failures and a legal
    /// placement.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.legality.is_legal()
    }
}

/// Runs the complete legalization pipeline over the position buffer.
///
/// Stage ordering is strict: type legalizers (parallel, merged serially),
/// then chains, then alignment, then verification. The buffer must be
/// host-resident; callers holding device-resident positions copy them in
/// before this call and back out afterward. Each call is idempotent given
/// the same inputs.
///
/// # Errors
///
/// Returns [`LegalizeError::InfeasibleAssignment`] when any area type has
/// more instances than site slots — a global infeasibility the pipeline
/// cannot repair. All other conditions are reported in the
/// [`LegalizeReport`] and through the sink.
pub fn legalize(
    design: &Design,
    catalog: &SiteCatalog,
    config: &LegalizeConfig,
    positions: &mut Positions,
    ctx: &mut LegalizationContext,
    sink: &EventSink,
) -> LegalizeResult<LegalizeReport> {
    let kinds = pipeline::build_legalizers(design, catalog);
    let outputs = pipeline::run_type_legalizers(design, catalog, positions, config, &kinds)?;

    let mut failures = Vec::new();
    for out in outputs {
        for (inst, x, y, z) in out.updates {
            positions.set_xyz(inst, x, y, z);
        }
        for inst in out.locks {
            ctx.lock_inst(inst);
        }
        for area_type in out.lock_types {
            ctx.lock_area_type(area_type);
        }
        for event in out.events {
            sink.emit(event);
        }
        failures.extend(out.failures);
    }

    claim_placed(design, catalog, positions, ctx);
    failures.extend(chain::legalize_chains(
        design, catalog, config, positions, ctx, sink,
    ));

    align::align_shapes(design, positions);
    align::align_regions(design, catalog, positions);

    let legality = verify::verify(design, catalog, config, positions);
    if legality.is_legal() {
        sink.emit(Event::note(Stage::Verify, "placement is legal"));
    } else {
        sink.emit(Event::error(
            Stage::Verify,
            format!("{} legality violations", legality.violations.len()),
        ));
    }

    Ok(LegalizeReport { failures, legality })
}

/// Claims the `(site, slot)` cells of every fixed or already-locked
/// instance, so the chain search sees them as occupied.
fn claim_placed(
    design: &Design,
    catalog: &SiteCatalog,
    positions: &Positions,
    ctx: &mut LegalizationContext,
) {
    for inst in &design.instances {
        if inst.class == InstClass::Filler {
            continue;
        }
        let pinned = inst.class == InstClass::Fixed || ctx.is_inst_locked(inst.id);
        if !pinned {
            continue;
        }
        let (x, y, z) = positions.xyz(inst.id);
        if x.fract() != 0.0 || y.fract() != 0.0 || x < 0.0 || y < 0.0 {
            continue;
        }
        for dx in 0..inst.width.ceil() as u32 {
            for dy in 0..inst.height.ceil() as u32 {
                if let Some(site) = catalog.site_at(x as u32 + dx, y as u32 + dy) {
                    ctx.claim(site.id, z);
                }
            }
        }
    }
}
