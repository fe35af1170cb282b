//! Structured legalization events with severity, stage, and instance context.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;
use strata_fabric::InstId;

/// The pipeline stage that emitted an event.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Stage {
    /// Single-site single-resource flow assignment.
    SsrFlow,
    /// Dense row packing of uniform-footprint types.
    DensePack,
    /// Mixed-size region packing.
    MixedRegion,
    /// Edge/IO assignment.
    Io,
    /// Chain/shape search.
    Chain,
    /// Alignment post-processing.
    Align,
    /// Legality verification.
    Verify,
    /// Pipeline orchestration.
    Pipeline,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::SsrFlow => "ssr-flow",
            Stage::DensePack => "dense-pack",
            Stage::MixedRegion => "mixed-region",
            Stage::Io => "io",
            Stage::Chain => "chain",
            Stage::Align => "align",
            Stage::Verify => "verify",
            Stage::Pipeline => "pipeline",
        };
        write!(f, "{name}")
    }
}

/// A structured event describing a non-fatal legalization condition.
///
/// Events are the mechanism for reporting per-group failures and audit
/// findings without aborting independent work. Each event carries the
/// emitting stage, a severity, a human-readable message, and the affected
/// instance IDs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    /// The severity level of this event.
    pub severity: Severity,
    /// The pipeline stage that emitted this event.
    pub stage: Stage,
    /// The main event message.
    pub message: String,
    /// Instances affected by this event, if any.
    pub insts: Vec<InstId>,
}

impl Event {
    /// Creates a new error event for the given stage.
    pub fn error(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            stage,
            message: message.into(),
            insts: Vec::new(),
        }
    }

    /// Creates a new warning event for the given stage.
    pub fn warning(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            stage,
            message: message.into(),
            insts: Vec::new(),
        }
    }

    /// Creates a new note event for the given stage.
    pub fn note(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            stage,
            message: message.into(),
            insts: Vec::new(),
        }
    }

    /// Attaches affected instances to this event.
    pub fn with_insts(mut self, insts: impl IntoIterator<Item = InstId>) -> Self {
        self.insts.extend(insts);
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.stage, self.message)
    }
}
