//! The legalization error taxonomy.
//!
//! Fatal conditions propagate as `Err` from [`legalize`](crate::legalize);
//! recoverable per-group conditions are collected in the
//! [`LegalizeReport`](crate::LegalizeReport) failure list and reported to
//! the event sink, so one failing chain or region never blocks independent
//! work.

use crate::ids::ChainId;
use serde::{Deserialize, Serialize};
use strata_fabric::{AreaTypeId, RegionId};

/// The result type of fallible legalization operations.
pub type LegalizeResult<T> = Result<T, LegalizeError>;

/// A legalization failure.
///
/// `InfeasibleAssignment` is fatal: there are not enough sites of a type
/// and the call cannot proceed for it. The other variants are recoverable
/// and isolated per group or region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum LegalizeError {
    /// Supply of sites is smaller than instance demand for an area type.
    #[error("infeasible assignment for area type {area_type}: demand {demand} exceeds site supply {supply}")]
    InfeasibleAssignment {
        /// The area type whose sub-problem is infeasible.
        area_type: AreaTypeId,
        /// Number of instances requiring a site.
        demand: usize,
        /// Number of available site slots.
        supply: usize,
    },

    /// A chain exhausted its search budget without finding a legal anchor.
    #[error("chain {chain} found no legal anchor within {iterations} search iterations")]
    ChainLegalizationFailure {
        /// The failing chain.
        chain: ChainId,
        /// The iteration budget that was exhausted.
        iterations: u32,
    },

    /// A region's members cannot be packed within its box.
    #[error("region {region} capacity exceeded: members need {required} site units, box row holds {available}")]
    RegionCapacityExceeded {
        /// The overflowing region.
        region: RegionId,
        /// Site units required by the members of one packing row.
        required: f32,
        /// Site units available in that row.
        available: f32,
    },
}

impl LegalizeError {
    /// Returns whether this failure aborts the whole legalization call.
    ///
    /// Only `InfeasibleAssignment` is fatal; the other variants are
    /// reported per group and legalization of independent work continues.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LegalizeError::InfeasibleAssignment { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_infeasible() {
        let err = LegalizeError::InfeasibleAssignment {
            area_type: AreaTypeId::from_raw(2),
            demand: 10,
            supply: 7,
        };
        assert_eq!(
            format!("{err}"),
            "infeasible assignment for area type 2: demand 10 exceeds site supply 7"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn chain_failure_not_fatal() {
        let err = LegalizeError::ChainLegalizationFailure {
            chain: ChainId::from_raw(3),
            iterations: 50,
        };
        assert!(!err.is_fatal());
        assert!(format!("{err}").contains("chain 3"));
    }

    #[test]
    fn region_overflow_not_fatal() {
        let err = LegalizeError::RegionCapacityExceeded {
            region: RegionId::from_raw(0),
            required: 9.0,
            available: 4.0,
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn serde_roundtrip() {
        let err = LegalizeError::ChainLegalizationFailure {
            chain: ChainId::from_raw(1),
            iterations: 50,
        };
        let json = serde_json::to_string(&err).unwrap();
        let restored: LegalizeError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, restored);
    }
}
