//! Legalization configuration.
//!
//! [`LegalizeConfig`] is deserializable (e.g., from a TOML table in the
//! caller's project configuration) and every field has a sensible default,
//! so an empty table configures the standard pipeline.

use serde::{Deserialize, Serialize};

/// The displacement metric used by the assignment engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostMetric {
    /// Manhattan (L1) displacement.
    Manhattan,
    /// Squared Euclidean displacement.
    SquaredEuclidean,
}

/// Configuration for a legalization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegalizeConfig {
    /// Displacement metric for flow assignment costs.
    pub cost_metric: CostMetric,
    /// Iteration budget for the chain search ring escalation.
    pub chain_max_iterations: u32,
    /// Whether the verifier checks clock-region and half-column budgets.
    pub check_clock_budgets: bool,
}

impl Default for LegalizeConfig {
    fn default() -> Self {
        Self {
            cost_metric: CostMetric::Manhattan,
            chain_max_iterations: 50,
            check_clock_budgets: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LegalizeConfig::default();
        assert_eq!(config.cost_metric, CostMetric::Manhattan);
        assert_eq!(config.chain_max_iterations, 50);
        assert!(!config.check_clock_budgets);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config: LegalizeConfig = toml::from_str("").unwrap();
        assert_eq!(config, LegalizeConfig::default());
    }

    #[test]
    fn toml_overrides() {
        let config: LegalizeConfig = toml::from_str(
            r#"
            cost_metric = "squared_euclidean"
            chain_max_iterations = 20
            check_clock_budgets = true
            "#,
        )
        .unwrap();
        assert_eq!(config.cost_metric, CostMetric::SquaredEuclidean);
        assert_eq!(config.chain_max_iterations, 20);
        assert!(config.check_clock_budgets);
    }

    #[test]
    fn unknown_field_rejected() {
        let result: Result<LegalizeConfig, _> = toml::from_str("chain_max_iters = 20");
        assert!(result.is_err());
    }

    #[test]
    fn serde_json_roundtrip() {
        let config = LegalizeConfig {
            cost_metric: CostMetric::SquaredEuclidean,
            chain_max_iterations: 10,
            check_clock_budgets: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: LegalizeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }
}
