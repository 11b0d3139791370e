//! config.rs
//! Parameters of one alignment run.

use crate::engine::AlignmentError;
use serde::{Deserialize, Serialize};

/// Which arc measure is compared when two nodes are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcMatchMode {
    #[default]
    Persistence,
    Area,
    Volume,
}

impl TryFrom<i32> for ArcMatchMode {
    type Error = AlignmentError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ArcMatchMode::Persistence),
            1 => Ok(ArcMatchMode::Area),
            2 => Ok(ArcMatchMode::Volume),
            _ => Err(AlignmentError::InvalidConfig(format!("unknown arc match mode {}", code))),
        }
    }
}

/// How the attributes of matched nodes and arcs are folded into the consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    #[default]
    Average,
    Median,
    /// Value of the most recently merged tree. Disables the seeded shuffle of
    /// the processing order.
    LastMatched,
}

impl TryFrom<i32> for AggregationPolicy {
    type Error = AlignmentError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(AggregationPolicy::Average),
            1 => Ok(AggregationPolicy::Median),
            2 => Ok(AggregationPolicy::LastMatched),
            _ => Err(AlignmentError::InvalidConfig(format!("unknown aggregation policy {}", code))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub arc_match: ArcMatchMode,
    pub weight_combinatorial: f64,
    pub weight_arc: f64,
    pub weight_scalar: f64,
    pub aggregation: AggregationPolicy,
    pub seed: u64,
    /// Align each incoming tree against the consensus rooted at every node and
    /// every arc midpoint, instead of at its current root only.
    pub free_root: bool,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            arc_match: ArcMatchMode::Persistence,
            weight_combinatorial: 0.0,
            weight_arc: 1.0,
            weight_scalar: 0.0,
            aggregation: AggregationPolicy::Average,
            seed: 0,
            free_root: false,
        }
    }
}

impl AlignmentConfig {
    pub fn new() -> Self { Self::default() }

    /// Parses a JSON object; absent fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, AlignmentError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| AlignmentError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AlignmentError> {
        let weights = [
            ("weight_combinatorial", self.weight_combinatorial),
            ("weight_arc", self.weight_arc),
            ("weight_scalar", self.weight_scalar),
        ];
        for (name, w) in weights {
            if !w.is_finite() || w < 0.0 {
                return Err(AlignmentError::InvalidConfig(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, w
                )));
            }
        }
        Ok(())
    }

    pub fn with_weights(mut self, combinatorial: f64, arc: f64, scalar: f64) -> Self {
        self.weight_combinatorial = combinatorial;
        self.weight_arc = arc;
        self.weight_scalar = scalar;
        self
    }

    pub fn with_aggregation(mut self, aggregation: AggregationPolicy) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_arc_match(mut self, arc_match: ArcMatchMode) -> Self {
        self.arc_match = arc_match;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_free_root(mut self, free_root: bool) -> Self {
        self.free_root = free_root;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AlignmentConfig::default();
        assert_eq!(config.arc_match, ArcMatchMode::Persistence);
        assert_eq!(config.aggregation, AggregationPolicy::Average);
        assert_eq!(config.weight_arc, 1.0);
        assert_eq!(config.weight_combinatorial, 0.0);
        assert_eq!(config.weight_scalar, 0.0);
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = AlignmentConfig::from_json(r#"{"aggregation": "median", "seed": 7}"#).unwrap();
        assert_eq!(config.aggregation, AggregationPolicy::Median);
        assert_eq!(config.seed, 7);
        assert_eq!(config.arc_match, ArcMatchMode::Persistence);
        assert!(!config.free_root);
    }

    #[test]
    fn test_from_json_rejects_negative_weight() {
        let err = AlignmentConfig::from_json(r#"{"weight_arc": -1.0}"#).unwrap_err();
        assert!(matches!(err, AlignmentError::InvalidConfig(_)));
    }

    #[rstest]
    #[case(0, ArcMatchMode::Persistence)]
    #[case(1, ArcMatchMode::Area)]
    #[case(2, ArcMatchMode::Volume)]
    fn test_arc_match_codes(#[case] code: i32, #[case] expected: ArcMatchMode) {
        assert_eq!(ArcMatchMode::try_from(code).unwrap(), expected);
    }

    #[rstest]
    #[case(0, AggregationPolicy::Average)]
    #[case(1, AggregationPolicy::Median)]
    #[case(2, AggregationPolicy::LastMatched)]
    fn test_aggregation_codes(#[case] code: i32, #[case] expected: AggregationPolicy) {
        assert_eq!(AggregationPolicy::try_from(code).unwrap(), expected);
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        assert!(ArcMatchMode::try_from(3).is_err());
        assert!(AggregationPolicy::try_from(-1).is_err());
    }
}
