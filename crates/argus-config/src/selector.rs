//! Selector configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_limit() -> usize {
    10
}

const fn default_oracle_weight() -> f64 {
    0.5
}

const fn default_unranked_confidence() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectorConfig {
    /// Candidate limit when a caller gives none.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Weight `w` of oracle confidence in `tiers * ((1 - w) + w * confidence)`.
    #[serde(default = "default_oracle_weight")]
    pub oracle_weight: f64,

    /// Confidence assumed for sources the oracle did not rank.
    #[serde(default = "default_unranked_confidence")]
    pub unranked_confidence: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            oracle_weight: default_oracle_weight(),
            unranked_confidence: default_unranked_confidence(),
        }
    }
}

impl SelectorConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("selector.oracle_weight", self.oracle_weight),
            ("selector.unranked_confidence", self.unranked_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(
                    field,
                    format!("{value} is outside 0.0..=1.0"),
                ));
            }
        }
        if self.default_limit == 0 {
            return Err(ConfigError::invalid(
                "selector.default_limit",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
