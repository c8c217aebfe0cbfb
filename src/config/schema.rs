use serde::{Deserialize, Serialize};

use crate::scoring::ScoringConfig;

/// Number of factors listed in the text report unless configured otherwise.
pub const DEFAULT_TOP_FACTORS: usize = 8;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Scoring rules; built-in defaults when omitted
    #[serde(default)]
    pub scoring: Option<ScoringConfig>,

    /// How many factors the text report lists
    #[serde(default = "default_top_factors")]
    pub top_factors: usize,
}

fn default_top_factors() -> usize {
    DEFAULT_TOP_FACTORS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scoring: None,
            top_factors: DEFAULT_TOP_FACTORS,
        }
    }
}
