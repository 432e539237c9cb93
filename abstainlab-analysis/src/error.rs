//! Statistical error kinds.
//!
//! Every variant is local to one (configuration, category) cell. The report
//! builder records them per cell and keeps computing the rest of the table.

use abstainlab_core::{CategoryId, ConfigName};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatsError {
    /// Zero runs, or fewer than the statistic needs.
    #[error("insufficient sample: {actual} runs, at least {required} required")]
    InsufficientSample { required: usize, actual: usize },

    #[error("category mismatch: candidate '{candidate}' vs baseline '{baseline}'")]
    CategoryMismatch {
        candidate: CategoryId,
        baseline: CategoryId,
    },

    /// Both run distributions are constant, so the pooled SD is zero.
    #[error("degenerate variance in '{category}': pooled standard deviation is zero")]
    DegenerateVariance { category: CategoryId },

    #[error("unknown baseline '{baseline}': no runs recorded for it")]
    UnknownBaseline { baseline: ConfigName },
}

/// A cell the report could not compute, with the reason.
///
/// `category == None` marks the configuration's Overall row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellError {
    pub configuration: ConfigName,
    pub category: Option<CategoryId>,
    /// Which statistic failed (`aggregate`, `delta`, `effect_size`, `welch_t_test`,
    /// `comparison`, `overall_mean` or `overall_delta`).
    pub statistic: String,
    pub error: StatsError,
}

impl std::fmt::Display for CellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let category = self
            .category
            .as_ref()
            .map_or("overall", |c| c.as_str());
        write!(
            f,
            "{}/{} {}: unavailable: {}",
            self.configuration, category, self.statistic, self.error
        )
    }
}
