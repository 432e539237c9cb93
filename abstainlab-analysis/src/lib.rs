//! AbstainLab Analysis — the stochastic evaluation statistics engine.
//!
//! Turns a `RunStore` of repeated per-category measurements into a
//! deterministic comparison report:
//! - Aggregator: mean, sample SD, standard error, confidence interval
//! - Baseline comparator: per-category and overall deltas, CI-overlap verdicts
//! - Effect size: Cohen's d with pooled SD
//! - Variance auditor: coefficient-of-variation and range flags
//! - Significance: Welch's t-test with Benjamini–Hochberg adjustment
//! - Report builder and JSON/CSV/Markdown exporters

pub mod aggregate;
pub mod audit;
pub mod compare;
pub mod config;
pub mod distribution;
pub mod effect_size;
pub mod error;
pub mod export;
pub mod report;
pub mod significance;

pub use aggregate::{aggregate, AggregateStat, ConfidenceInterval, PercentileSpread};
pub use audit::{audit, VarianceFlags, VarianceThresholds};
pub use compare::{ci_verdict, delta, overall_delta, to_percentage_points, CiVerdict};
pub use config::{AnalysisConfig, ConfigError};
pub use effect_size::{cohens_d, EffectMagnitude};
pub use error::{CellError, StatsError};
pub use report::{
    AbstentionCount, AbstentionSummary, CategoryLeader, Cell, ComparisonEntry, ComparisonReport,
    EffectSize, Leader, OverallRow, ReportBuilder, ReportRow, SCHEMA_VERSION,
};
pub use significance::{benjamini_hochberg, welch_t_test, FdrResult, WelchTest};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: report types can be produced on rayon worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<AggregateStat>();
        require_sync::<AggregateStat>();
        require_send::<ComparisonReport>();
        require_sync::<ComparisonReport>();
        require_send::<AnalysisConfig>();
        require_sync::<AnalysisConfig>();
        require_send::<StatsError>();
        require_sync::<StatsError>();
    }
}
