//! Baseline comparator — candidate minus baseline, per category and overall.

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateStat;
use crate::error::StatsError;

/// Whether two confidence intervals separate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiVerdict {
    /// Candidate lower bound above baseline upper bound.
    Improvement,
    /// Candidate upper bound below baseline lower bound.
    Degradation,
    Overlapping,
}

impl std::fmt::Display for CiVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CiVerdict::Improvement => "improvement",
            CiVerdict::Degradation => "degradation",
            CiVerdict::Overlapping => "overlapping",
        };
        f.write_str(label)
    }
}

/// Delta of means as a fraction in [−1, 1].
///
/// Both stats must describe the same category and each must carry at least
/// `min_samples` runs.
pub fn delta(
    candidate: &AggregateStat,
    baseline: &AggregateStat,
    min_samples: usize,
) -> Result<f64, StatsError> {
    if candidate.category != baseline.category {
        return Err(StatsError::CategoryMismatch {
            candidate: candidate.category.clone(),
            baseline: baseline.category.clone(),
        });
    }
    let smaller = candidate.n.min(baseline.n);
    if smaller < min_samples {
        return Err(StatsError::InsufficientSample {
            required: min_samples,
            actual: smaller,
        });
    }
    Ok(candidate.mean - baseline.mean)
}

/// Unweighted mean of per-category deltas.
pub fn overall_delta(deltas: &[f64]) -> Result<f64, StatsError> {
    if deltas.is_empty() {
        return Err(StatsError::InsufficientSample {
            required: 1,
            actual: 0,
        });
    }
    Ok(deltas.iter().sum::<f64>() / deltas.len() as f64)
}

/// `None` when either side has no interval.
pub fn ci_verdict(candidate: &AggregateStat, baseline: &AggregateStat) -> Option<CiVerdict> {
    let c = candidate.ci?;
    let b = baseline.ci?;
    Some(if c.lower > b.upper {
        CiVerdict::Improvement
    } else if c.upper < b.lower {
        CiVerdict::Degradation
    } else {
        CiVerdict::Overlapping
    })
}

pub fn to_percentage_points(fraction: f64) -> f64 {
    fraction * 100.0
}
