//! Aggregator — summary statistics of one (configuration, category) run set.
//!
//! Sample SD uses the n−1 divisor and is undefined for a single run, never 0.
//! The confidence interval is the normal approximation mean ± z(c)·SE; below the
//! configured minimum sample size it is still reported but flagged.

use abstainlab_core::CategoryId;
use serde::{Deserialize, Serialize};

use crate::distribution::z_critical;
use crate::error::StatsError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
    /// n is below the normal-approximation minimum.
    pub small_sample: bool,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Empirical spread of the per-run values: the (1−c)/2 and 1−(1−c)/2
/// percentiles, linearly interpolated between order statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileSpread {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStat {
    pub category: CategoryId,
    pub n: usize,
    pub mean: f64,
    pub std_dev: Option<f64>,
    pub std_error: Option<f64>,
    pub ci: Option<ConfidenceInterval>,
    pub min: f64,
    pub max: f64,
    pub percentile_spread: PercentileSpread,
}

impl AggregateStat {
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Summarize per-run accuracies for one category.
///
/// Fails with `InsufficientSample` when `values` is empty.
pub fn aggregate(
    category: &CategoryId,
    values: &[f64],
    confidence: f64,
    normal_approx_min: usize,
) -> Result<AggregateStat, StatsError> {
    let n = values.len();
    if n == 0 {
        return Err(StatsError::InsufficientSample {
            required: 1,
            actual: 0,
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let min = sorted[0];
    let max = sorted[n - 1];

    // identical runs: report the exact value rather than a rounded sum / n
    let (mean, std_dev) = if min == max {
        (min, (n >= 2).then_some(0.0))
    } else {
        (mean(values), sample_std_dev(values))
    };

    let std_error = std_dev.map(|sd| sd / (n as f64).sqrt());
    let ci = std_error.map(|se| {
        let half_width = z_critical(confidence) * se;
        ConfidenceInterval {
            lower: mean - half_width,
            upper: mean + half_width,
            level: confidence,
            small_sample: n < normal_approx_min,
        }
    });

    let tail = (1.0 - confidence) / 2.0;
    let percentile_spread = PercentileSpread {
        lower: percentile_sorted(&sorted, tail),
        upper: percentile_sorted(&sorted, 1.0 - tail),
    };

    Ok(AggregateStat {
        category: category.clone(),
        n,
        mean,
        std_dev,
        std_error,
        ci,
        min,
        max,
        percentile_spread,
    })
}

// ─── Shared summaries ────────────────────────────────────────────────

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with the n−1 divisor; `None` below two values.
pub(crate) fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let ss = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    Some(ss / (values.len() - 1) as f64)
}

pub(crate) fn sample_std_dev(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Percentile `p` in [0, 1] of a sorted, non-empty slice.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = p * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
