//! Effect size — Cohen's d with pooled standard deviation.
//!
//! d = (mean_c − mean_b) / pooled_sd
//! pooled_sd = sqrt(((n1−1)·sd1² + (n2−1)·sd2²) / (n1+n2−2))

use abstainlab_core::CategoryId;
use serde::{Deserialize, Serialize};

use crate::aggregate::mean;
use crate::error::StatsError;

/// Pooled SDs at or below this are treated as zero.
pub const DEGENERATE_POOLED_SD: f64 = 1e-12;

/// Conventional interpretation bands for |d|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMagnitude {
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectMagnitude {
    pub fn from_d(d: f64) -> Self {
        let d_abs = d.abs();
        if d_abs < 0.2 {
            EffectMagnitude::Negligible
        } else if d_abs < 0.5 {
            EffectMagnitude::Small
        } else if d_abs < 0.8 {
            EffectMagnitude::Medium
        } else {
            EffectMagnitude::Large
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EffectMagnitude::Negligible => "negligible",
            EffectMagnitude::Small => "small",
            EffectMagnitude::Medium => "medium",
            EffectMagnitude::Large => "large",
        }
    }
}

impl std::fmt::Display for EffectMagnitude {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Cohen's d of `candidate` against `baseline` per-run accuracies.
///
/// A side with a single run contributes no variance to the pooled SD. When
/// both sides are constant the pooled SD is zero and the result is
/// `DegenerateVariance`, never 0 or infinity.
pub fn cohens_d(
    candidate: &[f64],
    baseline: &[f64],
    category: &CategoryId,
) -> Result<f64, StatsError> {
    let n1 = candidate.len();
    let n2 = baseline.len();
    if n1 == 0 || n2 == 0 {
        return Err(StatsError::InsufficientSample {
            required: 1,
            actual: n1.min(n2),
        });
    }
    if n1 + n2 < 3 {
        return Err(StatsError::InsufficientSample {
            required: 3,
            actual: n1 + n2,
        });
    }

    let m1 = mean(candidate);
    let m2 = mean(baseline);
    let ss1: f64 = candidate.iter().map(|v| (v - m1).powi(2)).sum();
    let ss2: f64 = baseline.iter().map(|v| (v - m2).powi(2)).sum();
    let pooled_sd = ((ss1 + ss2) / (n1 + n2 - 2) as f64).sqrt();

    if !(pooled_sd > DEGENERATE_POOLED_SD) {
        return Err(StatsError::DegenerateVariance {
            category: category.clone(),
        });
    }

    Ok((m1 - m2) / pooled_sd)
}
