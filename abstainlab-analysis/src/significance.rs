//! Significance testing across the comparison family.
//!
//! - Welch's two-sample t-test (unequal variances, Welch–Satterthwaite df)
//! - Benjamini–Hochberg FDR adjustment over every comparison cell of a report
//!
//! With run counts around 50 per cell these p-values are reasonable, but the
//! per-run accuracies of one configuration are not strictly independent across
//! categories. Treat the adjusted p-values as a ranking aid next to the CI
//! verdict and the effect size.

use abstainlab_core::CategoryId;
use serde::{Deserialize, Serialize};

use crate::aggregate::{mean, sample_variance};
use crate::distribution::t_two_sided_p;
use crate::error::StatsError;

// ─── Welch's t-test ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WelchTest {
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

/// Two-sided Welch t-test of H0: mean(candidate) = mean(baseline).
///
/// Each side needs at least two runs. Zero standard error on both sides is
/// `DegenerateVariance`.
pub fn welch_t_test(
    candidate: &[f64],
    baseline: &[f64],
    category: &CategoryId,
) -> Result<WelchTest, StatsError> {
    let (var1, var2) = match (sample_variance(candidate), sample_variance(baseline)) {
        (Some(v1), Some(v2)) => (v1, v2),
        _ => {
            return Err(StatsError::InsufficientSample {
                required: 2,
                actual: candidate.len().min(baseline.len()),
            })
        }
    };
    let n1 = candidate.len() as f64;
    let n2 = baseline.len() as f64;

    let se1 = var1 / n1;
    let se2 = var2 / n2;
    let se = (se1 + se2).sqrt();
    if !(se > 0.0) {
        return Err(StatsError::DegenerateVariance {
            category: category.clone(),
        });
    }

    let t = (mean(candidate) - mean(baseline)) / se;
    let df = (se1 + se2).powi(2) / (se1.powi(2) / (n1 - 1.0) + se2.powi(2) / (n2 - 1.0));
    let p_value = t_two_sided_p(t, df);

    Ok(WelchTest {
        t_statistic: t,
        degrees_of_freedom: df,
        p_value,
    })
}

// ─── Benjamini-Hochberg ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FdrResult {
    pub raw_p: f64,
    pub adjusted_p: f64,
    pub significant: bool,
}

/// Benjamini–Hochberg step-up adjustment.
///
/// Results are returned in input order.
pub fn benjamini_hochberg(p_values: &[f64], alpha: f64) -> Vec<FdrResult> {
    let m = p_values.len();
    if m == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| {
        p_values[a]
            .partial_cmp(&p_values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    // adjusted_p_(k) = min(p_(k) * m/k, adjusted_p_(k+1)), from the largest down
    let mut adjusted = vec![0.0; m];
    let mut running = 1.0_f64;
    for (rank0, &idx) in order.iter().enumerate().rev() {
        let rank = (rank0 + 1) as f64;
        running = running.min(p_values[idx] * m as f64 / rank);
        adjusted[idx] = running;
    }

    p_values
        .iter()
        .zip(adjusted)
        .map(|(&raw_p, adjusted_p)| FdrResult {
            raw_p,
            adjusted_p,
            significant: adjusted_p <= alpha,
        })
        .collect()
}
