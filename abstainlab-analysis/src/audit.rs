//! Variance auditor — advisory flags for noisy run sets.
//!
//! A run set is flagged when its coefficient of variation exceeds the relative
//! threshold and, independently, when its range exceeds the absolute one.

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateStat;

pub const DEFAULT_MAX_COEFFICIENT_OF_VARIATION: f64 = 0.15;
pub const DEFAULT_MAX_RANGE: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceThresholds {
    #[serde(default = "default_max_cov")]
    pub max_coefficient_of_variation: f64,
    /// Absolute spread (max − min) in accuracy fraction units.
    #[serde(default = "default_max_range")]
    pub max_range: f64,
}

fn default_max_cov() -> f64 {
    DEFAULT_MAX_COEFFICIENT_OF_VARIATION
}

fn default_max_range() -> f64 {
    DEFAULT_MAX_RANGE
}

impl Default for VarianceThresholds {
    fn default() -> Self {
        Self {
            max_coefficient_of_variation: DEFAULT_MAX_COEFFICIENT_OF_VARIATION,
            max_range: DEFAULT_MAX_RANGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceFlags {
    pub high_relative_variance: bool,
    pub wide_range: bool,
    /// Undefined when the SD is undefined or the mean is zero.
    pub coefficient_of_variation: Option<f64>,
    pub range: f64,
}

impl VarianceFlags {
    pub fn any(&self) -> bool {
        self.high_relative_variance || self.wide_range
    }
}

pub fn audit(stat: &AggregateStat, thresholds: &VarianceThresholds) -> VarianceFlags {
    let coefficient_of_variation = match stat.std_dev {
        Some(sd) if stat.mean != 0.0 => Some(sd / stat.mean.abs()),
        _ => None,
    };
    let range = stat.range();

    VarianceFlags {
        high_relative_variance: coefficient_of_variation
            .is_some_and(|cov| cov > thresholds.max_coefficient_of_variation),
        wide_range: range > thresholds.max_range,
        coefficient_of_variation,
        range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;

    fn stat(values: &[f64]) -> AggregateStat {
        aggregate(&"live_simple".into(), values, 0.95, 30).unwrap()
    }

    /// Two-point sample with the given mean and sample SD.
    fn two_point(mean: f64, sd: f64) -> AggregateStat {
        let offset = sd / std::f64::consts::SQRT_2;
        stat(&[mean - offset, mean + offset])
    }

    #[test]
    fn coefficient_of_variation_threshold() {
        let noisy = audit(&two_point(0.70, 0.12), &VarianceThresholds::default());
        assert!(noisy.high_relative_variance);
        let cov = noisy.coefficient_of_variation.unwrap();
        assert!((cov - 0.12 / 0.70).abs() < 1e-9);

        let calm = audit(&two_point(0.70, 0.05), &VarianceThresholds::default());
        assert!(!calm.high_relative_variance);
    }

    #[test]
    fn range_is_flagged_independently() {
        // low CoV but range 0.12
        let s = stat(&[0.84, 0.90, 0.90, 0.90, 0.96]);
        let flags = audit(&s, &VarianceThresholds::default());
        assert!(!flags.high_relative_variance);
        assert!(flags.wide_range);
        assert!(flags.any());
    }

    #[test]
    fn undefined_cov_is_not_flagged() {
        let single = audit(&stat(&[0.5]), &VarianceThresholds::default());
        assert_eq!(single.coefficient_of_variation, None);
        assert!(!single.any());

        let zero_mean = audit(&stat(&[0.0, 0.0, 0.0]), &VarianceThresholds::default());
        assert_eq!(zero_mean.coefficient_of_variation, None);
        assert!(!zero_mean.high_relative_variance);
    }

    #[test]
    fn thresholds_deserialize_with_defaults() {
        let t: VarianceThresholds = serde_json::from_str(r#"{"max_range": 0.2}"#).unwrap();
        assert_eq!(t.max_range, 0.2);
        assert_eq!(t.max_coefficient_of_variation, 0.15);
    }
}
