//! Analysis configuration — every tunable the engine uses, supplied by the caller.
//!
//! The baseline has no default: it must be named explicitly. All other fields
//! default to the documented values and can be overridden from TOML:
//!
//! ```toml
//! baseline = "baseline"
//! confidence_level = 0.95
//! min_comparison_samples = 2
//! configuration_order = ["baseline", "zero_output"]
//!
//! [variance]
//! max_coefficient_of_variation = 0.15
//! max_range = 0.10
//!
//! [targets]
//! zero_output = ["irrelevance", "live_irrelevance"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use abstainlab_core::{CategoryId, CategoryKinds, ConfigName};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audit::VarianceThresholds;

pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
pub const DEFAULT_MIN_COMPARISON_SAMPLES: usize = 2;
/// Below this many runs the normal-approximation CI is flagged as small-sample.
pub const DEFAULT_NORMAL_APPROX_MIN_SAMPLES: usize = 30;
pub const DEFAULT_FDR_ALPHA: f64 = 0.05;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("confidence level must be in (0, 1), got {0}")]
    InvalidConfidenceLevel(f64),

    #[error("FDR alpha must be in (0, 1), got {0}")]
    InvalidFdrAlpha(f64),

    #[error("threshold '{name}' must be finite and positive, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("minimum comparison sample size must be at least 1")]
    InvalidMinSamples,

    #[error("baseline name is blank")]
    BlankBaseline,

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// The reference configuration for deltas and effect sizes.
    pub baseline: ConfigName,
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    #[serde(default)]
    pub variance: VarianceThresholds,
    /// Minimum runs on each side before a delta is computed.
    #[serde(default = "default_min_comparison_samples")]
    pub min_comparison_samples: usize,
    #[serde(default = "default_normal_approx_min_samples")]
    pub normal_approx_min_samples: usize,
    /// Benjamini–Hochberg level applied across all comparison cells.
    #[serde(default = "default_fdr_alpha")]
    pub fdr_alpha: f64,
    /// Explicit row order; names not listed follow in first-seen order.
    #[serde(default)]
    pub configuration_order: Vec<ConfigName>,
    /// Explicit column order; names not listed follow in first-seen order.
    #[serde(default)]
    pub category_order: Vec<CategoryId>,
    #[serde(default)]
    pub category_kinds: CategoryKinds,
    /// Categories each configuration was designed to improve.
    #[serde(default)]
    pub targets: BTreeMap<ConfigName, Vec<CategoryId>>,
}

fn default_confidence_level() -> f64 {
    DEFAULT_CONFIDENCE_LEVEL
}

fn default_min_comparison_samples() -> usize {
    DEFAULT_MIN_COMPARISON_SAMPLES
}

fn default_normal_approx_min_samples() -> usize {
    DEFAULT_NORMAL_APPROX_MIN_SAMPLES
}

fn default_fdr_alpha() -> f64 {
    DEFAULT_FDR_ALPHA
}

impl AnalysisConfig {
    /// Configuration with every default and the given baseline.
    pub fn new(baseline: impl Into<ConfigName>) -> Self {
        Self {
            baseline: baseline.into(),
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            variance: VarianceThresholds::default(),
            min_comparison_samples: DEFAULT_MIN_COMPARISON_SAMPLES,
            normal_approx_min_samples: DEFAULT_NORMAL_APPROX_MIN_SAMPLES,
            fdr_alpha: DEFAULT_FDR_ALPHA,
            configuration_order: Vec::new(),
            category_order: Vec::new(),
            category_kinds: CategoryKinds::default(),
            targets: BTreeMap::new(),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baseline.as_str().trim().is_empty() {
            return Err(ConfigError::BlankBaseline);
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ConfigError::InvalidConfidenceLevel(self.confidence_level));
        }
        if !(self.fdr_alpha > 0.0 && self.fdr_alpha < 1.0) {
            return Err(ConfigError::InvalidFdrAlpha(self.fdr_alpha));
        }
        for (name, value) in [
            (
                "max_coefficient_of_variation",
                self.variance.max_coefficient_of_variation,
            ),
            ("max_range", self.variance.max_range),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        if self.min_comparison_samples == 0 {
            return Err(ConfigError::InvalidMinSamples);
        }
        Ok(())
    }

    pub fn is_target(&self, configuration: &ConfigName, category: &CategoryId) -> bool {
        self.targets
            .get(configuration)
            .is_some_and(|cats| cats.contains(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abstainlab_core::CategoryKind;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = AnalysisConfig::from_toml(r#"baseline = "baseline""#).unwrap();
        assert_eq!(config, AnalysisConfig::new("baseline"));
        assert_eq!(config.confidence_level, 0.95);
        assert_eq!(config.variance.max_coefficient_of_variation, 0.15);
        assert_eq!(config.variance.max_range, 0.10);
        assert_eq!(config.min_comparison_samples, 2);
    }

    #[test]
    fn baseline_is_required() {
        let err = AnalysisConfig::from_toml("confidence_level = 0.9").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn full_toml_round_trip() {
        let text = r#"
baseline = "baseline"
confidence_level = 0.99
min_comparison_samples = 5
configuration_order = ["baseline", "zero_output"]
category_order = ["irrelevance", "simple"]

[variance]
max_coefficient_of_variation = 0.2
max_range = 0.05

[category_kinds]
refusal = "abstention"

[targets]
zero_output = ["irrelevance", "live_irrelevance"]
"#;
        let config = AnalysisConfig::from_toml(text).unwrap();
        assert_eq!(config.confidence_level, 0.99);
        assert_eq!(config.min_comparison_samples, 5);
        assert_eq!(config.variance.max_range, 0.05);
        assert_eq!(config.configuration_order.len(), 2);
        assert_eq!(
            config.category_kinds.kind_of(&"refusal".into()),
            CategoryKind::Abstention
        );
        assert!(config.is_target(&"zero_output".into(), &"irrelevance".into()));
        assert!(!config.is_target(&"zero_output".into(), &"simple".into()));
        assert!(!config.is_target(&"baseline".into(), &"simple".into()));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = AnalysisConfig::new("baseline");
        config.confidence_level = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfidenceLevel(_))
        ));

        let mut config = AnalysisConfig::new("baseline");
        config.variance.max_range = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold {
                name: "max_range",
                ..
            })
        ));

        let mut config = AnalysisConfig::new("baseline");
        config.min_comparison_samples = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMinSamples)));

        assert!(matches!(
            AnalysisConfig::new(" ").validate(),
            Err(ConfigError::BlankBaseline)
        ));
    }
}
