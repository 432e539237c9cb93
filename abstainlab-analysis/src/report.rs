//! Report builder — assembles every statistic into one comparison table.
//!
//! Cells are computed in parallel and collected in (configuration, category)
//! order, so the same store and config always produce the same report.
//! Statistical failures never abort the build: each one becomes an
//! `Unavailable` cell plus an entry in `errors`.

use abstainlab_core::{
    campaign_hash, CampaignHash, CategoryId, CategoryKind, ConfigName, RunSet, RunStore,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, AggregateStat};
use crate::audit::{audit, VarianceFlags, VarianceThresholds};
use crate::compare::{ci_verdict, delta, overall_delta, CiVerdict};
use crate::config::{AnalysisConfig, ConfigError};
use crate::effect_size::{cohens_d, EffectMagnitude};
use crate::error::{CellError, StatsError};
use crate::significance::{benjamini_hochberg, welch_t_test, FdrResult, WelchTest};

/// Current schema version for serialized reports.
pub const SCHEMA_VERSION: u32 = 1;

// ─── Report types ────────────────────────────────────────────────────

/// A computed value, or the reason it could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Cell<T> {
    Available { value: T },
    Unavailable { reason: String },
}

impl<T> Cell<T> {
    pub fn from_result(result: Result<T, StatsError>) -> Self {
        match result {
            Ok(value) => Cell::Available { value },
            Err(e) => Cell::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Cell::Available { value } => Some(value),
            Cell::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Cell::Available { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Cell::Available { .. } => None,
            Cell::Unavailable { reason } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSize {
    pub d: f64,
    pub magnitude: EffectMagnitude,
}

/// Candidate vs baseline for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    /// candidate mean − baseline mean, as a fraction
    pub delta: Cell<f64>,
    pub effect_size: Cell<EffectSize>,
    pub ci_verdict: Option<CiVerdict>,
    pub welch: Cell<WelchTest>,
    /// Benjamini–Hochberg result across every available Welch p-value of the report.
    pub fdr: Option<FdrResult>,
}

impl ComparisonEntry {
    fn unavailable(err: &StatsError) -> Self {
        let reason = err.to_string();
        Self {
            delta: Cell::Unavailable {
                reason: reason.clone(),
            },
            effect_size: Cell::Unavailable {
                reason: reason.clone(),
            },
            ci_verdict: None,
            welch: Cell::Unavailable { reason },
            fdr: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub configuration: ConfigName,
    pub category: CategoryId,
    pub is_baseline: bool,
    /// The configuration declares this category as one it targets.
    pub is_target: bool,
    pub aggregate: Cell<AggregateStat>,
    pub variance: Option<VarianceFlags>,
    /// Absent on the baseline's own rows.
    pub comparison: Option<ComparisonEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallRow {
    pub configuration: ConfigName,
    pub is_baseline: bool,
    pub runs: usize,
    /// Unweighted mean of per-category means.
    pub mean_accuracy: Cell<f64>,
    /// Unweighted mean of per-category deltas. Absent for the baseline.
    pub delta: Option<Cell<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leader {
    pub configuration: ConfigName,
    pub mean: f64,
    pub delta: Option<f64>,
}

/// Best non-baseline configuration for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLeader {
    pub category: CategoryId,
    pub leader: Option<Leader>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstentionCount {
    pub category: CategoryId,
    pub mean_correctly_empty: Option<f64>,
}

/// Mean correctly-empty responses per abstention category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstentionSummary {
    pub configuration: ConfigName,
    pub categories: Vec<AbstentionCount>,
    /// Sum over categories; `None` when there are none or any lacks the sub-count.
    pub total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub schema_version: u32,
    pub baseline: ConfigName,
    pub confidence_level: f64,
    pub fdr_alpha: f64,
    pub variance_thresholds: VarianceThresholds,
    pub campaign_hash: CampaignHash,
    pub configurations: Vec<ConfigName>,
    pub categories: Vec<CategoryId>,
    pub rows: Vec<ReportRow>,
    pub overall: Vec<OverallRow>,
    pub leaders: Vec<CategoryLeader>,
    pub abstention: Vec<AbstentionSummary>,
    pub errors: Vec<CellError>,
}

impl ComparisonReport {
    pub fn row(&self, configuration: &ConfigName, category: &CategoryId) -> Option<&ReportRow> {
        self.rows
            .iter()
            .find(|r| &r.configuration == configuration && &r.category == category)
    }

    pub fn rows_for<'r>(
        &'r self,
        configuration: &'r ConfigName,
    ) -> impl Iterator<Item = &'r ReportRow> + 'r {
        self.rows
            .iter()
            .filter(move |r| &r.configuration == configuration)
    }

    pub fn overall_for(&self, configuration: &ConfigName) -> Option<&OverallRow> {
        self.overall
            .iter()
            .find(|o| &o.configuration == configuration)
    }
}

// ─── Builder ─────────────────────────────────────────────────────────

/// Per-run accuracies of one cell with their aggregate.
struct Sample {
    values: Vec<f64>,
    aggregate: Result<AggregateStat, StatsError>,
}

struct CellOutcome {
    row: ReportRow,
    errors: Vec<CellError>,
    mean: Result<f64, StatsError>,
    /// `None` on baseline rows.
    delta: Option<Result<f64, StatsError>>,
}

pub struct ReportBuilder<'a> {
    store: &'a RunStore,
    config: &'a AnalysisConfig,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(store: &'a RunStore, config: &'a AnalysisConfig) -> Self {
        Self { store, config }
    }

    /// Build the report. Only an invalid configuration is fatal.
    pub fn build(&self) -> Result<ComparisonReport, ConfigError> {
        self.config.validate()?;

        let configurations = ordered(&self.config.configuration_order, self.store.configurations());
        let categories = ordered(&self.config.category_order, self.store.categories());
        let baseline = &self.config.baseline;

        let baseline_known = self.store.contains_configuration(baseline);
        if !baseline_known {
            warn!(%baseline, "baseline has no runs, every comparison is unavailable");
        }

        let baseline_samples: Vec<Option<Sample>> = categories
            .par_iter()
            .map(|cat| baseline_known.then(|| self.sample(baseline, cat)))
            .collect();

        let keys: Vec<(usize, usize)> = (0..configurations.len())
            .flat_map(|i| (0..categories.len()).map(move |j| (i, j)))
            .collect();

        let mut outcomes: Vec<CellOutcome> = keys
            .par_iter()
            .map(|&(i, j)| {
                self.compute_cell(&configurations[i], &categories[j], baseline_samples[j].as_ref())
            })
            .collect();

        self.apply_fdr(&mut outcomes);

        let width = categories.len();
        let mut overall_errors: Vec<CellError> = Vec::new();
        let overall: Vec<OverallRow> = configurations
            .iter()
            .enumerate()
            .map(|(i, cfg)| {
                let cells = &outcomes[i * width..(i + 1) * width];
                self.overall_row(cfg, cells, &mut overall_errors)
            })
            .collect();

        let mut errors: Vec<CellError> = Vec::new();
        let mut rows: Vec<ReportRow> = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            errors.extend(outcome.errors);
            rows.push(outcome.row);
        }
        errors.extend(overall_errors);

        let leaders = categories
            .iter()
            .enumerate()
            .map(|(j, cat)| CategoryLeader {
                category: cat.clone(),
                leader: leader_for(&rows, width, j),
            })
            .collect();

        let abstention = configurations
            .iter()
            .map(|cfg| self.abstention_summary(cfg, &categories))
            .collect();

        for err in &errors {
            warn!(%err, "cell unavailable");
        }
        info!(
            configurations = configurations.len(),
            categories = categories.len(),
            unavailable = errors.len(),
            "comparison report built"
        );

        Ok(ComparisonReport {
            schema_version: SCHEMA_VERSION,
            baseline: baseline.clone(),
            confidence_level: self.config.confidence_level,
            fdr_alpha: self.config.fdr_alpha,
            variance_thresholds: self.config.variance,
            campaign_hash: campaign_hash(self.store),
            configurations,
            categories,
            rows,
            overall,
            leaders,
            abstention,
            errors,
        })
    }

    fn sample(&self, configuration: &ConfigName, category: &CategoryId) -> Sample {
        let values = self
            .store
            .get(configuration, category)
            .map(RunSet::accuracies)
            .unwrap_or_default();
        let aggregate = aggregate(
            category,
            &values,
            self.config.confidence_level,
            self.config.normal_approx_min_samples,
        );
        Sample { values, aggregate }
    }

    fn compute_cell(
        &self,
        configuration: &ConfigName,
        category: &CategoryId,
        baseline: Option<&Sample>,
    ) -> CellOutcome {
        let mut errors = Vec::new();
        let is_baseline = configuration == &self.config.baseline;
        let sample = self.sample(configuration, category);

        record(&mut errors, configuration, category, "aggregate", &sample.aggregate);
        let variance = sample
            .aggregate
            .as_ref()
            .ok()
            .map(|stat| audit(stat, &self.config.variance));

        let (comparison, delta) = if is_baseline {
            (None, None)
        } else {
            let (entry, delta) = match baseline {
                Some(base) => self.compare(configuration, category, &sample, base, &mut errors),
                None => {
                    let err = StatsError::UnknownBaseline {
                        baseline: self.config.baseline.clone(),
                    };
                    errors.push(cell_error(configuration, Some(category), "comparison", &err));
                    (ComparisonEntry::unavailable(&err), Err(err))
                }
            };
            (Some(entry), Some(delta))
        };
        let mean = sample.aggregate.as_ref().map(|s| s.mean).map_err(Clone::clone);

        debug!(
            %configuration,
            %category,
            n = sample.values.len(),
            unavailable = errors.len(),
            "cell computed"
        );

        CellOutcome {
            row: ReportRow {
                configuration: configuration.clone(),
                category: category.clone(),
                is_baseline,
                is_target: self.config.is_target(configuration, category),
                aggregate: Cell::from_result(sample.aggregate),
                variance,
                comparison,
            },
            errors,
            mean,
            delta,
        }
    }

    fn compare(
        &self,
        configuration: &ConfigName,
        category: &CategoryId,
        candidate: &Sample,
        baseline: &Sample,
        errors: &mut Vec<CellError>,
    ) -> (ComparisonEntry, Result<f64, StatsError>) {
        // Below the minimum no comparison statistic is attempted, so the
        // cell also stays out of the FDR family.
        let smaller = candidate.values.len().min(baseline.values.len());
        let required = self.config.min_comparison_samples;
        if smaller < required {
            let err = StatsError::InsufficientSample {
                required,
                actual: smaller,
            };
            for statistic in ["delta", "effect_size", "welch_t_test"] {
                errors.push(cell_error(configuration, Some(category), statistic, &err));
            }
            return (ComparisonEntry::unavailable(&err), Err(err));
        }

        let delta = match (&candidate.aggregate, &baseline.aggregate) {
            (Ok(c), Ok(b)) => delta(c, b, self.config.min_comparison_samples),
            (Err(e), _) | (_, Err(e)) => Err(e.clone()),
        };
        let verdict = match (&candidate.aggregate, &baseline.aggregate) {
            (Ok(c), Ok(b)) => ci_verdict(c, b),
            _ => None,
        };
        let effect_size = cohens_d(&candidate.values, &baseline.values, category).map(|d| {
            EffectSize {
                d,
                magnitude: EffectMagnitude::from_d(d),
            }
        });
        let welch = welch_t_test(&candidate.values, &baseline.values, category);

        record(errors, configuration, category, "delta", &delta);
        record(errors, configuration, category, "effect_size", &effect_size);
        record(errors, configuration, category, "welch_t_test", &welch);

        let entry = ComparisonEntry {
            delta: Cell::from_result(delta.clone()),
            effect_size: Cell::from_result(effect_size),
            ci_verdict: verdict,
            welch: Cell::from_result(welch),
            fdr: None,
        };
        (entry, delta)
    }

    /// BH over every available Welch p-value, in row order.
    fn apply_fdr(&self, outcomes: &mut [CellOutcome]) {
        let mut slots: Vec<usize> = Vec::new();
        let mut p_values: Vec<f64> = Vec::new();
        for (idx, outcome) in outcomes.iter().enumerate() {
            let p = outcome
                .row
                .comparison
                .as_ref()
                .and_then(|c| c.welch.value())
                .map(|w| w.p_value);
            if let Some(p) = p {
                slots.push(idx);
                p_values.push(p);
            }
        }

        let adjusted = benjamini_hochberg(&p_values, self.config.fdr_alpha);
        for (idx, fdr) in slots.into_iter().zip(adjusted) {
            if let Some(comparison) = outcomes[idx].row.comparison.as_mut() {
                comparison.fdr = Some(fdr);
            }
        }
    }

    fn overall_row(
        &self,
        configuration: &ConfigName,
        cells: &[CellOutcome],
        errors: &mut Vec<CellError>,
    ) -> OverallRow {
        let is_baseline = configuration == &self.config.baseline;

        let means: Vec<(&CategoryId, &Result<f64, StatsError>)> =
            cells.iter().map(|c| (&c.row.category, &c.mean)).collect();
        let mean_accuracy = overall_cell(configuration, "overall_mean", &means, errors);

        let delta = (!is_baseline).then(|| {
            let deltas: Vec<(&CategoryId, &Result<f64, StatsError>)> = cells
                .iter()
                .filter_map(|c| c.delta.as_ref().map(|d| (&c.row.category, d)))
                .collect();
            overall_cell(configuration, "overall_delta", &deltas, errors)
        });

        OverallRow {
            configuration: configuration.clone(),
            is_baseline,
            runs: self.store.run_count(configuration),
            mean_accuracy,
            delta,
        }
    }

    fn abstention_summary(
        &self,
        configuration: &ConfigName,
        categories: &[CategoryId],
    ) -> AbstentionSummary {
        let counts: Vec<AbstentionCount> = categories
            .iter()
            .filter(|cat| self.config.category_kinds.kind_of(cat) == CategoryKind::Abstention)
            .map(|cat| AbstentionCount {
                category: cat.clone(),
                mean_correctly_empty: self
                    .store
                    .get(configuration, cat)
                    .and_then(RunSet::mean_correctly_empty),
            })
            .collect();
        let total = if counts.is_empty() {
            None
        } else {
            counts.iter().map(|c| c.mean_correctly_empty).sum::<Option<f64>>()
        };

        AbstentionSummary {
            configuration: configuration.clone(),
            categories: counts,
            total,
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Explicit names first (deduplicated), then the rest in first-seen order.
fn ordered<T: Clone + PartialEq>(explicit: &[T], seen: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(explicit.len() + seen.len());
    for name in explicit.iter().chain(seen) {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}

fn cell_error(
    configuration: &ConfigName,
    category: Option<&CategoryId>,
    statistic: &str,
    error: &StatsError,
) -> CellError {
    CellError {
        configuration: configuration.clone(),
        category: category.cloned(),
        statistic: statistic.to_string(),
        error: error.clone(),
    }
}

fn record<T>(
    errors: &mut Vec<CellError>,
    configuration: &ConfigName,
    category: &CategoryId,
    statistic: &str,
    result: &Result<T, StatsError>,
) {
    if let Err(e) = result {
        errors.push(cell_error(configuration, Some(category), statistic, e));
    }
}

/// Unweighted mean of one value per category; any missing category makes it unavailable.
fn overall_cell(
    configuration: &ConfigName,
    statistic: &str,
    per_category: &[(&CategoryId, &Result<f64, StatsError>)],
    errors: &mut Vec<CellError>,
) -> Cell<f64> {
    let mut values = Vec::with_capacity(per_category.len());
    for &(category, result) in per_category {
        match result {
            Ok(v) => values.push(*v),
            Err(err) => {
                errors.push(cell_error(configuration, None, statistic, err));
                return Cell::Unavailable {
                    reason: format!("category '{category}' unavailable: {err}"),
                };
            }
        }
    }
    match overall_delta(&values) {
        Ok(value) => Cell::Available { value },
        Err(err) => {
            errors.push(cell_error(configuration, None, statistic, &err));
            Cell::from_result(Err(err))
        }
    }
}

fn leader_for(rows: &[ReportRow], width: usize, column: usize) -> Option<Leader> {
    let mut best: Option<Leader> = None;
    for row in rows.iter().skip(column).step_by(width.max(1)) {
        if row.is_baseline {
            continue;
        }
        let Some(stat) = row.aggregate.value() else {
            continue;
        };
        if best.as_ref().map_or(true, |b| stat.mean > b.mean) {
            best = Some(Leader {
                configuration: row.configuration.clone(),
                mean: stat.mean,
                delta: row
                    .comparison
                    .as_ref()
                    .and_then(|c| c.delta.value())
                    .copied(),
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_order_comes_first_without_duplicates() {
        let explicit: Vec<ConfigName> = vec!["zero_output".into(), "baseline".into()];
        let seen: Vec<ConfigName> = vec!["baseline".into(), "format_strict".into(), "zero_output".into()];
        let out: Vec<String> = ordered(&explicit, &seen)
            .into_iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(out, vec!["zero_output", "baseline", "format_strict"]);
    }

    #[test]
    fn cell_accessors() {
        let ok: Cell<f64> = Cell::from_result(Ok(0.5));
        assert_eq!(ok.value(), Some(&0.5));
        assert!(ok.is_available());
        assert_eq!(ok.reason(), None);

        let err: Cell<f64> = Cell::from_result(Err(StatsError::InsufficientSample {
            required: 2,
            actual: 1,
        }));
        assert!(!err.is_available());
        assert!(err.reason().unwrap().contains("insufficient sample"));
    }

    #[test]
    fn cell_serializes_with_status_tag() {
        let json = serde_json::to_string(&Cell::Available { value: 0.25 }).unwrap();
        assert_eq!(json, r#"{"status":"available","value":0.25}"#);
        let json = serde_json::to_string(&Cell::<f64>::Unavailable {
            reason: "x".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"unavailable","reason":"x"}"#);
    }

    #[test]
    fn overall_cell_names_the_missing_category() {
        let mut errors = Vec::new();
        let simple: CategoryId = "simple".into();
        let irrelevance: CategoryId = "irrelevance".into();
        let ok = Ok(0.5);
        let missing = Err(StatsError::InsufficientSample {
            required: 1,
            actual: 0,
        });
        let cell = overall_cell(
            &"zero_output".into(),
            "overall_mean",
            &[(&simple, &ok), (&irrelevance, &missing)],
            &mut errors,
        );
        assert!(cell.reason().unwrap().starts_with("category 'irrelevance' unavailable"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].category, None);

        let empty = overall_cell(&"zero_output".into(), "overall_mean", &[], &mut errors);
        assert!(!empty.is_available());
        assert_eq!(errors.len(), 2);
    }
}
