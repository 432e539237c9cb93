//! Validated trial outcomes and the per-cell run collections built from them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CategoryId, ConfigName};

/// One trial's outcome for one (configuration, category) pair.
///
/// Fields are public for construction in tests and loaders. The counts are
/// checked twice: `RawRunRecord::validate` rejects bad records at ingestion,
/// and `RunSet::push` rejects any result with `correct > total` or
/// `correctly_empty > correct`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub configuration: ConfigName,
    pub category: CategoryId,
    /// 1-based trial number when the harness recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<u32>,
    pub total: u32,
    pub correct: u32,
    /// Correct answers that were empty responses. Counted out of `total`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correctly_empty: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<NaiveDateTime>,
}

impl RunResult {
    /// `correct / total`, or `None` when the run had no tests.
    pub fn accuracy(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.correct as f64 / self.total as f64)
    }

    /// `correctly_empty / total`, when both are defined.
    pub fn abstention_rate(&self) -> Option<f64> {
        match (self.correctly_empty, self.total) {
            (Some(empty), total) if total > 0 => Some(empty as f64 / total as f64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunSetError {
    #[error(
        "corpus size mismatch for {configuration}/{category}: expected {expected} tests, found {found}"
    )]
    CorpusSizeMismatch {
        configuration: ConfigName,
        category: CategoryId,
        expected: u32,
        found: u32,
    },

    #[error("inconsistent counts for {configuration}/{category}: {correct} correct ({empty} empty) out of {total}")]
    InconsistentCounts {
        configuration: ConfigName,
        category: CategoryId,
        total: u32,
        correct: u32,
        empty: u32,
    },

    #[error("run for {found_configuration}/{found_category} does not belong to {configuration}/{category}")]
    WrongCell {
        configuration: ConfigName,
        category: CategoryId,
        found_configuration: ConfigName,
        found_category: CategoryId,
    },
}

/// All trials for one (configuration, category), in insertion order.
///
/// Every result shares the same `total` because the test corpus is fixed per
/// category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSet {
    configuration: ConfigName,
    category: CategoryId,
    results: Vec<RunResult>,
}

impl RunSet {
    pub fn new(configuration: ConfigName, category: CategoryId) -> Self {
        Self {
            configuration,
            category,
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: RunResult) -> Result<(), RunSetError> {
        if result.configuration != self.configuration || result.category != self.category {
            return Err(RunSetError::WrongCell {
                configuration: self.configuration.clone(),
                category: self.category.clone(),
                found_configuration: result.configuration,
                found_category: result.category,
            });
        }
        let empty = result.correctly_empty.unwrap_or(0);
        if result.correct > result.total || empty > result.correct {
            return Err(RunSetError::InconsistentCounts {
                configuration: self.configuration.clone(),
                category: self.category.clone(),
                total: result.total,
                correct: result.correct,
                empty,
            });
        }
        if let Some(expected) = self.total_tests() {
            if result.total != expected {
                return Err(RunSetError::CorpusSizeMismatch {
                    configuration: self.configuration.clone(),
                    category: self.category.clone(),
                    expected,
                    found: result.total,
                });
            }
        }
        self.results.push(result);
        Ok(())
    }

    pub fn configuration(&self) -> &ConfigName {
        &self.configuration
    }

    pub fn category(&self) -> &CategoryId {
        &self.category
    }

    pub fn results(&self) -> &[RunResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Corpus size shared by every run, if any run has been recorded.
    pub fn total_tests(&self) -> Option<u32> {
        self.results.first().map(|r| r.total)
    }

    /// Per-run accuracies in run order. Runs with an undefined accuracy
    /// (empty corpus) are skipped, never counted as zero.
    pub fn accuracies(&self) -> Vec<f64> {
        self.results.iter().filter_map(RunResult::accuracy).collect()
    }

    /// Mean number of correctly-empty responses per run, over the runs that
    /// reported the sub-count.
    pub fn mean_correctly_empty(&self) -> Option<f64> {
        let counts: Vec<u32> = self
            .results
            .iter()
            .filter_map(|r| r.correctly_empty)
            .collect();
        if counts.is_empty() {
            return None;
        }
        Some(counts.iter().map(|&c| c as f64).sum::<f64>() / counts.len() as f64)
    }
}
