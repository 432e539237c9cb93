//! Ingestion boundary — turns loosely-typed harness records into `RunResult`s.
//!
//! The evaluation harness writes records with optional, signed, or missing
//! fields. Everything is checked here so statistical code only ever sees
//! validated shapes:
//! - names must be present and non-blank
//! - counts must be present and non-negative
//! - `correct <= total`, `correctly_empty <= correct`
//! - a non-zero `correctly_empty` is only accepted for abstention categories

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CategoryId, CategoryKinds, ConfigName, RunResult, RunSetError};

/// Errors raised while validating ingested records.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("missing field '{field}'")]
    MissingField { field: &'static str },

    #[error("field '{field}' is blank")]
    BlankName { field: &'static str },

    #[error("field '{field}' is negative ({value})")]
    NegativeCount { field: &'static str, value: i64 },

    #[error("field '{field}' is too large ({value})")]
    CountOverflow { field: &'static str, value: i64 },

    #[error("correct count {correct} exceeds total {total}")]
    CorrectExceedsTotal { correct: u32, total: u32 },

    #[error("correctly-empty count {empty} exceeds correct count {correct}")]
    EmptyExceedsCorrect { empty: u32, correct: u32 },

    #[error("category '{category}' expects a function call, but {empty} empty responses were counted correct")]
    EmptyOnInvocationCategory { category: CategoryId, empty: u32 },

    #[error(transparent)]
    RunSet(#[from] RunSetError),

    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<IngestError>,
    },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl IngestError {
    fn at_line(self, line: usize) -> Self {
        IngestError::AtLine {
            line,
            source: Box::new(self),
        }
    }
}

/// A harness record before validation. Every field is optional so that a
/// missing key surfaces as `IngestError::MissingField` rather than a serde
/// message deep inside a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRunRecord {
    #[serde(default, alias = "config")]
    pub configuration: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub run: Option<u32>,
    #[serde(default, alias = "total_count")]
    pub total: Option<i64>,
    #[serde(default, alias = "correct_count")]
    pub correct: Option<i64>,
    #[serde(default, alias = "empty_correct")]
    pub correctly_empty: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

impl RawRunRecord {
    /// Validate into a `RunResult`, resolving the category kind through `kinds`.
    pub fn validate(self, kinds: &CategoryKinds) -> Result<RunResult, IngestError> {
        let configuration = ConfigName::new(required_name(self.configuration, "configuration")?);
        let category = CategoryId::new(required_name(self.category, "category")?);

        let total = count(required(self.total, "total")?, "total")?;
        let correct = count(required(self.correct, "correct")?, "correct")?;
        if correct > total {
            return Err(IngestError::CorrectExceedsTotal { correct, total });
        }

        let correctly_empty = self
            .correctly_empty
            .map(|v| count(v, "correctly_empty"))
            .transpose()?;
        if let Some(empty) = correctly_empty {
            if empty > correct {
                return Err(IngestError::EmptyExceedsCorrect { empty, correct });
            }
            if empty > 0 && !kinds.kind_of(&category).expects_empty_response() {
                return Err(IngestError::EmptyOnInvocationCategory { category, empty });
            }
        }

        Ok(RunResult {
            configuration,
            category,
            run: self.run,
            total,
            correct,
            correctly_empty,
            recorded_at: self.timestamp,
        })
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, IngestError> {
    value.ok_or(IngestError::MissingField { field })
}

fn required_name(value: Option<String>, field: &'static str) -> Result<String, IngestError> {
    let name = required(value, field)?;
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(IngestError::BlankName { field });
    }
    Ok(trimmed.to_string())
}

fn count(value: i64, field: &'static str) -> Result<u32, IngestError> {
    if value < 0 {
        return Err(IngestError::NegativeCount { field, value });
    }
    u32::try_from(value).map_err(|_| IngestError::CountOverflow { field, value })
}

/// Parse JSONL input: one `RawRunRecord` per non-blank line.
///
/// Fails on the first bad line; the error carries its 1-based line number.
pub fn parse_jsonl(input: &str, kinds: &CategoryKinds) -> Result<Vec<RunResult>, IngestError> {
    let mut results = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let raw: RawRunRecord = serde_json::from_str(trimmed)
            .map_err(|e| IngestError::from(e).at_line(line_no))?;
        let result = raw.validate(kinds).map_err(|e| e.at_line(line_no))?;
        results.push(result);
    }
    Ok(results)
}
