//! Campaign loading from the evaluation harness's on-disk layout.
//!
//! Two sources are supported:
//! 1. A campaign directory: `<base>/<configuration>/run_NNN/results.json`,
//!    one file per trial with per-category totals.
//! 2. A JSONL file with one flat record per (configuration, run, category).
//!
//! Directory entries are visited in sorted order so the resulting store is
//! independent of filesystem enumeration order. A configuration with fewer
//! completed runs than required is skipped as a whole and reported back;
//! partial campaigns are never mixed with complete ones.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CategoryKinds, ConfigName, RunSetError};
use crate::ingest::{parse_jsonl, IngestError, RawRunRecord};
use crate::store::RunStore;

/// File written by the harness in every completed run directory.
pub const RESULTS_FILE: &str = "results.json";

/// Errors from the loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed results file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid record in {path}: {source}")]
    Ingest {
        path: PathBuf,
        #[source]
        source: IngestError,
    },

    #[error("not a campaign directory: {0}")]
    NotADirectory(PathBuf),

    #[error(transparent)]
    RunSet(#[from] RunSetError),
}

/// Options controlling which configurations are loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Skip configurations with fewer completed runs than this.
    pub required_runs: Option<usize>,
    /// Restrict loading to these configurations (all when `None`).
    pub configurations: Option<Vec<ConfigName>>,
    /// Category kinds used when validating abstention sub-counts.
    pub kinds: CategoryKinds,
}

/// A configuration left out because its run set is incomplete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedConfiguration {
    pub configuration: ConfigName,
    pub completed_runs: usize,
    pub required_runs: usize,
}

/// Result of loading a campaign.
#[derive(Debug)]
pub struct LoadedCampaign {
    pub store: RunStore,
    pub skipped: Vec<SkippedConfiguration>,
}

/// Per-category totals inside a harness `results.json`.
#[derive(Debug, Clone, Deserialize)]
struct CategoryTally {
    #[serde(default, alias = "total_count")]
    total: Option<i64>,
    #[serde(default, alias = "correct_count")]
    correct: Option<i64>,
    #[serde(default)]
    correctly_empty: Option<i64>,
}

/// Top-level shape of a harness `results.json`.
#[derive(Debug, Clone, Deserialize)]
struct RunFile {
    #[serde(default)]
    run: Option<u32>,
    #[serde(default)]
    timestamp: Option<NaiveDateTime>,
    // BTreeMap: categories within one run are visited in name order
    #[serde(default)]
    results: BTreeMap<String, CategoryTally>,
}

/// Load a campaign directory into a run store.
pub fn load_campaign_dir(base: &Path, opts: &LoadOptions) -> Result<LoadedCampaign, LoadError> {
    if !base.is_dir() {
        return Err(LoadError::NotADirectory(base.to_path_buf()));
    }

    let mut store = RunStore::new();
    let mut skipped = Vec::new();

    for config_dir in sorted_subdirs(base)? {
        let Some(name) = dir_name(&config_dir) else {
            continue;
        };
        let configuration = ConfigName::new(name);
        if let Some(only) = &opts.configurations {
            if !only.contains(&configuration) {
                continue;
            }
        }

        let run_files: Vec<(PathBuf, Option<u32>)> = sorted_subdirs(&config_dir)?
            .into_iter()
            .filter_map(|dir| {
                let run_no = dir_name(&dir).and_then(parse_run_number);
                let file = dir.join(RESULTS_FILE);
                file.is_file().then_some((file, run_no))
            })
            .collect();

        if let Some(required) = opts.required_runs {
            if run_files.len() < required {
                tracing::warn!(
                    configuration = %configuration,
                    completed = run_files.len(),
                    required,
                    "skipping incomplete configuration"
                );
                skipped.push(SkippedConfiguration {
                    configuration,
                    completed_runs: run_files.len(),
                    required_runs: required,
                });
                continue;
            }
        }

        for (file, dir_run) in &run_files {
            let parsed = read_run_file(file)?;
            if parsed.results.is_empty() {
                tracing::warn!(path = %file.display(), "results file has no categories");
            }
            let run = parsed.run.or(*dir_run);
            for (category, tally) in parsed.results {
                let raw = RawRunRecord {
                    configuration: Some(configuration.to_string()),
                    category: Some(category),
                    run,
                    total: tally.total,
                    correct: tally.correct,
                    correctly_empty: tally.correctly_empty,
                    timestamp: parsed.timestamp,
                };
                let result = raw.validate(&opts.kinds).map_err(|source| LoadError::Ingest {
                    path: file.clone(),
                    source,
                })?;
                store.insert(result)?;
            }
        }

        tracing::info!(
            configuration = %configuration,
            runs = run_files.len(),
            "loaded configuration"
        );
    }

    Ok(LoadedCampaign { store, skipped })
}

/// Load a JSONL file of flat run records.
///
/// Completeness is checked per configuration against `required_runs` using the
/// largest per-category run count.
pub fn load_jsonl_file(path: &Path, opts: &LoadOptions) -> Result<LoadedCampaign, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let results = parse_jsonl(&text, &opts.kinds).map_err(|source| LoadError::Ingest {
        path: path.to_path_buf(),
        source,
    })?;

    let results: Vec<_> = match &opts.configurations {
        Some(only) => results
            .into_iter()
            .filter(|r| only.contains(&r.configuration))
            .collect(),
        None => results,
    };
    let full = RunStore::from_results(results.iter().cloned())?;

    let Some(required) = opts.required_runs else {
        return Ok(LoadedCampaign {
            store: full,
            skipped: Vec::new(),
        });
    };

    let mut skipped = Vec::new();
    for configuration in full.configurations() {
        let completed = full.run_count(configuration);
        if completed < required {
            tracing::warn!(
                configuration = %configuration,
                completed,
                required,
                "skipping incomplete configuration"
            );
            skipped.push(SkippedConfiguration {
                configuration: configuration.clone(),
                completed_runs: completed,
                required_runs: required,
            });
        }
    }
    let store = RunStore::from_results(
        results
            .into_iter()
            .filter(|r| !skipped.iter().any(|s| s.configuration == r.configuration)),
    )?;
    Ok(LoadedCampaign { store, skipped })
}

/// Count completed runs per configuration without loading any records.
pub fn completed_runs(base: &Path) -> Result<Vec<(ConfigName, usize)>, LoadError> {
    if !base.is_dir() {
        return Err(LoadError::NotADirectory(base.to_path_buf()));
    }
    let mut counts = Vec::new();
    for config_dir in sorted_subdirs(base)? {
        let Some(name) = dir_name(&config_dir) else {
            continue;
        };
        let completed = sorted_subdirs(&config_dir)?
            .iter()
            .filter(|dir| dir.join(RESULTS_FILE).is_file())
            .count();
        counts.push((ConfigName::new(name), completed));
    }
    Ok(counts)
}

fn read_run_file(path: &Path) -> Result<RunFile, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
}

/// `run_007` → 7.
fn parse_run_number(name: String) -> Option<u32> {
    name.strip_prefix("run_").and_then(|n| n.parse().ok())
}
