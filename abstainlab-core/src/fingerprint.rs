//! Campaign fingerprinting — deterministic identity of the raw run records.
//!
//! Two reports built from the same campaign carry the same fingerprint, which
//! lets downstream consumers tell a regenerated report from one computed over
//! different data.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::RunResult;
use crate::store::RunStore;

/// BLAKE3 hex digest over the canonical run records of a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignHash(pub String);

impl fmt::Display for CampaignHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash every run in store order. Timestamps are excluded: re-importing the
/// same outcomes at a later time must not change the identity.
pub fn campaign_hash(store: &RunStore) -> CampaignHash {
    let mut hasher = blake3::Hasher::new();
    for set in store.iter() {
        for run in set.results() {
            hash_run(&mut hasher, run);
        }
    }
    CampaignHash(hasher.finalize().to_hex().to_string())
}

fn hash_run(hasher: &mut blake3::Hasher, run: &RunResult) {
    // length-prefixed names keep ("ab","c") distinct from ("a","bc")
    for name in [run.configuration.as_str(), run.category.as_str()] {
        hasher.update(&(name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
    }
    hasher.update(&run.run.map_or(u64::MAX, u64::from).to_le_bytes());
    hasher.update(&run.total.to_le_bytes());
    hasher.update(&run.correct.to_le_bytes());
    hasher.update(&run.correctly_empty.map_or(u64::MAX, u64::from).to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(cfg: &str, cat: &str, correct: u32) -> RunResult {
        RunResult {
            configuration: cfg.into(),
            category: cat.into(),
            run: Some(1),
            total: 10,
            correct,
            correctly_empty: None,
            recorded_at: None,
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let a = RunStore::from_results(vec![result("baseline", "simple", 7)]).unwrap();
        let b = RunStore::from_results(vec![result("baseline", "simple", 7)]).unwrap();
        assert_eq!(campaign_hash(&a), campaign_hash(&b));
        assert_eq!(campaign_hash(&a).0.len(), 64);
    }

    #[test]
    fn hash_changes_with_outcomes() {
        let a = RunStore::from_results(vec![result("baseline", "simple", 7)]).unwrap();
        let b = RunStore::from_results(vec![result("baseline", "simple", 8)]).unwrap();
        assert_ne!(campaign_hash(&a), campaign_hash(&b));
    }

    #[test]
    fn hash_ignores_timestamps() {
        let mut stamped = result("baseline", "simple", 7);
        stamped.recorded_at = chrono::NaiveDate::from_ymd_opt(2025, 7, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0));
        let a = RunStore::from_results(vec![result("baseline", "simple", 7)]).unwrap();
        let b = RunStore::from_results(vec![stamped]).unwrap();
        assert_eq!(campaign_hash(&a), campaign_hash(&b));
    }

    #[test]
    fn name_boundaries_matter() {
        let a = RunStore::from_results(vec![result("ab", "c", 7)]).unwrap();
        let b = RunStore::from_results(vec![result("a", "bc", 7)]).unwrap();
        assert_ne!(campaign_hash(&a), campaign_hash(&b));
    }
}
