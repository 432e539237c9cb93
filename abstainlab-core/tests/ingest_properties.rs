//! Property tests for the ingestion boundary.
//!
//! Uses proptest to verify:
//! 1. Every record with 0 <= correct <= total validates, with accuracy in [0, 1]
//! 2. Records with correct > total never validate
//! 3. Negative counts never validate
//! 4. Runs of one cell with differing corpus sizes are rejected by the store
//! 5. The store rejects directly built results whose accuracy would exceed 1

use abstainlab_core::{
    CategoryKinds, IngestError, RawRunRecord, RunResult, RunSetError, RunStore,
};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn record(total: i64, correct: i64) -> RawRunRecord {
    RawRunRecord {
        configuration: Some("baseline".into()),
        category: Some("live_simple".into()),
        total: Some(total),
        correct: Some(correct),
        ..Default::default()
    }
}

fn arb_valid_counts() -> impl Strategy<Value = (i64, i64)> {
    (0i64..5000).prop_flat_map(|total| (Just(total), 0..=total))
}

// ── 1. Valid counts ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn valid_counts_always_validate((total, correct) in arb_valid_counts()) {
        let result = record(total, correct).validate(&CategoryKinds::new()).unwrap();
        match result.accuracy() {
            Some(acc) => prop_assert!((0.0..=1.0).contains(&acc)),
            None => prop_assert_eq!(total, 0),
        }
    }
}

// ── 2. Correct above total ───────────────────────────────────────────

proptest! {
    #[test]
    fn correct_above_total_is_rejected(total in 0i64..5000, excess in 1i64..100) {
        let err = record(total, total + excess)
            .validate(&CategoryKinds::new())
            .unwrap_err();
        let is_expected = matches!(err, IngestError::CorrectExceedsTotal { .. });
        prop_assert!(is_expected);
    }
}

// ── 3. Negative counts ───────────────────────────────────────────────

proptest! {
    #[test]
    fn negative_counts_are_rejected(value in i64::MIN..0) {
        let err = record(100, value).validate(&CategoryKinds::new()).unwrap_err();
        let is_expected = matches!(err, IngestError::NegativeCount { field: "correct", .. });
        prop_assert!(is_expected);
    }
}

// ── 4. Corpus size consistency ───────────────────────────────────────

proptest! {
    #[test]
    fn differing_corpus_sizes_are_rejected(a in 1i64..1000, b in 1i64..1000) {
        prop_assume!(a != b);
        let first = record(a, 0).validate(&CategoryKinds::new()).unwrap();
        let second = record(b, 0).validate(&CategoryKinds::new()).unwrap();
        let err = RunStore::from_results(vec![first, second]).unwrap_err();
        let is_expected = matches!(err, RunSetError::CorpusSizeMismatch { .. });
        prop_assert!(is_expected);
    }
}

// ── 5. Store-side count check ────────────────────────────────────────

proptest! {
    #[test]
    fn store_rejects_correct_above_total(total in 0u32..5000, excess in 1u32..100) {
        let direct = RunResult {
            configuration: "baseline".into(),
            category: "live_simple".into(),
            run: None,
            total,
            correct: total + excess,
            correctly_empty: None,
            recorded_at: None,
        };
        let err = RunStore::from_results(vec![direct]).unwrap_err();
        let is_expected = matches!(err, RunSetError::InconsistentCounts { .. });
        prop_assert!(is_expected);
    }
}
