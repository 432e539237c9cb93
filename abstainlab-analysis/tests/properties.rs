//! Property tests for the statistics engine.
//!
//! Uses proptest to verify:
//! 1. Delta antisymmetry: delta(c, b) = −delta(b, c)
//! 2. Effect-size sign follows the mean difference
//! 3. Negating both samples flips d without changing its magnitude
//! 4. Identical runs have zero SD and a collapsed interval
//! 5. The confidence interval always contains the mean

use abstainlab_analysis::{aggregate, cohens_d, delta, StatsError};
use abstainlab_core::CategoryId;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_accuracy() -> impl Strategy<Value = f64> {
    (0u32..=400).prop_map(|correct| correct as f64 / 400.0)
}

fn arb_runs() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_accuracy(), 2..60)
}

fn cat() -> CategoryId {
    "live_simple".into()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

// ── 1. Delta antisymmetry ────────────────────────────────────────────

proptest! {
    #[test]
    fn delta_is_antisymmetric(c in arb_runs(), b in arb_runs()) {
        let cs = aggregate(&cat(), &c, 0.95, 30).unwrap();
        let bs = aggregate(&cat(), &b, 0.95, 30).unwrap();
        let forward = delta(&cs, &bs, 2).unwrap();
        let backward = delta(&bs, &cs, 2).unwrap();
        prop_assert!((forward + backward).abs() < 1e-12);
    }
}

// ── 2. Sign of d ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn effect_size_sign_matches_mean_difference(c in arb_runs(), b in arb_runs()) {
        match cohens_d(&c, &b, &cat()) {
            Ok(d) => {
                let diff = mean(&c) - mean(&b);
                prop_assert!(d.is_finite());
                if diff.abs() > 1e-12 {
                    prop_assert_eq!(d > 0.0, diff > 0.0);
                }
            }
            Err(e) => {
                // only both-constant samples are degenerate
                let constant = |v: &[f64]| v.iter().all(|x| *x == v[0]);
                let degenerate = matches!(e, StatsError::DegenerateVariance { .. });
                prop_assert!(degenerate, "expected degenerate variance, got {}", e);
                prop_assert!(constant(&c) && constant(&b));
            }
        }
    }
}

// ── 3. Flip invariance ───────────────────────────────────────────────

proptest! {
    #[test]
    fn negating_samples_flips_effect_size(c in arb_runs(), b in arb_runs()) {
        let neg_c: Vec<f64> = c.iter().map(|v| -v).collect();
        let neg_b: Vec<f64> = b.iter().map(|v| -v).collect();
        if let (Ok(d), Ok(flipped)) = (cohens_d(&c, &b, &cat()), cohens_d(&neg_c, &neg_b, &cat())) {
            prop_assert!((d.abs() - flipped.abs()).abs() < 1e-9);
            prop_assert!((d + flipped).abs() < 1e-9);
        }
    }
}

// ── 4. Identical runs ────────────────────────────────────────────────

proptest! {
    #[test]
    fn identical_runs_have_zero_spread(value in arb_accuracy(), n in 2usize..80) {
        let values = vec![value; n];
        let stat = aggregate(&cat(), &values, 0.95, 30).unwrap();
        prop_assert_eq!(stat.std_dev, Some(0.0));
        prop_assert_eq!(stat.mean, value);
        let ci = stat.ci.unwrap();
        prop_assert_eq!(ci.lower, value);
        prop_assert_eq!(ci.upper, value);
    }
}

// ── 5. Interval contains the mean ────────────────────────────────────

proptest! {
    #[test]
    fn interval_brackets_mean(values in arb_runs(), confidence in 0.5f64..0.999) {
        let stat = aggregate(&cat(), &values, confidence, 30).unwrap();
        let ci = stat.ci.unwrap();
        prop_assert!(ci.lower <= stat.mean && stat.mean <= ci.upper);
        prop_assert!(stat.min <= stat.mean + 1e-12 && stat.mean <= stat.max + 1e-12);
        prop_assert_eq!(ci.small_sample, values.len() < 30);
    }
}
