//! Property-based tests for the scoring models.

use proptest::prelude::*;

use crate::scoring::{
    classify, extract_features, predict_default, recommend_terms, RawSignals, ScoringFeatures,
    FEATURE_COUNT,
};
use aura_core::constants::{LOW_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD, MIN_LTV};
use aura_core::types::RiskCategory;

/// Strategy for a feature vector inside the unit cube.
fn unit_vector() -> impl Strategy<Value = [f64; FEATURE_COUNT]> {
    prop::array::uniform19(0.0f64..=1.0)
}

/// Strategy for raw inputs that may be missing, negative, huge or NaN.
fn messy_value() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        Just(None),
        Just(Some(f64::NAN)),
        Just(Some(f64::INFINITY)),
        Just(Some(f64::NEG_INFINITY)),
        (-1e12f64..1e12).prop_map(Some),
    ]
}

fn messy_signals() -> impl Strategy<Value = RawSignals> {
    (
        prop::array::uniform8(messy_value()),
        prop::array::uniform8(messy_value()),
        prop::collection::vec(-1e9f64..1e9, 0..40),
    )
        .prop_map(|(a, b, history)| RawSignals {
            credit_score: a[0],
            poh_score: a[1],
            badge_count: a[2],
            onchain_activity: a[3],
            account_age_days: a[4],
            reputation_score: a[5],
            tx_count: a[6],
            tx_volume_usd: a[7],
            tx_velocity: b[0],
            unique_contracts: b[1],
            total_borrowed: b[2],
            total_supplied: b[3],
            repayment_rate: b[4],
            liquidation_count: b[5],
            github_score: b[6],
            twitter_score: b[7],
            is_verified: None,
            score_history: history,
        })
}

proptest! {
    /// Property: the category always agrees with the fixed thresholds.
    #[test]
    fn prop_classify_consistent_with_thresholds(values in unit_vector()) {
        let (category, score) = classify(&ScoringFeatures::new(values));
        let expected = if score >= LOW_RISK_THRESHOLD {
            RiskCategory::Low
        } else if score >= MEDIUM_RISK_THRESHOLD {
            RiskCategory::Medium
        } else {
            RiskCategory::High
        };
        prop_assert_eq!(category, expected);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    /// Property: raising any positively weighted feature never lowers the score.
    #[test]
    fn prop_classify_is_monotonic(
        values in unit_vector(),
        index in 0usize..7,
        bump in 0.0f64..=1.0,
    ) {
        let base = ScoringFeatures::new(values);
        let mut raised = values;
        raised[index] = (raised[index] + bump).min(1.0);

        let (_, before) = classify(&base);
        let (_, after) = classify(&ScoringFeatures::new(raised));
        prop_assert!(after >= before);
    }

    /// Property: default probability stays in [0, 100] for any raw input.
    #[test]
    fn prop_predict_default_in_range(raw in messy_signals()) {
        let probability = predict_default(&extract_features(&raw));
        prop_assert!((0.0..=100.0).contains(&probability));
    }

    /// Property: every extracted dimension lies in the unit interval.
    #[test]
    fn prop_features_in_unit_interval(raw in messy_signals()) {
        let features = extract_features(&raw);
        for value in features.as_slice() {
            prop_assert!((0.0..=1.0).contains(value));
        }
    }

    /// Property: terms are always finite and the LTV floor holds.
    #[test]
    fn prop_terms_are_finite(risk in prop::num::f64::ANY, amount in prop::num::f64::ANY) {
        let terms = recommend_terms(risk, amount);
        prop_assert!(terms.max_ltv >= MIN_LTV);
        prop_assert!(terms.collateral_ratio.is_finite());
        prop_assert!(terms.interest_rate.is_finite());
        prop_assert!(terms.max_loan_amount.is_finite());
        prop_assert!(terms.max_loan_amount >= 0.0);
    }
}
