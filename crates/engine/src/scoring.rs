//! Risk scoring pipeline.
//!
//! Raw wallet signals are normalized into a fixed 19-dimension feature
//! vector, then fed through three deterministic models:
//!
//! - a linear risk classifier over the identity block,
//! - a default-probability predictor over the first five features,
//! - a rule-based fraud detector.
//!
//! Every function is pure. Missing or non-finite inputs take the documented
//! defaults and every emitted percentage is clamped to `[0, 100]`.

use aura_core::constants::*;
use aura_core::hashing::sha256_prefixed;
use aura_core::types::{RiskCategory, WalletAddress};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Number of scoring dimensions.
pub const FEATURE_COUNT: usize = 19;

/// Raw, unnormalized signals about a wallet.
///
/// Every field is optional. Absent fields take a neutral default during
/// [`extract_features`] rather than propagating into the models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSignals {
    /// Credit score on a 0-1000 scale.
    pub credit_score: Option<f64>,
    /// Proof-of-humanity score on a 0-100 scale.
    pub poh_score: Option<f64>,
    /// Number of identity badges held.
    pub badge_count: Option<f64>,
    /// On-chain activity score on a 0-100 scale.
    pub onchain_activity: Option<f64>,
    /// Wallet age in days.
    pub account_age_days: Option<f64>,
    /// Reputation score on a 0-100 scale.
    pub reputation_score: Option<f64>,
    /// Whether the wallet holds a verified credential.
    pub is_verified: Option<bool>,
    /// Lifetime transaction count.
    pub tx_count: Option<f64>,
    /// Lifetime transaction volume in USD.
    pub tx_volume_usd: Option<f64>,
    /// Transaction velocity, already normalized to `[0, 1]`.
    pub tx_velocity: Option<f64>,
    /// Distinct contracts interacted with.
    pub unique_contracts: Option<f64>,
    /// Total borrowed across lending protocols (USD).
    pub total_borrowed: Option<f64>,
    /// Total supplied across lending protocols (USD).
    pub total_supplied: Option<f64>,
    /// Loan repayment rate in percent.
    pub repayment_rate: Option<f64>,
    /// Number of liquidations suffered.
    pub liquidation_count: Option<f64>,
    /// GitHub provider score on a 0-100 scale.
    pub github_score: Option<f64>,
    /// Twitter provider score on a 0-100 scale.
    pub twitter_score: Option<f64>,
    /// Chronological credit score history.
    pub score_history: Vec<f64>,
}

/// Named scoring dimensions, in vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Feature {
    /// Credit score.
    CreditScore = 0,
    /// Proof-of-humanity score.
    PohScore,
    /// Badge count.
    BadgeCount,
    /// On-chain activity.
    OnchainActivity,
    /// Account age.
    AccountAge,
    /// Reputation.
    Reputation,
    /// Verified credential flag.
    Verification,
    /// Transaction count.
    TxCount,
    /// Transaction volume.
    TxVolume,
    /// Transaction velocity.
    TxVelocity,
    /// Unique contracts.
    UniqueContracts,
    /// Total borrowed.
    Borrowed,
    /// Total supplied.
    Supplied,
    /// Repayment rate.
    RepaymentRate,
    /// Liquidation safety.
    LiquidationSafety,
    /// GitHub score.
    GithubScore,
    /// Twitter score.
    TwitterScore,
    /// Score volatility.
    ScoreVolatility,
    /// Score trend.
    ScoreTrend,
}

impl Feature {
    /// Position of the feature inside [`ScoringFeatures`].
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Normalized feature vector, every dimension in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringFeatures([f64; FEATURE_COUNT]);

impl ScoringFeatures {
    /// Build a vector from raw values, clamping each into `[0, 1]`.
    /// NaN becomes 0.
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        ScoringFeatures(values.map(unit))
    }

    /// Read a single dimension.
    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    /// All dimensions in vector order.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Lending terms recommended for a risk score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LendingTerms {
    /// Annual interest rate in percent.
    pub interest_rate: f64,
    /// Maximum loan-to-value ratio in `(0, 1)`.
    pub max_ltv: f64,
    /// Loan duration in days.
    pub duration_days: u32,
    /// Maximum loan amount for the requested principal.
    pub max_loan_amount: f64,
    /// Collateral required per unit borrowed (`1 / max_ltv`).
    pub collateral_ratio: f64,
}

/// Outcome of the fraud rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAssessment {
    /// Cumulative rule weight exceeded the flag threshold.
    pub is_fraud: bool,
    /// Cumulative rule weight as a percentage.
    pub likelihood: f64,
    /// Triggered rules, in check order.
    pub reasons: Vec<String>,
}

/// Full model output for one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Classifier category.
    pub risk_category: RiskCategory,
    /// `(1 - classifier score) * 100`.
    pub risk_score: f64,
    /// Probability of default in percent.
    pub default_probability: f64,
    /// Fraud flag.
    pub fraud_detected: bool,
    /// Fraud likelihood in percent.
    pub fraud_likelihood: f64,
    /// Human-readable anomaly reasons.
    pub anomalies: Vec<String>,
    /// Recommended lending terms.
    pub recommended_terms: LendingTerms,
}

/// Deterministic commitment binding a wallet, score and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentProof {
    /// `sha256(wallet || risk_score || timestamp)`.
    pub proof_hash: String,
    /// `sha256(proof_hash || wallet)`.
    pub nullifier: String,
    /// Oracle that signed off on the assessment.
    pub oracle_address: String,
    /// RFC 3339 timestamp committed in the proof.
    pub timestamp: String,
}

/// An assessment: model output plus proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Assessed wallet.
    pub wallet_address: WalletAddress,
    /// Model output.
    #[serde(flatten)]
    pub result: ScoreResult,
    /// Proof over the result.
    pub proof: AssessmentProof,
    /// Scoring rules version.
    pub model_version: String,
    /// Assessment time.
    pub assessed_at: DateTime<Utc>,
}

/// Clamp into `[0, 1]`, mapping NaN to 0.
fn unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Clamp into `[0, 100]`, mapping NaN to `nan_as`.
fn percent(x: f64, nan_as: f64) -> f64 {
    if x.is_nan() {
        nan_as
    } else {
        x.clamp(0.0, 100.0)
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn ratio(value: Option<f64>, divisor: f64) -> f64 {
    unit(finite(value).unwrap_or(0.0) / divisor)
}

fn round_to(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round() / factor
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Normalize raw signals into the 19-dimension feature vector.
///
/// Missing fields default to 0 except transaction velocity (0.5),
/// repayment rate (100%), liquidation count (0, so safety 1.0) and the score
/// history (`[500]`, so volatility 0 and trend 0.5).
pub fn extract_features(raw: &RawSignals) -> ScoringFeatures {
    let history: Vec<f64> = {
        let finite_scores: Vec<f64> = raw
            .score_history
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect();
        if finite_scores.is_empty() {
            vec![DEFAULT_HISTORY_SCORE]
        } else {
            finite_scores
        }
    };

    let volatility = if history.len() < 2 {
        0.0
    } else {
        std_dev(&history) / SCORE_HISTORY_DIVISOR
    };

    let trend = match (history.first(), history.last()) {
        (Some(first), Some(last)) if history.len() >= 2 => {
            NEUTRAL_SCORE_TREND + (last - first) / SCORE_HISTORY_DIVISOR
        }
        _ => NEUTRAL_SCORE_TREND,
    };

    let repayment = finite(raw.repayment_rate).unwrap_or(DEFAULT_REPAYMENT_RATE);
    let liquidations = finite(raw.liquidation_count).unwrap_or(0.0);

    ScoringFeatures::new([
        // Identity and passport
        ratio(raw.credit_score, CREDIT_SCORE_DIVISOR),
        ratio(raw.poh_score, POH_SCORE_DIVISOR),
        ratio(raw.badge_count, BADGE_COUNT_DIVISOR),
        ratio(raw.onchain_activity, ONCHAIN_ACTIVITY_DIVISOR),
        ratio(raw.account_age_days, ACCOUNT_AGE_DIVISOR_DAYS),
        ratio(raw.reputation_score, REPUTATION_DIVISOR),
        if raw.is_verified.unwrap_or(false) { 1.0 } else { 0.0 },
        // Transactions
        ratio(raw.tx_count, TX_COUNT_DIVISOR),
        ratio(raw.tx_volume_usd, TX_VOLUME_DIVISOR_USD),
        finite(raw.tx_velocity).unwrap_or(DEFAULT_TX_VELOCITY),
        ratio(raw.unique_contracts, UNIQUE_CONTRACTS_DIVISOR),
        // DeFi
        ratio(raw.total_borrowed, BORROWED_DIVISOR_USD),
        ratio(raw.total_supplied, SUPPLIED_DIVISOR_USD),
        repayment / REPAYMENT_RATE_DIVISOR,
        1.0 - liquidations / LIQUIDATION_DIVISOR,
        // Social
        ratio(raw.github_score, SOCIAL_SCORE_DIVISOR),
        ratio(raw.twitter_score, SOCIAL_SCORE_DIVISOR),
        // Temporal
        volatility,
        trend,
    ])
}

/// Linear risk classifier over the first seven features.
///
/// Returns the category and the raw classifier score in `[0, 1]`.
pub fn classify(features: &ScoringFeatures) -> (RiskCategory, f64) {
    let score = unit(
        CLASSIFIER_WEIGHTS
            .iter()
            .zip(features.as_slice())
            .map(|(w, f)| w * f)
            .sum(),
    );
    (RiskCategory::from_score(score), score)
}

/// Probability of default in percent.
pub fn predict_default(features: &ScoringFeatures) -> f64 {
    let trust: f64 = DEFAULT_PREDICTOR_WEIGHTS
        .iter()
        .zip(features.as_slice())
        .map(|(w, f)| w * f)
        .sum();
    percent((1.0 - trust) * 100.0, 100.0)
}

/// Rule-based anomaly detection.
///
/// Rules are checked in a fixed order (velocity, volatility, activity) and
/// each triggered rule appends its reason.
pub fn detect_fraud(features: &ScoringFeatures) -> FraudAssessment {
    let mut cumulative = 0.0;
    let mut reasons = Vec::new();

    if features.get(Feature::TxVelocity) > FRAUD_VELOCITY_THRESHOLD {
        cumulative += FRAUD_VELOCITY_WEIGHT;
        reasons.push(REASON_HIGH_VELOCITY.to_string());
    }

    if features.get(Feature::ScoreVolatility) > FRAUD_VOLATILITY_THRESHOLD {
        cumulative += FRAUD_VOLATILITY_WEIGHT;
        reasons.push(REASON_HIGH_VOLATILITY.to_string());
    }

    if features.get(Feature::OnchainActivity) < FRAUD_ACTIVITY_THRESHOLD {
        cumulative += FRAUD_ACTIVITY_WEIGHT;
        reasons.push(REASON_SUSPICIOUS_ACTIVITY.to_string());
    }

    FraudAssessment {
        is_fraud: cumulative > FRAUD_FLAG_THRESHOLD,
        likelihood: round_to(percent(cumulative * 100.0, 0.0), 2),
        reasons,
    }
}

/// Recommend lending terms for a risk score and requested principal.
///
/// The risk score is clamped to `[0, 100]` (NaN counts as 100). The
/// principal is clamped to `[0, MAX_REQUESTED_AMOUNT]` and a non-finite
/// principal counts as 0. The LTV never drops below [`MIN_LTV`].
pub fn recommend_terms(risk_score: f64, requested_amount: f64) -> LendingTerms {
    let risk = percent(risk_score, 100.0);
    let amount = if requested_amount.is_finite() {
        requested_amount.clamp(0.0, MAX_REQUESTED_AMOUNT)
    } else {
        0.0
    };

    let ltv = (BASE_LTV - risk / LTV_RISK_DIVISOR).max(MIN_LTV);

    let (duration_days, multiplier) = if risk < TERMS_LOW_BAND {
        (90, 1.5)
    } else if risk < TERMS_MEDIUM_BAND {
        (60, 1.0)
    } else {
        (30, 0.5)
    };

    LendingTerms {
        interest_rate: round_to(BASE_INTEREST_RATE + risk / 10.0, 2),
        max_ltv: round_to(ltv, 4),
        duration_days,
        max_loan_amount: round_to(amount * multiplier, 2),
        collateral_ratio: round_to(1.0 / ltv, 2),
    }
}

/// Run the full pipeline on already extracted features.
pub fn score_features(features: &ScoringFeatures, requested_amount: f64) -> ScoreResult {
    let (risk_category, classifier_score) = classify(features);
    // Terms use the unrounded score; only the reported value is rounded.
    let raw_risk = percent((1.0 - classifier_score) * 100.0, 100.0);
    let risk_score = round_to(raw_risk, 2);
    let default_probability = round_to(predict_default(features), 2);
    let fraud = detect_fraud(features);

    ScoreResult {
        risk_category,
        risk_score,
        default_probability,
        fraud_detected: fraud.is_fraud,
        fraud_likelihood: fraud.likelihood,
        anomalies: fraud.reasons,
        recommended_terms: recommend_terms(raw_risk, requested_amount),
    }
}

/// Build the assessment proof.
///
/// The risk score is committed with two decimals and the timestamp as RFC
/// 3339 with second precision, so the same inputs always hash identically.
pub fn assessment_proof(
    wallet: &WalletAddress,
    risk_score: f64,
    assessed_at: DateTime<Utc>,
    oracle_address: &str,
) -> AssessmentProof {
    let timestamp = assessed_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let wallet = wallet.to_string();
    let proof_hash = sha256_prefixed(format!("{}{:.2}{}", wallet, risk_score, timestamp).as_bytes());
    let nullifier = sha256_prefixed(format!("{}{}", proof_hash, wallet).as_bytes());

    AssessmentProof {
        proof_hash,
        nullifier,
        oracle_address: oracle_address.to_string(),
        timestamp,
    }
}

/// Assess a wallet end to end: extract, classify, predict, detect, price, prove.
pub fn assess(
    raw: &RawSignals,
    wallet: &WalletAddress,
    requested_amount: f64,
    assessed_at: DateTime<Utc>,
    oracle_address: &str,
) -> Assessment {
    let features = extract_features(raw);
    let result = score_features(&features, requested_amount);
    let proof = assessment_proof(wallet, result.risk_score, assessed_at, oracle_address);

    Assessment {
        wallet_address: *wallet,
        result,
        proof,
        model_version: MODEL_VERSION.to_string(),
        assessed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn wallet() -> WalletAddress {
        WalletAddress::from([0x42; 20])
    }

    #[test]
    fn test_empty_signals_use_defaults() {
        let features = extract_features(&RawSignals::default());
        assert_eq!(features.get(Feature::CreditScore), 0.0);
        assert_eq!(features.get(Feature::TxVelocity), 0.5);
        assert_eq!(features.get(Feature::RepaymentRate), 1.0);
        assert_eq!(features.get(Feature::LiquidationSafety), 1.0);
        assert_eq!(features.get(Feature::ScoreVolatility), 0.0);
        assert_eq!(features.get(Feature::ScoreTrend), 0.5);
    }

    #[test]
    fn test_normalization_caps_at_one() {
        let raw = RawSignals {
            tx_count: Some(5_000.0),
            badge_count: Some(42.0),
            liquidation_count: Some(9.0),
            repayment_rate: Some(250.0),
            ..Default::default()
        };
        let features = extract_features(&raw);
        assert_eq!(features.get(Feature::TxCount), 1.0);
        assert_eq!(features.get(Feature::BadgeCount), 1.0);
        assert_eq!(features.get(Feature::LiquidationSafety), 0.0);
        assert_eq!(features.get(Feature::RepaymentRate), 1.0);
    }

    #[test]
    fn test_non_finite_inputs_are_missing() {
        let raw = RawSignals {
            credit_score: Some(f64::NAN),
            tx_velocity: Some(f64::INFINITY),
            score_history: vec![f64::NAN, 700.0],
            ..Default::default()
        };
        let features = extract_features(&raw);
        assert_eq!(features.get(Feature::CreditScore), 0.0);
        assert_eq!(features.get(Feature::TxVelocity), 0.5);
        assert_eq!(features.get(Feature::ScoreTrend), 0.5);
    }

    #[test]
    fn test_history_volatility_and_trend() {
        let raw = RawSignals {
            score_history: vec![400.0, 600.0],
            ..Default::default()
        };
        let features = extract_features(&raw);
        assert!(approx(features.get(Feature::ScoreVolatility), 0.1));
        assert!(approx(features.get(Feature::ScoreTrend), 0.7));
    }

    #[test]
    fn test_classify_thresholds() {
        let mut values = [0.0; FEATURE_COUNT];
        values[..7].copy_from_slice(&[1.0; 7]);
        let (category, score) = classify(&ScoringFeatures::new(values));
        assert_eq!(category, RiskCategory::Low);
        assert!(approx(score, 1.0));

        let (category, _) = classify(&ScoringFeatures::new([0.5; FEATURE_COUNT]));
        assert_eq!(category, RiskCategory::Medium);

        let (category, score) = classify(&ScoringFeatures::new([0.0; FEATURE_COUNT]));
        assert_eq!(category, RiskCategory::High);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_predict_default_bounds() {
        assert!(approx(
            predict_default(&ScoringFeatures::new([0.0; FEATURE_COUNT])),
            100.0
        ));
        assert!(approx(
            predict_default(&ScoringFeatures::new([1.0; FEATURE_COUNT])),
            0.0
        ));
    }

    #[test]
    fn test_fraud_scenario_velocity_first() {
        let raw = RawSignals {
            credit_score: Some(900.0),
            poh_score: Some(90.0),
            badge_count: Some(5.0),
            tx_velocity: Some(0.95),
            ..Default::default()
        };
        let fraud = detect_fraud(&extract_features(&raw));

        assert!(fraud.likelihood >= 40.0);
        assert_eq!(fraud.reasons[0], REASON_HIGH_VELOCITY);
        // No on-chain activity was supplied, so the activity rule fires too.
        assert_eq!(fraud.reasons.len(), 2);
        assert_eq!(fraud.reasons[1], REASON_SUSPICIOUS_ACTIVITY);
        assert!(approx(fraud.likelihood, 70.0));
        assert!(fraud.is_fraud);
    }

    #[test]
    fn test_fraud_velocity_alone_is_not_flagged() {
        let raw = RawSignals {
            tx_velocity: Some(0.95),
            onchain_activity: Some(80.0),
            ..Default::default()
        };
        let fraud = detect_fraud(&extract_features(&raw));
        assert_eq!(fraud.reasons, vec![REASON_HIGH_VELOCITY.to_string()]);
        assert!(approx(fraud.likelihood, 40.0));
        assert!(!fraud.is_fraud);
    }

    #[test]
    fn test_terms_low_risk() {
        let terms = recommend_terms(25.0, 10_000.0);
        assert_eq!(terms.duration_days, 90);
        assert!(approx(terms.max_loan_amount, 15_000.0));
        assert!(approx(terms.max_ltv, 0.625));
        assert!(approx(terms.collateral_ratio, 1.6));
        assert!(approx(terms.interest_rate, 7.5));
    }

    #[test]
    fn test_terms_high_risk() {
        let terms = recommend_terms(80.0, 10_000.0);
        assert_eq!(terms.duration_days, 30);
        assert!(approx(terms.max_loan_amount, 5_000.0));
        assert!(approx(terms.max_ltv, 0.35));
        assert!(approx(terms.collateral_ratio, 2.86));
    }

    #[test]
    fn test_terms_medium_band_and_guards() {
        let terms = recommend_terms(45.0, 10_000.0);
        assert_eq!(terms.duration_days, 60);
        assert!(approx(terms.max_loan_amount, 10_000.0));

        let terms = recommend_terms(f64::NAN, -5.0);
        assert_eq!(terms.duration_days, 30);
        assert_eq!(terms.max_loan_amount, 0.0);
        assert!(terms.max_ltv >= MIN_LTV);
        assert!(terms.collateral_ratio.is_finite());

        let terms = recommend_terms(1e9, 10_000.0);
        assert!(approx(terms.interest_rate, 15.0));
    }

    #[test]
    fn test_terms_band_uses_unrounded_risk() {
        let mut values = [0.0; FEATURE_COUNT];
        values[..7].copy_from_slice(&[0.70004; 7]);
        let result = score_features(&ScoringFeatures::new(values), 10_000.0);

        // 29.996 reports as 30.0 but still sits in the low band.
        assert!(approx(result.risk_score, 30.0));
        assert_eq!(result.risk_category, RiskCategory::Low);
        assert_eq!(result.recommended_terms.duration_days, 90);
        assert!(approx(result.recommended_terms.max_loan_amount, 15_000.0));
    }

    #[test]
    fn test_assess_is_deterministic() {
        let raw = RawSignals {
            credit_score: Some(720.0),
            poh_score: Some(65.0),
            ..Default::default()
        };
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let first = assess(&raw, &wallet(), 10_000.0, at, DEFAULT_ORACLE_ADDRESS);
        let second = assess(&raw, &wallet(), 10_000.0, at, DEFAULT_ORACLE_ADDRESS);

        assert_eq!(first, second);
        assert_eq!(first.model_version, MODEL_VERSION);
        assert_eq!(first.proof.timestamp, "2025-01-02T03:04:05Z");
        assert!(first.proof.proof_hash.starts_with("0x"));
        assert_ne!(first.proof.proof_hash, first.proof.nullifier);
    }

    #[test]
    fn test_assess_proof_binds_timestamp() {
        let raw = RawSignals::default();
        let a = assess(
            &raw,
            &wallet(),
            10_000.0,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            DEFAULT_ORACLE_ADDRESS,
        );
        let b = assess(
            &raw,
            &wallet(),
            10_000.0,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 1).unwrap(),
            DEFAULT_ORACLE_ADDRESS,
        );
        assert_eq!(a.result, b.result);
        assert_ne!(a.proof.proof_hash, b.proof.proof_hash);
    }

    #[test]
    fn test_percentages_stay_in_range() {
        let raw = RawSignals {
            credit_score: Some(-10_000.0),
            poh_score: Some(f64::NEG_INFINITY),
            score_history: vec![0.0, 1_000_000.0, -1_000_000.0],
            ..Default::default()
        };
        let result = score_features(&extract_features(&raw), f64::NAN);
        for value in [
            result.risk_score,
            result.default_probability,
            result.fraud_likelihood,
        ] {
            assert!((0.0..=100.0).contains(&value));
        }
    }
}
