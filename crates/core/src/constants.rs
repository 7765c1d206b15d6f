//! Canonical scoring constants for the Aura oracle.
//!
//! Weights, divisors and thresholds are part of the published scoring
//! rules. Lenders reproduce assessments from these values, so they MUST NOT
//! change without bumping [`MODEL_VERSION`].

/// Version tag stamped on every assessment.
pub const MODEL_VERSION: &str = "2.0.0";

/// Default oracle address embedded in assessment proofs.
pub const DEFAULT_ORACLE_ADDRESS: &str = "0x1234567890123456789012345678901234567890";

/// Default loan amount used when a request omits one.
pub const DEFAULT_REQUESTED_AMOUNT: f64 = 10_000.0;

/// Largest principal the terms model will price.
pub const MAX_REQUESTED_AMOUNT: f64 = 1e15;

// Feature normalization divisors (raw value / divisor, clamped to [0, 1]).

/// Credit score divisor.
pub const CREDIT_SCORE_DIVISOR: f64 = 1000.0;
/// Proof-of-humanity score divisor.
pub const POH_SCORE_DIVISOR: f64 = 100.0;
/// Badge count divisor.
pub const BADGE_COUNT_DIVISOR: f64 = 10.0;
/// On-chain activity divisor.
pub const ONCHAIN_ACTIVITY_DIVISOR: f64 = 100.0;
/// Account age divisor (days).
pub const ACCOUNT_AGE_DIVISOR_DAYS: f64 = 365.0;
/// Reputation score divisor.
pub const REPUTATION_DIVISOR: f64 = 100.0;
/// Transaction count divisor.
pub const TX_COUNT_DIVISOR: f64 = 500.0;
/// Transaction volume divisor (USD).
pub const TX_VOLUME_DIVISOR_USD: f64 = 100_000.0;
/// Unique contract interaction divisor.
pub const UNIQUE_CONTRACTS_DIVISOR: f64 = 20.0;
/// Total borrowed divisor (USD).
pub const BORROWED_DIVISOR_USD: f64 = 50_000.0;
/// Total supplied divisor (USD).
pub const SUPPLIED_DIVISOR_USD: f64 = 75_000.0;
/// Repayment rate divisor (percent).
pub const REPAYMENT_RATE_DIVISOR: f64 = 100.0;
/// Liquidation count at which liquidation safety reaches zero.
pub const LIQUIDATION_DIVISOR: f64 = 5.0;
/// Social provider score divisor.
pub const SOCIAL_SCORE_DIVISOR: f64 = 100.0;
/// Score history divisor used by volatility and trend.
pub const SCORE_HISTORY_DIVISOR: f64 = 1000.0;

// Missing-value defaults.

/// Neutral transaction velocity.
pub const DEFAULT_TX_VELOCITY: f64 = 0.5;
/// Repayment rate assumed when no DeFi history exists (percent).
pub const DEFAULT_REPAYMENT_RATE: f64 = 100.0;
/// Neutral score trend.
pub const NEUTRAL_SCORE_TREND: f64 = 0.5;
/// Credit score assumed when no history exists.
pub const DEFAULT_HISTORY_SCORE: f64 = 500.0;

// Risk classifier.

/// Classifier weights, applied to the first seven features in order:
/// credit, poh, activity, age, reputation, volume, engagement.
pub const CLASSIFIER_WEIGHTS: [f64; 7] = [0.25, 0.20, 0.15, 0.15, 0.10, 0.08, 0.07];
/// Minimum classifier score for the low-risk category.
pub const LOW_RISK_THRESHOLD: f64 = 0.7;
/// Minimum classifier score for the medium-risk category.
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.4;

// Default predictor.

/// Default predictor weights, applied to the first five features in order.
pub const DEFAULT_PREDICTOR_WEIGHTS: [f64; 5] = [0.30, 0.25, 0.20, 0.15, 0.10];

// Fraud rules.

/// Transaction velocity above which the velocity rule fires.
pub const FRAUD_VELOCITY_THRESHOLD: f64 = 0.9;
/// Weight added by the velocity rule.
pub const FRAUD_VELOCITY_WEIGHT: f64 = 0.4;
/// Score volatility above which the volatility rule fires.
pub const FRAUD_VOLATILITY_THRESHOLD: f64 = 0.3;
/// Weight added by the volatility rule.
pub const FRAUD_VOLATILITY_WEIGHT: f64 = 0.3;
/// Activity level below which the activity rule fires.
pub const FRAUD_ACTIVITY_THRESHOLD: f64 = 0.2;
/// Weight added by the activity rule.
pub const FRAUD_ACTIVITY_WEIGHT: f64 = 0.3;
/// Cumulative anomaly score above which a wallet is flagged.
pub const FRAUD_FLAG_THRESHOLD: f64 = 0.5;

/// Reason emitted by the velocity rule.
pub const REASON_HIGH_VELOCITY: &str = "Unusually high transaction velocity";
/// Reason emitted by the volatility rule.
pub const REASON_HIGH_VOLATILITY: &str = "High credit score volatility";
/// Reason emitted by the activity rule.
pub const REASON_SUSPICIOUS_ACTIVITY: &str = "Suspicious activity pattern";

// Lending terms.

/// Interest rate floor (percent).
pub const BASE_INTEREST_RATE: f64 = 5.0;
/// Loan-to-value ceiling.
pub const BASE_LTV: f64 = 0.75;
/// Risk score divisor applied to the LTV.
pub const LTV_RISK_DIVISOR: f64 = 200.0;
/// Smallest LTV the engine will emit; guards the collateral division.
pub const MIN_LTV: f64 = 0.01;
/// Upper bound (exclusive) of the low-risk terms band.
pub const TERMS_LOW_BAND: f64 = 30.0;
/// Upper bound (exclusive) of the medium-risk terms band.
pub const TERMS_MEDIUM_BAND: f64 = 60.0;

// Credit score calculator.

/// Points per proof-of-humanity score unit.
pub const CREDIT_POH_MULTIPLIER: f64 = 4.0;
/// Cap on the proof-of-humanity contribution.
pub const CREDIT_POH_CAP: f64 = 400.0;
/// Points per badge.
pub const CREDIT_BADGE_POINTS: f64 = 50.0;
/// Cap on the badge contribution.
pub const CREDIT_BADGE_CAP: f64 = 300.0;
/// Cap on the on-chain contribution.
pub const CREDIT_ONCHAIN_CAP: f64 = 300.0;
/// Maximum credit score.
pub const MAX_CREDIT_SCORE: f64 = 1000.0;

// Reputation engine.

/// Proof-of-humanity component weight.
pub const REPUTATION_WEIGHT_POH: f64 = 0.25;
/// Badge component weight.
pub const REPUTATION_WEIGHT_BADGES: f64 = 0.15;
/// Social component weight.
pub const REPUTATION_WEIGHT_SOCIAL: f64 = 0.20;
/// On-chain component weight.
pub const REPUTATION_WEIGHT_ONCHAIN: f64 = 0.20;
/// Network trust component weight.
pub const REPUTATION_WEIGHT_NETWORK: f64 = 0.10;
/// Temporal consistency component weight.
pub const REPUTATION_WEIGHT_TEMPORAL: f64 = 0.10;
/// Reputation scale.
pub const REPUTATION_SCALE: f64 = 1000.0;
/// GitHub share of the social component.
pub const SOCIAL_GITHUB_SHARE: f64 = 0.6;
/// Twitter share of the social component.
pub const SOCIAL_TWITTER_SHARE: f64 = 0.4;
/// Badge count at which network trust saturates.
pub const NETWORK_TRUST_BADGE_CAP: f64 = 5.0;
/// Component value used when a relational signal is unavailable.
pub const NEUTRAL_COMPONENT: f64 = 0.5;

// Scheduler and passports.

/// Maximum score history entries retained per passport.
pub const SCORE_HISTORY_CAP: usize = 30;
/// Absolute risk score change that triggers a `passport_updated` event.
pub const SIGNIFICANT_CHANGE_THRESHOLD: f64 = 50.0;
/// Default refresh cycle interval in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;
/// Default number of passports processed concurrently.
pub const DEFAULT_REFRESH_BATCH_SIZE: usize = 10;
/// Cooldown between forced refreshes of the same wallet in seconds.
pub const FORCE_REFRESH_COOLDOWN_SECS: u64 = 360;

// Feature store.

/// Default time-to-live for cached features in seconds.
pub const DEFAULT_FEATURE_TTL_SECS: u64 = 3600;

// API keys.

/// Prefix of every issued API key.
pub const API_KEY_PREFIX: &str = "aura_sk_";
/// Request quota of the free tier.
pub const FREE_TIER_LIMIT: i64 = 100;
/// Request quota of the pro tier.
pub const PRO_TIER_LIMIT: i64 = 1_000;
/// Request quota of the enterprise tier.
pub const ENTERPRISE_TIER_LIMIT: i64 = 10_000;

// Credentials.

/// Proof type label for issued proofs.
pub const PROOF_TYPE: &str = "BJJSignature2021";
/// Default credential issuer DID.
pub const DEFAULT_ISSUER_DID: &str = "did:polygonid:polygon:amoy:aura-issuer";
/// DID prefix for credential subjects; the wallet address is appended.
pub const DEFAULT_SUBJECT_DID_PREFIX: &str = "did:polygonid:polygon:amoy:";
/// Uniqueness score cap.
pub const MAX_UNIQUENESS_SCORE: f64 = 100.0;
