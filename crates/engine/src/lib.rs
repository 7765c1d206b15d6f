//! Aura scoring engines.
//!
//! Pure, deterministic computations shared by the oracle services and the
//! HTTP API:
//! - [`scoring`]: 19-dimension feature extraction, risk classifier, default
//!   predictor, fraud rules, lending terms and assessment proofs
//! - [`credit`]: additive 0-1000 credit score
//! - [`reputation`]: six-component reputation score and trust bands
//!
//! Nothing here performs I/O. Callers gather signals, pass them in, and
//! receive immutable results.

#![warn(missing_docs)]

pub mod credit;
pub mod reputation;
pub mod scoring;

#[cfg(test)]
mod proptest_scoring;

pub use credit::{calculate_credit_score, CreditGrade, CreditScore};
pub use reputation::{
    calculate_reputation, calculate_trust_score, ReputationInputs, ReputationResult, TrustScore,
};
pub use scoring::{
    assess, classify, detect_fraud, extract_features, predict_default, recommend_terms,
    Assessment, AssessmentProof, Feature, FraudAssessment, LendingTerms, RawSignals,
    ScoreResult, ScoringFeatures, FEATURE_COUNT,
};
