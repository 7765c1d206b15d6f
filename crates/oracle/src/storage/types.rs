//! Database types for the oracle storage layer.

use anyhow::{Context, Result};
use aura_core::types::{ApiTier, RiskCategory, VerificationLevel, WalletAddress};
use aura_engine::credit::CreditGrade;
use aura_prover::{Attestations, Credential, Proof};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Convert stored unix seconds to a UTC timestamp.
pub(crate) fn from_unix(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).with_context(|| format!("Invalid stored timestamp: {}", secs))
}

/// Parse a stored wallet address.
pub(crate) fn parse_wallet(raw: &str) -> Result<WalletAddress> {
    raw.parse()
        .with_context(|| format!("Invalid stored wallet address: {}", raw))
}

/// A passport as stored in the database, with its score history.
///
/// The history is chronological (oldest first) and never longer than the
/// configured cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassportRecord {
    /// Owning wallet (unique)
    pub wallet_address: WalletAddress,

    /// Latest risk category
    pub risk_category: RiskCategory,

    /// Latest risk score (0-100)
    pub risk_score: f64,

    /// Latest default probability (0-100)
    pub default_probability: f64,

    /// Latest fraud flag
    pub fraud_detected: bool,

    /// Latest fraud likelihood (0-100)
    pub fraud_likelihood: f64,

    /// Credit score (0-1000)
    pub credit_score: u32,

    /// Credit grade
    pub credit_grade: CreditGrade,

    /// Recent risk scores, oldest first
    pub score_history: Vec<f64>,

    /// Inactive passports are skipped by the scheduler
    pub is_active: bool,

    /// First persisted
    pub created_at: DateTime<Utc>,

    /// Last refreshed
    pub last_updated: DateTime<Utc>,
}

/// Fresh scoring output written over a passport.
#[derive(Debug, Clone, PartialEq)]
pub struct PassportUpdate {
    pub risk_category: RiskCategory,
    pub risk_score: f64,
    pub default_probability: f64,
    pub fraud_detected: bool,
    pub fraud_likelihood: f64,
    pub credit_score: u32,
    pub credit_grade: CreditGrade,
}

/// Result of a forced-refresh cooldown claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshClaim {
    /// The caller owns this refresh window.
    Claimed,
    /// A refresh ran too recently.
    Cooldown { retry_after_secs: u64 },
}

/// Enrollment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Signals gathered, no proof yet.
    Pending,
    /// A proof was generated from this enrollment.
    ProofGenerated,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::ProofGenerated => "proof_generated",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(EnrollmentStatus::Pending),
            "proof_generated" => Ok(EnrollmentStatus::ProofGenerated),
            other => anyhow::bail!("Unknown enrollment status: {}", other),
        }
    }
}

/// A proof-of-humanity enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    /// UUID v4
    pub id: String,

    /// Caller-supplied user id
    pub user_id: String,

    /// Wallet being enrolled
    pub wallet_address: WalletAddress,

    /// Hashed attestations and uniqueness score
    pub attestations: Attestations,

    /// Raw provider reports, kept for audit
    pub raw_reports: serde_json::Value,

    /// Lifecycle status
    pub status: EnrollmentStatus,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// A generated proof together with the credential it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofRecord {
    /// UUID v4
    pub id: String,

    /// Source enrollment
    pub enrollment_id: String,

    /// Wallet the enrollment belongs to
    pub wallet_address: WalletAddress,

    /// The proof
    pub proof: Proof,

    /// The credential the proof covers
    pub credential: Credential,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Badge to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBadge {
    pub wallet_address: WalletAddress,
    pub nullifier: String,
    pub proof_hash: String,
    pub score: f64,
    pub verification_level: VerificationLevel,
    pub issued_at: DateTime<Utc>,
}

/// An issued proof-of-humanity badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeRecord {
    /// UUID v4
    pub id: String,

    /// Sequential badge number
    pub token_id: i64,

    /// Badge holder
    pub wallet_address: WalletAddress,

    /// Identity nullifier (globally unique)
    pub nullifier: String,

    /// Proof the badge was issued for
    pub proof_hash: String,

    /// Uniqueness score at issuance
    pub score: f64,

    /// Verification level at issuance
    pub verification_level: VerificationLevel,

    /// Issuance time
    pub issued_at: DateTime<Utc>,
}

/// An API key row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// `aura_sk_<32 hex>`
    pub api_key: String,

    /// Owner
    pub user_id: String,

    /// Quota class
    pub tier: ApiTier,

    /// Request quota
    pub rate_limit: i64,

    /// Requests consumed (monotonic)
    pub requests_used: i64,

    /// Cleared on revocation
    pub is_active: bool,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last successful consume
    pub last_used_at: Option<DateTime<Utc>>,

    /// Revocation time
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Outcome of an atomic quota consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// One request was counted.
    Consumed { limit: i64, used: i64 },
    /// Key is unknown or revoked.
    InvalidKey,
    /// Quota exhausted.
    Exhausted { limit: i64, used: i64 },
}

/// A persisted oracle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: i64,
    pub event_type: String,
    pub wallet_address: Option<WalletAddress>,
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}

/// Database statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    /// Total number of passports
    pub passport_count: u64,

    /// Passports visited by the scheduler
    pub active_passport_count: u64,

    /// Issued badges
    pub badge_count: u64,

    /// API keys ever created
    pub api_key_count: u64,

    /// Recorded events
    pub event_count: u64,
}
