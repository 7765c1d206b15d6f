//! Threshold proofs: "score >= threshold" without revealing the score.
//!
//! Same caveat as [`crate::proof`]: a hash commitment, not a circuit proof.

use aura_core::hashing::{hash_canonical, is_hex_digest, sha256_hex};
use aura_core::types::WalletAddress;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;

const GITHUB_POINTS: u64 = 30;
const TWITTER_POINTS: u64 = 20;
const WALLET_AGE_CAP: u64 = 25;
const TX_COUNT_CAP: u64 = 25;

/// Default threshold when a request omits one.
pub const DEFAULT_THRESHOLD: u64 = 50;

/// Inputs for a threshold score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdInput {
    /// Prover wallet.
    pub wallet_address: WalletAddress,
    /// GitHub account verified.
    #[serde(default)]
    pub github_verified: bool,
    /// Twitter account verified.
    #[serde(default)]
    pub twitter_verified: bool,
    /// Wallet age in days.
    #[serde(default)]
    pub wallet_age_days: u64,
    /// Lifetime transaction count.
    #[serde(default)]
    pub transaction_count: u64,
}

/// Threshold proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdProof {
    /// Commitment over the circuit inputs.
    pub proof_hash: String,
    /// Whether the hidden score meets the threshold.
    pub is_valid: bool,
    /// Threshold tested.
    pub threshold: u64,
    /// `sha256(wallet)`.
    pub nullifier: String,
    /// Caller-supplied timestamp, echoed back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

fn github_points(input: &ThresholdInput) -> u64 {
    if input.github_verified {
        GITHUB_POINTS
    } else {
        0
    }
}

fn twitter_points(input: &ThresholdInput) -> u64 {
    if input.twitter_verified {
        TWITTER_POINTS
    } else {
        0
    }
}

fn wallet_age_points(input: &ThresholdInput) -> u64 {
    (input.wallet_age_days / 10).min(WALLET_AGE_CAP)
}

fn tx_points(input: &ThresholdInput) -> u64 {
    (input.transaction_count / 5).min(TX_COUNT_CAP)
}

/// Threshold score in `[0, 100]`.
pub fn calculate_threshold_score(input: &ThresholdInput) -> u64 {
    github_points(input) + twitter_points(input) + wallet_age_points(input) + tx_points(input)
}

/// Commit to the score inputs and report whether the threshold is met.
pub fn generate_threshold_proof(
    input: &ThresholdInput,
    threshold: u64,
    timestamp: Option<String>,
) -> Result<ThresholdProof> {
    let nullifier = sha256_hex(input.wallet_address.to_string().as_bytes());
    let circuit_input = json!({
        "threshold": threshold,
        "nullifierHash": nullifier,
        "githubScore": github_points(input),
        "twitterScore": twitter_points(input),
        "walletAge": wallet_age_points(input),
        "transactionCount": tx_points(input),
    });

    Ok(ThresholdProof {
        proof_hash: hash_canonical(&circuit_input)?,
        is_valid: calculate_threshold_score(input) >= threshold,
        threshold,
        nullifier,
        timestamp,
    })
}

/// Format check for a threshold proof.
pub fn verify_threshold_proof(proof_hash: &str, nullifier: &str) -> bool {
    is_hex_digest(proof_hash) && is_hex_digest(nullifier)
}
