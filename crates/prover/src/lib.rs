//! Credential and proof construction for Aura proof-of-humanity badges.
//!
//! This crate provides:
//! - Canonical attestation hashing
//! - Proof-of-humanity credential assembly
//! - Deterministic proof + nullifier generation and a placeholder verifier
//! - Threshold proofs over a hidden score
//!
//! All proofs are SHA-256 commitments. Nothing here is zero-knowledge.

#![warn(missing_docs)]

pub mod credential;
pub mod error;
pub mod proof;
pub mod threshold;

pub use credential::{
    calculate_uniqueness_score, create_credential, hash_identity, Attestations, Credential,
};
pub use error::{ProverError, Result};
pub use proof::{generate_proof, nullifier_for, verify_proof, Proof};
pub use threshold::{
    calculate_threshold_score, generate_threshold_proof, verify_threshold_proof, ThresholdInput,
    ThresholdProof,
};
