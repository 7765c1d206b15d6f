//! Hash-commitment proofs and nullifiers.
//!
//! These proofs are SHA-256 commitments, not zero-knowledge proofs. The
//! nullifier is a one-way function of the identity secret, so the same
//! person always produces the same nullifier and a second badge can be
//! refused without ever storing the secret.

use aura_core::constants::PROOF_TYPE;
use aura_core::hashing::{canonical_json, sha256_hex};
use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::error::{ProverError, Result};

/// Proof over a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    /// Proof scheme label.
    pub proof_type: String,
    /// `sha256(canonical_json(credential) || secret)`, lowercase hex.
    pub proof_hash: String,
    /// `sha256(secret)`, lowercase hex.
    pub nullifier: String,
    /// `[score, score > 0]`.
    pub public_signals: Vec<f64>,
    /// Credential the proof covers.
    pub credential_id: String,
    /// Credential issuer.
    pub issuer: String,
    /// Mirrors the credential issuance date.
    pub created_at: String,
}

impl Proof {
    /// Score carried in the public signals, if any.
    pub fn score(&self) -> Option<f64> {
        self.public_signals.first().copied()
    }
}

/// Derive the nullifier for an identity secret.
pub fn nullifier_for(identity_secret: &str) -> String {
    sha256_hex(identity_secret.as_bytes())
}

/// Generate a proof for `credential`.
///
/// Deterministic: the same credential and secret always yield the same
/// proof hash and nullifier.
pub fn generate_proof(credential: &Credential, identity_secret: &str) -> Result<Proof> {
    if identity_secret.is_empty() {
        return Err(ProverError::EmptySecret);
    }

    let encoded = canonical_json(credential)?;
    let proof_hash = sha256_hex(format!("{}{}", encoded, identity_secret).as_bytes());
    let score = credential.score();

    Ok(Proof {
        proof_type: PROOF_TYPE.to_string(),
        proof_hash,
        nullifier: nullifier_for(identity_secret),
        public_signals: vec![score, if score > 0.0 { 1.0 } else { 0.0 }],
        credential_id: credential.id.clone(),
        issuer: credential.issuer.clone(),
        created_at: credential.issuance_date.clone(),
    })
}

/// Placeholder integrity check.
///
/// Accepts a proof when the issuer matches `expected_issuer` (if given), the
/// public signals are present and the score is non-negative. This does not
/// verify any cryptographic statement.
pub fn verify_proof(proof: &Proof, expected_issuer: Option<&str>) -> bool {
    if let Some(issuer) = expected_issuer {
        if proof.issuer != issuer {
            return false;
        }
    }

    match proof.score() {
        Some(score) => score >= 0.0,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::create_credential;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn credential(score: f64) -> Credential {
        let attestations = json!({"onchain_hash": "cc", "score": score});
        create_credential(
            "did:example:issuer",
            "did:example:0xabc",
            Some(&attestations),
            score,
            Utc.with_ymd_and_hms(2025, 5, 5, 5, 5, 5).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn proof_is_deterministic() {
        let first = generate_proof(&credential(72.0), "secret-1").unwrap();
        let second = generate_proof(&credential(72.0), "secret-1").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.nullifier, nullifier_for("secret-1"));
        assert_eq!(first.proof_type, "BJJSignature2021");
    }

    #[test]
    fn nullifier_depends_only_on_secret() {
        let a = generate_proof(&credential(10.0), "same").unwrap();
        let b = generate_proof(&credential(90.0), "same").unwrap();
        assert_eq!(a.nullifier, b.nullifier);
        assert_ne!(a.proof_hash, b.proof_hash);
    }

    #[test]
    fn public_signals_flag_positive_score() {
        let proof = generate_proof(&credential(0.0), "s").unwrap();
        assert_eq!(proof.public_signals, vec![0.0, 0.0]);
        let proof = generate_proof(&credential(55.0), "s").unwrap();
        assert_eq!(proof.public_signals, vec![55.0, 1.0]);
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert_eq!(
            generate_proof(&credential(1.0), ""),
            Err(ProverError::EmptySecret)
        );
    }

    #[test]
    fn verify_checks_issuer_and_signals() {
        let proof = generate_proof(&credential(60.0), "s").unwrap();
        assert!(verify_proof(&proof, None));
        assert!(verify_proof(&proof, Some("did:example:issuer")));
        assert!(!verify_proof(&proof, Some("did:example:other")));

        let mut stripped = proof.clone();
        stripped.public_signals.clear();
        assert!(!verify_proof(&stripped, None));

        let mut negative = proof;
        negative.public_signals[0] = -1.0;
        assert!(!verify_proof(&negative, None));
    }
}
