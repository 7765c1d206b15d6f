//! Verifiable-credential construction.
//!
//! A credential binds a subject DID to a uniqueness score and to the hash of
//! the attestations that produced it. Attestation blobs are hashed as RFC 8785
//! canonical JSON. An absent blob is hashed as the empty object `{}`, never as
//! `null`, so "no attestations" has exactly one representation.

use aura_core::constants::MAX_UNIQUENESS_SCORE;
use aura_core::hashing::hash_canonical;
use aura_core::types::VerificationLevel;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProverError, Result};

const CREDENTIALS_CONTEXT_V1: &str = "https://www.w3.org/2018/credentials/v1";
const POH_CONTEXT: &str = "https://schema.iden3.io/core/jsonld/iden3proofs.jsonld";
const CREDENTIAL_TYPE: &str = "VerifiableCredential";
const POH_CREDENTIAL_TYPE: &str = "ProofOfHumanityCredential";
const POH_SCHEMA_ID: &str = "ipfs://QmProofOfHumanitySchemaV1";
const POH_SCHEMA_TYPE: &str = "JsonSchemaValidator2018";

/// Per-provider attestation hashes gathered during enrollment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attestations {
    /// Hash of the GitHub provider report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_hash: Option<String>,
    /// Hash of the Twitter provider report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_hash: Option<String>,
    /// Hash of the on-chain report.
    pub onchain_hash: String,
    /// Uniqueness score computed from the reports.
    pub score: f64,
}

impl Attestations {
    /// JSON form used for hashing.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| ProverError::InvalidAttestation(e.to_string()))
    }
}

/// Subject section of a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    /// Subject DID.
    pub id: String,
    /// Subject type.
    #[serde(rename = "type")]
    pub subject_type: String,
    /// Uniqueness score in `[0, 100]`.
    pub uniqueness_score: f64,
    /// Verification level derived from the score.
    pub verification_level: VerificationLevel,
    /// Canonical hash of the attestations.
    pub attestation_hash: String,
}

/// Credential schema reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSchema {
    /// Schema location.
    pub id: String,
    /// Schema validator type.
    #[serde(rename = "type")]
    pub schema_type: String,
}

/// Proof-of-humanity credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// JSON-LD contexts.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// `urn:sha256:<attestation hash>`.
    pub id: String,
    /// Credential types.
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,
    /// Issuer DID.
    pub issuer: String,
    /// RFC 3339 issuance time with second precision.
    pub issuance_date: String,
    /// Subject claims.
    pub credential_subject: CredentialSubject,
    /// Schema reference.
    pub credential_schema: CredentialSchema,
}

impl Credential {
    /// Uniqueness score claimed by the credential.
    pub fn score(&self) -> f64 {
        self.credential_subject.uniqueness_score
    }
}

/// Hash an attestation blob.
///
/// `None` hashes as the canonical empty object `{}`.
pub fn hash_identity(attestations: Option<&Value>) -> Result<String> {
    match attestations {
        Some(value) => Ok(hash_canonical(value)?),
        None => Ok(hash_canonical(&Value::Object(Map::new()))?),
    }
}

/// Clamp a uniqueness score into `[0, 100]`; non-finite scores become 0.
pub fn normalize_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, MAX_UNIQUENESS_SCORE)
    } else {
        0.0
    }
}

/// Build a credential for `subject_did`.
pub fn create_credential(
    issuer: &str,
    subject_did: &str,
    attestations: Option<&Value>,
    score: f64,
    issued_at: DateTime<Utc>,
) -> Result<Credential> {
    let attestation_hash = hash_identity(attestations)?;
    let score = normalize_score(score);

    Ok(Credential {
        context: vec![CREDENTIALS_CONTEXT_V1.to_string(), POH_CONTEXT.to_string()],
        id: format!("urn:sha256:{}", attestation_hash),
        credential_type: vec![
            CREDENTIAL_TYPE.to_string(),
            POH_CREDENTIAL_TYPE.to_string(),
        ],
        issuer: issuer.to_string(),
        issuance_date: issued_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        credential_subject: CredentialSubject {
            id: subject_did.to_string(),
            subject_type: POH_CREDENTIAL_TYPE.to_string(),
            uniqueness_score: score,
            verification_level: VerificationLevel::from_score(score),
            attestation_hash,
        },
        credential_schema: CredentialSchema {
            id: POH_SCHEMA_ID.to_string(),
            schema_type: POH_SCHEMA_TYPE.to_string(),
        },
    })
}

/// Uniqueness score: sum of the provider scores, capped at 100.
pub fn calculate_uniqueness_score(
    github_score: Option<f64>,
    twitter_score: Option<f64>,
    onchain_score: f64,
) -> f64 {
    let total: f64 = [github_score, twitter_score, Some(onchain_score)]
        .into_iter()
        .flatten()
        .filter(|s| s.is_finite() && *s > 0.0)
        .sum();
    total.min(MAX_UNIQUENESS_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn none_hashes_like_empty_object() {
        let empty = json!({});
        assert_eq!(
            hash_identity(None).unwrap(),
            hash_identity(Some(&empty)).unwrap()
        );
        assert_ne!(
            hash_identity(None).unwrap(),
            hash_identity(Some(&Value::Null)).unwrap()
        );
    }

    #[test]
    fn key_order_does_not_change_hash() {
        let a = json!({"github_hash": "aa", "score": 40});
        let b = json!({"score": 40, "github_hash": "aa"});
        assert_eq!(
            hash_identity(Some(&a)).unwrap(),
            hash_identity(Some(&b)).unwrap()
        );
    }

    #[test]
    fn credential_embeds_level_and_hash() {
        let attestations = json!({"onchain_hash": "bb", "score": 85});
        let credential = create_credential(
            "did:example:issuer",
            "did:example:subject",
            Some(&attestations),
            85.0,
            issued_at(),
        )
        .unwrap();

        assert_eq!(
            credential.credential_subject.verification_level,
            VerificationLevel::High
        );
        assert_eq!(
            credential.id,
            format!("urn:sha256:{}", hash_identity(Some(&attestations)).unwrap())
        );
        assert_eq!(credential.issuance_date, "2025-03-01T12:00:00Z");

        let encoded = serde_json::to_value(&credential).unwrap();
        assert!(encoded.get("@context").is_some());
        assert_eq!(encoded["credentialSubject"]["uniquenessScore"], json!(85.0));
    }

    #[test]
    fn score_is_clamped() {
        let credential =
            create_credential("i", "s", None, 250.0, issued_at()).unwrap();
        assert_eq!(credential.score(), 100.0);
        let credential =
            create_credential("i", "s", None, f64::NAN, issued_at()).unwrap();
        assert_eq!(credential.score(), 0.0);
    }

    #[test]
    fn uniqueness_is_capped_sum() {
        assert_eq!(calculate_uniqueness_score(Some(40.0), Some(30.0), 10.0), 80.0);
        assert_eq!(calculate_uniqueness_score(Some(80.0), Some(70.0), 0.0), 100.0);
        assert_eq!(calculate_uniqueness_score(None, None, 0.0), 0.0);
        assert_eq!(calculate_uniqueness_score(Some(f64::NAN), None, 5.0), 5.0);
    }
}
