//! Proof-of-humanity enrollment, proof generation and badge issuance.
//!
//! Flow: `enroll` hashes the provider reports into attestations and a
//! uniqueness score, `prove` wraps them in a credential and commits to it
//! with the holder's secret, `issue_badge` records a badge for the proof.
//! The badge insert is guarded by the UNIQUE nullifier, so one identity can
//! never hold two badges however many requests race.

use aura_core::types::WalletAddress;
use aura_prover::{
    calculate_uniqueness_score, create_credential, generate_proof, hash_identity, verify_proof,
    Attestations,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::CredentialsConfig;
use crate::error::{OracleError, OracleResult};
use crate::events::{EventSink, OracleEvent};
use crate::pipeline::ScoringPipeline;
use crate::sources::{SignalCollector, SignalReport};
use crate::storage::{
    BadgeRecord, EnrollmentRecord, EnrollmentStatus, NewBadge, ProofRecord, Storage,
};
use crate::store::BadgeLedger;

/// Longest handle any supported provider issues.
const MAX_HANDLE_LEN: usize = 39;

/// Provider handles are ASCII letters, digits, `_` and `-`. Blank means absent.
fn provider_handle<'a>(field: &str, handle: Option<&'a str>) -> OracleResult<Option<&'a str>> {
    let Some(handle) = handle.map(str::trim).filter(|h| !h.is_empty()) else {
        return Ok(None);
    };
    let valid = handle.len() <= MAX_HANDLE_LEN
        && handle
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if !valid {
        return Err(OracleError::InvalidInput(format!(
            "{} must be 1-{} letters, digits, '_' or '-'",
            field, MAX_HANDLE_LEN
        )));
    }
    Ok(Some(handle))
}

fn report_hash(report: &SignalReport) -> OracleResult<String> {
    let value = serde_json::to_value(report)
        .map_err(|e| OracleError::Internal(anyhow::Error::new(e).context("Failed to encode report")))?;
    Ok(hash_identity(Some(&value))?)
}

/// Enrollment, proof and badge service.
#[derive(Clone)]
pub struct PohService {
    storage: Storage,
    collector: SignalCollector,
    ledger: Arc<dyn BadgeLedger>,
    pipeline: ScoringPipeline,
    events: Arc<dyn EventSink>,
    credentials: CredentialsConfig,
}

impl PohService {
    pub fn new(
        storage: Storage,
        collector: SignalCollector,
        ledger: Arc<dyn BadgeLedger>,
        pipeline: ScoringPipeline,
        events: Arc<dyn EventSink>,
        credentials: CredentialsConfig,
    ) -> Self {
        Self {
            storage,
            collector,
            ledger,
            pipeline,
            events,
            credentials,
        }
    }

    /// Collect identity reports for a wallet and record an enrollment.
    pub async fn enroll(
        &self,
        user_id: &str,
        wallet: &WalletAddress,
        github_handle: Option<&str>,
        twitter_handle: Option<&str>,
    ) -> OracleResult<EnrollmentRecord> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(OracleError::InvalidInput("user_id must not be empty".into()));
        }
        let github_handle = provider_handle("github_handle", github_handle)?;
        let twitter_handle = provider_handle("twitter_handle", twitter_handle)?;

        let ((github, twitter), onchain) = tokio::join!(
            self.collector.identity(github_handle, twitter_handle),
            self.collector.onchain(wallet)
        );

        let onchain_hash = match &onchain {
            Some(report) => report_hash(report)?,
            None => hash_identity(None)?,
        };
        let score = calculate_uniqueness_score(
            github.as_ref().and_then(|r| r.finite_score()),
            twitter.as_ref().and_then(|r| r.finite_score()),
            onchain.as_ref().and_then(|r| r.finite_score()).unwrap_or(0.0),
        );

        let attestations = Attestations {
            github_hash: github.as_ref().map(report_hash).transpose()?,
            twitter_hash: twitter.as_ref().map(report_hash).transpose()?,
            onchain_hash,
            score,
        };

        let record = EnrollmentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            wallet_address: *wallet,
            attestations,
            raw_reports: json!({
                "github": github,
                "twitter": twitter,
                "onchain": onchain,
            }),
            status: EnrollmentStatus::Pending,
            created_at: Utc::now(),
        };
        self.storage.insert_enrollment(&record).await?;

        info!(
            enrollment_id = %record.id,
            %wallet,
            uniqueness_score = score,
            "Enrollment recorded"
        );
        Ok(record)
    }

    /// Build the credential for an enrollment and prove it with `identity_secret`.
    pub async fn prove(&self, enrollment_id: &str, identity_secret: &str) -> OracleResult<ProofRecord> {
        let enrollment = self
            .storage
            .get_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| OracleError::NotFound(format!("Enrollment {} not found", enrollment_id)))?;

        let attestations: Value = enrollment.attestations.to_value()?;
        let credential = create_credential(
            &self.credentials.issuer_did,
            &self.credentials.subject_did(&enrollment.wallet_address),
            Some(&attestations),
            enrollment.attestations.score,
            Utc::now(),
        )?;
        let proof = generate_proof(&credential, identity_secret)?;

        let record = ProofRecord {
            id: uuid::Uuid::new_v4().to_string(),
            enrollment_id: enrollment.id.clone(),
            wallet_address: enrollment.wallet_address,
            proof,
            credential,
            created_at: Utc::now(),
        };
        self.storage.insert_proof(&record).await?;

        info!(
            enrollment_id,
            proof_hash = %record.proof.proof_hash,
            "Proof generated"
        );

        // Regenerating an identical proof keeps the first row's id.
        let stored = self
            .storage
            .get_proof_by_hash(&record.proof.proof_hash)
            .await?
            .unwrap_or(record);
        Ok(stored)
    }

    /// Issue a badge for a stored proof.
    ///
    /// Fails with `DuplicateIdentity` if the nullifier already holds a badge.
    /// The wallet's passport is created or refreshed afterwards.
    pub async fn issue_badge(
        &self,
        proof_hash: &str,
        nullifier: &str,
        wallet: &WalletAddress,
    ) -> OracleResult<BadgeRecord> {
        let stored = self
            .storage
            .get_proof_by_hash(proof_hash)
            .await?
            .ok_or_else(|| OracleError::NotFound(format!("Proof {} not found", proof_hash)))?;

        if stored.proof.nullifier != nullifier {
            return Err(OracleError::InvalidInput(
                "Nullifier does not match the proof".into(),
            ));
        }
        if stored.wallet_address != *wallet {
            return Err(OracleError::InvalidInput(
                "Wallet does not match the enrolled wallet".into(),
            ));
        }
        if !verify_proof(&stored.proof, Some(&self.credentials.issuer_did)) {
            return Err(OracleError::InvalidInput("Proof verification failed".into()));
        }
        if self.ledger.has_nullifier(nullifier).await? {
            return Err(OracleError::DuplicateIdentity {
                nullifier: nullifier.to_string(),
            });
        }

        // The UNIQUE nullifier still arbitrates issuers racing past the check.
        let badge = self
            .ledger
            .record_badge(&NewBadge {
                wallet_address: *wallet,
                nullifier: nullifier.to_string(),
                proof_hash: proof_hash.to_string(),
                score: stored.credential.score(),
                verification_level: stored.credential.credential_subject.verification_level,
                issued_at: Utc::now(),
            })
            .await?
            .ok_or_else(|| OracleError::DuplicateIdentity {
                nullifier: nullifier.to_string(),
            })?;

        info!(
            %wallet,
            token_id = badge.token_id,
            score = badge.score,
            "Badge issued"
        );
        self.events.publish(OracleEvent::badge_issued(&badge));

        if let Err(e) = self.pipeline.refresh(wallet, None).await {
            warn!(%wallet, "Badge issued but passport refresh failed: {:#}", e);
        }

        Ok(badge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChannelEventSink, EventType};
    use crate::feature_store::NullFeatureCache;
    use crate::locks::EntityLocks;
    use crate::pipeline::test_support::settings;
    use crate::sources::test_sources::StaticSource;
    use crate::sources::NullSignalSource;
    use crate::storage::test_support::temp_storage;
    use aura_core::types::VerificationLevel;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn wallet() -> WalletAddress {
        WalletAddress::from([0xab; 20])
    }

    fn service(storage: &Storage) -> (PohService, mpsc::Receiver<OracleEvent>) {
        let (sink, rx) = ChannelEventSink::new(16);
        let events: Arc<dyn EventSink> = Arc::new(sink);
        let collector = SignalCollector::new(
            Arc::new(StaticSource(SignalReport::with_score(40.0).metric_value("followers", 12))),
            Arc::new(StaticSource(SignalReport::with_score(25.0))),
            Arc::new(StaticSource(SignalReport::with_score(30.0))),
            Arc::new(NullSignalSource::new("defi")),
            Duration::from_secs(1),
        );
        let pipeline = ScoringPipeline::new(
            collector.clone(),
            Arc::new(NullFeatureCache),
            Arc::new(storage.clone()),
            Arc::new(storage.clone()),
            events.clone(),
            EntityLocks::new(),
            settings(),
        );
        let poh = PohService::new(
            storage.clone(),
            collector,
            Arc::new(storage.clone()),
            pipeline,
            events,
            CredentialsConfig::default(),
        );
        (poh, rx)
    }

    #[tokio::test]
    async fn test_enroll_prove_issue() {
        let (storage, _db) = temp_storage().await;
        let (poh, mut rx) = service(&storage);

        let enrollment = poh
            .enroll("user-1", &wallet(), Some("octocat"), Some("jack"))
            .await
            .unwrap();
        assert_eq!(enrollment.attestations.score, 95.0);
        assert!(enrollment.attestations.github_hash.is_some());
        assert_eq!(enrollment.status, EnrollmentStatus::Pending);

        let proof = poh.prove(&enrollment.id, "correct horse").await.unwrap();
        assert_eq!(
            proof.credential.credential_subject.verification_level,
            VerificationLevel::High
        );
        let stored = storage.get_enrollment(&enrollment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, EnrollmentStatus::ProofGenerated);

        let badge = poh
            .issue_badge(&proof.proof.proof_hash, &proof.proof.nullifier, &wallet())
            .await
            .unwrap();
        assert_eq!(badge.score, 95.0);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event_type, EventType::BadgeIssued);

        // Issuance creates the passport.
        let passport = storage.get_passport(&wallet()).await.unwrap().unwrap();
        assert_eq!(passport.score_history.len(), 1);
        // 95*4 (capped 400) + 50 + 30
        assert_eq!(passport.credit_score, 460);
    }

    #[tokio::test]
    async fn test_enroll_without_handles() {
        let (storage, _db) = temp_storage().await;
        let (poh, _rx) = service(&storage);

        let enrollment = poh.enroll("user-2", &wallet(), None, None).await.unwrap();
        assert_eq!(enrollment.attestations.score, 30.0);
        assert!(enrollment.attestations.github_hash.is_none());
        assert!(enrollment.attestations.twitter_hash.is_none());

        assert!(matches!(
            poh.enroll("", &wallet(), None, None).await,
            Err(OracleError::InvalidInput(_))
        ));
        assert!(matches!(
            poh.prove("missing", "secret").await,
            Err(OracleError::NotFound(_))
        ));
        assert!(matches!(
            poh.prove(&enrollment.id, "").await,
            Err(OracleError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_issue_yields_one_badge() {
        let (storage, _db) = temp_storage().await;
        let (poh, _rx) = service(&storage);

        let enrollment = poh.enroll("user-3", &wallet(), None, None).await.unwrap();
        let proof = poh.prove(&enrollment.id, "secret").await.unwrap();
        let hash = proof.proof.proof_hash.clone();
        let nullifier = proof.proof.nullifier.clone();

        let w = wallet();
        let (a, b) = tokio::join!(
            poh.issue_badge(&hash, &nullifier, &w),
            poh.issue_badge(&hash, &nullifier, &w)
        );
        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(OracleError::DuplicateIdentity { .. }))));
        assert_eq!(storage.count_badges(&w).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_many_issuers_leave_one_badge() {
        let (storage, _db) = temp_storage().await;
        let (poh, _rx) = service(&storage);

        let enrollment = poh.enroll("user-5", &wallet(), None, None).await.unwrap();
        let proof = poh.prove(&enrollment.id, "secret").await.unwrap();
        let hash = proof.proof.proof_hash.clone();
        let nullifier = proof.proof.nullifier.clone();
        let w = wallet();

        let results = futures::future::join_all(
            (0..8).map(|_| poh.issue_badge(&hash, &nullifier, &w)),
        )
        .await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(OracleError::DuplicateIdentity { .. })))
                .count(),
            7
        );
        assert_eq!(storage.badges_for_wallet(&w).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_secret_reused_on_another_wallet_is_duplicate() {
        let (storage, _db) = temp_storage().await;
        let (poh, _rx) = service(&storage);
        let other = WalletAddress::from([0xcd; 20]);

        let first = poh.enroll("user-6", &wallet(), None, None).await.unwrap();
        let first = poh.prove(&first.id, "same person").await.unwrap();
        poh.issue_badge(&first.proof.proof_hash, &first.proof.nullifier, &wallet())
            .await
            .unwrap();

        let second = poh.enroll("user-6b", &other, Some("someone-else"), None).await.unwrap();
        let second = poh.prove(&second.id, "same person").await.unwrap();
        assert_ne!(second.proof.proof_hash, first.proof.proof_hash);
        assert_eq!(second.proof.nullifier, first.proof.nullifier);

        match poh
            .issue_badge(&second.proof.proof_hash, &second.proof.nullifier, &other)
            .await
        {
            Err(OracleError::DuplicateIdentity { nullifier }) => {
                assert_eq!(nullifier, first.proof.nullifier);
            }
            unexpected => panic!("expected duplicate identity, got {:?}", unexpected),
        }
        assert_eq!(storage.count_badges(&other).await.unwrap(), 0);
        assert!(storage.get_passport(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_enroll_rejects_malformed_handles() {
        let (storage, _db) = temp_storage().await;
        let (poh, _rx) = service(&storage);

        let too_long = "x".repeat(40);
        for handle in ["../../admin/reset?confirm=1", "a b", "name#frag", too_long.as_str()] {
            assert!(
                matches!(
                    poh.enroll("user-7", &wallet(), Some(handle), None).await,
                    Err(OracleError::InvalidInput(_))
                ),
                "{}",
                handle
            );
        }
        assert!(matches!(
            poh.enroll("user-7", &wallet(), None, Some("@jack")).await,
            Err(OracleError::InvalidInput(_))
        ));

        // Blank handles count as absent.
        let enrollment = poh.enroll("user-7", &wallet(), Some("  "), Some("jack_2")).await.unwrap();
        assert!(enrollment.attestations.github_hash.is_none());
        assert!(enrollment.attestations.twitter_hash.is_some());
    }

    #[tokio::test]
    async fn test_issue_rejects_mismatches() {
        let (storage, _db) = temp_storage().await;
        let (poh, _rx) = service(&storage);

        let enrollment = poh.enroll("user-4", &wallet(), None, None).await.unwrap();
        let proof = poh.prove(&enrollment.id, "secret").await.unwrap();
        let hash = &proof.proof.proof_hash;

        assert!(matches!(
            poh.issue_badge("deadbeef", &proof.proof.nullifier, &wallet()).await,
            Err(OracleError::NotFound(_))
        ));
        assert!(matches!(
            poh.issue_badge(hash, "wrong", &wallet()).await,
            Err(OracleError::InvalidInput(_))
        ));
        assert!(matches!(
            poh.issue_badge(hash, &proof.proof.nullifier, &WalletAddress::from([1; 20]))
                .await,
            Err(OracleError::InvalidInput(_))
        ));
    }
}
