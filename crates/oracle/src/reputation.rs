//! Reputation and trust views for a wallet.
//!
//! Inputs come from the feature cache (collected on a miss) and the badge
//! ledger. A ledger that fails or times out leaves the relational inputs
//! unset, so the engine falls back to its neutral components.

use aura_core::types::WalletAddress;
use aura_engine::reputation::{
    calculate_reputation, calculate_trust_score, ReputationInputs, ReputationResult, TrustScore,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::feature_store::{features, FeatureCache};
use crate::pipeline::ScoringPipeline;

/// Computes reputation and trust scores on demand.
#[derive(Clone)]
pub struct ReputationService {
    features: Arc<dyn FeatureCache>,
    pipeline: ScoringPipeline,
}

impl ReputationService {
    pub fn new(features: Arc<dyn FeatureCache>, pipeline: ScoringPipeline) -> Self {
        Self { features, pipeline }
    }

    /// Gather engine inputs for `wallet`.
    pub async fn inputs(&self, wallet: &WalletAddress) -> ReputationInputs {
        let ledger = if self.features.lookup(wallet, features::COMPUTED_AT).is_none() {
            debug!(%wallet, "Feature cache miss, collecting signals");
            let (_, ledger) = self.pipeline.refresh_features(wallet).await;
            ledger
        } else {
            self.pipeline.ledger_facts(wallet).await
        };

        let now = Utc::now();
        ReputationInputs {
            poh_score: self.features.get(wallet, features::POH_SCORE),
            badge_count: self.features.get(wallet, features::BADGE_COUNT),
            github_score: self.features.get(wallet, features::GITHUB_SCORE),
            twitter_score: self.features.get(wallet, features::TWITTER_SCORE),
            tx_count: self.features.get(wallet, features::ONCHAIN_TX_COUNT),
            ledger_badge_count: ledger.badge_count,
            account_age_days: ledger
                .first_badge_at
                .map(|first| (now - first).num_seconds().max(0) as f64 / 86_400.0),
        }
    }

    /// Reputation view for `wallet`.
    pub async fn calculate(&self, wallet: &WalletAddress) -> ReputationResult {
        let inputs = self.inputs(wallet).await;
        calculate_reputation(&inputs, Utc::now())
    }

    /// Trust score for `wallet`, with a loan recommendation when an amount is given.
    pub async fn trust_score(&self, wallet: &WalletAddress, loan_amount: Option<f64>) -> TrustScore {
        let reputation = self.calculate(wallet).await;
        calculate_trust_score(&reputation, loan_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullEventSink;
    use crate::feature_store::InMemoryFeatureStore;
    use crate::locks::EntityLocks;
    use crate::pipeline::test_support::settings;
    use crate::sources::test_sources::StaticSource;
    use crate::sources::{NullSignalSource, SignalCollector, SignalReport};
    use crate::storage::test_support::temp_storage;
    use crate::storage::NewBadge;
    use crate::store::BadgeLedger;
    use anyhow::Result;
    use async_trait::async_trait;
    use aura_core::types::{ReputationTier, VerificationLevel};
    use chrono::{DateTime, Duration as ChronoDuration};
    use std::time::Duration;

    /// Ledger that never answers in time.
    struct StalledLedger;

    #[async_trait]
    impl BadgeLedger for StalledLedger {
        async fn count_badges(&self, _wallet: &WalletAddress) -> Result<u32> {
            std::future::pending::<Result<u32>>().await
        }

        async fn first_badge_at(&self, _wallet: &WalletAddress) -> Result<Option<DateTime<Utc>>> {
            std::future::pending::<Result<Option<DateTime<Utc>>>>().await
        }

        async fn best_score(&self, _wallet: &WalletAddress) -> Result<Option<f64>> {
            anyhow::bail!("ledger offline")
        }

        async fn has_nullifier(&self, _nullifier: &str) -> Result<bool> {
            anyhow::bail!("ledger offline")
        }

        async fn record_badge(&self, _badge: &NewBadge) -> Result<Option<crate::storage::BadgeRecord>> {
            anyhow::bail!("ledger offline")
        }
    }

    fn collector(github: f64) -> SignalCollector {
        SignalCollector::new(
            Arc::new(StaticSource(SignalReport::with_score(github))),
            Arc::new(NullSignalSource::new("twitter")),
            Arc::new(StaticSource(SignalReport::default().metric_value("tx_count", 99))),
            Arc::new(NullSignalSource::new("defi")),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_reputation_from_storage_ledger() {
        let (storage, _db) = temp_storage().await;
        let wallet = WalletAddress::from([7; 20]);
        storage
            .insert_badge(&NewBadge {
                wallet_address: wallet,
                nullifier: "n-7".into(),
                proof_hash: "p-7".into(),
                score: 100.0,
                verification_level: VerificationLevel::High,
                issued_at: Utc::now() - ChronoDuration::days(120),
            })
            .await
            .unwrap();

        let cache: Arc<dyn FeatureCache> = Arc::new(InMemoryFeatureStore::new(Duration::from_secs(60)));
        let pipeline = ScoringPipeline::new(
            collector(100.0),
            cache.clone(),
            Arc::new(storage.clone()),
            Arc::new(storage.clone()),
            Arc::new(NullEventSink),
            EntityLocks::new(),
            settings(),
        );
        let service = ReputationService::new(cache.clone(), pipeline);

        let inputs = service.inputs(&wallet).await;
        assert_eq!(inputs.poh_score, 100.0);
        assert_eq!(inputs.badge_count, 1.0);
        assert_eq!(inputs.github_score, 100.0);
        assert_eq!(inputs.tx_count, 99.0);
        assert_eq!(inputs.ledger_badge_count, Some(1));
        assert!(inputs.account_age_days.unwrap() >= 119.0);
        assert!(cache.lookup(&wallet, features::COMPUTED_AT).is_some());

        // poh 250 + badges 15 + social 120 + onchain 200 + network 20 + temporal 100
        let reputation = service.calculate(&wallet).await;
        assert!((704..=705).contains(&reputation.reputation_score));
        assert_eq!(reputation.tier, ReputationTier::Gold);

        let trust = service.trust_score(&wallet, Some(1_000.0)).await;
        assert!(trust.trust_score >= 70.0);
        let rec = trust.recommendation.unwrap();
        assert!(rec.approved);
        assert_eq!(rec.max_approved_amount, 600.0);
    }

    #[tokio::test]
    async fn test_unavailable_ledger_uses_neutral_components() {
        let (storage, _db) = temp_storage().await;
        let wallet = WalletAddress::from([8; 20]);
        let cache: Arc<dyn FeatureCache> = Arc::new(InMemoryFeatureStore::new(Duration::from_secs(60)));
        let pipeline = ScoringPipeline::new(
            collector(0.0),
            cache.clone(),
            Arc::new(StalledLedger),
            Arc::new(storage.clone()),
            Arc::new(NullEventSink),
            EntityLocks::new(),
            settings(),
        );
        let service = ReputationService::new(cache, pipeline);

        let inputs = service.inputs(&wallet).await;
        assert_eq!(inputs.ledger_badge_count, None);
        assert_eq!(inputs.account_age_days, None);

        let reputation = service.calculate(&wallet).await;
        assert_eq!(reputation.components.network_trust, 50);
        assert_eq!(reputation.components.temporal, 50);
    }
}
