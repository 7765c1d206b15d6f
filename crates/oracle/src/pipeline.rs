//! Per-wallet scoring pipeline.
//!
//! `collect` gathers provider reports, ledger facts and the stored history;
//! `score` runs the engines; `persist` writes the passport and publishes a
//! `passport_updated` event on a significant change. The scheduler drives
//! the three steps batch-wise, everything else goes through
//! [`ScoringPipeline::refresh`].

use anyhow::{Context, Result};
use aura_core::constants::DEFAULT_REQUESTED_AMOUNT;
use aura_core::types::WalletAddress;
use aura_engine::credit::{calculate_credit_score, CreditScore};
use aura_engine::reputation::{calculate_reputation, ReputationInputs};
use aura_engine::scoring::{assess, Assessment, RawSignals};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::events::{EventSink, OracleEvent};
use crate::feature_store::{FeatureCache, RawFeatureInput};
use crate::locks::EntityLocks;
use crate::sources::{CollectedSignals, SignalCollector};
use crate::storage::{PassportRecord, PassportUpdate};
use crate::store::{BadgeLedger, PassportStore};

/// Knobs shared by every refresh path.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Address embedded in assessment proofs.
    pub oracle_address: String,
    /// Score history entries kept per passport.
    pub history_cap: usize,
    /// Risk score change that emits `passport_updated`.
    pub significant_change_threshold: f64,
}

/// Facts about the wallet's badges. `None` fields mean the ledger did not answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerFacts {
    pub badge_count: Option<u32>,
    pub best_score: Option<f64>,
    pub first_badge_at: Option<DateTime<Utc>>,
}

/// Everything gathered for one wallet.
#[derive(Debug, Clone)]
pub struct EntitySignals {
    pub wallet: WalletAddress,
    pub reports: CollectedSignals,
    pub ledger: LedgerFacts,
    /// Stored passport before this refresh.
    pub previous: Option<PassportRecord>,
}

/// Engine output for one wallet.
#[derive(Debug, Clone)]
pub struct ScoredEntity {
    pub wallet: WalletAddress,
    pub assessment: Assessment,
    pub credit: CreditScore,
    pub previous_score: Option<f64>,
}

/// Result of a persisted refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub passport: PassportRecord,
    pub assessment: Assessment,
    pub credit: CreditScore,
    pub previous_score: Option<f64>,
    pub significant_change: bool,
}

/// Collect, score and persist passports.
#[derive(Clone)]
pub struct ScoringPipeline {
    collector: SignalCollector,
    features: Arc<dyn FeatureCache>,
    ledger: Arc<dyn BadgeLedger>,
    passports: Arc<dyn PassportStore>,
    events: Arc<dyn EventSink>,
    locks: EntityLocks,
    settings: PipelineSettings,
}

impl ScoringPipeline {
    pub fn new(
        collector: SignalCollector,
        features: Arc<dyn FeatureCache>,
        ledger: Arc<dyn BadgeLedger>,
        passports: Arc<dyn PassportStore>,
        events: Arc<dyn EventSink>,
        locks: EntityLocks,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            collector,
            features,
            ledger,
            passports,
            events,
            locks,
            settings,
        }
    }

    pub fn locks(&self) -> &EntityLocks {
        &self.locks
    }

    pub fn features(&self) -> &Arc<dyn FeatureCache> {
        &self.features
    }

    pub fn passports(&self) -> &Arc<dyn PassportStore> {
        &self.passports
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run a ledger query under the collector timeout; failures become `None`.
    async fn ledger_call<T, F>(&self, what: &str, wallet: &WalletAddress, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.collector.timeout(), fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(%wallet, query = what, "Badge ledger query failed: {:#}", e);
                None
            }
            Err(_) => {
                warn!(%wallet, query = what, "Badge ledger query timed out");
                None
            }
        }
    }

    /// Badge facts for a wallet, degraded to `None` on ledger failure.
    pub async fn ledger_facts(&self, wallet: &WalletAddress) -> LedgerFacts {
        let (badge_count, best_score, first_badge_at) = tokio::join!(
            self.ledger_call("count_badges", wallet, self.ledger.count_badges(wallet)),
            self.ledger_call("best_score", wallet, self.ledger.best_score(wallet)),
            self.ledger_call("first_badge_at", wallet, self.ledger.first_badge_at(wallet)),
        );

        LedgerFacts {
            badge_count,
            best_score: best_score.flatten(),
            first_badge_at: first_badge_at.flatten(),
        }
    }

    /// Query providers and the ledger, and refresh the feature cache.
    pub async fn refresh_features(&self, wallet: &WalletAddress) -> (CollectedSignals, LedgerFacts) {
        let (reports, ledger) = tokio::join!(self.collector.collect(wallet), self.ledger_facts(wallet));

        let stored = self.features.compute_and_store(
            wallet,
            &RawFeatureInput {
                poh_score: ledger.best_score,
                badge_count: ledger.badge_count.map(f64::from),
                github: reports.github.clone(),
                twitter: reports.twitter.clone(),
                onchain: reports.onchain.clone(),
            },
        );
        debug!(%wallet, features = stored.len(), "Features refreshed");

        (reports, ledger)
    }

    /// Gather everything needed to score `wallet`.
    ///
    /// Provider and ledger failures degrade to defaults; only a failure to
    /// read the stored passport is an error.
    pub async fn collect(&self, wallet: &WalletAddress) -> Result<EntitySignals> {
        let ((reports, ledger), previous) =
            tokio::join!(self.refresh_features(wallet), self.passports.get(wallet));
        let previous = previous.context("Failed to load passport")?;

        Ok(EntitySignals {
            wallet: *wallet,
            reports,
            ledger,
            previous,
        })
    }

    /// Run the engines over collected signals.
    pub fn score(
        &self,
        signals: &EntitySignals,
        requested_amount: f64,
        now: DateTime<Utc>,
    ) -> ScoredEntity {
        let (raw, credit) = raw_signals(signals, now);
        let assessment = assess(
            &raw,
            &signals.wallet,
            requested_amount,
            now,
            &self.settings.oracle_address,
        );

        ScoredEntity {
            wallet: signals.wallet,
            assessment,
            credit,
            previous_score: signals.previous.as_ref().map(|p| p.risk_score),
        }
    }

    /// Write a scored entity and publish a change event if warranted.
    pub async fn persist(&self, scored: &ScoredEntity, now: DateTime<Utc>) -> Result<RefreshOutcome> {
        let result = &scored.assessment.result;
        let update = PassportUpdate {
            risk_category: result.risk_category,
            risk_score: result.risk_score,
            default_probability: result.default_probability,
            fraud_detected: result.fraud_detected,
            fraud_likelihood: result.fraud_likelihood,
            credit_score: scored.credit.credit_score,
            credit_grade: scored.credit.grade,
        };

        self.passports
            .upsert(&scored.wallet, &update, now)
            .await
            .context("Failed to upsert passport")?;
        self.passports
            .append_history(&scored.wallet, result.risk_score, now, self.settings.history_cap)
            .await
            .context("Failed to append score history")?;

        let passport = self
            .passports
            .get(&scored.wallet)
            .await?
            .with_context(|| format!("Passport {} vanished after upsert", scored.wallet))?;

        let significant_change = match scored.previous_score {
            Some(old) => (result.risk_score - old).abs() > self.settings.significant_change_threshold,
            None => false,
        };
        if significant_change {
            let old = scored.previous_score.unwrap_or_default();
            info!(
                wallet = %scored.wallet,
                old_score = old,
                new_score = result.risk_score,
                "Significant risk score change"
            );
            self.events.publish(OracleEvent::passport_updated(
                scored.wallet,
                old,
                result.risk_score,
                now,
            ));
        }

        Ok(RefreshOutcome {
            passport,
            assessment: scored.assessment.clone(),
            credit: scored.credit,
            previous_score: scored.previous_score,
            significant_change,
        })
    }

    /// Collect, score and persist one wallet. The caller must hold its lock.
    pub async fn refresh_unlocked(
        &self,
        wallet: &WalletAddress,
        requested_amount: f64,
        now: DateTime<Utc>,
    ) -> Result<RefreshOutcome> {
        let signals = self.collect(wallet).await?;
        let scored = self.score(&signals, requested_amount, now);
        self.persist(&scored, now).await
    }

    /// Lock, collect, score and persist one wallet.
    pub async fn refresh(
        &self,
        wallet: &WalletAddress,
        requested_amount: Option<f64>,
    ) -> Result<RefreshOutcome> {
        let guard = self.locks.lock(wallet).await;
        let outcome = self
            .refresh_unlocked(
                wallet,
                requested_amount.unwrap_or(DEFAULT_REQUESTED_AMOUNT),
                Utc::now(),
            )
            .await;
        drop(guard);
        self.locks.prune();
        outcome
    }

    /// Collector timeout, reused for ledger calls.
    pub fn call_timeout(&self) -> Duration {
        self.collector.timeout()
    }
}

/// Map collected signals onto the engine's raw inputs.
///
/// The credit score is computed first and fed back in as a feature.
pub fn raw_signals(signals: &EntitySignals, now: DateTime<Utc>) -> (RawSignals, CreditScore) {
    let reports = &signals.reports;
    let github_score = reports.github.as_ref().and_then(|r| r.finite_score());
    let twitter_score = reports.twitter.as_ref().and_then(|r| r.finite_score());
    let onchain = reports.onchain.as_ref();
    let defi = reports.defi.as_ref();
    let onchain_metric = |name: &str| onchain.and_then(|r| r.metric(name));
    let defi_metric = |name: &str| defi.and_then(|r| r.metric(name));

    let poh_score = signals.ledger.best_score;
    let badge_count = signals.ledger.badge_count;
    let onchain_score = onchain.and_then(|r| r.finite_score());
    let tx_count = onchain_metric("tx_count");

    let credit = calculate_credit_score(
        poh_score.unwrap_or(0.0),
        badge_count.unwrap_or(0),
        onchain_score.unwrap_or(0.0),
    );

    let reputation = calculate_reputation(
        &ReputationInputs {
            poh_score: poh_score.unwrap_or(0.0),
            badge_count: f64::from(badge_count.unwrap_or(0)),
            github_score: github_score.unwrap_or(0.0),
            twitter_score: twitter_score.unwrap_or(0.0),
            tx_count: tx_count.unwrap_or(0.0),
            ledger_badge_count: badge_count,
            account_age_days: signals
                .ledger
                .first_badge_at
                .map(|first| (now - first).num_seconds() as f64 / 86_400.0),
        },
        now,
    );

    let raw = RawSignals {
        credit_score: Some(f64::from(credit.credit_score)),
        poh_score,
        badge_count: badge_count.map(f64::from),
        onchain_activity: onchain_score,
        account_age_days: onchain_metric("age_days"),
        // 0-1000 reputation onto the 0-100 feature scale.
        reputation_score: Some(f64::from(reputation.reputation_score) / 10.0),
        is_verified: badge_count.map(|count| count > 0),
        tx_count,
        tx_volume_usd: onchain_metric("volume_usd"),
        tx_velocity: onchain_metric("tx_velocity"),
        unique_contracts: onchain_metric("unique_contracts"),
        total_borrowed: defi_metric("borrowed"),
        total_supplied: defi_metric("supplied"),
        repayment_rate: defi_metric("repayment_rate"),
        liquidation_count: defi_metric("liquidations"),
        github_score,
        twitter_score,
        score_history: signals
            .previous
            .as_ref()
            .map(|p| p.score_history.clone())
            .unwrap_or_default(),
    };

    (raw, credit)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::events::ChannelEventSink;
    use crate::sources::SignalReport;
    use crate::storage::test_support::temp_storage;
    use crate::storage::NewBadge;
    use aura_core::types::{RiskCategory, VerificationLevel};

    fn wallet(b: u8) -> WalletAddress {
        WalletAddress::from([b; 20])
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_730_000_000, 0).unwrap()
    }

    #[test]
    fn test_raw_signals_from_reports() {
        let signals = EntitySignals {
            wallet: wallet(1),
            reports: CollectedSignals {
                github: Some(SignalReport::with_score(40.0)),
                twitter: None,
                onchain: Some(
                    SignalReport::with_score(80.0)
                        .metric_value("tx_count", 250)
                        .metric_value("age_days", 400),
                ),
                defi: Some(SignalReport::default().metric_value("repayment_rate", 90)),
            },
            ledger: LedgerFacts {
                badge_count: Some(2),
                best_score: Some(75.0),
                first_badge_at: Some(now() - chrono::Duration::days(10)),
            },
            previous: None,
        };

        let (raw, credit) = raw_signals(&signals, now());
        // 75*4 + 2*50 + 80
        assert_eq!(credit.credit_score, 480);
        assert_eq!(raw.credit_score, Some(480.0));
        assert_eq!(raw.poh_score, Some(75.0));
        assert_eq!(raw.is_verified, Some(true));
        assert_eq!(raw.tx_count, Some(250.0));
        assert_eq!(raw.account_age_days, Some(400.0));
        assert_eq!(raw.repayment_rate, Some(90.0));
        assert_eq!(raw.twitter_score, None);
        assert!(raw.score_history.is_empty());
        assert!(raw.reputation_score.unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_refresh_creates_passport_with_history() {
        let (storage, _db) = temp_storage().await;
        let pipeline = quiet_pipeline(&storage);

        let outcome = pipeline.refresh(&wallet(2), None).await.unwrap();
        assert_eq!(outcome.previous_score, None);
        assert!(!outcome.significant_change);
        assert_eq!(outcome.passport.score_history, vec![outcome.assessment.result.risk_score]);
        // No signals at all: the classifier lands in the high-risk band.
        assert_eq!(outcome.passport.risk_category, RiskCategory::High);

        let outcome = pipeline.refresh(&wallet(2), Some(5_000.0)).await.unwrap();
        assert_eq!(outcome.passport.score_history.len(), 2);
        assert!(outcome.previous_score.is_some());
    }

    #[tokio::test]
    async fn test_refresh_releases_lock_entries() {
        let (storage, _db) = temp_storage().await;
        let pipeline = quiet_pipeline(&storage);

        for b in 10..60 {
            pipeline.refresh(&wallet(b), None).await.unwrap();
        }
        assert!(pipeline.locks().is_empty());

        // A held lock survives the prune of a sibling refresh.
        let held = pipeline.locks().lock(&wallet(70)).await;
        pipeline.refresh(&wallet(71), None).await.unwrap();
        assert_eq!(pipeline.locks().len(), 1);
        drop(held);
    }

    #[tokio::test]
    async fn test_significant_change_emits_event() {
        let (storage, _db) = temp_storage().await;
        let (sink, mut rx) = ChannelEventSink::new(8);
        let pipeline = pipeline(&storage, Arc::new(sink));
        let w = wallet(3);

        // Seed a passport whose stored score is far from what a refresh yields.
        let seeded = PassportUpdate {
            risk_category: RiskCategory::Low,
            risk_score: 0.0,
            default_probability: 0.0,
            fraud_detected: false,
            fraud_likelihood: 0.0,
            credit_score: 1000,
            credit_grade: aura_engine::credit::CreditGrade::Excellent,
        };
        storage.upsert_passport(&w, &seeded, now()).await.unwrap();

        let outcome = pipeline.refresh(&w, None).await.unwrap();
        assert!(outcome.significant_change);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.wallet_address, Some(w));
        assert_eq!(event.payload["old_score"], 0.0);
    }

    #[tokio::test]
    async fn test_ledger_facts_feed_credit() {
        let (storage, _db) = temp_storage().await;
        let pipeline = quiet_pipeline(&storage);
        let w = wallet(4);

        storage
            .insert_badge(&NewBadge {
                wallet_address: w,
                nullifier: "n".into(),
                proof_hash: "p".into(),
                score: 90.0,
                verification_level: VerificationLevel::High,
                issued_at: now(),
            })
            .await
            .unwrap();

        let facts = pipeline.ledger_facts(&w).await;
        assert_eq!(facts.badge_count, Some(1));
        assert_eq!(facts.best_score, Some(90.0));

        let outcome = pipeline.refresh(&w, None).await.unwrap();
        // 90*4 + 50
        assert_eq!(outcome.credit.credit_score, 410);
        assert_eq!(outcome.passport.credit_score, 410);
    }
}
