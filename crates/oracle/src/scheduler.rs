//! Continuous refresh scheduler.
//!
//! Every cycle loads the active passports and refreshes them in batches of
//! `batch_size`. Within a batch the entity locks are taken up front, then
//! signals are collected concurrently, scored, and persisted concurrently.
//! One entity failing never affects its siblings.
//!
//! The stop signal is observed between cycles only: the sleep is
//! interruptible, a running cycle is not.

use anyhow::{Context, Result};
use aura_core::constants::DEFAULT_REQUESTED_AMOUNT;
use aura_core::types::WalletAddress;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::error::{OracleError, OracleResult, RateLimit};
use crate::pipeline::{EntitySignals, ScoredEntity, ScoringPipeline};
use crate::storage::{PassportRecord, RefreshClaim};

/// Where the scheduler loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Collecting,
    Scoring,
    Persisting,
    Sleeping,
    Stopped,
}

/// Cumulative cycle statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStats {
    pub cycles: u64,
    pub entities_updated: u64,
    pub entities_failed: u64,
    pub significant_changes: u64,
    pub last_cycle_started_at: Option<DateTime<Utc>>,
    pub last_cycle_finished_at: Option<DateTime<Utc>>,
}

/// Snapshot returned by `/v1/oracle/status`.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub enabled: bool,
    pub interval_secs: u64,
    pub batch_size: usize,
    pub stats: SchedulerStats,
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub entities: usize,
    pub updated: usize,
    pub failed: usize,
    pub significant_changes: usize,
}

/// Background passport refresher.
#[derive(Clone)]
pub struct RefreshScheduler {
    pipeline: ScoringPipeline,
    config: SchedulerConfig,
    state: Arc<RwLock<SchedulerState>>,
    stats: Arc<RwLock<SchedulerStats>>,
}

/// Handle to a spawned scheduler loop.
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    scheduler: RefreshScheduler,
}

impl SchedulerHandle {
    /// Signal the loop to stop and wait for the current cycle to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            error!("Scheduler task panicked: {}", e);
        }
    }

    /// Current scheduler status.
    pub async fn status(&self) -> SchedulerStatus {
        self.scheduler.status().await
    }
}

impl RefreshScheduler {
    pub fn new(pipeline: ScoringPipeline, config: SchedulerConfig) -> Self {
        Self {
            pipeline,
            config,
            state: Arc::new(RwLock::new(SchedulerState::Idle)),
            stats: Arc::new(RwLock::new(SchedulerStats::default())),
        }
    }

    async fn set_state(&self, state: SchedulerState) {
        *self.state.write().await = state;
    }

    pub async fn state(&self) -> SchedulerState {
        *self.state.read().await
    }

    pub async fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            state: self.state().await,
            enabled: self.config.enabled,
            interval_secs: self.config.interval_secs,
            batch_size: self.config.batch_size,
            stats: self.stats.read().await.clone(),
        }
    }

    /// Spawn the loop as a background task.
    pub fn spawn(&self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let scheduler = self.clone();
        let task = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.run(stop_rx).await }
        });

        SchedulerHandle {
            stop_tx,
            task,
            scheduler,
        }
    }

    /// Run cycles until `stop_rx` turns true or its sender is dropped.
    pub async fn run(&self, mut stop_rx: watch::Receiver<bool>) {
        info!(
            "Refresh scheduler starting with interval: {}s, batch size: {}",
            self.config.interval_secs, self.config.batch_size
        );

        loop {
            if *stop_rx.borrow() {
                break;
            }

            if let Err(e) = self.run_cycle().await {
                error!("Refresh cycle failed: {:#}", e);
            }

            self.set_state(SchedulerState::Sleeping).await;
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval()) => {}
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.set_state(SchedulerState::Stopped).await;
        info!("Refresh scheduler stopped");
    }

    /// Run one full cycle over every active passport.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = Utc::now();
        self.stats.write().await.last_cycle_started_at = Some(started);
        self.set_state(SchedulerState::Collecting).await;

        let passports = self
            .pipeline
            .passports()
            .find_active()
            .await
            .context("Failed to load active passports")?;
        let wallets: Vec<WalletAddress> = passports.iter().map(|p| p.wallet_address).collect();

        let mut report = CycleReport {
            entities: wallets.len(),
            ..CycleReport::default()
        };

        for batch in wallets.chunks(self.config.batch_size.max(1)) {
            self.process_batch(batch, &mut report).await;
        }
        self.pipeline.locks().prune();
        self.pipeline.features().prune_expired();

        let finished = Utc::now();
        {
            let mut stats = self.stats.write().await;
            stats.cycles += 1;
            stats.entities_updated += report.updated as u64;
            stats.entities_failed += report.failed as u64;
            stats.significant_changes += report.significant_changes as u64;
            stats.last_cycle_finished_at = Some(finished);
        }
        self.set_state(SchedulerState::Idle).await;

        info!(
            entities = report.entities,
            updated = report.updated,
            failed = report.failed,
            changes = report.significant_changes,
            duration_ms = (finished - started).num_milliseconds(),
            "Refresh cycle complete"
        );
        Ok(report)
    }

    async fn process_batch(&self, batch: &[WalletAddress], report: &mut CycleReport) {
        let _guards = self.pipeline.locks().lock_many(batch).await;

        self.set_state(SchedulerState::Collecting).await;
        let collected = join_all(batch.iter().map(|wallet| self.pipeline.collect(wallet))).await;

        let mut signals: Vec<EntitySignals> = Vec::with_capacity(batch.len());
        for (wallet, result) in batch.iter().zip(collected) {
            match result {
                Ok(s) => signals.push(s),
                Err(e) => {
                    warn!(%wallet, "Failed to collect signals: {:#}", e);
                    report.failed += 1;
                }
            }
        }

        self.set_state(SchedulerState::Scoring).await;
        let now = Utc::now();
        let scored: Vec<ScoredEntity> = signals
            .iter()
            .map(|s| self.pipeline.score(s, DEFAULT_REQUESTED_AMOUNT, now))
            .collect();

        self.set_state(SchedulerState::Persisting).await;
        let persisted = join_all(scored.iter().map(|s| self.pipeline.persist(s, now))).await;
        for (entity, result) in scored.iter().zip(persisted) {
            match result {
                Ok(outcome) => {
                    report.updated += 1;
                    if outcome.significant_change {
                        report.significant_changes += 1;
                    }
                }
                Err(e) => {
                    warn!(wallet = %entity.wallet, "Failed to persist passport: {:#}", e);
                    report.failed += 1;
                }
            }
        }

        debug!(batch = batch.len(), "Batch refreshed");
    }

    /// Refresh one wallet now, subject to the per-wallet cooldown.
    pub async fn force_refresh(&self, wallet: &WalletAddress) -> OracleResult<PassportRecord> {
        let passports = self.pipeline.passports();
        if passports.get(wallet).await?.is_none() {
            return Err(OracleError::NotFound(format!("No passport for {}", wallet)));
        }

        match passports
            .claim_refresh(wallet, Utc::now(), self.config.cooldown())
            .await?
        {
            RefreshClaim::Cooldown { retry_after_secs } => {
                debug!(%wallet, retry_after_secs, "Forced refresh rejected by cooldown");
                return Err(OracleError::RateLimited(RateLimit::Cooldown { retry_after_secs }));
            }
            RefreshClaim::Claimed => {}
        }

        info!(%wallet, "Forced refresh");
        let outcome = self.pipeline.refresh(wallet, None).await?;
        Ok(outcome.passport)
    }
}
