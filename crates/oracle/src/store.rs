//! Persistence seams used by the scoring services.
//!
//! The scheduler and pipeline talk to these traits rather than to
//! [`Storage`] directly, so tests can substitute failing or slow stores.

use anyhow::Result;
use async_trait::async_trait;
use aura_core::types::WalletAddress;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::storage::{BadgeRecord, NewBadge, PassportRecord, PassportUpdate, RefreshClaim, Storage};

/// Passport persistence.
#[async_trait]
pub trait PassportStore: Send + Sync {
    /// Every active passport.
    async fn find_active(&self) -> Result<Vec<PassportRecord>>;

    /// One passport, active or not.
    async fn get(&self, wallet: &WalletAddress) -> Result<Option<PassportRecord>>;

    /// Insert or overwrite the scoring fields.
    async fn upsert(
        &self,
        wallet: &WalletAddress,
        update: &PassportUpdate,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Append to the capped score history.
    async fn append_history(
        &self,
        wallet: &WalletAddress,
        risk_score: f64,
        at: DateTime<Utc>,
        cap: usize,
    ) -> Result<()>;

    /// Atomically claim a forced-refresh window.
    async fn claim_refresh(
        &self,
        wallet: &WalletAddress,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<RefreshClaim>;
}

/// Badge ownership ledger.
#[async_trait]
pub trait BadgeLedger: Send + Sync {
    /// Badges held by the wallet.
    async fn count_badges(&self, wallet: &WalletAddress) -> Result<u32>;

    /// Issuance time of the wallet's oldest badge.
    async fn first_badge_at(&self, wallet: &WalletAddress) -> Result<Option<DateTime<Utc>>>;

    /// Highest uniqueness score among the wallet's badges.
    async fn best_score(&self, wallet: &WalletAddress) -> Result<Option<f64>>;

    /// Whether the nullifier is already taken.
    async fn has_nullifier(&self, nullifier: &str) -> Result<bool>;

    /// Record a badge; `None` if the nullifier is taken.
    async fn record_badge(&self, badge: &NewBadge) -> Result<Option<BadgeRecord>>;
}

#[async_trait]
impl PassportStore for Storage {
    async fn find_active(&self) -> Result<Vec<PassportRecord>> {
        self.list_active_passports().await
    }

    async fn get(&self, wallet: &WalletAddress) -> Result<Option<PassportRecord>> {
        self.get_passport(wallet).await
    }

    async fn upsert(
        &self,
        wallet: &WalletAddress,
        update: &PassportUpdate,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.upsert_passport(wallet, update, now).await
    }

    async fn append_history(
        &self,
        wallet: &WalletAddress,
        risk_score: f64,
        at: DateTime<Utc>,
        cap: usize,
    ) -> Result<()> {
        self.append_score_history(wallet, risk_score, at, cap).await
    }

    async fn claim_refresh(
        &self,
        wallet: &WalletAddress,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<RefreshClaim> {
        Storage::claim_refresh(self, wallet, now, cooldown).await
    }
}

#[async_trait]
impl BadgeLedger for Storage {
    async fn count_badges(&self, wallet: &WalletAddress) -> Result<u32> {
        Storage::count_badges(self, wallet).await
    }

    async fn first_badge_at(&self, wallet: &WalletAddress) -> Result<Option<DateTime<Utc>>> {
        Storage::first_badge_at(self, wallet).await
    }

    async fn best_score(&self, wallet: &WalletAddress) -> Result<Option<f64>> {
        self.best_badge_score(wallet).await
    }

    async fn has_nullifier(&self, nullifier: &str) -> Result<bool> {
        self.nullifier_exists(nullifier).await
    }

    async fn record_badge(&self, badge: &NewBadge) -> Result<Option<BadgeRecord>> {
        self.insert_badge(badge).await
    }
}
