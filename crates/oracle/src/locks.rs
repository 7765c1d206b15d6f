//! Per-wallet update locks.
//!
//! Every read-compute-write of a passport runs under its wallet's lock so the
//! scheduler and forced refreshes never interleave on the same entity.

use aura_core::types::WalletAddress;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created async mutex per wallet.
#[derive(Debug, Clone, Default)]
pub struct EntityLocks {
    locks: Arc<DashMap<WalletAddress, Arc<Mutex<()>>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, wallet: &WalletAddress) -> Arc<Mutex<()>> {
        self.locks
            .entry(*wallet)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Wait for the wallet's lock.
    pub async fn lock(&self, wallet: &WalletAddress) -> OwnedMutexGuard<()> {
        self.handle(wallet).lock_owned().await
    }

    /// Lock several wallets, always in address order so two batches can
    /// never deadlock on each other.
    pub async fn lock_many(&self, wallets: &[WalletAddress]) -> Vec<OwnedMutexGuard<()>> {
        let mut sorted = wallets.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for wallet in &sorted {
            guards.push(self.lock(wallet).await);
        }
        guards
    }

    /// Drop lock entries nobody holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of tracked wallets.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
