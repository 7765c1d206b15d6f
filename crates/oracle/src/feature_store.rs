//! Per-wallet feature cache.
//!
//! Features are named `f64` values with independent expiry. A missing or
//! expired feature reads as [`DEFAULT_FEATURE_VALUE`]; reads never repopulate.

use aura_core::types::WalletAddress;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::sources::SignalReport;

/// Value of an absent feature.
pub const DEFAULT_FEATURE_VALUE: f64 = 0.0;

/// Feature names, in the order [`FeatureCache::get_vector`] returns them.
pub const VECTOR_FEATURES: [&str; 8] = [
    features::POH_SCORE,
    features::BADGE_COUNT,
    features::GITHUB_SCORE,
    features::TWITTER_SCORE,
    features::ONCHAIN_TX_COUNT,
    features::GITHUB_REPOS,
    features::GITHUB_FOLLOWERS,
    features::TWITTER_FOLLOWERS,
];

/// Every feature [`derive_features`] and `compute_and_store` can write.
pub const ALL_FEATURES: [&str; 12] = [
    features::POH_SCORE,
    features::BADGE_COUNT,
    features::GITHUB_SCORE,
    features::GITHUB_REPOS,
    features::GITHUB_FOLLOWERS,
    features::TWITTER_SCORE,
    features::TWITTER_FOLLOWERS,
    features::ONCHAIN_TX_COUNT,
    features::ONCHAIN_SCORE,
    features::ONCHAIN_BALANCE,
    features::ACCOUNT_AGE_DAYS,
    features::COMPUTED_AT,
];

/// Feature names.
pub mod features {
    pub const POH_SCORE: &str = "poh_score";
    pub const BADGE_COUNT: &str = "badge_count";
    pub const GITHUB_SCORE: &str = "github_score";
    pub const GITHUB_REPOS: &str = "github_repos";
    pub const GITHUB_FOLLOWERS: &str = "github_followers";
    pub const TWITTER_SCORE: &str = "twitter_score";
    pub const TWITTER_FOLLOWERS: &str = "twitter_followers";
    pub const ONCHAIN_TX_COUNT: &str = "onchain_tx_count";
    pub const ONCHAIN_SCORE: &str = "onchain_score";
    pub const ONCHAIN_BALANCE: &str = "onchain_balance";
    pub const ACCOUNT_AGE_DAYS: &str = "account_age_days";
    /// Unix seconds of the last `compute_and_store`.
    pub const COMPUTED_AT: &str = "computed_at";
}

/// Raw inputs for [`FeatureCache::compute_and_store`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeatureInput {
    pub poh_score: Option<f64>,
    pub badge_count: Option<f64>,
    pub github: Option<SignalReport>,
    pub twitter: Option<SignalReport>,
    pub onchain: Option<SignalReport>,
}

/// Derive named features from raw provider reports.
pub fn derive_features(input: &RawFeatureInput) -> Vec<(&'static str, f64)> {
    let mut out = Vec::new();

    if let Some(poh) = input.poh_score {
        out.push((features::POH_SCORE, poh));
    }
    if let Some(badges) = input.badge_count {
        out.push((features::BADGE_COUNT, badges));
    }
    if let Some(gh) = &input.github {
        out.push((features::GITHUB_SCORE, gh.score));
        out.push((features::GITHUB_REPOS, gh.metric("public_repos").unwrap_or(0.0)));
        out.push((features::GITHUB_FOLLOWERS, gh.metric("followers").unwrap_or(0.0)));
    }
    if let Some(tw) = &input.twitter {
        out.push((features::TWITTER_SCORE, tw.score));
        out.push((
            features::TWITTER_FOLLOWERS,
            tw.metric("followers_count").unwrap_or(0.0),
        ));
    }
    if let Some(oc) = &input.onchain {
        out.push((features::ONCHAIN_TX_COUNT, oc.metric("tx_count").unwrap_or(0.0)));
        out.push((features::ONCHAIN_BALANCE, oc.metric("balance").unwrap_or(0.0)));
        out.push((features::ONCHAIN_SCORE, oc.score));
        if let Some(age) = oc.metric("age_days") {
            out.push((features::ACCOUNT_AGE_DAYS, age));
        }
    }

    out
}

/// Feature cache contract.
///
/// Implementations must be safe to share across tasks. A backend that cannot
/// answer behaves as a miss.
pub trait FeatureCache: Send + Sync {
    /// Live value, or `None` if absent or expired.
    fn lookup(&self, entity: &WalletAddress, name: &str) -> Option<f64>;

    /// Store a value. `ttl = None` uses the cache default. Non-finite values
    /// are ignored.
    fn set(&self, entity: &WalletAddress, name: &str, value: f64, ttl: Option<Duration>);

    /// Remove every feature of an entity.
    fn invalidate(&self, entity: &WalletAddress);

    /// Drop expired entries. Returns features removed.
    fn prune_expired(&self) -> usize {
        0
    }

    /// Entities currently holding at least one entry.
    fn entity_count(&self) -> usize {
        0
    }

    /// Live value or the default.
    fn get(&self, entity: &WalletAddress, name: &str) -> f64 {
        self.lookup(entity, name).unwrap_or(DEFAULT_FEATURE_VALUE)
    }

    /// Several values at once; absent ones read as the default.
    fn get_many(&self, entity: &WalletAddress, names: &[&str]) -> HashMap<String, f64> {
        names
            .iter()
            .map(|name| (name.to_string(), self.get(entity, name)))
            .collect()
    }

    /// The eight vector features in [`VECTOR_FEATURES`] order.
    fn get_vector(&self, entity: &WalletAddress) -> [f64; 8] {
        VECTOR_FEATURES.map(|name| self.get(entity, name))
    }

    /// Derive features from raw reports, store them and return what was stored.
    fn compute_and_store(
        &self,
        entity: &WalletAddress,
        input: &RawFeatureInput,
    ) -> HashMap<String, f64> {
        let mut stored: HashMap<String, f64> = derive_features(input)
            .into_iter()
            .filter(|(_, value)| value.is_finite())
            .map(|(name, value)| {
                self.set(entity, name, value, None);
                (name.to_string(), value)
            })
            .collect();

        let computed_at = Utc::now().timestamp() as f64;
        self.set(entity, features::COMPUTED_AT, computed_at, None);
        stored.insert(features::COMPUTED_AT.to_string(), computed_at);

        stored
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedFeature {
    value: f64,
    expires_at: Instant,
}

/// In-process TTL cache.
#[derive(Debug)]
pub struct InMemoryFeatureStore {
    entries: DashMap<WalletAddress, HashMap<String, CachedFeature>>,
    default_ttl: Duration,
}

impl InMemoryFeatureStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }
}

impl FeatureCache for InMemoryFeatureStore {
    fn lookup(&self, entity: &WalletAddress, name: &str) -> Option<f64> {
        let now = Instant::now();
        {
            let features = self.entries.get(entity)?;
            let feature = features.get(name)?;
            if feature.expires_at > now {
                return Some(feature.value);
            }
        }

        // The shard read guard is released above; an expired hit evicts
        // every stale entry of the entity and the entity itself once empty.
        self.entries.remove_if_mut(entity, |_, features| {
            features.retain(|_, f| f.expires_at > now);
            features.is_empty()
        });
        None
    }

    fn set(&self, entity: &WalletAddress, name: &str, value: f64, ttl: Option<Duration>) {
        if !value.is_finite() {
            debug!(%entity, name, "Ignoring non-finite feature value");
            return;
        }

        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        self.entries
            .entry(*entity)
            .or_default()
            .insert(name.to_string(), CachedFeature { value, expires_at });
    }

    fn invalidate(&self, entity: &WalletAddress) {
        self.entries.remove(entity);
    }

    fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.entries.retain(|_, features| {
            let before = features.len();
            features.retain(|_, f| f.expires_at > now);
            removed += before - features.len();
            !features.is_empty()
        });

        if removed > 0 {
            debug!(removed, "Pruned expired features");
        }
        removed
    }

    fn entity_count(&self) -> usize {
        self.entries.len()
    }
}

/// Cache that stores nothing; every read is a miss.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFeatureCache;

impl FeatureCache for NullFeatureCache {
    fn lookup(&self, _entity: &WalletAddress, _name: &str) -> Option<f64> {
        None
    }

    fn set(&self, _entity: &WalletAddress, _name: &str, _value: f64, _ttl: Option<Duration>) {}

    fn invalidate(&self, _entity: &WalletAddress) {}
}
