//! API key issuance and quota enforcement.

use aura_core::constants::API_KEY_PREFIX;
use aura_core::types::ApiTier;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{OracleError, OracleResult, RateLimit};
use crate::events::{EventSink, OracleEvent};
use crate::storage::{ApiKeyRecord, ConsumeOutcome, Storage};

/// Usage summary for one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyStats {
    pub tier: ApiTier,
    pub requests_used: i64,
    pub rate_limit: i64,
    pub remaining: i64,
    pub usage_percent: f64,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<&ApiKeyRecord> for KeyStats {
    fn from(key: &ApiKeyRecord) -> Self {
        let usage_percent = if key.rate_limit > 0 {
            (key.requests_used as f64 / key.rate_limit as f64 * 10_000.0).round() / 100.0
        } else {
            100.0
        };

        Self {
            tier: key.tier,
            requests_used: key.requests_used,
            rate_limit: key.rate_limit,
            remaining: (key.rate_limit - key.requests_used).max(0),
            usage_percent,
            is_active: key.is_active,
            last_used_at: key.last_used_at,
        }
    }
}

/// Quota left after a successful consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Consumed {
    pub limit: i64,
    pub used: i64,
}

/// A key as listed for its owner: the secret is masked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeySummary {
    pub api_key: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub stats: KeyStats,
}

impl From<&ApiKeyRecord> for KeySummary {
    fn from(key: &ApiKeyRecord) -> Self {
        Self {
            api_key: mask_api_key(&key.api_key),
            user_id: key.user_id.clone(),
            created_at: key.created_at,
            stats: KeyStats::from(key),
        }
    }
}

/// `aura_sk_1a2b…9z8y`: prefix, four leading and four trailing characters.
pub fn mask_api_key(api_key: &str) -> String {
    let secret = api_key.strip_prefix(API_KEY_PREFIX).unwrap_or(api_key);
    if secret.len() <= 8 || !secret.is_ascii() {
        return format!("{}…", API_KEY_PREFIX);
    }
    format!(
        "{}{}…{}",
        API_KEY_PREFIX,
        &secret[..4],
        &secret[secret.len() - 4..]
    )
}

/// Generate a fresh `aura_sk_<32 hex>` key.
pub fn generate_api_key() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    format!("{}{}", API_KEY_PREFIX, hex::encode(bytes))
}

/// Gatekeeper for keyed API routes.
#[derive(Clone)]
pub struct ApiKeyGate {
    storage: Storage,
    events: Arc<dyn EventSink>,
}

impl ApiKeyGate {
    pub fn new(storage: Storage, events: Arc<dyn EventSink>) -> Self {
        Self { storage, events }
    }

    /// Issue a key for `user_id` with the tier's quota.
    pub async fn create_key(&self, tier: ApiTier, user_id: &str) -> OracleResult<ApiKeyRecord> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(OracleError::InvalidInput("user_id must not be empty".into()));
        }

        let record = ApiKeyRecord {
            api_key: generate_api_key(),
            user_id: user_id.to_string(),
            tier,
            rate_limit: tier.rate_limit(),
            requests_used: 0,
            is_active: true,
            created_at: Utc::now(),
            last_used_at: None,
            revoked_at: None,
        };
        self.storage.insert_api_key(&record).await?;

        info!(user_id, tier = %tier, "API key created");
        Ok(record)
    }

    /// Look up an active key.
    pub async fn verify(&self, api_key: &str) -> OracleResult<ApiKeyRecord> {
        match self.storage.get_api_key(api_key).await? {
            Some(key) if key.is_active => Ok(key),
            _ => Err(OracleError::InvalidKey),
        }
    }

    /// Count one request against the key's quota.
    pub async fn check_and_consume(&self, api_key: &str) -> OracleResult<Consumed> {
        self.check_and_consume_units(api_key, 1).await
    }

    /// Count `units` requests at once; nothing is consumed if they do not all fit.
    pub async fn check_and_consume_units(&self, api_key: &str, units: u32) -> OracleResult<Consumed> {
        match self
            .storage
            .consume_api_key_units(api_key, units, Utc::now())
            .await?
        {
            ConsumeOutcome::Consumed { limit, used } => Ok(Consumed { limit, used }),
            ConsumeOutcome::InvalidKey => Err(OracleError::InvalidKey),
            ConsumeOutcome::Exhausted { limit, used } => {
                debug!(limit, used, units, "API key quota exhausted");
                Err(OracleError::RateLimited(RateLimit::Quota { limit, used }))
            }
        }
    }

    /// Revoke a key. Revoking an unknown or already revoked key is `NotFound`.
    pub async fn revoke(&self, api_key: &str) -> OracleResult<()> {
        let now = Utc::now();
        let key = self
            .storage
            .get_api_key(api_key)
            .await?
            .ok_or_else(|| OracleError::NotFound("API key not found".into()))?;

        if !self.storage.revoke_api_key(api_key, now).await? {
            return Err(OracleError::NotFound("API key already revoked".into()));
        }

        info!(user_id = %key.user_id, "API key revoked");
        self.events.publish(OracleEvent::api_key_revoked(&key.user_id, now));
        Ok(())
    }

    /// Usage summary for a key, revoked or not.
    pub async fn stats(&self, api_key: &str) -> OracleResult<KeyStats> {
        let key = self
            .storage
            .get_api_key(api_key)
            .await?
            .ok_or_else(|| OracleError::NotFound("API key not found".into()))?;
        Ok(KeyStats::from(&key))
    }

    /// Keys owned by a user, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> OracleResult<Vec<ApiKeyRecord>> {
        Ok(self.storage.api_keys_for_user(user_id).await?)
    }

    /// Masked listing of a user's keys.
    pub async fn summaries_for_user(&self, user_id: &str) -> OracleResult<Vec<KeySummary>> {
        let keys = self.list_for_user(user_id).await?;
        Ok(keys.iter().map(KeySummary::from).collect())
    }
}
