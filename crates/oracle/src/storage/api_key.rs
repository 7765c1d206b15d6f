//! API key storage operations.

use super::types::from_unix;
use super::{ApiKeyRecord, ConsumeOutcome, Storage};
use anyhow::{Context, Result};
use aura_core::types::ApiTier;
use chrono::{DateTime, Utc};
use sqlx::Row;

const API_KEY_COLUMNS: &str = r#"
    api_key, user_id, tier, rate_limit, requests_used, is_active,
    created_at, last_used_at, revoked_at
"#;

impl Storage {
    /// Store a new API key.
    pub async fn insert_api_key(&self, key: &ApiKeyRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (
                api_key, user_id, tier, rate_limit, requests_used, is_active,
                created_at, last_used_at, revoked_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&key.api_key)
        .bind(&key.user_id)
        .bind(key.tier.as_str())
        .bind(key.rate_limit)
        .bind(key.requests_used)
        .bind(key.is_active)
        .bind(key.created_at.timestamp())
        .bind(key.last_used_at.map(|t| t.timestamp()))
        .bind(key.revoked_at.map(|t| t.timestamp()))
        .execute(&self.pool)
        .await
        .context("Failed to insert API key")?;

        Ok(())
    }

    /// Get an API key row, active or not.
    pub async fn get_api_key(&self, api_key: &str) -> Result<Option<ApiKeyRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM api_keys WHERE api_key = ?",
            API_KEY_COLUMNS
        ))
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch API key")?;

        row.map(Self::row_to_api_key).transpose()
    }

    /// API keys owned by a user, newest first.
    pub async fn api_keys_for_user(&self, user_id: &str) -> Result<Vec<ApiKeyRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM api_keys WHERE user_id = ? ORDER BY created_at DESC, api_key",
            API_KEY_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list API keys")?;

        rows.into_iter().map(Self::row_to_api_key).collect()
    }

    /// Count one request against a key's quota.
    pub async fn consume_api_key(&self, api_key: &str, now: DateTime<Utc>) -> Result<ConsumeOutcome> {
        self.consume_api_key_units(api_key, 1, now).await
    }

    /// Count `units` requests against a key's quota, all or nothing.
    ///
    /// The quota check and the increment are one conditional UPDATE, so
    /// concurrent callers can never push `requests_used` past `rate_limit`.
    pub async fn consume_api_key_units(
        &self,
        api_key: &str,
        units: u32,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome> {
        let units = i64::from(units);
        let row = sqlx::query(
            r#"
            UPDATE api_keys
            SET requests_used = requests_used + ?,
                last_used_at = ?
            WHERE api_key = ?
              AND is_active = 1
              AND requests_used + ? <= rate_limit
            RETURNING rate_limit, requests_used
            "#,
        )
        .bind(units)
        .bind(now.timestamp())
        .bind(api_key)
        .bind(units)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to consume API key quota")?;

        if let Some(row) = row {
            return Ok(ConsumeOutcome::Consumed {
                limit: row.get("rate_limit"),
                used: row.get("requests_used"),
            });
        }

        // Nothing updated: tell unknown/revoked keys apart from exhausted ones.
        match self.get_api_key(api_key).await? {
            Some(key) if key.is_active => Ok(ConsumeOutcome::Exhausted {
                limit: key.rate_limit,
                used: key.requests_used,
            }),
            _ => Ok(ConsumeOutcome::InvalidKey),
        }
    }

    /// Revoke a key. One-way; the row is kept for audit.
    ///
    /// Returns `false` if the key does not exist or was already revoked.
    pub async fn revoke_api_key(&self, api_key: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET is_active = 0,
                revoked_at = ?
            WHERE api_key = ?
              AND is_active = 1
            "#,
        )
        .bind(now.timestamp())
        .bind(api_key)
        .execute(&self.pool)
        .await
        .context("Failed to revoke API key")?;

        Ok(result.rows_affected() > 0)
    }

    fn row_to_api_key(row: sqlx::sqlite::SqliteRow) -> Result<ApiKeyRecord> {
        let tier: String = row.get("tier");
        let last_used_at: Option<i64> = row.get("last_used_at");
        let revoked_at: Option<i64> = row.get("revoked_at");

        Ok(ApiKeyRecord {
            api_key: row.get("api_key"),
            user_id: row.get("user_id"),
            tier: tier.parse::<ApiTier>().context("Invalid stored tier")?,
            rate_limit: row.get("rate_limit"),
            requests_used: row.get("requests_used"),
            is_active: row.get("is_active"),
            created_at: from_unix(row.get("created_at"))?,
            last_used_at: last_used_at.map(from_unix).transpose()?,
            revoked_at: revoked_at.map(from_unix).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::temp_storage;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_720_000_000, 0).unwrap()
    }

    fn key(name: &str, limit: i64, used: i64) -> ApiKeyRecord {
        ApiKeyRecord {
            api_key: name.to_string(),
            user_id: "user-1".to_string(),
            tier: ApiTier::Free,
            rate_limit: limit,
            requests_used: used,
            is_active: true,
            created_at: now(),
            last_used_at: None,
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn test_consume_until_exhausted() {
        let (storage, _db) = temp_storage().await;
        storage.insert_api_key(&key("k1", 2, 0)).await.unwrap();

        assert_eq!(
            storage.consume_api_key("k1", now()).await.unwrap(),
            ConsumeOutcome::Consumed { limit: 2, used: 1 }
        );
        assert_eq!(
            storage.consume_api_key("k1", now()).await.unwrap(),
            ConsumeOutcome::Consumed { limit: 2, used: 2 }
        );
        assert_eq!(
            storage.consume_api_key("k1", now()).await.unwrap(),
            ConsumeOutcome::Exhausted { limit: 2, used: 2 }
        );
        assert_eq!(
            storage.consume_api_key("missing", now()).await.unwrap(),
            ConsumeOutcome::InvalidKey
        );

        let stored = storage.get_api_key("k1").await.unwrap().unwrap();
        assert_eq!(stored.last_used_at, Some(now()));
    }

    #[tokio::test]
    async fn test_unit_consume_is_all_or_nothing() {
        let (storage, _db) = temp_storage().await;
        storage.insert_api_key(&key("k3", 10, 6)).await.unwrap();

        assert_eq!(
            storage.consume_api_key_units("k3", 5, now()).await.unwrap(),
            ConsumeOutcome::Exhausted { limit: 10, used: 6 }
        );
        assert_eq!(
            storage.consume_api_key_units("k3", 4, now()).await.unwrap(),
            ConsumeOutcome::Consumed { limit: 10, used: 10 }
        );
        assert_eq!(
            storage.consume_api_key("k3", now()).await.unwrap(),
            ConsumeOutcome::Exhausted { limit: 10, used: 10 }
        );
    }

    #[tokio::test]
    async fn test_revoke_is_one_way_and_keeps_row() {
        let (storage, _db) = temp_storage().await;
        storage.insert_api_key(&key("k2", 10, 3)).await.unwrap();

        assert!(storage.revoke_api_key("k2", now()).await.unwrap());
        assert!(!storage.revoke_api_key("k2", now()).await.unwrap());
        assert!(!storage.revoke_api_key("nope", now()).await.unwrap());

        let stored = storage.get_api_key("k2").await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.requests_used, 3);
        assert_eq!(stored.revoked_at, Some(now()));

        assert_eq!(
            storage.consume_api_key("k2", now()).await.unwrap(),
            ConsumeOutcome::InvalidKey
        );
    }

    #[tokio::test]
    async fn test_keys_for_user() {
        let (storage, _db) = temp_storage().await;
        storage.insert_api_key(&key("a", 10, 0)).await.unwrap();
        storage.insert_api_key(&key("b", 10, 0)).await.unwrap();

        let keys = storage.api_keys_for_user("user-1").await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(storage.api_keys_for_user("user-2").await.unwrap().is_empty());
    }
}
