//! Event storage operations.

use super::types::{from_unix, parse_wallet};
use super::{EventRecord, Storage};
use crate::events::{EventType, OracleEvent};
use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

impl Storage {
    /// Persist an event. Returns the row id.
    pub async fn insert_event(&self, event: &OracleEvent) -> Result<i64> {
        let payload = serde_json::to_string(&event.payload).context("Failed to encode payload")?;

        let result = sqlx::query(
            r#"
            INSERT INTO events (event_type, wallet_address, payload, emitted_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(event.event_type.as_str())
        .bind(event.wallet_address.map(|w| w.to_string()))
        .bind(payload)
        .bind(event.emitted_at.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to insert event")?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent events, newest first, optionally of one type only.
    pub async fn recent_events(
        &self,
        event_type: Option<EventType>,
        limit: u32,
    ) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, wallet_address, payload, emitted_at
            FROM events
            WHERE ?1 IS NULL OR event_type = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )
        .bind(event_type.map(|t| t.as_str()))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch events")?;

        rows.iter().map(event_from_row).collect()
    }
}

fn event_from_row(row: &SqliteRow) -> Result<EventRecord> {
    let wallet: Option<String> = row.get("wallet_address");
    let payload: String = row.get("payload");
    Ok(EventRecord {
        id: row.get("id"),
        event_type: row.get("event_type"),
        wallet_address: wallet.as_deref().map(parse_wallet).transpose()?,
        payload: serde_json::from_str(&payload).context("Invalid stored payload")?,
        emitted_at: from_unix(row.get("emitted_at"))?,
    })
}

#[cfg(test)]
mod tests {
    use crate::events::{EventType, OracleEvent};
    use crate::storage::test_support::temp_storage;
    use aura_core::types::WalletAddress;
    use chrono::DateTime;

    #[tokio::test]
    async fn test_events_newest_first() {
        let (storage, _db) = temp_storage().await;
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let wallet = WalletAddress::from([3; 20]);

        storage
            .insert_event(&OracleEvent::passport_updated(wallet, 10.0, 75.0, at))
            .await
            .unwrap();
        storage
            .insert_event(&OracleEvent::api_key_revoked("user-9", at))
            .await
            .unwrap();

        let events = storage.recent_events(None, 10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "api_key_revoked");
        assert_eq!(events[0].wallet_address, None);
        assert_eq!(events[1].wallet_address, Some(wallet));
        assert_eq!(events[1].payload["new_score"], 75.0);
    }

    #[tokio::test]
    async fn test_events_filtered_by_type() {
        let (storage, _db) = temp_storage().await;
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        for i in 0..3 {
            storage
                .insert_event(&OracleEvent::passport_updated(
                    WalletAddress::from([i; 20]),
                    0.0,
                    f64::from(i) * 10.0,
                    at,
                ))
                .await
                .unwrap();
        }
        storage
            .insert_event(&OracleEvent::api_key_revoked("user-9", at))
            .await
            .unwrap();

        let updates = storage
            .recent_events(Some(EventType::PassportUpdated), 2)
            .await
            .unwrap();
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|e| e.event_type == "passport_updated"));
        assert_eq!(updates[0].payload["new_score"], 20.0);

        let badges = storage.recent_events(Some(EventType::BadgeIssued), 50).await.unwrap();
        assert!(badges.is_empty());
    }
}
