//! Badge storage operations.

use super::types::{from_unix, parse_wallet};
use super::{BadgeRecord, NewBadge, Storage};
use anyhow::{Context, Result};
use aura_core::types::{VerificationLevel, WalletAddress};
use chrono::{DateTime, Utc};
use sqlx::Row;

impl Storage {
    /// Record a badge unless its nullifier was already used.
    ///
    /// Returns `None` when another badge holds the same nullifier. The
    /// uniqueness check is the UNIQUE constraint itself, so concurrent
    /// issuers for one identity get exactly one `Some`.
    pub async fn insert_badge(&self, badge: &NewBadge) -> Result<Option<BadgeRecord>> {
        let id = uuid::Uuid::new_v4().to_string();

        let result = sqlx::query(
            r#"
            INSERT INTO badges (
                id, wallet_address, nullifier, proof_hash,
                score, verification_level, issued_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(nullifier) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(badge.wallet_address.to_string())
        .bind(&badge.nullifier)
        .bind(&badge.proof_hash)
        .bind(badge.score)
        .bind(badge.verification_level.as_str())
        .bind(badge.issued_at.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to insert badge")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(BadgeRecord {
            id,
            token_id: result.last_insert_rowid(),
            wallet_address: badge.wallet_address,
            nullifier: badge.nullifier.clone(),
            proof_hash: badge.proof_hash.clone(),
            score: badge.score,
            verification_level: badge.verification_level,
            // Stored with second precision.
            issued_at: from_unix(badge.issued_at.timestamp())?,
        }))
    }

    /// Number of badges held by a wallet.
    pub async fn count_badges(&self, wallet: &WalletAddress) -> Result<u32> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM badges WHERE wallet_address = ?")
            .bind(wallet.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count badges")?;

        Ok(count as u32)
    }

    /// Issuance time of the wallet's oldest badge.
    pub async fn first_badge_at(&self, wallet: &WalletAddress) -> Result<Option<DateTime<Utc>>> {
        let issued_at: Option<i64> =
            sqlx::query_scalar("SELECT MIN(issued_at) FROM badges WHERE wallet_address = ?")
                .bind(wallet.to_string())
                .fetch_one(&self.pool)
                .await
                .context("Failed to fetch first badge")?;

        issued_at.map(from_unix).transpose()
    }

    /// Highest uniqueness score across the wallet's badges.
    pub async fn best_badge_score(&self, wallet: &WalletAddress) -> Result<Option<f64>> {
        let score: Option<f64> =
            sqlx::query_scalar("SELECT MAX(score) FROM badges WHERE wallet_address = ?")
                .bind(wallet.to_string())
                .fetch_one(&self.pool)
                .await
                .context("Failed to fetch best badge score")?;

        Ok(score)
    }

    /// Whether any badge already uses `nullifier`.
    pub async fn nullifier_exists(&self, nullifier: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM badges WHERE nullifier = ?)")
                .bind(nullifier)
                .fetch_one(&self.pool)
                .await
                .context("Failed to check nullifier")?;

        Ok(exists)
    }

    /// Badges held by a wallet, oldest first.
    pub async fn badges_for_wallet(&self, wallet: &WalletAddress) -> Result<Vec<BadgeRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, token_id, wallet_address, nullifier, proof_hash,
                   score, verification_level, issued_at
            FROM badges
            WHERE wallet_address = ?
            ORDER BY token_id
            "#,
        )
        .bind(wallet.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list badges")?;

        rows.into_iter().map(Self::row_to_badge).collect()
    }

    fn row_to_badge(row: sqlx::sqlite::SqliteRow) -> Result<BadgeRecord> {
        let wallet: String = row.get("wallet_address");
        let level: String = row.get("verification_level");

        Ok(BadgeRecord {
            id: row.get("id"),
            token_id: row.get("token_id"),
            wallet_address: parse_wallet(&wallet)?,
            nullifier: row.get("nullifier"),
            proof_hash: row.get("proof_hash"),
            score: row.get("score"),
            verification_level: level
                .parse::<VerificationLevel>()
                .context("Invalid stored verification level")?,
            issued_at: from_unix(row.get("issued_at"))?,
        })
    }
}
