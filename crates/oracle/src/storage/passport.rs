//! Passport, score history and refresh-log storage operations.

use super::types::{from_unix, parse_wallet};
use super::{PassportRecord, PassportUpdate, RefreshClaim, Storage};
use anyhow::{Context, Result};
use aura_core::types::{RiskCategory, WalletAddress};
use aura_engine::credit::CreditGrade;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::collections::HashMap;
use std::time::Duration;

const PASSPORT_COLUMNS: &str = r#"
    wallet_address, risk_category, risk_score, default_probability,
    fraud_detected, fraud_likelihood, credit_score, credit_grade,
    is_active, created_at, last_updated
"#;

impl Storage {
    /// Get a passport with its score history.
    pub async fn get_passport(&self, wallet: &WalletAddress) -> Result<Option<PassportRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM passports WHERE wallet_address = ?",
            PASSPORT_COLUMNS
        ))
        .bind(wallet.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch passport")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let history = self.score_history(wallet).await?;
        Self::row_to_passport(row, history).map(Some)
    }

    /// All active passports, ordered by wallet address.
    pub async fn list_active_passports(&self) -> Result<Vec<PassportRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM passports WHERE is_active = 1 ORDER BY wallet_address",
            PASSPORT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list active passports")?;

        let history_rows = sqlx::query(
            r#"
            SELECT h.wallet_address, h.risk_score
            FROM passport_score_history h
            JOIN passports p ON p.wallet_address = h.wallet_address
            WHERE p.is_active = 1
            ORDER BY h.wallet_address, h.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load score histories")?;

        let mut histories: HashMap<String, Vec<f64>> = HashMap::new();
        for row in history_rows {
            histories
                .entry(row.get("wallet_address"))
                .or_default()
                .push(row.get("risk_score"));
        }

        rows.into_iter()
            .map(|row| {
                let wallet: String = row.get("wallet_address");
                let history = histories.remove(&wallet).unwrap_or_default();
                Self::row_to_passport(row, history)
            })
            .collect()
    }

    /// Insert or overwrite the scoring fields of a passport.
    ///
    /// `created_at` and `is_active` are preserved on update.
    pub async fn upsert_passport(
        &self,
        wallet: &WalletAddress,
        update: &PassportUpdate,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO passports (
                wallet_address, risk_category, risk_score, default_probability,
                fraud_detected, fraud_likelihood, credit_score, credit_grade,
                is_active, created_at, last_updated
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            ON CONFLICT(wallet_address) DO UPDATE SET
                risk_category = excluded.risk_category,
                risk_score = excluded.risk_score,
                default_probability = excluded.default_probability,
                fraud_detected = excluded.fraud_detected,
                fraud_likelihood = excluded.fraud_likelihood,
                credit_score = excluded.credit_score,
                credit_grade = excluded.credit_grade,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(wallet.to_string())
        .bind(update.risk_category.as_str())
        .bind(update.risk_score)
        .bind(update.default_probability)
        .bind(update.fraud_detected)
        .bind(update.fraud_likelihood)
        .bind(i64::from(update.credit_score))
        .bind(update.credit_grade.as_str())
        .bind(now.timestamp())
        .bind(now.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to upsert passport")?;

        Ok(())
    }

    /// Append a score to the history, keeping only the newest `cap` entries.
    pub async fn append_score_history(
        &self,
        wallet: &WalletAddress,
        risk_score: f64,
        recorded_at: DateTime<Utc>,
        cap: usize,
    ) -> Result<()> {
        let wallet = wallet.to_string();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            INSERT INTO passport_score_history (wallet_address, risk_score, recorded_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&wallet)
        .bind(risk_score)
        .bind(recorded_at.timestamp())
        .execute(&mut *tx)
        .await
        .context("Failed to append score history")?;

        sqlx::query(
            r#"
            DELETE FROM passport_score_history
            WHERE wallet_address = ?
              AND id NOT IN (
                SELECT id FROM passport_score_history
                WHERE wallet_address = ?
                ORDER BY id DESC
                LIMIT ?
              )
            "#,
        )
        .bind(&wallet)
        .bind(&wallet)
        .bind(cap as i64)
        .execute(&mut *tx)
        .await
        .context("Failed to trim score history")?;

        tx.commit().await.context("Failed to commit score history")?;

        Ok(())
    }

    /// Score history for a wallet, oldest first.
    pub async fn score_history(&self, wallet: &WalletAddress) -> Result<Vec<f64>> {
        let scores: Vec<f64> = sqlx::query_scalar(
            r#"
            SELECT risk_score FROM passport_score_history
            WHERE wallet_address = ?
            ORDER BY id
            "#,
        )
        .bind(wallet.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch score history")?;

        Ok(scores)
    }

    /// Activate or deactivate a passport. Returns `false` if it does not exist.
    pub async fn set_passport_active(&self, wallet: &WalletAddress, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE passports SET is_active = ? WHERE wallet_address = ?")
            .bind(active)
            .bind(wallet.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update passport status")?;

        Ok(result.rows_affected() > 0)
    }

    /// Atomically claim a forced-refresh window for `wallet`.
    ///
    /// Succeeds when no refresh is logged or the last one is at least
    /// `cooldown` old. The check and the write are a single statement, so
    /// two concurrent callers can never both claim the same window.
    pub async fn claim_refresh(
        &self,
        wallet: &WalletAddress,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<RefreshClaim> {
        let wallet = wallet.to_string();
        let now_secs = now.timestamp();
        let cooldown_secs = cooldown.as_secs() as i64;
        let cutoff = now_secs - cooldown_secs;

        let result = sqlx::query(
            r#"
            INSERT INTO refresh_log (wallet_address, last_refresh_at)
            VALUES (?, ?)
            ON CONFLICT(wallet_address) DO UPDATE SET
                last_refresh_at = excluded.last_refresh_at
            WHERE refresh_log.last_refresh_at <= ?
            "#,
        )
        .bind(&wallet)
        .bind(now_secs)
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .context("Failed to claim refresh window")?;

        if result.rows_affected() > 0 {
            return Ok(RefreshClaim::Claimed);
        }

        let last: i64 =
            sqlx::query_scalar("SELECT last_refresh_at FROM refresh_log WHERE wallet_address = ?")
                .bind(&wallet)
                .fetch_one(&self.pool)
                .await
                .context("Failed to read refresh log")?;

        let retry_after_secs = (last + cooldown_secs - now_secs).max(1) as u64;
        Ok(RefreshClaim::Cooldown { retry_after_secs })
    }

    fn row_to_passport(row: sqlx::sqlite::SqliteRow, history: Vec<f64>) -> Result<PassportRecord> {
        let wallet: String = row.get("wallet_address");
        let category: String = row.get("risk_category");
        let grade: String = row.get("credit_grade");
        let credit_score: i64 = row.get("credit_score");

        Ok(PassportRecord {
            wallet_address: parse_wallet(&wallet)?,
            risk_category: category
                .parse::<RiskCategory>()
                .context("Invalid stored risk category")?,
            risk_score: row.get("risk_score"),
            default_probability: row.get("default_probability"),
            fraud_detected: row.get("fraud_detected"),
            fraud_likelihood: row.get("fraud_likelihood"),
            credit_score: u32::try_from(credit_score).context("Invalid stored credit score")?,
            credit_grade: CreditGrade::from_label(&grade)
                .with_context(|| format!("Invalid stored credit grade: {}", grade))?,
            score_history: history,
            is_active: row.get("is_active"),
            created_at: from_unix(row.get("created_at"))?,
            last_updated: from_unix(row.get("last_updated"))?,
        })
    }
}
