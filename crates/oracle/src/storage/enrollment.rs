//! Enrollment and proof storage operations.

use super::types::{from_unix, parse_wallet};
use super::{EnrollmentRecord, EnrollmentStatus, ProofRecord, Storage};
use anyhow::{Context, Result};
use sqlx::Row;

impl Storage {
    /// Store a new enrollment.
    pub async fn insert_enrollment(&self, enrollment: &EnrollmentRecord) -> Result<()> {
        let attestations = serde_json::to_string(&enrollment.attestations)
            .context("Failed to encode attestations")?;
        let raw_reports = serde_json::to_string(&enrollment.raw_reports)
            .context("Failed to encode raw reports")?;

        sqlx::query(
            r#"
            INSERT INTO enrollments (
                id, user_id, wallet_address, attestations, raw_reports, status, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&enrollment.id)
        .bind(&enrollment.user_id)
        .bind(enrollment.wallet_address.to_string())
        .bind(attestations)
        .bind(raw_reports)
        .bind(enrollment.status.as_str())
        .bind(enrollment.created_at.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to insert enrollment")?;

        Ok(())
    }

    /// Get an enrollment by id.
    pub async fn get_enrollment(&self, id: &str) -> Result<Option<EnrollmentRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, wallet_address, attestations, raw_reports, status, created_at
            FROM enrollments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch enrollment")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let wallet: String = row.get("wallet_address");
        let attestations: String = row.get("attestations");
        let raw_reports: String = row.get("raw_reports");
        let status: String = row.get("status");

        Ok(Some(EnrollmentRecord {
            id: row.get("id"),
            user_id: row.get("user_id"),
            wallet_address: parse_wallet(&wallet)?,
            attestations: serde_json::from_str(&attestations)
                .context("Invalid stored attestations")?,
            raw_reports: serde_json::from_str(&raw_reports)
                .context("Invalid stored raw reports")?,
            status: EnrollmentStatus::parse(&status)?,
            created_at: from_unix(row.get("created_at"))?,
        }))
    }

    /// Store a generated proof and advance its enrollment in one transaction.
    pub async fn insert_proof(&self, record: &ProofRecord) -> Result<()> {
        let proof_json = serde_json::to_string(&record.proof).context("Failed to encode proof")?;
        let credential_json =
            serde_json::to_string(&record.credential).context("Failed to encode credential")?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        // Proofs are deterministic; regenerating one replaces the stored copy.
        sqlx::query(
            r#"
            INSERT INTO proofs (
                id, enrollment_id, wallet_address, proof_hash, nullifier,
                proof_json, credential_json, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(proof_hash) DO UPDATE SET
                proof_json = excluded.proof_json,
                credential_json = excluded.credential_json
            "#,
        )
        .bind(&record.id)
        .bind(&record.enrollment_id)
        .bind(record.wallet_address.to_string())
        .bind(&record.proof.proof_hash)
        .bind(&record.proof.nullifier)
        .bind(proof_json)
        .bind(credential_json)
        .bind(record.created_at.timestamp())
        .execute(&mut *tx)
        .await
        .context("Failed to insert proof")?;

        sqlx::query("UPDATE enrollments SET status = ? WHERE id = ?")
            .bind(EnrollmentStatus::ProofGenerated.as_str())
            .bind(&record.enrollment_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update enrollment status")?;

        tx.commit().await.context("Failed to commit proof")?;

        Ok(())
    }

    /// Get a stored proof by its hash.
    pub async fn get_proof_by_hash(&self, proof_hash: &str) -> Result<Option<ProofRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, enrollment_id, wallet_address, proof_json, credential_json, created_at
            FROM proofs
            WHERE proof_hash = ?
            "#,
        )
        .bind(proof_hash)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch proof")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let wallet: String = row.get("wallet_address");
        let proof_json: String = row.get("proof_json");
        let credential_json: String = row.get("credential_json");

        Ok(Some(ProofRecord {
            id: row.get("id"),
            enrollment_id: row.get("enrollment_id"),
            wallet_address: parse_wallet(&wallet)?,
            proof: serde_json::from_str(&proof_json).context("Invalid stored proof")?,
            credential: serde_json::from_str(&credential_json)
                .context("Invalid stored credential")?,
            created_at: from_unix(row.get("created_at"))?,
        }))
    }
}
