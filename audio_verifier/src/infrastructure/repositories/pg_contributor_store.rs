// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # PostgreSQL Contributor Store
//!
//! Durable implementation of the [`ContributorRepository`] port: contributor
//! totals plus the immutable per-session award records.
//!
//! ## Award Transaction
//!
//! `apply_award` runs one transaction:
//!
//! 1. `INSERT ... ON CONFLICT (session_id) DO NOTHING` of the submission
//!    record — zero rows affected means the award was already applied, and
//!    the transaction ends without touching the contributor.
//! 2. `SELECT ... FOR UPDATE` of the contributor row (created on the spot
//!    for a first-time wallet).
//! 3. Totals, running mean and tier are recomputed through the domain
//!    entity and written back.
//!
//! The session id is therefore the idempotence key for the whole reward
//! path.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use async_trait::async_trait;
use audio_verifier_domain::entities::{Contributor, SubmissionRecord};
use audio_verifier_domain::repositories::{AwardOutcome, ContributorRepository};
use audio_verifier_domain::value_objects::ContributorTier;
use audio_verifier_domain::VerifierError;

/// PostgreSQL-backed contributor repository.
pub struct PgContributorStore {
    pool: PgPool,
}

impl PgContributorStore {
    /// Creates the store over an existing pool and ensures the schema.
    pub async fn new(pool: PgPool) -> Result<Self, VerifierError> {
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), VerifierError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                wallet_address TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                total_points BIGINT NOT NULL DEFAULT 0,
                total_submissions BIGINT NOT NULL DEFAULT 0,
                average_rarity_score DOUBLE PRECISION NOT NULL DEFAULT 0.0,
                tier VARCHAR(50) NOT NULL DEFAULT 'Contributor',
                first_bulk_contributions INTEGER NOT NULL DEFAULT 0,
                rare_subject_contributions INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS submission_records (
                session_id UUID PRIMARY KEY,
                wallet_address TEXT NOT NULL,
                points BIGINT NOT NULL,
                rarity_score INTEGER NOT NULL,
                sample_count INTEGER NOT NULL,
                breakdown JSONB NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_submission_records_wallet ON submission_records(wallet_address)",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        tracing::info!("Verified users and submission_records table schemas");
        Ok(())
    }

    fn row_to_contributor(row: &sqlx::postgres::PgRow) -> Result<Contributor, VerifierError> {
        let tier: String = row.try_get("tier").map_err(storage_err)?;
        Ok(Contributor {
            wallet_address: row.try_get("wallet_address").map_err(storage_err)?,
            username: row.try_get("username").map_err(storage_err)?,
            total_points: row.try_get::<i64, _>("total_points").map_err(storage_err)? as u64,
            total_submissions: row
                .try_get::<i64, _>("total_submissions")
                .map_err(storage_err)? as u64,
            average_rarity_score: row.try_get("average_rarity_score").map_err(storage_err)?,
            tier: ContributorTier::parse_or_default(&tier),
            first_bulk_contributions: row
                .try_get::<i32, _>("first_bulk_contributions")
                .map_err(storage_err)? as u32,
            rare_subject_contributions: row
                .try_get::<i32, _>("rare_subject_contributions")
                .map_err(storage_err)? as u32,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(storage_err)?,
            updated_at: row
                .try_get::<DateTime<Utc>, _>("updated_at")
                .map_err(storage_err)?,
        })
    }
}

#[async_trait]
impl ContributorRepository for PgContributorStore {
    async fn get(&self, wallet_address: &str) -> Result<Option<Contributor>, VerifierError> {
        let row = sqlx::query("SELECT * FROM users WHERE wallet_address = $1")
            .bind(wallet_address)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(Self::row_to_contributor).transpose()
    }

    async fn get_or_create(&self, wallet_address: &str) -> Result<Contributor, VerifierError> {
        if let Some(existing) = self.get(wallet_address).await? {
            return Ok(existing);
        }

        let fresh = Contributor::new(wallet_address.to_string());
        sqlx::query(
            r#"
            INSERT INTO users
                (wallet_address, username, total_points, total_submissions,
                 average_rarity_score, tier, created_at, updated_at)
            VALUES ($1, $2, 0, 0, 0.0, 'Contributor', $3, $3)
            ON CONFLICT (wallet_address) DO NOTHING
            "#,
        )
        .bind(&fresh.wallet_address)
        .bind(&fresh.username)
        .bind(fresh.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        tracing::info!(wallet = %short_wallet(wallet_address), "Created contributor");
        Ok(fresh)
    }

    async fn total_submissions(&self) -> Result<u64, VerifierError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submission_records")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(count as u64)
    }

    async fn apply_award(
        &self,
        record: &SubmissionRecord,
        is_rare_subject: bool,
    ) -> Result<AwardOutcome, VerifierError> {
        // Make sure the contributor row exists before locking it.
        self.get_or_create(&record.wallet_address).await?;

        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO submission_records
                (session_id, wallet_address, points, rarity_score, sample_count, breakdown, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(record.session_id.as_uuid())
        .bind(&record.wallet_address)
        .bind(record.points as i64)
        .bind(i32::from(record.rarity_score))
        .bind(record.sample_count as i32)
        .bind(serde_json::to_value(&record.breakdown)?)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await.map_err(storage_err)?;
            tracing::info!(
                session_id = %record.session_id.short(),
                "Award already recorded for session, skipping"
            );
            return Ok(AwardOutcome::AlreadyRecorded);
        }

        let row = sqlx::query("SELECT * FROM users WHERE wallet_address = $1 FOR UPDATE")
            .bind(&record.wallet_address)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage_err)?;
        let mut contributor = Self::row_to_contributor(&row)?;

        contributor.apply_award(
            record.points,
            record.rarity_score,
            record.is_first_bulk,
            is_rare_subject,
        );

        sqlx::query(
            r#"
            UPDATE users
            SET total_points = $1,
                total_submissions = $2,
                average_rarity_score = $3,
                tier = $4,
                first_bulk_contributions = $5,
                rare_subject_contributions = $6,
                updated_at = $7
            WHERE wallet_address = $8
            "#,
        )
        .bind(contributor.total_points as i64)
        .bind(contributor.total_submissions as i64)
        .bind(contributor.average_rarity_score)
        .bind(contributor.tier.as_str())
        .bind(contributor.first_bulk_contributions as i32)
        .bind(contributor.rare_subject_contributions as i32)
        .bind(contributor.updated_at)
        .bind(&contributor.wallet_address)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;

        tracing::info!(
            wallet = %short_wallet(&record.wallet_address),
            points = record.points,
            total = contributor.total_points,
            tier = %contributor.tier,
            "Applied award"
        );
        Ok(AwardOutcome::Applied(contributor))
    }
}

fn short_wallet(wallet: &str) -> String {
    wallet.chars().take(8).collect()
}

fn storage_err(e: impl std::fmt::Display) -> VerifierError {
    VerifierError::storage_error(e.to_string())
}
