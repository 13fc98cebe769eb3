// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # PostgreSQL Session Store
//!
//! Durable implementation of the [`SessionRepository`] port.
//!
//! ## Overview
//!
//! One row per verification session, JSONB columns for the structured
//! payloads (`initial_data`, `results`, `warnings`), indexes on
//! `verification_id`, `status` and `created_at`. Schema bootstrap runs at
//! pool construction so a fresh database is usable without a migration
//! step.
//!
//! ## Concurrency Contract
//!
//! - Every mutation is a single `UPDATE ... WHERE id = $1 AND status =
//!   'processing'` statement, so partial updates are atomic and terminal
//!   rows are frozen: a second `mark_completed` (or any later write)
//!   matches zero rows and reports `false`.
//! - `updated_at` is refreshed by every update.
//! - The store keeps no in-memory session state; the database row is the
//!   only authority.

use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{QueryBuilder, Row};

use async_trait::async_trait;
use audio_verifier_domain::entities::{SubmissionInfo, VerificationSession};
use audio_verifier_domain::repositories::{SessionPatch, SessionRepository};
use audio_verifier_domain::value_objects::{SessionStatus, VerificationStage};
use audio_verifier_domain::{SessionId, VerifierError};

/// Connection pool size; sufficient for one ingress reactor plus the
/// worker pool.
const POOL_SIZE: u32 = 10;

/// PostgreSQL-backed session repository.
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates the store over an existing pool and ensures the schema.
    pub async fn new(pool: PgPool) -> Result<Self, VerifierError> {
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Connects a dedicated pool and ensures the schema.
    pub async fn connect(database_url: &str) -> Result<Self, VerifierError> {
        let pool = PgPoolOptions::new()
            .max_connections(POOL_SIZE)
            .connect(database_url)
            .await
            .map_err(|e| VerifierError::storage_error(format!("Failed to connect: {}", e)))?;
        Self::new(pool).await
    }

    /// Returns the underlying pool for components sharing the datastore.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<(), VerifierError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS verification_sessions (
                id UUID PRIMARY KEY,
                verification_id VARCHAR(255) NOT NULL,
                status VARCHAR(50) NOT NULL DEFAULT 'processing',
                stage VARCHAR(50) NOT NULL DEFAULT 'queued',
                progress DOUBLE PRECISION NOT NULL DEFAULT 0.0,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                initial_data JSONB,
                results JSONB,
                error TEXT,
                warnings JSONB NOT NULL DEFAULT '[]'::jsonb
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_sessions_verification_id ON verification_sessions(verification_id)",
            "CREATE INDEX IF NOT EXISTS idx_sessions_status ON verification_sessions(status)",
            "CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON verification_sessions(created_at)",
        ] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
        }

        tracing::info!("Verified verification_sessions table schema");
        Ok(())
    }

    fn row_to_session(row: &sqlx::postgres::PgRow) -> Result<VerificationSession, VerifierError> {
        let status: String = row.try_get("status").map_err(storage_err)?;
        let stage: String = row.try_get("stage").map_err(storage_err)?;
        let initial_data: Option<serde_json::Value> =
            row.try_get("initial_data").map_err(storage_err)?;
        let results: Option<serde_json::Value> = row.try_get("results").map_err(storage_err)?;
        let warnings: serde_json::Value = row.try_get("warnings").map_err(storage_err)?;

        Ok(VerificationSession {
            id: SessionId::from(row.try_get::<uuid::Uuid, _>("id").map_err(storage_err)?),
            verification_id: row.try_get("verification_id").map_err(storage_err)?,
            status: SessionStatus::parse(&status)?,
            stage: VerificationStage::parse(&stage)?,
            progress: row.try_get("progress").map_err(storage_err)?,
            initial_data: initial_data
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default(),
            results: results.map(serde_json::from_value).transpose()?,
            error: row.try_get("error").map_err(storage_err)?,
            warnings: serde_json::from_value(warnings).unwrap_or_default(),
            created_at: row.try_get("created_at").map_err(storage_err)?,
            updated_at: row.try_get("updated_at").map_err(storage_err)?,
        })
    }
}

#[async_trait]
impl SessionRepository for PgSessionStore {
    async fn create(
        &self,
        verification_id: &str,
        initial_data: SubmissionInfo,
    ) -> Result<SessionId, VerifierError> {
        let id = SessionId::new();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO verification_sessions
                (id, verification_id, status, stage, progress, created_at, updated_at, initial_data)
            VALUES ($1, $2, 'processing', 'queued', 0.0, $3, $3, $4)
            "#,
        )
        .bind(id.as_uuid())
        .bind(verification_id)
        .bind(now)
        .bind(serde_json::to_value(&initial_data)?)
        .execute(&self.pool)
        .await
        .map_err(|e| VerifierError::storage_error(format!("Failed to create session: {}", e)))?;

        tracing::info!(session_id = %id.short(), "Created session");
        Ok(id)
    }

    async fn update(&self, id: SessionId, patch: SessionPatch) -> Result<bool, VerifierError> {
        if patch.is_empty() {
            tracing::warn!(session_id = %id.short(), "No fields to update");
            return Ok(false);
        }

        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("UPDATE verification_sessions SET updated_at = ");
        builder.push_bind(Utc::now());
        if let Some(stage) = patch.stage {
            builder.push(", stage = ").push_bind(stage.as_str());
        }
        if let Some(progress) = patch.progress {
            builder.push(", progress = ").push_bind(progress);
        }
        if let Some(status) = patch.status {
            builder.push(", status = ").push_bind(status.as_str());
        }
        if let Some(results) = &patch.results {
            builder
                .push(", results = ")
                .push_bind(serde_json::to_value(results)?);
        }
        if let Some(error) = patch.error {
            builder.push(", error = ").push_bind(error);
        }
        builder.push(" WHERE id = ").push_bind(id.as_uuid());
        builder.push(" AND status = 'processing'");

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| VerifierError::storage_error(format!("Failed to update session: {}", e)))?;

        let matched = result.rows_affected() == 1;
        if !matched {
            tracing::warn!(session_id = %id.short(), "Session not found or frozen for update");
        }
        Ok(matched)
    }

    async fn add_warnings(&self, id: SessionId, warnings: &[String]) -> Result<bool, VerifierError> {
        if warnings.is_empty() {
            return Ok(true);
        }
        // Dedup within the batch; the SQL filters against the stored set.
        let mut batch: Vec<&String> = Vec::new();
        for warning in warnings {
            if !batch.contains(&warning) {
                batch.push(warning);
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE verification_sessions
            SET warnings = warnings || (
                    SELECT COALESCE(jsonb_agg(value), '[]'::jsonb)
                    FROM jsonb_array_elements($2::jsonb) AS incoming(value)
                    WHERE NOT warnings @> jsonb_build_array(value)
                ),
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(serde_json::to_value(&batch)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| VerifierError::storage_error(format!("Failed to add warnings: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, id: SessionId) -> Result<Option<VerificationSession>, VerifierError> {
        let row = sqlx::query(
            r#"
            SELECT id, verification_id, status, stage, progress,
                   created_at, updated_at, initial_data, results, error, warnings
            FROM verification_sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| VerifierError::storage_error(format!("Failed to query session: {}", e)))?;

        row.as_ref().map(Self::row_to_session).transpose()
    }

    async fn ping(&self) -> Result<(), VerifierError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| VerifierError::storage_error(format!("Database ping failed: {}", e)))
    }
}

fn storage_err(e: impl std::fmt::Display) -> VerifierError {
    VerifierError::storage_error(e.to_string())
}
