// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory Stores
//!
//! In-memory implementations of the session and contributor repositories,
//! mirroring the PostgreSQL stores' semantics (terminal rows frozen,
//! warning set-union, award idempotence on session id). They back the
//! offline test suites and local development without a database.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use async_trait::async_trait;
use audio_verifier_domain::entities::{
    Contributor, SubmissionInfo, SubmissionRecord, VerificationSession,
};
use audio_verifier_domain::repositories::{
    AwardOutcome, ContributorRepository, SessionPatch, SessionRepository,
};
use audio_verifier_domain::value_objects::SessionStatus;
use audio_verifier_domain::{SessionId, VerifierError};

/// In-memory session repository.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, VerificationSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions (tests assert that rejects create none).
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionStore {
    async fn create(
        &self,
        verification_id: &str,
        initial_data: SubmissionInfo,
    ) -> Result<SessionId, VerifierError> {
        let session = VerificationSession::new(verification_id.to_string(), initial_data);
        let id = session.id;
        self.sessions.write().insert(id, session);
        Ok(id)
    }

    async fn update(&self, id: SessionId, patch: SessionPatch) -> Result<bool, VerifierError> {
        if patch.is_empty() {
            return Ok(false);
        }
        let mut sessions = self.sessions.write();
        let Some(session) = sessions.get_mut(&id) else {
            return Ok(false);
        };
        // Terminal rows are frozen, matching the SQL `status = 'processing'` guard.
        if session.status != SessionStatus::Processing {
            return Ok(false);
        }

        if let Some(stage) = patch.stage {
            session.stage = stage;
        }
        if let Some(progress) = patch.progress {
            session.progress = progress;
        }
        if let Some(status) = patch.status {
            session.status = status;
        }
        if let Some(results) = patch.results {
            session.results = Some(results);
        }
        if let Some(error) = patch.error {
            session.error = Some(error);
        }
        session.updated_at = Utc::now();
        Ok(true)
    }

    async fn add_warnings(&self, id: SessionId, warnings: &[String]) -> Result<bool, VerifierError> {
        let mut sessions = self.sessions.write();
        let Some(session) = sessions.get_mut(&id) else {
            return Ok(false);
        };
        if session.merge_warnings(warnings) > 0 {
            session.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn get(&self, id: SessionId) -> Result<Option<VerificationSession>, VerifierError> {
        Ok(self.sessions.read().get(&id).cloned())
    }
}

/// In-memory contributor repository.
#[derive(Default)]
pub struct MemoryContributorStore {
    contributors: RwLock<HashMap<String, Contributor>>,
    records: RwLock<HashMap<SessionId, SubmissionRecord>>,
}

impl MemoryContributorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the global submission count (early-multiplier scenarios).
    pub fn seed_records(&self, records: Vec<SubmissionRecord>) {
        let mut map = self.records.write();
        for record in records {
            map.insert(record.session_id, record);
        }
    }
}

#[async_trait]
impl ContributorRepository for MemoryContributorStore {
    async fn get(&self, wallet_address: &str) -> Result<Option<Contributor>, VerifierError> {
        Ok(self.contributors.read().get(wallet_address).cloned())
    }

    async fn get_or_create(&self, wallet_address: &str) -> Result<Contributor, VerifierError> {
        let mut contributors = self.contributors.write();
        Ok(contributors
            .entry(wallet_address.to_string())
            .or_insert_with(|| Contributor::new(wallet_address.to_string()))
            .clone())
    }

    async fn total_submissions(&self) -> Result<u64, VerifierError> {
        Ok(self.records.read().len() as u64)
    }

    async fn apply_award(
        &self,
        record: &SubmissionRecord,
        is_rare_subject: bool,
    ) -> Result<AwardOutcome, VerifierError> {
        {
            let mut records = self.records.write();
            if records.contains_key(&record.session_id) {
                return Ok(AwardOutcome::AlreadyRecorded);
            }
            records.insert(record.session_id, record.clone());
        }

        let mut contributors = self.contributors.write();
        let contributor = contributors
            .entry(record.wallet_address.clone())
            .or_insert_with(|| Contributor::new(record.wallet_address.clone()));
        contributor.apply_award(
            record.points,
            record.rarity_score,
            record.is_first_bulk,
            is_rare_subject,
        );
        Ok(AwardOutcome::Applied(contributor.clone()))
    }
}
