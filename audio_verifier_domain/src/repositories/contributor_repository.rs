// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Contributor Repository Port
//!
//! Persistence for contributor totals and the per-session award records.
//!
//! ## Idempotence
//!
//! `apply_award` runs in a single transaction keyed on the submission
//! record's session id: the record insert is skipped when a row for that
//! session already exists, and in that case the contributor totals are left
//! untouched. Applying the same award twice therefore equals applying it
//! once.

use async_trait::async_trait;

use crate::entities::{Contributor, SubmissionRecord};
use crate::error::VerifierError;

/// Result of an award application.
#[derive(Debug, Clone, PartialEq)]
pub enum AwardOutcome {
    /// The award was applied; carries the updated contributor.
    Applied(Contributor),
    /// A record for this session id already existed; nothing changed.
    AlreadyRecorded,
}

/// Port for contributor and award persistence.
#[async_trait]
pub trait ContributorRepository: Send + Sync {
    /// Fetches a contributor by wallet address.
    async fn get(&self, wallet_address: &str) -> Result<Option<Contributor>, VerifierError>;

    /// Fetches or creates the contributor row for a wallet.
    async fn get_or_create(&self, wallet_address: &str) -> Result<Contributor, VerifierError>;

    /// Global count of recorded submissions, read at award time for the
    /// early-contributor multiplier.
    async fn total_submissions(&self) -> Result<u64, VerifierError>;

    /// Applies one award transactionally: inserts the submission record
    /// (idempotent on session id) and updates the contributor totals.
    async fn apply_award(
        &self,
        record: &SubmissionRecord,
        is_rare_subject: bool,
    ) -> Result<AwardOutcome, VerifierError>;
}
