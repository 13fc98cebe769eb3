// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Submission Record
//!
//! Immutable per-accepted-submission row linking a completed session to its
//! contributor, with the awarded point total and the multiplier breakdown
//! used. Created exactly once per successful completion; the session id is
//! the idempotence key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::points_calculator::PointsBreakdown;
use crate::services::datetime_serde;
use crate::value_objects::SessionId;

/// Immutable award row for one accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    // Identity fields (always first)
    pub session_id: SessionId,
    pub wallet_address: String,

    // Award fields
    pub points: u64,
    pub rarity_score: u8,
    pub sample_count: u32,
    pub is_first_bulk: bool,
    pub breakdown: PointsBreakdown,

    // Metadata fields (always last)
    #[serde(with = "datetime_serde")]
    pub created_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn new(
        session_id: SessionId,
        wallet_address: String,
        rarity_score: u8,
        sample_count: u32,
        is_first_bulk: bool,
        breakdown: PointsBreakdown,
    ) -> Self {
        Self {
            session_id,
            wallet_address,
            points: breakdown.points,
            rarity_score,
            sample_count,
            is_first_bulk,
            breakdown,
            created_at: Utc::now(),
        }
    }
}
