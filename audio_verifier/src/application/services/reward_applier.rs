// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Reward Applier
//!
//! Turns a completed verification's verdict into contributor points.
//!
//! ## Flow
//!
//! 1. Skip silently when the submission carries no wallet (info log).
//! 2. Read the global submission count for the early-contributor factor.
//! 3. Compute the six-factor breakdown with the domain calculator.
//! 4. Hand the submission record to the contributor repository, which
//!    applies it transactionally and idempotently on the session id.
//!
//! Applying the same session twice leaves totals unchanged; the repository
//! reports `AlreadyRecorded` and the applier logs it at info.

use std::sync::Arc;

use audio_verifier_domain::entities::SubmissionRecord;
use audio_verifier_domain::repositories::{AwardOutcome, ContributorRepository};
use audio_verifier_domain::services::points_calculator::{
    PointsCalculator, PointsInput, SpecificityGrade, SubjectRarityTier, VerificationStatus,
};
use audio_verifier_domain::{SessionId, VerifierError};

/// Inputs for one reward application.
#[derive(Debug, Clone)]
pub struct RewardInput {
    pub session_id: SessionId,
    pub wallet_address: Option<String>,
    /// Rarity score in [0, 100] from the analysis stage.
    pub rarity_score: u8,
    /// Technical quality score in [0, 1].
    pub quality_score: f64,
    pub sample_count: u32,
    pub is_first_bulk: bool,
    pub subject_rarity_tier: Option<SubjectRarityTier>,
    pub specificity_grade: Option<SpecificityGrade>,
    pub verification_status: Option<VerificationStatus>,
}

/// Applies verdict-derived awards to contributor totals.
pub struct RewardApplier {
    contributors: Arc<dyn ContributorRepository>,
    calculator: PointsCalculator,
}

impl RewardApplier {
    pub fn new(contributors: Arc<dyn ContributorRepository>) -> Self {
        Self {
            contributors,
            calculator: PointsCalculator::new(),
        }
    }

    /// Applies one award. Returns `None` when the submission had no wallet.
    pub async fn apply(&self, input: RewardInput) -> Result<Option<AwardOutcome>, VerifierError> {
        let Some(wallet) = input.wallet_address.clone().filter(|w| !w.is_empty()) else {
            tracing::info!(
                session_id = %input.session_id.short(),
                "Submission has no wallet, skipping reward"
            );
            return Ok(None);
        };

        let total_submissions = self.contributors.total_submissions().await?;
        let breakdown = self.calculator.calculate(
            &PointsInput {
                rarity_score: input.rarity_score,
                quality_score: input.quality_score,
                sample_count: input.sample_count,
                is_first_bulk: input.is_first_bulk,
                subject_rarity_tier: input.subject_rarity_tier,
                specificity_grade: input.specificity_grade,
                verification_status: input.verification_status,
            },
            total_submissions,
        );

        tracing::info!(
            session_id = %input.session_id.short(),
            rarity = input.rarity_score,
            quality_mult = breakdown.quality_multiplier,
            bulk_mult = breakdown.bulk_multiplier,
            subject_mult = breakdown.subject_rarity_multiplier,
            specificity_mult = breakdown.specificity_multiplier,
            verification_mult = breakdown.verification_multiplier,
            early_mult = breakdown.early_contributor_multiplier,
            points = breakdown.points,
            "Calculated award"
        );

        let is_rare_subject = matches!(
            input.subject_rarity_tier,
            Some(SubjectRarityTier::Critical) | Some(SubjectRarityTier::High)
        );
        let record = SubmissionRecord::new(
            input.session_id,
            wallet,
            input.rarity_score,
            input.sample_count,
            input.is_first_bulk,
            breakdown,
        );

        let outcome = self.contributors.apply_award(&record, is_rare_subject).await?;
        if outcome == AwardOutcome::AlreadyRecorded {
            tracing::info!(
                session_id = %input.session_id.short(),
                "Reward already applied for session"
            );
        }
        Ok(Some(outcome))
    }
}
