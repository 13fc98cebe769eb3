// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Points Calculator
//!
//! Rarity-based reward calculation for accepted submissions.
//!
//! ## Formula
//!
//! ```text
//! points = ⌊rarity_score × quality_mult × bulk_mult × subject_mult
//!                        × specificity_mult × verification_mult × early_mult⌋
//! ```
//!
//! All six factors come from closed tables:
//!
//! | Factor | Table |
//! |---|---|
//! | quality | ≥0.9 → 1.5, ≥0.75 → 1.3, ≥0.6 → 1.15, ≥0.4 → 1.05, else 1.0 |
//! | bulk | first bulk ∧ ≥100 samples → 2.0; ≥50 samples → 1.2; else 1.0 |
//! | subject rarity | Critical 5.0, High 3.0, Medium 2.0, Standard 1.0, Oversaturated 0.5 |
//! | specificity | A 1.3, B 1.2, C 1.1, D 1.05, E/F 1.0 |
//! | verification | verified 1.2, partially_verified 1.1, else 1.0 |
//! | early contributor | global total <100 → 1.5, <500 → 1.3, <1000 → 1.2, else 1.0 |
//!
//! The full breakdown (every factor plus the intermediate products) is
//! returned so the submission record can persist how the award was derived.

use serde::{Deserialize, Serialize};

/// Subject rarity tier assigned by the analysis stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SubjectRarityTier {
    Critical,
    High,
    Medium,
    #[default]
    Standard,
    Oversaturated,
}

/// Specificity grade of the submission's categorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SpecificityGrade {
    A,
    B,
    C,
    #[default]
    D,
    E,
    F,
}

/// External verification status of the contributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    PartiallyVerified,
    #[default]
    Unverified,
}

/// Inputs for one award calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct PointsInput {
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

/// Full multiplier breakdown persisted with each award.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsBreakdown {
    pub points: u64,
    pub rarity_score: u8,
    pub quality_multiplier: f64,
    pub bulk_multiplier: f64,
    pub subject_rarity_multiplier: f64,
    pub specificity_multiplier: f64,
    pub verification_multiplier: f64,
    pub early_contributor_multiplier: f64,
    pub total_multiplier: f64,
    /// Intermediate products, factor by factor, ending at the final total.
    pub quality_adjusted: u64,
    pub bulk_adjusted: u64,
    pub subject_adjusted: u64,
    pub specificity_adjusted: u64,
    pub verification_adjusted: u64,
}

/// Stateless reward calculator over the closed multiplier tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointsCalculator;

impl PointsCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Quality multiplier from the technical quality score.
    pub fn quality_multiplier(&self, quality_score: f64) -> f64 {
        if quality_score >= 0.9 {
            1.5
        } else if quality_score >= 0.75 {
            1.3
        } else if quality_score >= 0.6 {
            1.15
        } else if quality_score >= 0.4 {
            1.05
        } else {
            1.0
        }
    }

    /// Bulk submission multiplier.
    pub fn bulk_multiplier(&self, sample_count: u32, is_first_bulk: bool) -> f64 {
        if is_first_bulk && sample_count >= 100 {
            2.0
        } else if sample_count >= 50 {
            1.2
        } else {
            1.0
        }
    }

    /// Subject rarity multiplier; missing tier defaults to Standard.
    pub fn subject_rarity_multiplier(&self, tier: Option<SubjectRarityTier>) -> f64 {
        match tier.unwrap_or_default() {
            SubjectRarityTier::Critical => 5.0,
            SubjectRarityTier::High => 3.0,
            SubjectRarityTier::Medium => 2.0,
            SubjectRarityTier::Standard => 1.0,
            SubjectRarityTier::Oversaturated => 0.5,
        }
    }

    /// Specificity multiplier; missing grade defaults to D.
    pub fn specificity_multiplier(&self, grade: Option<SpecificityGrade>) -> f64 {
        match grade.unwrap_or_default() {
            SpecificityGrade::A => 1.3,
            SpecificityGrade::B => 1.2,
            SpecificityGrade::C => 1.1,
            SpecificityGrade::D => 1.05,
            SpecificityGrade::E | SpecificityGrade::F => 1.0,
        }
    }

    /// Verification multiplier; missing status defaults to unverified.
    pub fn verification_multiplier(&self, status: Option<VerificationStatus>) -> f64 {
        match status.unwrap_or_default() {
            VerificationStatus::Verified => 1.2,
            VerificationStatus::PartiallyVerified => 1.1,
            VerificationStatus::Unverified => 1.0,
        }
    }

    /// Early contributor multiplier from the global submission count at
    /// award time.
    pub fn early_contributor_multiplier(&self, total_submissions: u64) -> f64 {
        if total_submissions < 100 {
            1.5
        } else if total_submissions < 500 {
            1.3
        } else if total_submissions < 1000 {
            1.2
        } else {
            1.0
        }
    }

    /// Calculates the award and its full breakdown.
    pub fn calculate(&self, input: &PointsInput, total_submissions: u64) -> PointsBreakdown {
        let quality_mult = self.quality_multiplier(input.quality_score);
        let bulk_mult = self.bulk_multiplier(input.sample_count, input.is_first_bulk);
        let subject_mult = self.subject_rarity_multiplier(input.subject_rarity_tier);
        let specificity_mult = self.specificity_multiplier(input.specificity_grade);
        let verification_mult = self.verification_multiplier(input.verification_status);
        let early_mult = self.early_contributor_multiplier(total_submissions);

        let total_multiplier = quality_mult
            * bulk_mult
            * subject_mult
            * specificity_mult
            * verification_mult
            * early_mult;

        let base = f64::from(input.rarity_score);
        let points = (base * total_multiplier).floor() as u64;

        PointsBreakdown {
            points,
            rarity_score: input.rarity_score,
            quality_multiplier: quality_mult,
            bulk_multiplier: bulk_mult,
            subject_rarity_multiplier: subject_mult,
            specificity_multiplier: specificity_mult,
            verification_multiplier: verification_mult,
            early_contributor_multiplier: early_mult,
            total_multiplier,
            quality_adjusted: (base * quality_mult) as u64,
            bulk_adjusted: (base * quality_mult * bulk_mult) as u64,
            subject_adjusted: (base * quality_mult * bulk_mult * subject_mult) as u64,
            specificity_adjusted: (base * quality_mult * bulk_mult * subject_mult
                * specificity_mult) as u64,
            verification_adjusted: (base * quality_mult * bulk_mult * subject_mult
                * specificity_mult
                * verification_mult) as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn base_input() -> PointsInput {
        PointsInput {
            rarity_score: 50,
            quality_score: 0.5,
            sample_count: 1,
            is_first_bulk: false,
            subject_rarity_tier: None,
            specificity_grade: None,
            verification_status: None,
        }
    }

    #[test]
    fn test_quality_multiplier_boundaries() {
        let calc = PointsCalculator::new();
        assert_eq!(calc.quality_multiplier(0.9000), 1.5);
        assert_eq!(calc.quality_multiplier(0.8999), 1.3);
        assert_eq!(calc.quality_multiplier(0.75), 1.3);
        assert_eq!(calc.quality_multiplier(0.6), 1.15);
        assert_eq!(calc.quality_multiplier(0.4), 1.05);
        assert_eq!(calc.quality_multiplier(0.39), 1.0);
    }

    #[test]
    fn test_bulk_multiplier() {
        let calc = PointsCalculator::new();
        assert_eq!(calc.bulk_multiplier(100, true), 2.0);
        // First-bulk flag alone is not enough below 100 samples
        assert_eq!(calc.bulk_multiplier(99, true), 1.2);
        assert_eq!(calc.bulk_multiplier(50, false), 1.2);
        assert_eq!(calc.bulk_multiplier(49, false), 1.0);
    }

    #[test]
    fn test_early_contributor_multiplier() {
        let calc = PointsCalculator::new();
        assert_eq!(calc.early_contributor_multiplier(0), 1.5);
        assert_eq!(calc.early_contributor_multiplier(99), 1.5);
        assert_eq!(calc.early_contributor_multiplier(100), 1.3);
        assert_eq!(calc.early_contributor_multiplier(499), 1.3);
        assert_eq!(calc.early_contributor_multiplier(500), 1.2);
        assert_eq!(calc.early_contributor_multiplier(999), 1.2);
        assert_eq!(calc.early_contributor_multiplier(1000), 1.0);
    }

    #[test]
    fn test_defaults_for_missing_inputs() {
        let calc = PointsCalculator::new();
        assert_eq!(calc.subject_rarity_multiplier(None), 1.0);
        assert_eq!(calc.specificity_multiplier(None), 1.05);
        assert_eq!(calc.verification_multiplier(None), 1.0);
    }

    #[test]
    fn test_calculate_floors_product() {
        let calc = PointsCalculator::new();
        let mut input = base_input();
        input.rarity_score = 10;
        input.quality_score = 0.95; // 1.5x
        // 10 × 1.5 × 1.05 (default specificity) × 1.5 (early) = 23.625 → 23
        let breakdown = calc.calculate(&input, 0);
        assert_eq!(breakdown.points, 23);
        assert_eq!(breakdown.quality_multiplier, 1.5);
        assert_eq!(breakdown.early_contributor_multiplier, 1.5);
    }

    #[test]
    fn test_breakdown_products_are_cumulative() {
        let calc = PointsCalculator::new();
        let input = PointsInput {
            rarity_score: 80,
            quality_score: 0.8,
            sample_count: 120,
            is_first_bulk: true,
            subject_rarity_tier: Some(SubjectRarityTier::High),
            specificity_grade: Some(SpecificityGrade::A),
            verification_status: Some(VerificationStatus::Verified),
        };
        let b = calc.calculate(&input, 2_000);
        assert_eq!(b.quality_adjusted, 104); // 80 × 1.3
        assert_eq!(b.bulk_adjusted, 208); // × 2.0
        assert_eq!(b.subject_adjusted, 624); // × 3.0
        assert!(b.points >= b.verification_adjusted.min(b.points));
    }

    proptest! {
        #[test]
        fn prop_points_bounded_by_max_product(
            rarity in 0u8..=100,
            quality in 0.0f64..=1.0,
            samples in 0u32..1_000,
            first_bulk: bool,
            total in 0u64..10_000,
        ) {
            let calc = PointsCalculator::new();
            let input = PointsInput {
                rarity_score: rarity,
                quality_score: quality,
                sample_count: samples,
                is_first_bulk: first_bulk,
                subject_rarity_tier: Some(SubjectRarityTier::Critical),
                specificity_grade: Some(SpecificityGrade::A),
                verification_status: Some(VerificationStatus::Verified),
            };
            let breakdown = calc.calculate(&input, total);
            // Max product: 1.5 × 2.0 × 5.0 × 1.3 × 1.2 × 1.5 = 35.1
            prop_assert!(breakdown.points <= (f64::from(rarity) * 35.1).floor() as u64);
        }
    }
}
