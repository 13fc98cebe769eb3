// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Contributor Entity
//!
//! Cumulative per-wallet record of points, submissions and tier. Identity is
//! the opaque wallet address. Tier is derived from total points on every
//! award, never stored authority on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::datetime_serde;
use crate::value_objects::ContributorTier;

/// Cumulative contributor record, keyed by wallet address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    // Identity fields (always first)
    pub wallet_address: String,
    pub username: String,

    // Core business fields
    pub total_points: u64,
    pub total_submissions: u64,
    /// Running mean of awarded rarity scores, in [0, 100].
    pub average_rarity_score: f64,
    pub tier: ContributorTier,
    pub first_bulk_contributions: u32,
    pub rare_subject_contributions: u32,

    // Metadata fields (always last)
    #[serde(with = "datetime_serde")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "datetime_serde")]
    pub updated_at: DateTime<Utc>,
}

impl Contributor {
    /// Creates a fresh contributor with zeroed totals.
    pub fn new(wallet_address: String) -> Self {
        let username = default_username(&wallet_address);
        let now = Utc::now();
        Self {
            wallet_address,
            username,
            total_points: 0,
            total_submissions: 0,
            average_rarity_score: 0.0,
            tier: ContributorTier::Contributor,
            first_bulk_contributions: 0,
            rare_subject_contributions: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies one award to the cumulative totals: point increment,
    /// submission count, running-mean rarity, optional bulk/rare-subject
    /// counters, and tier recomputation.
    pub fn apply_award(
        &mut self,
        points: u64,
        rarity_score: u8,
        is_first_bulk: bool,
        is_rare_subject: bool,
    ) {
        let old_submissions = self.total_submissions;
        self.total_points += points;
        self.total_submissions += 1;
        self.average_rarity_score = (self.average_rarity_score * old_submissions as f64
            + f64::from(rarity_score))
            / self.total_submissions as f64;
        if is_first_bulk {
            self.first_bulk_contributions += 1;
        }
        if is_rare_subject {
            self.rare_subject_contributions += 1;
        }
        self.tier = ContributorTier::from_points(self.total_points);
        self.updated_at = Utc::now();
    }
}

fn default_username(wallet_address: &str) -> String {
    let prefix: String = wallet_address.chars().take(8).collect();
    format!("User_{}", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_contributor_defaults() {
        let c = Contributor::new("0x00000001".to_string());
        assert_eq!(c.username, "User_0x000000");
        assert_eq!(c.total_points, 0);
        assert_eq!(c.tier, ContributorTier::Contributor);
    }

    #[test]
    fn test_apply_award_updates_running_mean() {
        let mut c = Contributor::new("0x01".to_string());
        c.apply_award(100, 80, false, false);
        assert_eq!(c.total_points, 100);
        assert_eq!(c.total_submissions, 1);
        assert_eq!(c.average_rarity_score, 80.0);

        c.apply_award(50, 40, false, false);
        assert_eq!(c.total_points, 150);
        assert_eq!(c.total_submissions, 2);
        assert_eq!(c.average_rarity_score, 60.0);
    }

    #[test]
    fn test_apply_award_recomputes_tier() {
        let mut c = Contributor::new("0x01".to_string());
        c.apply_award(999, 50, false, false);
        assert_eq!(c.tier, ContributorTier::Contributor);
        c.apply_award(1, 50, false, false);
        assert_eq!(c.tier, ContributorTier::Bronze);
    }

    #[test]
    fn test_apply_award_counters() {
        let mut c = Contributor::new("0x01".to_string());
        c.apply_award(10, 50, true, true);
        assert_eq!(c.first_bulk_contributions, 1);
        assert_eq!(c.rare_subject_contributions, 1);
        c.apply_award(10, 50, false, false);
        assert_eq!(c.first_bulk_contributions, 1);
        assert_eq!(c.rare_subject_contributions, 1);
    }
}
