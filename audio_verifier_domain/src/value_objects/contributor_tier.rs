// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Contributor Tier
//!
//! Named buckets over cumulative contributor points. Tier is a pure
//! function of `total_points` against a fixed threshold table and is
//! recomputed whenever points are awarded; it is never stored authority.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Ordered contributor tiers.
///
/// `Contributor < Bronze < Silver < Gold < Platinum < Diamond < Legend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContributorTier {
    Contributor,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Legend,
}

impl ContributorTier {
    /// Threshold table, highest first.
    const THRESHOLDS: [(ContributorTier, u64); 7] = [
        (ContributorTier::Legend, 100_000),
        (ContributorTier::Diamond, 50_000),
        (ContributorTier::Platinum, 25_000),
        (ContributorTier::Gold, 10_000),
        (ContributorTier::Silver, 5_000),
        (ContributorTier::Bronze, 1_000),
        (ContributorTier::Contributor, 0),
    ];

    /// Determines the tier for a cumulative point total.
    pub fn from_points(total_points: u64) -> ContributorTier {
        for (tier, threshold) in Self::THRESHOLDS {
            if total_points >= threshold {
                return tier;
            }
        }
        ContributorTier::Contributor
    }

    /// Database / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributorTier::Contributor => "Contributor",
            ContributorTier::Bronze => "Bronze",
            ContributorTier::Silver => "Silver",
            ContributorTier::Gold => "Gold",
            ContributorTier::Platinum => "Platinum",
            ContributorTier::Diamond => "Diamond",
            ContributorTier::Legend => "Legend",
        }
    }

    /// Parses the database representation, defaulting to `Contributor` for
    /// unknown values so a corrupt row never poisons an award.
    pub fn parse_or_default(s: &str) -> ContributorTier {
        match s {
            "Bronze" => ContributorTier::Bronze,
            "Silver" => ContributorTier::Silver,
            "Gold" => ContributorTier::Gold,
            "Platinum" => ContributorTier::Platinum,
            "Diamond" => ContributorTier::Diamond,
            "Legend" => ContributorTier::Legend,
            _ => ContributorTier::Contributor,
        }
    }
}

impl Display for ContributorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
