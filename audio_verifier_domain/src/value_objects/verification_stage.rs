// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Verification Stage
//!
//! The stage vocabulary of the six-stage verification state machine, with
//! the progress endpoints each stage is required to publish.
//!
//! ## State Machine
//!
//! ```text
//! queued(0.00)
//!   → ingesting(0.05)
//!     → quality(0.15…0.30) ──[fail]→ failed
//!       → copyright(0.35…0.45)
//!         → transcription(0.55…0.65) ──[empty]→ failed
//!           → analysis(0.75…0.85)
//!             → finalizing(0.95)
//!               → completed(1.00)
//! ```
//!
//! Progress is monotonically non-decreasing while the session is processing;
//! the pipeline is the sole writer and publishes at least the entry and exit
//! value of every stage it runs.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::error::VerifierError;

/// Processing stage of a verification session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStage {
    Queued,
    Ingesting,
    Quality,
    Copyright,
    Transcription,
    Analysis,
    Finalizing,
    Completed,
    Failed,
}

impl VerificationStage {
    /// Database / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStage::Queued => "queued",
            VerificationStage::Ingesting => "ingesting",
            VerificationStage::Quality => "quality",
            VerificationStage::Copyright => "copyright",
            VerificationStage::Transcription => "transcription",
            VerificationStage::Analysis => "analysis",
            VerificationStage::Finalizing => "finalizing",
            VerificationStage::Completed => "completed",
            VerificationStage::Failed => "failed",
        }
    }

    /// Parses the database representation.
    pub fn parse(s: &str) -> Result<Self, VerifierError> {
        match s {
            "queued" => Ok(VerificationStage::Queued),
            "ingesting" => Ok(VerificationStage::Ingesting),
            "quality" => Ok(VerificationStage::Quality),
            "copyright" => Ok(VerificationStage::Copyright),
            "transcription" => Ok(VerificationStage::Transcription),
            "analysis" => Ok(VerificationStage::Analysis),
            "finalizing" => Ok(VerificationStage::Finalizing),
            "completed" => Ok(VerificationStage::Completed),
            "failed" => Ok(VerificationStage::Failed),
            other => Err(VerifierError::ValidationError(format!(
                "Unknown verification stage: {}",
                other
            ))),
        }
    }

    /// Progress value published when the stage is entered.
    pub fn entry_progress(&self) -> f64 {
        match self {
            VerificationStage::Queued => 0.0,
            VerificationStage::Ingesting => 0.05,
            VerificationStage::Quality => 0.15,
            VerificationStage::Copyright => 0.35,
            VerificationStage::Transcription => 0.55,
            VerificationStage::Analysis => 0.75,
            VerificationStage::Finalizing => 0.95,
            VerificationStage::Completed => 1.0,
            VerificationStage::Failed => 0.0,
        }
    }

    /// Progress value published when the stage completes.
    pub fn exit_progress(&self) -> f64 {
        match self {
            VerificationStage::Quality => 0.30,
            VerificationStage::Copyright => 0.45,
            VerificationStage::Transcription => 0.65,
            VerificationStage::Analysis => 0.85,
            other => other.entry_progress(),
        }
    }
}

impl Display for VerificationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN_ORDER: [VerificationStage; 6] = [
        VerificationStage::Quality,
        VerificationStage::Copyright,
        VerificationStage::Transcription,
        VerificationStage::Analysis,
        VerificationStage::Finalizing,
        VerificationStage::Completed,
    ];

    #[test]
    fn test_progress_is_monotonic_across_run_order() {
        let mut last = 0.0;
        for stage in RUN_ORDER {
            assert!(stage.entry_progress() >= last, "{} regressed", stage);
            assert!(stage.exit_progress() >= stage.entry_progress());
            last = stage.exit_progress();
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn test_round_trip() {
        for stage in RUN_ORDER {
            assert_eq!(VerificationStage::parse(stage.as_str()).unwrap(), stage);
        }
    }

    #[test]
    fn test_required_endpoints() {
        assert_eq!(VerificationStage::Quality.entry_progress(), 0.15);
        assert_eq!(VerificationStage::Quality.exit_progress(), 0.30);
        assert_eq!(VerificationStage::Transcription.entry_progress(), 0.55);
        assert_eq!(VerificationStage::Finalizing.entry_progress(), 0.95);
    }
}
