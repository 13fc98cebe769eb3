// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Single-word failure reasons attached to terminal verification failures.
//!
//! The set is closed: downstream consumers (reporting, contributor-facing
//! messaging) switch on these values, so free-text must never leak into the
//! `failure_reason` field.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Closed set of terminal failure reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    FormatProbeFailed,
    ClippingDetected,
    ExcessiveSilence,
    VolumeOutOfRange,
    SampleRateTooLow,
    DurationOutOfRange,
    AnalysisFailed,
    ConvertedWithFfmpeg,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::FormatProbeFailed => "format_probe_failed",
            FailureReason::ClippingDetected => "clipping_detected",
            FailureReason::ExcessiveSilence => "excessive_silence",
            FailureReason::VolumeOutOfRange => "volume_out_of_range",
            FailureReason::SampleRateTooLow => "sample_rate_too_low",
            FailureReason::DurationOutOfRange => "duration_out_of_range",
            FailureReason::AnalysisFailed => "analysis_failed",
            FailureReason::ConvertedWithFfmpeg => "converted_with_ffmpeg",
        }
    }
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_representation() {
        assert_eq!(FailureReason::FormatProbeFailed.as_str(), "format_probe_failed");
        assert_eq!(FailureReason::ClippingDetected.as_str(), "clipping_detected");
        let json = serde_json::to_string(&FailureReason::ExcessiveSilence).unwrap();
        assert_eq!(json, "\"excessive_silence\"");
    }
}
