// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Approval Aggregation
//!
//! The single place where a submission's approval verdict is decided.
//!
//! ```text
//! approved = quality.passed
//!         ∧ ¬(copyright.detected ∧ copyright.confidence > 0.8)
//!         ∧ analysis.safety_passed
//! ```
//!
//! No stage sets approval individually; the pipeline calls
//! [`compute_approval`] once during aggregation.
//!
//! The copyright threshold is a strict `>`: a confidence of exactly 0.8
//! does not block approval. The detector reports matches at `>= 0.8` for
//! its own purposes, so when the two coincide exactly the caller should
//! record a warning via [`threshold_coincidence_warning`].

use crate::entities::{AnalysisReport, CopyrightReport, QualityReport};

/// Copyright confidence above which a detected match blocks approval.
pub const COPYRIGHT_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Computes the final approval verdict from the three gating stages.
pub fn compute_approval(
    quality: &QualityReport,
    copyright: &CopyrightReport,
    analysis: &AnalysisReport,
) -> bool {
    let high_confidence_copyright =
        copyright.detected && copyright.confidence > COPYRIGHT_CONFIDENCE_THRESHOLD;
    quality.passed && !high_confidence_copyright && analysis.safety_passed
}

/// Warning to record when a detected match sits exactly on the threshold,
/// where the detector's own `>=` reporting and the approval formula's
/// strict `>` disagree.
pub fn threshold_coincidence_warning(copyright: &CopyrightReport) -> Option<String> {
    if copyright.detected && copyright.confidence == COPYRIGHT_CONFIDENCE_THRESHOLD {
        Some(format!(
            "Copyright match confidence is exactly {:.2}; approval uses a strict threshold and did not block",
            COPYRIGHT_CONFIDENCE_THRESHOLD
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn passing_quality() -> QualityReport {
        QualityReport {
            passed: true,
            ..QualityReport::default()
        }
    }

    fn copyright(detected: bool, confidence: f64) -> CopyrightReport {
        CopyrightReport {
            checked: true,
            detected,
            confidence,
            ..CopyrightReport::default()
        }
    }

    fn safe_analysis(safety_passed: bool) -> AnalysisReport {
        AnalysisReport {
            safety_passed,
            ..AnalysisReport::default()
        }
    }

    #[test]
    fn test_all_gates_pass() {
        assert!(compute_approval(
            &passing_quality(),
            &copyright(false, 0.0),
            &safe_analysis(true),
        ));
    }

    #[test]
    fn test_threshold_is_strict() {
        // Exactly 0.80 does not block; 0.81 does
        assert!(compute_approval(
            &passing_quality(),
            &copyright(true, 0.80),
            &safe_analysis(true),
        ));
        assert!(!compute_approval(
            &passing_quality(),
            &copyright(true, 0.81),
            &safe_analysis(true),
        ));
    }

    #[test]
    fn test_high_confidence_without_detection_is_fine() {
        assert!(compute_approval(
            &passing_quality(),
            &copyright(false, 0.99),
            &safe_analysis(true),
        ));
    }

    #[test]
    fn test_safety_gate() {
        assert!(!compute_approval(
            &passing_quality(),
            &copyright(false, 0.0),
            &safe_analysis(false),
        ));
    }

    #[test]
    fn test_quality_gate() {
        assert!(!compute_approval(
            &QualityReport::default(),
            &copyright(false, 0.0),
            &safe_analysis(true),
        ));
    }

    #[test]
    fn test_threshold_coincidence_warning() {
        assert!(threshold_coincidence_warning(&copyright(true, 0.8)).is_some());
        assert!(threshold_coincidence_warning(&copyright(true, 0.81)).is_none());
        assert!(threshold_coincidence_warning(&copyright(false, 0.8)).is_none());
    }

    proptest! {
        #[test]
        fn prop_approval_matches_boolean_formula(
            quality_passed: bool,
            safety_passed: bool,
            detected: bool,
            confidence in 0.0f64..=1.0,
        ) {
            let approved = compute_approval(
                &QualityReport { passed: quality_passed, ..QualityReport::default() },
                &copyright(detected, confidence),
                &safe_analysis(safety_passed),
            );
            let expected =
                quality_passed && !(detected && confidence > 0.8) && safety_passed;
            prop_assert_eq!(approved, expected);
        }
    }
}
