// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain services and collaborator ports.
//!
//! Pure services (approval, scoring, points, parsing) contain business logic
//! that does not belong to a single entity. The async traits are ports:
//! infrastructure implements them against the real collaborators, tests
//! substitute them.

pub mod analysis_parser;
pub mod analysis_prompt;
pub mod approval;
pub mod content_analysis;
pub mod copyright_detector;
pub mod datetime_serde;
pub mod points_calculator;
pub mod quality_analyzer;
pub mod quality_score;
pub mod transcription_service;

pub use analysis_parser::{parse_analysis_response, parse_per_file_response};
pub use approval::{compute_approval, COPYRIGHT_CONFIDENCE_THRESHOLD};
pub use content_analysis::ContentAnalysisService;
pub use copyright_detector::CopyrightDetector;
pub use points_calculator::{
    PointsBreakdown, PointsCalculator, PointsInput, SpecificityGrade, SubjectRarityTier,
    VerificationStatus,
};
pub use quality_analyzer::{QualityAnalyzer, QualityCheck};
pub use quality_score::{compute_rubric_score, QualityThresholds};
pub use transcription_service::{TranscriptionService, TRANSCRIPTION_INSTRUCTION};
