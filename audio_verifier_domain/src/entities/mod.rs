// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Entities of the verification domain.

mod contributor;
mod session;
mod submission;
mod submission_record;
mod verification_report;

pub use contributor::Contributor;
pub use session::VerificationSession;
pub use submission::{Categorization, DatasetMetadata, PerFileMetadata, SubmissionInfo};
pub use submission_record::SubmissionRecord;
pub use verification_report::{
    AnalysisReport, CopyrightMatch, CopyrightReport, FileAnalysis, PriceAnalysis, QualityAnalysis,
    QualityReport, Recommendations, ScoredAspect, VerificationResults,
};
