// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Quality Analyzer Port
//!
//! Infrastructure port for the external audio-feature library. The analyzer
//! reads the scratch file from disk and reports technical metrics; the
//! numerical analysis itself (decoding, RMS, silence statistics) is the
//! collaborator's business, not the domain's.

use std::path::Path;

use async_trait::async_trait;

use crate::entities::QualityReport;
use crate::error::VerifierError;
use crate::value_objects::FailureReason;

/// Outcome of one quality analysis.
///
/// `quality` is `None` when the file could not be analyzed at all (corrupt
/// or unreadable audio); the pipeline treats that as a quality-stage
/// failure. `warnings` are advisory and recorded on the session regardless
/// of pass/fail.
#[derive(Debug, Clone, Default)]
pub struct QualityCheck {
    pub quality: Option<QualityReport>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub failure_reason: Option<FailureReason>,
}

/// Port for the external audio quality library.
#[async_trait]
pub trait QualityAnalyzer: Send + Sync {
    /// Analyzes the audio file at `path`.
    ///
    /// Implementations return `Err` only for infrastructure faults (I/O,
    /// process spawn); an analyzable-but-bad file is a `QualityCheck` with
    /// `passed = false` or `quality = None`.
    async fn analyze(&self, path: &Path) -> Result<QualityCheck, VerifierError>;
}
