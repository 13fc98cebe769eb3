// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Copyright Detector Port
//!
//! Infrastructure port for the fingerprinting copyright-match service.
//!
//! The detection stage is never fatal: implementations embed their own
//! failures in the returned report (`checked = false`, `error` populated)
//! instead of propagating errors, so the trait method is infallible by
//! design.

use std::path::Path;

use async_trait::async_trait;

use crate::entities::CopyrightReport;

/// Port for the fingerprinting copyright-match service.
#[async_trait]
pub trait CopyrightDetector: Send + Sync {
    /// Fingerprints the audio at `path` and looks up known recordings.
    async fn check(&self, path: &Path) -> CopyrightReport;
}
