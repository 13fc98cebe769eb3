// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Content Analysis Port
//!
//! Infrastructure port for the LLM analysis collaborator. The domain builds
//! prompts ([`analysis_prompt`](super::analysis_prompt)) and parses
//! responses ([`parse_analysis_response`](super::parse_analysis_response));
//! the port only moves text.

use async_trait::async_trait;

use crate::error::VerifierError;

/// Port for the LLM content-analysis service.
#[async_trait]
pub trait ContentAnalysisService: Send + Sync {
    /// Submits an analysis prompt and returns the raw response text.
    ///
    /// Implementations use a low-temperature setting; the caller owns
    /// parsing and fallback behavior.
    async fn analyze(&self, prompt: &str, max_tokens: u32) -> Result<String, VerifierError>;
}
