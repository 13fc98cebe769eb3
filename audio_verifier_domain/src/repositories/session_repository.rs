// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Session Repository Port
//!
//! Durable CRUD for verification sessions with concurrent-safe partial
//! updates.
//!
//! ## Contract
//!
//! - Every mutation is a single atomic row write; the store holds no
//!   authoritative in-memory state.
//! - `updated_at` is refreshed on every update.
//! - Update operations return `Ok(true)` iff exactly one row matched;
//!   a missing id is `Ok(false)`, not an error.
//! - `get` returning `None` is not an error; `StorageError` is reserved for
//!   transport failures.
//! - Stage updates for one session are totally ordered by the single
//!   pipeline writer; the store provides no cross-session ordering.

use async_trait::async_trait;

use crate::entities::{SubmissionInfo, VerificationResults, VerificationSession};
use crate::error::VerifierError;
use crate::value_objects::{FailureReason, SessionId, SessionStatus, VerificationStage};

/// Partial update over a session row.
///
/// Only the populated fields are written; `updated_at` is always refreshed.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub stage: Option<VerificationStage>,
    pub progress: Option<f64>,
    pub status: Option<SessionStatus>,
    pub results: Option<VerificationResults>,
    pub error: Option<String>,
}

impl SessionPatch {
    pub fn is_empty(&self) -> bool {
        self.stage.is_none()
            && self.progress.is_none()
            && self.status.is_none()
            && self.results.is_none()
            && self.error.is_none()
    }
}

/// Failure description for `mark_failed`.
#[derive(Debug, Clone, Default)]
pub struct FailureInfo {
    pub errors: Vec<String>,
    pub stage_failed: String,
    pub failure_reason: Option<FailureReason>,
    /// Selects `status = cancelled` instead of `failed`.
    pub cancelled: bool,
}

impl FailureInfo {
    /// Joined error text persisted in the session's `error` column. The
    /// closed-set failure reason rides along in a greppable suffix.
    pub fn joined_errors(&self) -> String {
        let base = if self.errors.is_empty() {
            if self.stage_failed.is_empty() {
                "unknown".to_string()
            } else {
                self.stage_failed.clone()
            }
        } else {
            self.errors.join(", ")
        };
        match self.failure_reason {
            Some(reason) => format!("{} [failure_reason={}]", base, reason),
            None => base,
        }
    }
}

/// Port for durable session storage.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Inserts a fresh session row (`processing`/`queued`/progress 0) and
    /// returns its id.
    async fn create(
        &self,
        verification_id: &str,
        initial_data: SubmissionInfo,
    ) -> Result<SessionId, VerifierError>;

    /// Applies a partial update as one atomic write. Returns `true` iff
    /// exactly one row matched.
    async fn update(&self, id: SessionId, patch: SessionPatch) -> Result<bool, VerifierError>;

    /// Convenience over [`update`](Self::update) for stage/progress bumps.
    async fn update_stage(
        &self,
        id: SessionId,
        stage: VerificationStage,
        progress: f64,
    ) -> Result<bool, VerifierError> {
        self.update(
            id,
            SessionPatch {
                stage: Some(stage),
                progress: Some(progress),
                ..SessionPatch::default()
            },
        )
        .await
    }

    /// Writes the completed terminal state atomically.
    async fn mark_completed(
        &self,
        id: SessionId,
        results: VerificationResults,
    ) -> Result<bool, VerifierError> {
        self.update(
            id,
            SessionPatch {
                status: Some(SessionStatus::Completed),
                stage: Some(VerificationStage::Completed),
                progress: Some(1.0),
                results: Some(results),
                ..SessionPatch::default()
            },
        )
        .await
    }

    /// Writes the failed (or cancelled) terminal state atomically.
    async fn mark_failed(&self, id: SessionId, failure: FailureInfo) -> Result<bool, VerifierError> {
        let status = if failure.cancelled {
            SessionStatus::Cancelled
        } else {
            SessionStatus::Failed
        };
        self.update(
            id,
            SessionPatch {
                status: Some(status),
                stage: Some(VerificationStage::Failed),
                progress: Some(0.0),
                error: Some(failure.joined_errors()),
                ..SessionPatch::default()
            },
        )
        .await
    }

    /// Appends warnings not already present on the session.
    async fn add_warnings(&self, id: SessionId, warnings: &[String]) -> Result<bool, VerifierError>;

    /// Fetches a session; `None` when the id is unknown.
    async fn get(&self, id: SessionId) -> Result<Option<VerificationSession>, VerifierError>;

    /// Readiness check against the underlying store. In-memory stores are
    /// trivially ready.
    async fn ping(&self) -> Result<(), VerifierError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_patch_detection() {
        assert!(SessionPatch::default().is_empty());
        let patch = SessionPatch {
            progress: Some(0.5),
            ..SessionPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_joined_errors_fallbacks() {
        let failure = FailureInfo {
            errors: vec!["a".to_string(), "b".to_string()],
            ..FailureInfo::default()
        };
        assert_eq!(failure.joined_errors(), "a, b");

        let failure = FailureInfo {
            stage_failed: "quality".to_string(),
            ..FailureInfo::default()
        };
        assert_eq!(failure.joined_errors(), "quality");

        assert_eq!(FailureInfo::default().joined_errors(), "unknown");
    }

    #[test]
    fn test_joined_errors_carries_failure_reason() {
        let failure = FailureInfo {
            errors: vec!["Audio is clipping - reduce input gain".to_string()],
            stage_failed: "quality".to_string(),
            failure_reason: Some(FailureReason::ClippingDetected),
            cancelled: false,
        };
        assert_eq!(
            failure.joined_errors(),
            "Audio is clipping - reduce input gain [failure_reason=clipping_detected]"
        );
    }
}
