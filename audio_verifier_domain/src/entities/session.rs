// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Verification Session Entity
//!
//! The central entity of the system: one row per submission, carrying the
//! submission's identity, current stage/progress, and — once terminal — its
//! verdict or failure description.
//!
//! ## Entity Characteristics
//!
//! - **Identity**: a unique [`SessionId`] assigned at creation
//! - **Lifecycle**: created in `processing`/`queued`, driven through the
//!   stage machine by the pipeline, frozen on reaching a terminal status
//! - **Single Writer**: the owning pipeline run is the sole progress writer,
//!   so `progress` is monotonically non-decreasing while processing
//!
//! ## Invariants
//!
//! - `results` is non-null iff `status == completed`
//! - `error` is non-null iff `status ∈ {failed, cancelled}`
//! - `progress == 1.0` iff `status == completed`
//! - `created_at <= updated_at`
//!
//! [`validate`](VerificationSession::validate) checks all of these; the
//! store implementations call it in tests and debug assertions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{SubmissionInfo, VerificationResults};
use crate::error::VerifierError;
use crate::services::datetime_serde;
use crate::value_objects::{SessionId, SessionStatus, VerificationStage};

/// One verification session: a submission's full lifecycle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSession {
    // Identity fields (always first)
    pub id: SessionId,
    pub verification_id: String,

    // Lifecycle fields
    pub status: SessionStatus,
    pub stage: VerificationStage,
    pub progress: f64,

    // Payload fields
    pub initial_data: SubmissionInfo,
    pub results: Option<VerificationResults>,
    pub error: Option<String>,
    pub warnings: Vec<String>,

    // Metadata fields (always last)
    #[serde(with = "datetime_serde")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "datetime_serde")]
    pub updated_at: DateTime<Utc>,
}

impl VerificationSession {
    /// Creates a fresh session in the initial state.
    pub fn new(verification_id: String, initial_data: SubmissionInfo) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            verification_id,
            status: SessionStatus::Processing,
            stage: VerificationStage::Queued,
            progress: 0.0,
            initial_data,
            results: None,
            error: None,
            warnings: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True once the session has left `processing`.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Appends warnings not already present, preserving insertion order.
    ///
    /// Returns the number of warnings actually added.
    pub fn merge_warnings(&mut self, warnings: &[String]) -> usize {
        let mut added = 0;
        for warning in warnings {
            if !self.warnings.iter().any(|w| w == warning) {
                self.warnings.push(warning.clone());
                added += 1;
            }
        }
        added
    }

    /// Checks the entity invariants.
    pub fn validate(&self) -> Result<(), VerifierError> {
        if !(0.0..=1.0).contains(&self.progress) {
            return Err(VerifierError::ValidationError(format!(
                "Progress {} outside [0, 1]",
                self.progress
            )));
        }
        if self.results.is_some() != (self.status == SessionStatus::Completed) {
            return Err(VerifierError::ValidationError(
                "Results must be present exactly when status is completed".to_string(),
            ));
        }
        let failed_like =
            matches!(self.status, SessionStatus::Failed | SessionStatus::Cancelled);
        if self.error.is_some() != failed_like {
            return Err(VerifierError::ValidationError(
                "Error must be present exactly when status is failed or cancelled".to_string(),
            ));
        }
        if self.status == SessionStatus::Completed && self.progress != 1.0 {
            return Err(VerifierError::ValidationError(
                "Completed sessions must report progress 1.0".to_string(),
            ));
        }
        if self.created_at > self.updated_at {
            return Err(VerifierError::ValidationError(
                "created_at must not exceed updated_at".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> VerificationSession {
        VerificationSession::new("verif-1".to_string(), SubmissionInfo::default())
    }

    #[test]
    fn test_new_session_state() {
        let session = fresh();
        assert_eq!(session.status, SessionStatus::Processing);
        assert_eq!(session.stage, VerificationStage::Queued);
        assert_eq!(session.progress, 0.0);
        assert!(session.results.is_none());
        assert!(session.error.is_none());
        session.validate().unwrap();
    }

    #[test]
    fn test_merge_warnings_deduplicates() {
        let mut session = fresh();
        let added = session.merge_warnings(&[
            "low volume".to_string(),
            "low volume".to_string(),
            "mono".to_string(),
        ]);
        assert_eq!(added, 2);
        assert_eq!(session.warnings, vec!["low volume", "mono"]);

        let added = session.merge_warnings(&["mono".to_string()]);
        assert_eq!(added, 0);
        assert_eq!(session.warnings.len(), 2);
    }

    #[test]
    fn test_validate_rejects_results_without_completion() {
        let mut session = fresh();
        session.results = Some(VerificationResults::default());
        assert!(session.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_completed_without_full_progress() {
        let mut session = fresh();
        session.status = SessionStatus::Completed;
        session.results = Some(VerificationResults::default());
        session.progress = 0.95;
        assert!(session.validate().is_err());
        session.progress = 1.0;
        session.validate().unwrap();
    }

    #[test]
    fn test_validate_requires_error_on_failure() {
        let mut session = fresh();
        session.status = SessionStatus::Failed;
        session.stage = VerificationStage::Failed;
        assert!(session.validate().is_err());
        session.error = Some("quality: clipping".to_string());
        session.validate().unwrap();
    }
}
