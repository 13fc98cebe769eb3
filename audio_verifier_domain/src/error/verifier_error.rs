// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the hierarchical error system for the audio
//! verification domain. It categorizes failures, provides actionable error
//! messages, and carries enough context for both automated recovery and
//! human-readable diagnostics.
//!
//! ## Error Architecture
//!
//! The error system organizes failures into logical categories:
//!
//! #### Request Errors
//! - **BadRequest**: Malformed submission, invalid metadata, unsupported
//!   audio format, undersized blob
//! - **Unauthorized**: Bearer token missing or mismatched
//! - **PayloadTooLarge**: Declared content length above the configured bound
//!
//! #### Decryption Errors
//! - **AuthenticationFailure**: Key service denied the sealing policy
//! - **DecryptionFailure**: Envelope or AEAD failure (tag mismatch,
//!   wrong key length)
//!
//! #### Infrastructure Errors
//! - **StorageError**: Session store transport failures
//! - **NetworkFailure**: Transient upstream errors (blob 5xx, transport)
//! - **TimeoutError**: An upstream collaborator exceeded its deadline
//! - **ServiceUnavailable**: Required configuration absent
//!
//! #### System Errors
//! - **ProcessingFailed**: Pipeline stage failures
//! - **Cancelled**: User or system-initiated cancellation
//! - **InternalError**: Unexpected failures
//!
//! ## Error Recovery Strategies
//!
//! Some errors indicate temporary conditions that can be retried:
//! **TimeoutError** and **NetworkFailure**. The remainder require caller
//! intervention or represent terminal verdicts.

use thiserror::Error;

/// Domain-specific errors for the audio verification system.
///
/// Each variant represents a specific failure mode with a descriptive
/// message. The ingress layer maps kinds onto transport-level statuses;
/// the pipeline decides per kind whether to recover locally or surface a
/// terminal failure.
#[derive(Error, Debug, Clone)]
pub enum VerifierError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Authentication failure: {0}")]
    AuthenticationFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    #[error("Decryption failure: {0}")]
    DecryptionFailure(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl VerifierError {
    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new bad-request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Creates a new processing error
    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    /// Creates a new storage error
    pub fn storage_error(msg: impl Into<String>) -> Self {
        Self::StorageError(msg.into())
    }

    /// Creates a new network failure
    pub fn network_failure(msg: impl Into<String>) -> Self {
        Self::NetworkFailure(msg.into())
    }

    /// Creates a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::TimeoutError(msg.into())
    }

    /// Creates a new decryption failure
    pub fn decryption_failure(msg: impl Into<String>) -> Self {
        Self::DecryptionFailure(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Checks if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VerifierError::TimeoutError(_) | VerifierError::NetworkFailure(_)
        )
    }

    /// Gets the error category
    pub fn category(&self) -> &'static str {
        match self {
            VerifierError::InvalidConfiguration(_) => "configuration",
            VerifierError::BadRequest(_) => "request",
            VerifierError::Unauthorized(_) => "auth",
            VerifierError::AuthenticationFailure(_) => "auth",
            VerifierError::NotFound(_) => "request",
            VerifierError::PayloadTooLarge(_) => "request",
            VerifierError::ServiceUnavailable(_) => "configuration",
            VerifierError::NetworkFailure(_) => "network",
            VerifierError::TimeoutError(_) => "timeout",
            VerifierError::DecryptionFailure(_) => "decryption",
            VerifierError::StorageError(_) => "storage",
            VerifierError::SerializationError(_) => "serialization",
            VerifierError::ValidationError(_) => "validation",
            VerifierError::ProcessingFailed(_) => "processing",
            VerifierError::IoError(_) => "io",
            VerifierError::Cancelled(_) => "cancellation",
            VerifierError::InternalError(_) => "internal",
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for VerifierError {
    fn from(err: std::io::Error) -> Self {
        VerifierError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for VerifierError {
    fn from(err: serde_json::Error) -> Self {
        VerifierError::SerializationError(err.to_string())
    }
}
