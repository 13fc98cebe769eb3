// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Audio Verifier Domain
//!
//! The domain crate contains the core business logic and rules of the audio
//! dataset verification system. It implements Domain-Driven Design (DDD)
//! patterns and is completely independent of external concerns like
//! databases, HTTP transports, or audio codecs.
//!
//! ## Domain Concepts
//!
//! ### Entities
//! Objects with a distinct identity that runs through time and state
//! changes:
//!
//! - [`VerificationSession`](entities::VerificationSession): one submission's
//!   journey from acceptance to verdict
//! - [`Contributor`](entities::Contributor): cumulative per-wallet record of
//!   points, submissions and tier
//! - [`SubmissionRecord`](entities::SubmissionRecord): immutable award row
//!   linking a completed session to its contributor
//!
//! ### Value Objects
//! Immutable, self-validating concepts without identity:
//!
//! - [`SessionId`](value_objects::SessionId): type-safe session identifier
//! - [`SessionStatus`](value_objects::SessionStatus) /
//!   [`VerificationStage`](value_objects::VerificationStage): the state
//!   machine vocabulary
//! - [`AudioFormat`](value_objects::AudioFormat): magic-byte container probe
//! - [`EncryptedEnvelope`](value_objects::EncryptedEnvelope): the sealed-key
//!   wire layout
//! - [`ContributorTier`](value_objects::ContributorTier): pure function of
//!   cumulative points
//!
//! ### Domain Services
//! Stateless business logic that does not belong to a single entity:
//! approval aggregation, the quality-score rubric, the points calculator,
//! and the tolerant analysis-response parser.
//!
//! ### Ports
//! Async traits for everything the domain needs but does not own: session
//! and contributor persistence, the quality analyzer, the copyright
//! detector, and the transcription/analysis collaborators. Infrastructure
//! implements them; tests substitute them.
//!
//! ## Business Rules
//!
//! The domain layer enforces the system invariants:
//!
//! - `progress` only increases while a session is processing
//! - terminal sessions are frozen (`results` iff completed, `error` iff
//!   failed or cancelled)
//! - approval is decided in exactly one place, from the conjunction of
//!   quality, copyright and safety outcomes
//! - tier is a pure function of total points against a fixed threshold table

pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{
    AnalysisReport, Contributor, CopyrightMatch, CopyrightReport, DatasetMetadata, QualityReport,
    SubmissionInfo, SubmissionRecord, VerificationResults, VerificationSession,
};
pub use error::VerifierError;
pub use value_objects::{
    AudioFormat, ContributorTier, EncryptedEnvelope, FailureReason, SessionId, SessionStatus,
    VerificationStage,
};
