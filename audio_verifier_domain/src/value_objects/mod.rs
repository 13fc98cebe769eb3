// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Value objects of the verification domain.
//!
//! Value objects are immutable, compared by attributes rather than identity,
//! and self-validating. Everything here is side-effect free.

pub mod audio_format;
pub mod contributor_tier;
pub mod encrypted_envelope;
pub mod failure_reason;
pub mod session_id;
pub mod session_status;
pub mod verification_stage;

pub use audio_format::AudioFormat;
pub use contributor_tier::ContributorTier;
pub use encrypted_envelope::EncryptedEnvelope;
pub use failure_reason::FailureReason;
pub use session_id::SessionId;
pub use session_status::SessionStatus;
pub use verification_stage::VerificationStage;
