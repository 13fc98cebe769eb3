// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence ports of the verification domain.

mod contributor_repository;
mod session_repository;

pub use contributor_repository::{AwardOutcome, ContributorRepository};
pub use session_repository::{FailureInfo, SessionPatch, SessionRepository};
