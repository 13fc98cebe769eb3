// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Application services: pipeline orchestration and reward application.

pub mod reward_applier;
pub mod verification_pipeline;

pub use reward_applier::{RewardApplier, RewardInput};
pub use verification_pipeline::{PipelineJob, VerificationPipeline};
