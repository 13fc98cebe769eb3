// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Audio Verifier Service
//!
//! The application crate of the audio dataset verification service. It wires
//! the domain's ports to concrete infrastructure and exposes the HTTP
//! ingress surface.
//!
//! ## Layer Map
//!
//! - [`application`]: orchestration services — the six-stage verification
//!   pipeline and the reward applier
//! - [`infrastructure`]: port implementations — PostgreSQL stores, the
//!   decryption engine and its HTTP collaborators, the WAV quality
//!   analyzer, chat-completion clients, worker pool, scratch-file guard,
//!   metrics
//! - [`presentation`]: the axum HTTP surface (submission, status, cancel,
//!   probes)
//!
//! ## Flow
//!
//! Ingress accepts a submission, obtains plaintext through the decryption
//! engine, persists a session row, and hands a job to the worker pool.
//! A worker drives the pipeline, publishing stage/progress through the
//! session store after every stage, and hands the verdict to the reward
//! applier on completion. Terminal state is always written back to the
//! store; the per-run scratch file is removed on every exit path.

pub mod application;
pub mod infrastructure;
pub mod presentation;
