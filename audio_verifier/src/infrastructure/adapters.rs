// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Infrastructure adapters: HTTP collaborators and the built-in analyzers.

pub mod blob_store;
pub mod decryptor;
pub mod fingerprint;
pub mod key_service;
pub mod openrouter;
pub mod wav_quality;

pub use blob_store::{BlobSource, FetchAttempt, FetchRetryPolicy, HttpBlobSource};
pub use decryptor::{DecryptRequest, DecryptionEngine, Decryptor};
pub use fingerprint::HttpFingerprintDetector;
pub use key_service::{HttpKeyService, KeyRecovery, KeyRetryPolicy, RecoveredSecret};
pub use openrouter::{ChatCompletionClient, OpenRouterAnalyst, OpenRouterTranscriber};
pub use wav_quality::WavQualityAnalyzer;
