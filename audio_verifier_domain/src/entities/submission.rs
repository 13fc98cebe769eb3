// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Submission Metadata
//!
//! Structured metadata captured when a submission is accepted, stored as the
//! session's `initial_data`. Contributor-supplied fields use camelCase on
//! the wire; everything is optional-tolerant because the metadata originates
//! from an untrusted client.

use serde::{Deserialize, Serialize};

/// Contributor-provided categorization of the dataset's intended use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Categorization {
    pub use_case: Option<String>,
    pub content_type: Option<String>,
    pub domain: Option<String>,
}

/// Per-file title/description pair for multi-file datasets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerFileMetadata {
    pub title: String,
    pub description: String,
}

/// Dataset metadata as submitted by the contributor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasetMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub languages: Vec<String>,
    pub wallet_address: Option<String>,
    pub sample_count: u32,
    pub categorization: Categorization,
    pub per_file_metadata: Vec<PerFileMetadata>,
}

/// Structured submission record persisted as a session's `initial_data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionInfo {
    /// Content-addressed reference of the (encrypted) blob.
    pub blob_reference: String,
    /// Decrypted payload size in bytes.
    pub plaintext_size_bytes: u64,
    /// Duration probed from the decoded stream, if available.
    pub duration_seconds: u64,
    /// MIME type detected at ingress.
    pub file_format: String,
    /// Contributor-provided dataset metadata.
    pub metadata: DatasetMetadata,
}
