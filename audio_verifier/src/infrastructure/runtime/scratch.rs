// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Scratch File Guard
//!
//! Scoped handle for the per-run plaintext file on local disk.
//!
//! The scratch file is owned by exactly one pipeline run and must disappear
//! on every exit path: normal completion, stage failure, cancellation, and
//! panics. Deletion therefore lives in `Drop` rather than in any explicit
//! cleanup call.

use std::path::{Path, PathBuf};

use audio_verifier_domain::VerifierError;

/// RAII handle to a per-run scratch file.
///
/// The file is removed when the handle drops; a failed removal is logged
/// and never escalates.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Writes `bytes` to a fresh uniquely-named file under `dir`.
    pub async fn create(
        dir: &Path,
        prefix: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<Self, VerifierError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!(
            "{}_{}.{}",
            prefix,
            uuid::Uuid::new_v4(),
            extension
        ));
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Created scratch file");
        Ok(Self { path })
    }

    /// Adopts an already-written file (the legacy multipart flow streams
    /// directly to disk before the guard exists).
    pub fn adopt(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size in bytes.
    pub async fn len(&self) -> Result<u64, VerifierError> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, VerifierError> {
        Ok(self.len().await? == 0)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed scratch file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove scratch file")
            }
        }
    }
}
