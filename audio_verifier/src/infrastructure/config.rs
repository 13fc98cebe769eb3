// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Service Configuration
//!
//! One immutable [`AppConfig`] struct populated from the environment exactly
//! once at process start. Components receive the struct (or values derived
//! from it) and never read the environment themselves.
//!
//! ## Recognized Options
//!
//! | Variable | Requirement | Meaning |
//! |---|---|---|
//! | `DATABASE_URL` | mandatory | session/contributor store connection string |
//! | `AGGREGATOR_URL` | encrypted flow | blob fetch endpoint |
//! | `AGGREGATOR_TOKEN` | optional | bearer attached to blob fetches |
//! | `KEY_PACKAGE_ID` | encrypted flow | sealing-policy identifier |
//! | `KEY_SERVICE_URL` | encrypted flow | sealed-key recovery endpoint |
//! | `TRANSCRIPTION_API_KEY` | mandatory | transcription service credential |
//! | `ANALYSIS_API_KEY` | mandatory | analysis service credential |
//! | `FINGERPRINT_API_KEY` | optional | copyright matching disables gracefully without it |
//! | `FINGERPRINT_SERVICE_URL` | optional | copyright matcher endpoint override |
//! | `VERIFIER_AUTH_TOKEN` | optional | bearer auth enabled when set |
//! | `MAX_FILE_SIZE_GB` | default 13 | ingress size bound |
//! | `CORS_ORIGIN` | default localhost | comma-separated allowed origins |
//! | `ENABLE_LEGACY_UPLOAD` | default false | multipart upload flow flag |
//! | `TEMP_DIR` | default system temp | scratch file directory |
//! | `MAX_CONCURRENT_PIPELINES` | default 4 | worker pool size / backpressure bound |
//!
//! Missing mandatory variables fail startup with one aggregate error listing
//! everything that is absent, so operators fix the deployment in one pass.

use std::path::PathBuf;

use audio_verifier_domain::VerifierError;

/// Default ingress size bound in GiB.
pub const DEFAULT_MAX_FILE_SIZE_GB: u64 = 13;

/// Default worker pool size.
pub const DEFAULT_MAX_CONCURRENT_PIPELINES: usize = 4;

/// Immutable service configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub aggregator_url: Option<String>,
    pub aggregator_token: Option<String>,
    pub key_package_id: Option<String>,
    pub key_service_url: Option<String>,
    pub transcription_api_key: String,
    pub analysis_api_key: String,
    pub fingerprint_api_key: Option<String>,
    pub fingerprint_service_url: Option<String>,
    pub verifier_auth_token: Option<String>,
    pub max_file_size_gb: u64,
    pub cors_origins: Vec<String>,
    pub enable_legacy_upload: bool,
    pub temp_dir: PathBuf,
    pub max_concurrent_pipelines: usize,
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, VerifierError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary lookup (tests inject maps).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, VerifierError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let database_url = get("DATABASE_URL").unwrap_or_else(|| {
            missing.push("DATABASE_URL (session storage connection string)");
            String::new()
        });
        let transcription_api_key = get("TRANSCRIPTION_API_KEY").unwrap_or_else(|| {
            missing.push("TRANSCRIPTION_API_KEY (audio transcription credential)");
            String::new()
        });
        let analysis_api_key = get("ANALYSIS_API_KEY").unwrap_or_else(|| {
            missing.push("ANALYSIS_API_KEY (content analysis credential)");
            String::new()
        });
        if !missing.is_empty() {
            return Err(VerifierError::invalid_config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let max_file_size_gb = match get("MAX_FILE_SIZE_GB") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                VerifierError::invalid_config(format!("MAX_FILE_SIZE_GB is not an integer: {}", raw))
            })?,
            None => DEFAULT_MAX_FILE_SIZE_GB,
        };

        let max_concurrent_pipelines = match get("MAX_CONCURRENT_PIPELINES") {
            Some(raw) => raw.parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
                VerifierError::invalid_config(format!(
                    "MAX_CONCURRENT_PIPELINES must be a positive integer, got: {}",
                    raw
                ))
            })?,
            None => DEFAULT_MAX_CONCURRENT_PIPELINES,
        };

        let cors_origins = get("CORS_ORIGIN")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let enable_legacy_upload = get("ENABLE_LEGACY_UPLOAD")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let temp_dir = get("TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        Ok(Self {
            database_url,
            aggregator_url: get("AGGREGATOR_URL"),
            aggregator_token: get("AGGREGATOR_TOKEN"),
            key_package_id: get("KEY_PACKAGE_ID"),
            key_service_url: get("KEY_SERVICE_URL"),
            transcription_api_key,
            analysis_api_key,
            fingerprint_api_key: get("FINGERPRINT_API_KEY"),
            fingerprint_service_url: get("FINGERPRINT_SERVICE_URL"),
            verifier_auth_token: get("VERIFIER_AUTH_TOKEN"),
            max_file_size_gb,
            cors_origins,
            enable_legacy_upload,
            temp_dir,
            max_concurrent_pipelines,
        })
    }

    /// Ingress size bound in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_gb * 1024 * 1024 * 1024
    }

    /// True when every option the encrypted submission flow needs is set.
    pub fn encrypted_flow_ready(&self) -> bool {
        self.aggregator_url.is_some()
            && self.key_package_id.is_some()
            && self.key_service_url.is_some()
    }

    /// True when bearer auth is enabled.
    pub fn auth_enabled(&self) -> bool {
        self.verifier_auth_token.is_some()
    }
}
