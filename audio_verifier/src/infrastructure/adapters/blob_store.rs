// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Blob Aggregator Client
//!
//! Fetches encrypted blobs from the content-addressed blob store's read
//! endpoint (the aggregator).
//!
//! ## Propagation-Tolerant Retry
//!
//! The aggregator is eventually consistent: a freshly written blob may 404
//! for a while. The retry schedule therefore is:
//!
//! 1. sleep [`FetchRetryPolicy::propagation_delay`] (15 s) before the first
//!    attempt
//! 2. on 404, retry up to [`FetchRetryPolicy::max_retries`] (10) times with
//!    a fixed [`FetchRetryPolicy::retry_delay`] (30 s) between attempts
//! 3. any other status or transport error is terminal immediately
//!
//! The schedule lives in a policy struct so tests run with zero delays.

use std::time::Duration;

use async_trait::async_trait;
use audio_verifier_domain::VerifierError;

/// Total fetch deadline per attempt.
const FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Outcome of a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttempt {
    Found(Vec<u8>),
    /// 404: the blob may not have propagated yet.
    NotFound,
}

/// Port for a single blob-fetch attempt; the retry schedule lives in
/// [`fetch_with_retry`].
#[async_trait]
pub trait BlobSource: Send + Sync {
    async fn fetch(&self, blob_ref: &str) -> Result<FetchAttempt, VerifierError>;
}

/// Retry schedule for propagation-tolerant fetching.
#[derive(Debug, Clone, Copy)]
pub struct FetchRetryPolicy {
    /// Sleep before the first attempt.
    pub propagation_delay: Duration,
    /// Fixed backoff between 404 retries.
    pub retry_delay: Duration,
    /// Retries after the initial attempt, on 404 only.
    pub max_retries: u32,
}

impl Default for FetchRetryPolicy {
    fn default() -> Self {
        Self {
            propagation_delay: Duration::from_secs(15),
            retry_delay: Duration::from_secs(30),
            max_retries: 10,
        }
    }
}

impl FetchRetryPolicy {
    /// Zero-delay schedule for tests.
    pub fn immediate() -> Self {
        Self {
            propagation_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
            max_retries: 10,
        }
    }
}

/// Drives a [`BlobSource`] through the propagation-tolerant schedule.
pub async fn fetch_with_retry(
    source: &dyn BlobSource,
    blob_ref: &str,
    policy: &FetchRetryPolicy,
) -> Result<Vec<u8>, VerifierError> {
    let short = short_ref(blob_ref);
    tracing::info!(
        blob = %short,
        delay_secs = policy.propagation_delay.as_secs(),
        "Waiting for blob propagation"
    );
    tokio::time::sleep(policy.propagation_delay).await;

    let attempts = policy.max_retries + 1;
    for attempt in 1..=attempts {
        tracing::debug!(blob = %short, attempt, attempts, "Fetching blob");
        match source.fetch(blob_ref).await? {
            FetchAttempt::Found(bytes) => {
                tracing::info!(blob = %short, attempt, bytes = bytes.len(), "Fetched blob");
                return Ok(bytes);
            }
            FetchAttempt::NotFound if attempt < attempts => {
                tracing::warn!(
                    blob = %short,
                    attempt,
                    retry_in_secs = policy.retry_delay.as_secs(),
                    "Blob not found (404), retrying"
                );
                tokio::time::sleep(policy.retry_delay).await;
            }
            FetchAttempt::NotFound => {
                tracing::error!(blob = %short, attempts, "Blob still not found after retries");
                return Err(VerifierError::network_failure(format!(
                    "Blob {} not found after {} attempts",
                    short, attempts
                )));
            }
        }
    }
    unreachable!("retry loop always returns")
}

/// HTTP implementation against the aggregator's `/v1/blobs/{id}` route.
pub struct HttpBlobSource {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpBlobSource {
    pub fn new(base_url: String, bearer_token: Option<String>) -> Result<Self, VerifierError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| VerifierError::internal_error(format!("HTTP client build failed: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token,
        })
    }
}

#[async_trait]
impl BlobSource for HttpBlobSource {
    async fn fetch(&self, blob_ref: &str) -> Result<FetchAttempt, VerifierError> {
        let url = format!("{}/v1/blobs/{}", self.base_url, blob_ref);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                VerifierError::timeout(format!("Blob fetch timed out: {}", e))
            } else {
                VerifierError::network_failure(format!("Blob fetch transport error: {}", e))
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(FetchAttempt::NotFound);
        }
        if status.is_server_error() {
            return Err(VerifierError::network_failure(format!(
                "Aggregator returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(VerifierError::ValidationError(format!(
                "Aggregator rejected fetch with {}",
                status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VerifierError::network_failure(format!("Blob body read failed: {}", e)))?;
        Ok(FetchAttempt::Found(bytes.to_vec()))
    }
}

fn short_ref(blob_ref: &str) -> String {
    blob_ref.chars().take(16).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Scripted source: a fixed number of 404s, then success.
    struct Scripted {
        not_found_count: u32,
        calls: AtomicU32,
        payload: Vec<u8>,
    }

    #[async_trait]
    impl BlobSource for Scripted {
        async fn fetch(&self, _blob_ref: &str) -> Result<FetchAttempt, VerifierError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.not_found_count {
                Ok(FetchAttempt::NotFound)
            } else {
                Ok(FetchAttempt::Found(self.payload.clone()))
            }
        }
    }

    #[tokio::test]
    async fn test_succeeds_on_eleventh_attempt_within_budget() {
        let source = Scripted {
            not_found_count: 10,
            calls: AtomicU32::new(0),
            payload: vec![1, 2, 3],
        };
        let bytes = fetch_with_retry(&source, "blob", &FetchRetryPolicy::immediate())
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn test_exhausted_retries_is_network_failure() {
        let source = Scripted {
            not_found_count: u32::MAX,
            calls: AtomicU32::new(0),
            payload: Vec::new(),
        };
        let err = fetch_with_retry(&source, "blob", &FetchRetryPolicy::immediate())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifierError::NetworkFailure(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn test_non_404_error_is_terminal_immediately() {
        struct FailsHard {
            calls: AtomicU32,
        }
        #[async_trait]
        impl BlobSource for FailsHard {
            async fn fetch(&self, _blob_ref: &str) -> Result<FetchAttempt, VerifierError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(VerifierError::network_failure("aggregator returned 503"))
            }
        }
        let source = FailsHard {
            calls: AtomicU32::new(0),
        };
        let err = fetch_with_retry(&source, "blob", &FetchRetryPolicy::immediate())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifierError::NetworkFailure(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
