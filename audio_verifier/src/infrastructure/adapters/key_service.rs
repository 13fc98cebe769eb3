// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sealed-Key Recovery Client
//!
//! Client for the external key service that opens sealed keys under the
//! configured sealing policy.
//!
//! ## Contract
//!
//! Request: `(encrypted object hex, identity, session key material)` plus
//! the package id naming the policy. Response: the recovered raw bytes —
//! a 32-byte AEAD key for envelope submissions, the plaintext itself for
//! directly-sealed ones.
//!
//! Transport errors are retried up to three attempts with exponential
//! backoff and a 60-second per-attempt deadline. Policy denials (401/403)
//! and malformed-input rejections (4xx) are terminal. The recovered bytes
//! are zeroized when [`RecoveredSecret`] drops.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use zeroize::Zeroize;

use async_trait::async_trait;
use audio_verifier_domain::VerifierError;

/// Per-attempt deadline for key recovery.
const RECOVERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Recovered key material; zeroized on drop.
pub struct RecoveredSecret(Vec<u8>);

impl RecoveredSecret {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the secret without zeroizing; used when the bytes ARE the
    /// plaintext payload (direct sealing).
    pub fn into_bytes(mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }
}

impl Drop for RecoveredSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Port for the sealed-key recovery service.
#[async_trait]
pub trait KeyRecovery: Send + Sync {
    async fn recover(
        &self,
        encrypted_object_hex: &str,
        identity: &str,
        session_key: &str,
    ) -> Result<RecoveredSecret, VerifierError>;
}

/// Retry schedule for transport errors.
#[derive(Debug, Clone, Copy)]
pub struct KeyRetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for KeyRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl KeyRetryPolicy {
    /// Zero-delay schedule for tests.
    pub fn immediate() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        // Exponential backoff with a little jitter to avoid thundering herds
        let base = self.base_delay * 2u32.saturating_pow(attempt - 1);
        if base.is_zero() {
            return base;
        }
        let jitter = rand::rng().random_range(0..=base.as_millis() as u64 / 4);
        base + Duration::from_millis(jitter)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecoverRequest<'a> {
    encrypted_object: &'a str,
    identity: &'a str,
    session_key: &'a str,
    package_id: &'a str,
}

/// HTTP implementation of [`KeyRecovery`].
pub struct HttpKeyService {
    client: reqwest::Client,
    base_url: String,
    package_id: String,
    policy: KeyRetryPolicy,
}

impl HttpKeyService {
    pub fn new(
        base_url: String,
        package_id: String,
        policy: KeyRetryPolicy,
    ) -> Result<Self, VerifierError> {
        let client = reqwest::Client::builder()
            .timeout(RECOVERY_TIMEOUT)
            .build()
            .map_err(|e| VerifierError::internal_error(format!("HTTP client build failed: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            package_id,
            policy,
        })
    }

    async fn attempt(
        &self,
        request: &RecoverRequest<'_>,
    ) -> Result<RecoveredSecret, VerifierError> {
        let url = format!("{}/v1/keys/recover", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VerifierError::timeout(format!("Key recovery timed out: {}", e))
                } else {
                    VerifierError::network_failure(format!("Key service transport error: {}", e))
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(VerifierError::AuthenticationFailure(format!(
                "Key service denied policy access ({})",
                status
            )));
        }
        if status.is_client_error() {
            return Err(VerifierError::ValidationError(format!(
                "Key service rejected request ({})",
                status
            )));
        }
        if !status.is_success() {
            return Err(VerifierError::network_failure(format!(
                "Key service returned {}",
                status
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            VerifierError::network_failure(format!("Key service body read failed: {}", e))
        })?;
        if bytes.is_empty() {
            return Err(VerifierError::decryption_failure(
                "Key service returned empty key material",
            ));
        }
        Ok(RecoveredSecret::new(bytes.to_vec()))
    }
}

#[async_trait]
impl KeyRecovery for HttpKeyService {
    async fn recover(
        &self,
        encrypted_object_hex: &str,
        identity: &str,
        session_key: &str,
    ) -> Result<RecoveredSecret, VerifierError> {
        let request = RecoverRequest {
            encrypted_object: encrypted_object_hex,
            identity,
            session_key,
            package_id: &self.package_id,
        };

        let mut last_err = None;
        for attempt in 1..=self.policy.max_attempts {
            match self.attempt(&request).await {
                Ok(secret) => {
                    tracing::debug!(
                        identity = %identity.chars().take(16).collect::<String>(),
                        attempt,
                        "Recovered sealed key"
                    );
                    return Ok(secret);
                }
                Err(err) if err.is_recoverable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Key recovery attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err
            .unwrap_or_else(|| VerifierError::internal_error("Key recovery retries exhausted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovered_secret_into_bytes() {
        let secret = RecoveredSecret::new(vec![1, 2, 3]);
        assert_eq!(secret.len(), 3);
        assert_eq!(secret.into_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn test_delay_grows_exponentially() {
        let policy = KeyRetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        };
        let first = policy.delay_for(1);
        let second = policy.delay_for(2);
        assert!(first >= Duration::from_millis(100));
        assert!(first <= Duration::from_millis(125));
        assert!(second >= Duration::from_millis(200));
        assert!(second <= Duration::from_millis(250));
    }

    #[test]
    fn test_immediate_policy_has_no_delay() {
        assert!(KeyRetryPolicy::immediate().delay_for(1).is_zero());
    }
}
