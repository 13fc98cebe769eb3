// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Decryption Engine
//!
//! Turns an encrypted blob reference into plaintext bytes.
//!
//! ## Algorithm
//!
//! 1. **Fetch** the blob from the aggregator with the propagation-tolerant
//!    retry schedule ([`blob_store`](super::blob_store)).
//! 2. **Envelope detection**: if the blob matches the sealed-key envelope
//!    layout, split it; otherwise the whole blob is directly sealed.
//! 3. **Sealed-key recovery** through the key service
//!    ([`key_service`](super::key_service)). For the envelope form the
//!    recovered bytes must be a 32-byte AEAD key; for the direct form they
//!    are the plaintext itself.
//! 4. **AEAD open**: `[iv: 12][ct+tag]` under AES-256-GCM. The open runs on
//!    a blocking worker thread so multi-hundred-megabyte payloads never
//!    stall the ingress reactor; a tag mismatch is a fatal
//!    `DecryptionFailure`.
//!
//! Fetched ciphertext buffers are dropped as soon as the plaintext exists;
//! recovered key material zeroizes on drop.

use std::sync::Arc;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};

use async_trait::async_trait;
use audio_verifier_domain::value_objects::encrypted_envelope::IV_LEN;
use audio_verifier_domain::{EncryptedEnvelope, VerifierError};

use super::blob_store::{fetch_with_retry, BlobSource, FetchRetryPolicy};
use super::key_service::KeyRecovery;

/// AES-256 key length expected from the key service for envelope blobs.
const AEAD_KEY_LEN: usize = 32;

/// One decryption request from the ingress gate.
#[derive(Debug, Clone)]
pub struct DecryptRequest {
    pub blob_reference: String,
    pub encrypted_object_hex: String,
    pub identity: String,
    pub session_key: String,
}

/// Port for the full decryption operation; the ingress gate depends on this
/// so tests can substitute the whole engine.
#[async_trait]
pub trait Decryptor: Send + Sync {
    async fn decrypt(&self, request: &DecryptRequest) -> Result<Vec<u8>, VerifierError>;
}

/// Production decryption engine over the blob and key-service ports.
pub struct DecryptionEngine {
    blobs: Arc<dyn BlobSource>,
    keys: Arc<dyn KeyRecovery>,
    fetch_policy: FetchRetryPolicy,
}

impl DecryptionEngine {
    pub fn new(
        blobs: Arc<dyn BlobSource>,
        keys: Arc<dyn KeyRecovery>,
        fetch_policy: FetchRetryPolicy,
    ) -> Self {
        Self {
            blobs,
            keys,
            fetch_policy,
        }
    }
}

#[async_trait]
impl Decryptor for DecryptionEngine {
    async fn decrypt(&self, request: &DecryptRequest) -> Result<Vec<u8>, VerifierError> {
        if request.encrypted_object_hex.is_empty() {
            return Err(VerifierError::ValidationError(
                "encrypted_object_hex is required".to_string(),
            ));
        }
        hex::decode(&request.encrypted_object_hex).map_err(|e| {
            VerifierError::ValidationError(format!("encrypted_object_hex is not hex: {}", e))
        })?;

        let blob = fetch_with_retry(
            self.blobs.as_ref(),
            &request.blob_reference,
            &self.fetch_policy,
        )
        .await?;

        match EncryptedEnvelope::parse(&blob) {
            Some(envelope) => {
                tracing::debug!(
                    blob = %short_ref(&request.blob_reference),
                    sealed_key_len = envelope.sealed_key().len(),
                    "Detected envelope encryption format"
                );
                drop(blob);

                let key = self
                    .keys
                    .recover(
                        &request.encrypted_object_hex,
                        &request.identity,
                        &request.session_key,
                    )
                    .await?;
                if key.len() != AEAD_KEY_LEN {
                    return Err(VerifierError::decryption_failure(format!(
                        "Recovered key has length {}, expected {}",
                        key.len(),
                        AEAD_KEY_LEN
                    )));
                }

                open_aead(key.as_bytes(), &envelope).await
            }
            None => {
                tracing::debug!(
                    blob = %short_ref(&request.blob_reference),
                    "Using direct sealed decryption"
                );
                drop(blob);
                let plaintext = self
                    .keys
                    .recover(
                        &request.encrypted_object_hex,
                        &request.identity,
                        &request.session_key,
                    )
                    .await?;
                Ok(plaintext.into_bytes())
            }
        }
    }
}

/// Opens the envelope ciphertext on a blocking worker thread.
async fn open_aead(key: &[u8], envelope: &EncryptedEnvelope) -> Result<Vec<u8>, VerifierError> {
    let (iv, ciphertext) = envelope.split_iv().ok_or_else(|| {
        VerifierError::decryption_failure(format!(
            "Ciphertext shorter than the {}-byte nonce",
            IV_LEN
        ))
    })?;

    let key = key.to_vec();
    let iv = iv.to_vec();
    let ciphertext = ciphertext.to_vec();

    tokio::task::spawn_blocking(move || {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_ref())
            .map_err(|_| {
                VerifierError::decryption_failure(
                    "AEAD authentication failed (tag mismatch or wrong key)",
                )
            })
    })
    .await
    .map_err(|e| VerifierError::internal_error(format!("AEAD worker panicked: {}", e)))?
}

fn short_ref(blob_ref: &str) -> String {
    blob_ref.chars().take(16).collect()
}
