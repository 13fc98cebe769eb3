// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chat-Completion Collaborators
//!
//! Clients for the OpenAI-compatible chat-completion gateway hosting both
//! external model collaborators:
//!
//! - **Transcription**: the audio is base64-embedded as an `input_audio`
//!   content part next to the closed-caption instruction
//! - **Analysis**: plain text prompt at temperature 0.3 for stable verdicts
//!
//! Both share [`ChatCompletionClient`], which owns the HTTP plumbing and an
//! optional token-bucket limiter pacing outbound calls.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};

use async_trait::async_trait;
use audio_verifier_domain::services::{
    ContentAnalysisService, TranscriptionService, TRANSCRIPTION_INSTRUCTION,
};
use audio_verifier_domain::value_objects::AudioFormat;
use audio_verifier_domain::VerifierError;

use crate::infrastructure::runtime::rate_limiter::TokenBucket;

/// Default OpenAI-compatible gateway.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Model identifiers on the gateway.
pub const TRANSCRIPTION_MODEL: &str = "mistralai/voxtral-small-24b-2507";
pub const ANALYSIS_MODEL: &str = "google/gemini-2.5-flash";

/// Hard cap on audio submitted for transcription.
pub const MAX_TRANSCRIPTION_BYTES: u64 = 100 * 1024 * 1024;

/// Per-request deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared chat-completion HTTP client.
pub struct ChatCompletionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    limiter: Option<Arc<TokenBucket>>,
}

impl ChatCompletionClient {
    pub fn new(
        base_url: String,
        api_key: String,
        limiter: Option<Arc<TokenBucket>>,
    ) -> Result<Self, VerifierError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VerifierError::internal_error(format!("HTTP client build failed: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            limiter,
        })
    }

    /// Submits a chat completion and returns the first choice's content.
    pub async fn complete(&self, body: Value) -> Result<String, VerifierError> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VerifierError::timeout(format!("Chat completion timed out: {}", e))
                } else {
                    VerifierError::network_failure(format!("Chat completion transport error: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VerifierError::network_failure(format!(
                "Chat completion returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let payload: Value = response.json().await.map_err(|e| {
            VerifierError::network_failure(format!("Chat completion response parse error: {}", e))
        })?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                VerifierError::network_failure("Chat completion response missing content")
            })?;
        Ok(content.trim().to_string())
    }
}

/// Transcription collaborator over the chat gateway.
pub struct OpenRouterTranscriber {
    client: Arc<ChatCompletionClient>,
    model: String,
}

impl OpenRouterTranscriber {
    pub fn new(client: Arc<ChatCompletionClient>) -> Self {
        Self {
            client,
            model: TRANSCRIPTION_MODEL.to_string(),
        }
    }
}

#[async_trait]
impl TranscriptionService for OpenRouterTranscriber {
    async fn transcribe(&self, path: &Path, format: AudioFormat) -> Result<String, VerifierError> {
        let metadata = tokio::fs::metadata(path).await?;
        if metadata.len() > MAX_TRANSCRIPTION_BYTES {
            return Err(VerifierError::processing_failed(format!(
                "Audio file {} bytes exceeds {}MB limit for transcription",
                metadata.len(),
                MAX_TRANSCRIPTION_BYTES / (1024 * 1024)
            )));
        }

        let audio_bytes = tokio::fs::read(path).await?;
        // Base64 of up to 100MB is CPU-visible work; keep it off the reactor
        let audio_base64 =
            tokio::task::spawn_blocking(move || BASE64.encode(&audio_bytes))
                .await
                .map_err(|e| {
                    VerifierError::internal_error(format!("Base64 worker panicked: {}", e))
                })?;

        let body = json!({
            "model": self.model,
            "max_tokens": 4096,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": TRANSCRIPTION_INSTRUCTION},
                    {
                        "type": "input_audio",
                        "input_audio": format!("data:{};base64,{}", format.mime(), audio_base64),
                    },
                ],
            }],
        });

        let transcript = self.client.complete(body).await?;
        tracing::debug!(
            transcript_chars = transcript.len(),
            speakers = transcript.matches("Speaker").count(),
            annotations = transcript.matches('(').count(),
            "Transcription completed"
        );
        Ok(transcript)
    }
}

/// Analysis collaborator over the chat gateway.
pub struct OpenRouterAnalyst {
    client: Arc<ChatCompletionClient>,
    model: String,
}

impl OpenRouterAnalyst {
    pub fn new(client: Arc<ChatCompletionClient>) -> Self {
        Self {
            client,
            model: ANALYSIS_MODEL.to_string(),
        }
    }
}

#[async_trait]
impl ContentAnalysisService for OpenRouterAnalyst {
    async fn analyze(&self, prompt: &str, max_tokens: u32) -> Result<String, VerifierError> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "temperature": 0.3,
            "messages": [{"role": "user", "content": prompt}],
        });
        self.client.complete(body).await
    }
}
