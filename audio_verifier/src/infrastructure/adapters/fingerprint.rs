// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Fingerprint Service Client
//!
//! Client for the external fingerprinting copyright-match service.
//!
//! Copyright detection is strictly best-effort: a missing credential
//! disables the feature (`checked = false`, no error), and any service
//! failure is downgraded into the report instead of surfacing as a stage
//! error. At most five matches are kept, mirroring the service's own
//! reporting contract.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use async_trait::async_trait;
use audio_verifier_domain::entities::{CopyrightMatch, CopyrightReport};
use audio_verifier_domain::services::CopyrightDetector;

/// Per-lookup deadline.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(120);

/// Matches kept in a report.
const MAX_MATCHES: usize = 5;

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    results: Vec<LookupResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    #[serde(default)]
    score: f64,
    #[serde(default)]
    recording_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
}

/// HTTP implementation of the [`CopyrightDetector`] port.
pub struct HttpFingerprintDetector {
    client: Option<reqwest::Client>,
    base_url: String,
    api_key: String,
    /// Score at or above which a lookup result counts as a match.
    confidence_threshold: f64,
}

impl HttpFingerprintDetector {
    /// Creates the detector; a missing credential or endpoint disables
    /// lookups gracefully.
    pub fn new(api_key: Option<String>, service_url: Option<String>) -> Self {
        let enabled = api_key.is_some() && service_url.is_some();
        if api_key.is_some() && service_url.is_none() {
            tracing::warn!(
                "FINGERPRINT_API_KEY set without FINGERPRINT_SERVICE_URL, copyright checks disabled"
            );
        }
        let client = enabled.then(|| {
            reqwest::Client::builder()
                .timeout(LOOKUP_TIMEOUT)
                .build()
                .ok()
        });
        Self {
            client: client.flatten(),
            base_url: service_url
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.unwrap_or_default(),
            confidence_threshold: 0.8,
        }
    }

    async fn lookup(&self, path: &Path) -> Result<LookupResponse, String> {
        let client = self
            .client
            .as_ref()
            .ok_or("fingerprint client unavailable")?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("failed to read audio for fingerprinting: {}", e))?;

        let response = client
            .post(format!("{}/v1/lookup", self.base_url))
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| format!("fingerprint lookup transport error: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("fingerprint service returned {}", response.status()));
        }
        response
            .json::<LookupResponse>()
            .await
            .map_err(|e| format!("fingerprint response parse error: {}", e))
    }

    fn format_results(&self, response: LookupResponse) -> CopyrightReport {
        let mut detected = false;
        let mut max_confidence: f64 = 0.0;
        let mut matches = Vec::new();

        for result in response.results {
            max_confidence = max_confidence.max(result.score);
            if result.score >= self.confidence_threshold {
                detected = true;
                if matches.len() < MAX_MATCHES {
                    matches.push(CopyrightMatch {
                        title: non_empty(result.title),
                        artist: non_empty(result.artist),
                        confidence: round3(result.score),
                        recording_id: result.recording_id,
                    });
                }
            }
        }

        CopyrightReport {
            checked: true,
            detected,
            confidence: round3(max_confidence),
            matches,
            error: None,
        }
    }
}

#[async_trait]
impl CopyrightDetector for HttpFingerprintDetector {
    async fn check(&self, path: &Path) -> CopyrightReport {
        if self.client.is_none() {
            tracing::debug!("Fingerprint credential unset, copyright check skipped");
            return CopyrightReport::default();
        }

        match self.lookup(path).await {
            Ok(response) => self.format_results(response),
            Err(message) => {
                tracing::warn!(error = %message, "Copyright check failed");
                CopyrightReport {
                    checked: false,
                    detected: false,
                    confidence: 0.0,
                    matches: Vec::new(),
                    error: Some(message),
                }
            }
        }
    }
}

fn non_empty(value: String) -> String {
    if value.is_empty() {
        "Unknown".to_string()
    } else {
        value
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> HttpFingerprintDetector {
        HttpFingerprintDetector::new(
            Some("key".to_string()),
            Some("https://fingerprint.example".to_string()),
        )
    }

    #[test]
    fn test_format_results_threshold() {
        let report = detector().format_results(LookupResponse {
            results: vec![
                LookupResult {
                    score: 0.95,
                    recording_id: "r1".to_string(),
                    title: "Song".to_string(),
                    artist: "Artist".to_string(),
                },
                LookupResult {
                    score: 0.5,
                    recording_id: "r2".to_string(),
                    title: "Other".to_string(),
                    artist: String::new(),
                },
            ],
        });
        assert!(report.checked);
        assert!(report.detected);
        assert_eq!(report.confidence, 0.95);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].artist, "Artist");
    }

    #[test]
    fn test_below_threshold_reports_confidence_without_detection() {
        let report = detector().format_results(LookupResponse {
            results: vec![LookupResult {
                score: 0.6,
                recording_id: "r".to_string(),
                title: String::new(),
                artist: String::new(),
            }],
        });
        assert!(report.checked);
        assert!(!report.detected);
        assert_eq!(report.confidence, 0.6);
        assert!(report.matches.is_empty());
    }

    #[test]
    fn test_matches_capped_at_five() {
        let results = (0..8)
            .map(|i| LookupResult {
                score: 0.9,
                recording_id: format!("r{}", i),
                title: format!("t{}", i),
                artist: "a".to_string(),
            })
            .collect();
        let report = detector().format_results(LookupResponse { results });
        assert_eq!(report.matches.len(), MAX_MATCHES);
    }

    #[tokio::test]
    async fn test_unset_credential_skips_quietly() {
        let detector = HttpFingerprintDetector::new(None, None);
        let report = detector.check(Path::new("/nonexistent")).await;
        assert!(!report.checked);
        assert!(report.error.is_none());
    }
}
