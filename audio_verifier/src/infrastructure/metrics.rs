// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Service Metrics
//!
//! Prometheus metrics for the verification service: session lifecycle
//! counters, per-stage latency, and ingress rejection counts. The registry
//! is owned here and exposed through the `/metrics` route.

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

use audio_verifier_domain::VerifierError;

/// Prometheus metrics for the verifier.
pub struct MetricsService {
    registry: Registry,
    pub sessions_started: IntCounter,
    pub sessions_completed: IntCounter,
    pub sessions_failed: IntCounter,
    pub sessions_cancelled: IntCounter,
    pub submissions_rejected: IntCounterVec,
    pub stage_duration_seconds: HistogramVec,
    pub decrypt_duration_seconds: Histogram,
}

impl MetricsService {
    pub fn new() -> Result<Self, VerifierError> {
        let registry = Registry::new();

        let sessions_started = IntCounter::with_opts(Opts::new(
            "verifier_sessions_started_total",
            "Verification sessions created",
        ))
        .map_err(metrics_err)?;
        let sessions_completed = IntCounter::with_opts(Opts::new(
            "verifier_sessions_completed_total",
            "Verification sessions reaching completed",
        ))
        .map_err(metrics_err)?;
        let sessions_failed = IntCounter::with_opts(Opts::new(
            "verifier_sessions_failed_total",
            "Verification sessions reaching failed",
        ))
        .map_err(metrics_err)?;
        let sessions_cancelled = IntCounter::with_opts(Opts::new(
            "verifier_sessions_cancelled_total",
            "Verification sessions cancelled by callers",
        ))
        .map_err(metrics_err)?;
        let submissions_rejected = IntCounterVec::new(
            Opts::new(
                "verifier_submissions_rejected_total",
                "Submissions rejected at ingress, by reason",
            ),
            &["reason"],
        )
        .map_err(metrics_err)?;
        let stage_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "verifier_stage_duration_seconds",
                "Wall-clock duration of pipeline stages",
            )
            .buckets(prometheus::exponential_buckets(0.05, 2.0, 14).map_err(metrics_err)?),
            &["stage"],
        )
        .map_err(metrics_err)?;
        let decrypt_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "verifier_decrypt_duration_seconds",
                "Wall-clock duration of blob decryption",
            )
            .buckets(prometheus::exponential_buckets(0.5, 2.0, 12).map_err(metrics_err)?),
        )
        .map_err(metrics_err)?;

        registry
            .register(Box::new(sessions_started.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(sessions_completed.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(sessions_failed.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(sessions_cancelled.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(submissions_rejected.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(stage_duration_seconds.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(decrypt_duration_seconds.clone()))
            .map_err(metrics_err)?;

        Ok(Self {
            registry,
            sessions_started,
            sessions_completed,
            sessions_failed,
            sessions_cancelled,
            submissions_rejected,
            stage_duration_seconds,
            decrypt_duration_seconds,
        })
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, VerifierError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_err)?;
        String::from_utf8(buffer)
            .map_err(|e| VerifierError::internal_error(format!("Metrics encoding: {}", e)))
    }
}

fn metrics_err(e: impl std::fmt::Display) -> VerifierError {
    VerifierError::internal_error(format!("Metrics registration failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_appear_in_exposition() {
        let metrics = MetricsService::new().unwrap();
        metrics.sessions_started.inc();
        metrics
            .submissions_rejected
            .with_label_values(&["format_probe_failed"])
            .inc();
        metrics
            .stage_duration_seconds
            .with_label_values(&["quality"])
            .observe(0.25);

        let text = metrics.encode().unwrap();
        assert!(text.contains("verifier_sessions_started_total 1"));
        assert!(text.contains("format_probe_failed"));
        assert!(text.contains("verifier_stage_duration_seconds"));
    }
}
