// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Quality-gate scenarios through the full pipeline with the real WAV
//! analyzer: clipping, pervasive silence, and warning capture.

mod common;

use std::sync::Arc;

use audio_verifier_domain::entities::CopyrightReport;
use audio_verifier_domain::repositories::SessionRepository;
use audio_verifier_domain::value_objects::{SessionStatus, VerificationStage};

use common::*;

fn harness() -> Harness {
    Harness::new(
        Arc::new(StubCopyright {
            report: CopyrightReport {
                checked: true,
                ..CopyrightReport::default()
            },
        }),
        Arc::new(StubTranscriber::returning("hello")),
        Arc::new(StubAnalyst::approving()),
    )
}

#[tokio::test]
async fn test_clipped_audio_fails_with_clipping_reason() {
    let harness = harness();
    // Amplitude 1.2 saturates at full scale, so the analyzer sees clipping
    let clipped = wav_bytes(16_000, &sine(16_000, 2.0, 1.2));
    let (session_id, job) = harness.make_job(&clipped, metadata_with_wallet("0x01")).await;
    let scratch_path = job.scratch.path().to_path_buf();

    harness.pipeline.run(job).await;

    let session = harness.sessions.get(session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    assert_eq!(session.stage, VerificationStage::Failed);
    let error = session.error.as_deref().unwrap();
    assert!(error.contains("clipping"), "error was: {}", error);
    assert!(error.contains("failure_reason=clipping_detected"));
    assert!(session.results.is_none());
    assert!(!scratch_path.exists());
}

#[tokio::test]
async fn test_silent_audio_fails_with_silence_reason() {
    let harness = harness();
    // Two seconds of pure silence: > 95% silent
    let silent = wav_bytes(16_000, &vec![0.0; 32_000]);
    let (session_id, job) = harness.make_job(&silent, metadata_with_wallet("0x02")).await;

    harness.pipeline.run(job).await;

    let session = harness.sessions.get(session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    let error = session.error.as_deref().unwrap();
    assert!(error.contains("failure_reason=excessive_silence"), "error was: {}", error);
}

#[tokio::test]
async fn test_low_sample_rate_fails_with_reason() {
    let harness = harness();
    let low_rate = wav_bytes(4_000, &sine(4_000, 2.0, 0.25));
    let (session_id, job) = harness.make_job(&low_rate, metadata_with_wallet("0x03")).await;

    harness.pipeline.run(job).await;

    let session = harness.sessions.get(session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    assert!(session
        .error
        .as_deref()
        .unwrap()
        .contains("failure_reason=sample_rate_too_low"));
}

#[tokio::test]
async fn test_corrupt_audio_fails_with_probe_reason() {
    let harness = harness();
    let mut garbage = b"RIFF".to_vec();
    garbage.extend_from_slice(&[0u8; 2000]); // RIFF magic but no WAVE structure
    let (session_id, job) = harness.make_job(&garbage, metadata_with_wallet("0x04")).await;

    harness.pipeline.run(job).await;

    let session = harness.sessions.get(session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    assert!(session
        .error
        .as_deref()
        .unwrap()
        .contains("failure_reason=format_probe_failed"));
}

#[tokio::test]
async fn test_truncated_wav_passes_with_warning_recorded() {
    let harness = harness();
    let mut truncated = wav_bytes(16_000, &sine(16_000, 2.5, 0.25));
    truncated.truncate(truncated.len() - 2_000);
    let (session_id, job) = harness
        .make_job(&truncated, metadata_with_wallet("0x05"))
        .await;

    harness.pipeline.run(job).await;

    let session = harness.sessions.get(session_id).await.unwrap().unwrap();
    // Warnings are never fatal: the run completes, the warning is stored
    assert_eq!(session.status, SessionStatus::Completed);
    assert!(session
        .warnings
        .iter()
        .any(|w| w.contains("shorter than declared")));
}
