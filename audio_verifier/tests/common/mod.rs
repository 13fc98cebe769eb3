// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shared fixtures for the integration suites: stub collaborator ports,
//! synthesized WAV payloads, and a pipeline harness over the in-memory
//! stores.
#![allow(dead_code)] // each test binary uses its own subset of the fixtures

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use audio_verifier::application::services::reward_applier::RewardApplier;
use audio_verifier::application::services::verification_pipeline::{
    PipelineJob, VerificationPipeline,
};
use audio_verifier::infrastructure::adapters::wav_quality::WavQualityAnalyzer;
use audio_verifier::infrastructure::metrics::MetricsService;
use audio_verifier::infrastructure::repositories::{MemoryContributorStore, MemorySessionStore};
use audio_verifier::infrastructure::runtime::scratch::ScratchFile;
use audio_verifier_domain::entities::{CopyrightReport, DatasetMetadata};
use audio_verifier_domain::repositories::{FailureInfo, SessionRepository};
use audio_verifier_domain::services::{
    ContentAnalysisService, CopyrightDetector, QualityThresholds, TranscriptionService,
};
use audio_verifier_domain::value_objects::AudioFormat;
use audio_verifier_domain::{SessionId, SubmissionInfo, VerifierError};

// --- Audio synthesis ---

/// Builds a PCM_16 mono WAV from normalized samples.
pub fn wav_bytes(sample_rate: u32, samples: &[f64]) -> Vec<u8> {
    let data_len = samples.len() * 2;
    let mut out = Vec::with_capacity(44 + data_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());
    for sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        out.extend_from_slice(&((clamped * 32767.0) as i16).to_le_bytes());
    }
    out
}

/// A 440 Hz sine tone at the given amplitude.
pub fn sine(sample_rate: u32, seconds: f64, amplitude: f64) -> Vec<f64> {
    let frames = (f64::from(sample_rate) * seconds) as usize;
    (0..frames)
        .map(|i| {
            amplitude
                * (2.0 * std::f64::consts::PI * 440.0 * i as f64 / f64::from(sample_rate)).sin()
        })
        .collect()
}

/// A clean 2-second 16 kHz PCM_16 WAV that passes every quality gate.
pub fn clean_wav() -> Vec<u8> {
    wav_bytes(16_000, &sine(16_000, 2.0, 0.25))
}

// --- Stub collaborator ports ---

pub struct StubCopyright {
    pub report: CopyrightReport,
}

#[async_trait]
impl CopyrightDetector for StubCopyright {
    async fn check(&self, _path: &Path) -> CopyrightReport {
        self.report.clone()
    }
}

pub struct StubTranscriber {
    pub transcript: String,
    pub called: AtomicBool,
}

impl StubTranscriber {
    pub fn returning(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            called: AtomicBool::new(false),
        }
    }

    pub fn was_called(&self) -> bool {
        self.called.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionService for StubTranscriber {
    async fn transcribe(
        &self,
        _path: &Path,
        _format: AudioFormat,
    ) -> Result<String, VerifierError> {
        self.called.store(true, Ordering::SeqCst);
        Ok(self.transcript.clone())
    }
}

pub struct StubAnalyst {
    pub response: String,
}

impl StubAnalyst {
    /// Analyst returning the canonical happy-path verdict.
    pub fn approving() -> Self {
        Self {
            response: r#"{"qualityScore": 0.8, "safetyPassed": true, "insights": ["clear audio"], "concerns": []}"#
                .to_string(),
        }
    }

    pub fn returning(response: &str) -> Self {
        Self {
            response: response.to_string(),
        }
    }
}

#[async_trait]
impl ContentAnalysisService for StubAnalyst {
    async fn analyze(&self, _prompt: &str, _max_tokens: u32) -> Result<String, VerifierError> {
        Ok(self.response.clone())
    }
}

/// Copyright stub that cancels the session mid-stage, so the pipeline's
/// next inter-stage check observes the cancellation.
pub struct CancellingCopyright {
    pub sessions: Arc<MemorySessionStore>,
    pub session_id: std::sync::Mutex<Option<SessionId>>,
}

#[async_trait]
impl CopyrightDetector for CancellingCopyright {
    async fn check(&self, _path: &Path) -> CopyrightReport {
        let id = self.session_id.lock().unwrap().expect("session id seeded");
        self.sessions
            .mark_failed(
                id,
                FailureInfo {
                    errors: vec!["Verification cancelled by user".to_string()],
                    stage_failed: "cancelled".to_string(),
                    cancelled: true,
                    ..FailureInfo::default()
                },
            )
            .await
            .unwrap();
        CopyrightReport {
            checked: true,
            ..CopyrightReport::default()
        }
    }
}

// --- Harness ---

pub struct Harness {
    pub sessions: Arc<MemorySessionStore>,
    pub contributors: Arc<MemoryContributorStore>,
    pub pipeline: VerificationPipeline,
    pub temp_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(
        copyright: Arc<dyn CopyrightDetector>,
        transcriber: Arc<dyn TranscriptionService>,
        analyst: Arc<dyn ContentAnalysisService>,
    ) -> Self {
        let sessions = Arc::new(MemorySessionStore::new());
        let contributors = Arc::new(MemoryContributorStore::new());
        let pipeline = VerificationPipeline::new(
            sessions.clone(),
            Arc::new(WavQualityAnalyzer::new(QualityThresholds::default())),
            copyright,
            transcriber,
            analyst,
            Arc::new(RewardApplier::new(contributors.clone())),
            Arc::new(MetricsService::new().unwrap()),
        );
        Self {
            sessions,
            contributors,
            pipeline,
            temp_dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Writes the audio to a scratch file and creates the session row.
    pub async fn make_job(
        &self,
        audio: &[u8],
        metadata: DatasetMetadata,
    ) -> (SessionId, PipelineJob) {
        let scratch = ScratchFile::create(self.temp_dir.path(), "verify", "wav", audio)
            .await
            .unwrap();
        let info = SubmissionInfo {
            blob_reference: "blob-test".to_string(),
            plaintext_size_bytes: audio.len() as u64,
            duration_seconds: 2,
            file_format: "audio/wav".to_string(),
            metadata: metadata.clone(),
        };
        let session_id = self.sessions.create("verif-test", info).await.unwrap();
        let job = PipelineJob {
            session_id,
            scratch,
            format: AudioFormat::Wav,
            metadata,
            blob_reference: "blob-test".to_string(),
        };
        (session_id, job)
    }
}

/// Metadata with a wallet, as the reward path expects.
pub fn metadata_with_wallet(wallet: &str) -> DatasetMetadata {
    DatasetMetadata {
        title: "t".to_string(),
        description: "d".to_string(),
        wallet_address: Some(wallet.to_string()),
        sample_count: 1,
        ..DatasetMetadata::default()
    }
}
