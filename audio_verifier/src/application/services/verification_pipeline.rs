// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Verification Pipeline
//!
//! The six-stage state machine driving one submission from acceptance to
//! verdict.
//!
//! ## State Machine
//!
//! ```text
//! queued(0.00)
//!   → ingesting(0.05)
//!     → quality(0.15…0.30) ──[fail]→ failed
//!       → copyright(0.35…0.45)
//!         → transcription(0.55…0.65) ──[empty]→ failed
//!           → analysis(0.75…0.85)
//!             → finalizing(0.95)
//!               → completed(1.00)
//! ```
//!
//! One run owns one scratch file (deleted on every exit path via the RAII
//! guard) and mutates one typed result shell across stages; serialization
//! to the store happens only at finalization.
//!
//! ## Failure Model
//!
//! - Quality failure, empty transcript, oversized transcription input, and
//!   any unexpected error are **terminal**: the session is marked failed
//!   with the failing stage's name and errors.
//! - Copyright detector errors and analysis parse failures are **recovered
//!   locally** (downgrade + warning, safe defaults).
//! - A failure while writing the failure itself is logged and never
//!   escalates.
//!
//! ## Cancellation
//!
//! The session status is checked between stages; an observed `cancelled`
//! halts the run before the next stage, skips all further external calls,
//! and cleans up the scratch file.

use std::sync::Arc;
use std::time::Instant;

use audio_verifier_domain::entities::{DatasetMetadata, QualityReport, VerificationResults};
use audio_verifier_domain::repositories::{FailureInfo, SessionRepository};
use audio_verifier_domain::services::analysis_prompt::{build_analysis_prompt, build_per_file_prompt};
use audio_verifier_domain::services::{
    compute_approval, compute_rubric_score, parse_analysis_response, parse_per_file_response,
    approval::threshold_coincidence_warning, ContentAnalysisService, CopyrightDetector,
    QualityAnalyzer, QualityThresholds, TranscriptionService,
};
use audio_verifier_domain::value_objects::AudioFormat;
use audio_verifier_domain::{SessionId, SessionStatus, VerificationStage, VerifierError};

use crate::application::services::reward_applier::{RewardApplier, RewardInput};
use crate::infrastructure::metrics::MetricsService;
use crate::infrastructure::runtime::scratch::ScratchFile;
use crate::infrastructure::runtime::supervisor::spawn_supervised;

/// Token budgets for the analysis calls.
const ANALYSIS_MAX_TOKENS: u32 = 2048;
const PER_FILE_MAX_TOKENS: u32 = 1024;

/// One unit of work handed from ingress to a pipeline worker.
pub struct PipelineJob {
    pub session_id: SessionId,
    pub scratch: ScratchFile,
    pub format: AudioFormat,
    pub metadata: DatasetMetadata,
    pub blob_reference: String,
}

/// Outcome of a stage that may terminate the run.
enum StageFlow<T> {
    Continue(T),
    Halt,
}

/// The six-stage verification state machine.
pub struct VerificationPipeline {
    sessions: Arc<dyn SessionRepository>,
    quality: Arc<dyn QualityAnalyzer>,
    copyright: Arc<dyn CopyrightDetector>,
    transcriber: Arc<dyn TranscriptionService>,
    analyst: Arc<dyn ContentAnalysisService>,
    rewards: Arc<RewardApplier>,
    metrics: Arc<MetricsService>,
    thresholds: QualityThresholds,
}

impl VerificationPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        quality: Arc<dyn QualityAnalyzer>,
        copyright: Arc<dyn CopyrightDetector>,
        transcriber: Arc<dyn TranscriptionService>,
        analyst: Arc<dyn ContentAnalysisService>,
        rewards: Arc<RewardApplier>,
        metrics: Arc<MetricsService>,
    ) -> Self {
        Self {
            sessions,
            quality,
            copyright,
            transcriber,
            analyst,
            rewards,
            metrics,
            thresholds: QualityThresholds::default(),
        }
    }

    /// Runs one submission to a terminal state.
    ///
    /// Never returns an error to the worker: every failure path ends in a
    /// `mark_failed` write (or a logged inability to perform it). The
    /// scratch file inside `job` is deleted when this function returns,
    /// on every path.
    pub async fn run(&self, job: PipelineJob) {
        let session_id = job.session_id;
        tracing::info!(
            session_id = %session_id.short(),
            blob = %job.blob_reference.chars().take(16).collect::<String>(),
            "Starting verification pipeline"
        );

        match self.run_stages(&job).await {
            Ok(true) => {
                self.metrics.sessions_completed.inc();
            }
            Ok(false) => {
                // Terminal failure or observed cancellation; already recorded
            }
            Err(e) => {
                tracing::error!(
                    session_id = %session_id.short(),
                    error = %e,
                    "Pipeline failed unexpectedly"
                );
                self.metrics.sessions_failed.inc();
                self.record_failure(
                    session_id,
                    FailureInfo {
                        errors: vec![format!("Pipeline error: {}", e)],
                        stage_failed: "system".to_string(),
                        ..FailureInfo::default()
                    },
                )
                .await;
            }
        }
        // `job.scratch` drops here, removing the plaintext from disk
    }

    /// Drives the stages; `Ok(true)` is a completed verdict, `Ok(false)` a
    /// recorded terminal failure or cancellation.
    async fn run_stages(&self, job: &PipelineJob) -> Result<bool, VerifierError> {
        let session_id = job.session_id;
        let mut results = VerificationResults::default();

        self.update_stage(session_id, VerificationStage::Ingesting, 0.05)
            .await?;

        // Stage 1: Quality
        let quality = match self.stage_quality(session_id, job).await? {
            StageFlow::Continue(q) => q,
            StageFlow::Halt => return Ok(false),
        };
        results.quality = quality;

        if self.observed_cancellation(session_id).await? {
            return Ok(false);
        }

        // Stage 2: Copyright (never fatal)
        results.copyright = self.stage_copyright(session_id, job).await?;

        if self.observed_cancellation(session_id).await? {
            return Ok(false);
        }

        // Stage 3: Transcription
        let transcript = match self.stage_transcription(session_id, job).await? {
            StageFlow::Continue(t) => t,
            StageFlow::Halt => return Ok(false),
        };
        results.set_transcript(transcript);

        if self.observed_cancellation(session_id).await? {
            return Ok(false);
        }

        // Stage 4: Analysis (parse failures recover to safe defaults)
        results.analysis = self
            .stage_analysis(session_id, job, &results.transcript, &results.quality)
            .await?;

        if self.observed_cancellation(session_id).await? {
            return Ok(false);
        }

        // Stage 5: Aggregation -- the only place approval is decided
        self.update_stage(session_id, VerificationStage::Finalizing, 0.95)
            .await?;
        results.approved =
            compute_approval(&results.quality, &results.copyright, &results.analysis);
        results.safety_passed = results.analysis.safety_passed;
        if let Some(warning) = threshold_coincidence_warning(&results.copyright) {
            self.add_warnings(session_id, &[warning]).await;
        }

        tracing::info!(
            session_id = %session_id.short(),
            quality = results.quality.passed,
            copyright_detected = results.copyright.detected,
            copyright_confidence = results.copyright.confidence,
            safety = results.analysis.safety_passed,
            approved = results.approved,
            "Aggregated approval verdict"
        );

        // Stage 6: Finalization
        let reward = self.reward_input(&results, job);
        let finalized = self
            .sessions
            .mark_completed(session_id, results)
            .await?;
        if !finalized {
            return Err(VerifierError::processing_failed(
                "Failed to finalize verification",
            ));
        }
        tracing::info!(session_id = %session_id.short(), "Pipeline completed");

        // Fire-and-forget: the applier is idempotent on the session id
        let rewards = Arc::clone(&self.rewards);
        let _ = spawn_supervised("reward-applier", async move {
            rewards.apply(reward).await.map(|_| ())
        });

        Ok(true)
    }

    async fn stage_quality(
        &self,
        session_id: SessionId,
        job: &PipelineJob,
    ) -> Result<StageFlow<QualityReport>, VerifierError> {
        let started = Instant::now();
        self.update_stage(session_id, VerificationStage::Quality, 0.15)
            .await?;

        let check = self.quality.analyze(job.scratch.path()).await?;

        // Warnings are never fatal and recorded regardless of pass/fail
        if !check.warnings.is_empty() {
            tracing::info!(
                session_id = %session_id.short(),
                count = check.warnings.len(),
                "Quality check captured warnings"
            );
            self.add_warnings(session_id, &check.warnings).await;
        }

        self.metrics
            .stage_duration_seconds
            .with_label_values(&["quality"])
            .observe(started.elapsed().as_secs_f64());

        let mut quality = match check.quality {
            Some(q) if q.passed => q,
            other => {
                let failure_reason = check.failure_reason;
                tracing::warn!(
                    session_id = %session_id.short(),
                    reason = failure_reason.map(|r| r.as_str()).unwrap_or("unknown"),
                    errors = ?check.errors,
                    "Quality check failed"
                );
                self.metrics.sessions_failed.inc();
                let errors = if check.errors.is_empty() {
                    vec![match other {
                        Some(_) => "Audio failed quality thresholds".to_string(),
                        None => "Invalid or corrupted audio file".to_string(),
                    }]
                } else {
                    check.errors
                };
                self.record_failure(
                    session_id,
                    FailureInfo {
                        errors,
                        stage_failed: "quality".to_string(),
                        failure_reason,
                        ..FailureInfo::default()
                    },
                )
                .await;
                return Ok(StageFlow::Halt);
            }
        };

        quality.score = compute_rubric_score(&quality, &self.thresholds);
        tracing::info!(
            session_id = %session_id.short(),
            score = quality.score,
            duration_s = quality.duration,
            sample_rate = quality.sample_rate,
            "Quality check passed"
        );

        self.update_stage(session_id, VerificationStage::Quality, 0.30)
            .await?;
        Ok(StageFlow::Continue(quality))
    }

    async fn stage_copyright(
        &self,
        session_id: SessionId,
        job: &PipelineJob,
    ) -> Result<audio_verifier_domain::CopyrightReport, VerifierError> {
        let started = Instant::now();
        self.update_stage(session_id, VerificationStage::Copyright, 0.35)
            .await?;

        let report = self.copyright.check(job.scratch.path()).await;

        if let Some(error) = &report.error {
            // Detector failure downgrades to unchecked, recorded as a warning
            tracing::warn!(session_id = %session_id.short(), error = %error, "Copyright check failed");
            self.add_warnings(session_id, &[format!("Copyright check unavailable: {}", error)])
                .await;
        } else if report.checked {
            tracing::info!(
                session_id = %session_id.short(),
                detected = report.detected,
                confidence = report.confidence,
                matches = report.matches.len(),
                "Copyright check completed"
            );
        }

        self.metrics
            .stage_duration_seconds
            .with_label_values(&["copyright"])
            .observe(started.elapsed().as_secs_f64());
        self.update_stage(session_id, VerificationStage::Copyright, 0.45)
            .await?;
        Ok(report)
    }

    async fn stage_transcription(
        &self,
        session_id: SessionId,
        job: &PipelineJob,
    ) -> Result<StageFlow<String>, VerifierError> {
        let started = Instant::now();
        self.update_stage(session_id, VerificationStage::Transcription, 0.55)
            .await?;

        let transcript = match self
            .transcriber
            .transcribe(job.scratch.path(), job.format)
            .await
        {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(session_id = %session_id.short(), error = %e, "Transcription failed");
                self.metrics.sessions_failed.inc();
                self.record_failure(
                    session_id,
                    FailureInfo {
                        errors: vec![format!("Failed to transcribe audio: {}", e)],
                        stage_failed: "transcription".to_string(),
                        ..FailureInfo::default()
                    },
                )
                .await;
                return Ok(StageFlow::Halt);
            }
        };

        if transcript.is_empty() {
            tracing::warn!(session_id = %session_id.short(), "Transcription returned empty");
            self.metrics.sessions_failed.inc();
            self.record_failure(
                session_id,
                FailureInfo {
                    errors: vec!["Failed to transcribe audio".to_string()],
                    stage_failed: "transcription".to_string(),
                    ..FailureInfo::default()
                },
            )
            .await;
            return Ok(StageFlow::Halt);
        }

        tracing::info!(
            session_id = %session_id.short(),
            transcript_chars = transcript.len(),
            "Transcription completed"
        );
        self.metrics
            .stage_duration_seconds
            .with_label_values(&["transcription"])
            .observe(started.elapsed().as_secs_f64());
        self.update_stage(session_id, VerificationStage::Transcription, 0.65)
            .await?;
        Ok(StageFlow::Continue(transcript))
    }

    async fn stage_analysis(
        &self,
        session_id: SessionId,
        job: &PipelineJob,
        transcript: &str,
        quality: &QualityReport,
    ) -> Result<audio_verifier_domain::AnalysisReport, VerifierError> {
        let started = Instant::now();
        self.update_stage(session_id, VerificationStage::Analysis, 0.75)
            .await?;

        let prompt = build_analysis_prompt(transcript, &job.metadata, quality);
        let mut analysis = match self.analyst.analyze(&prompt, ANALYSIS_MAX_TOKENS).await {
            Ok(response) => match parse_analysis_response(&response) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    tracing::error!(
                        session_id = %session_id.short(),
                        reason = %reason,
                        "Failed to parse analysis response"
                    );
                    audio_verifier_domain::AnalysisReport::fallback()
                }
            },
            Err(e) => {
                // The stage recovers locally; the verdict uses safe defaults
                tracing::error!(session_id = %session_id.short(), error = %e, "Analysis call failed");
                audio_verifier_domain::AnalysisReport::fallback()
            }
        };

        // Optional second pass for multi-file datasets; never fatal
        if job.metadata.per_file_metadata.len() > 1 {
            let per_file_prompt = build_per_file_prompt(transcript, &job.metadata.per_file_metadata);
            match self.analyst.analyze(&per_file_prompt, PER_FILE_MAX_TOKENS).await {
                Ok(response) => {
                    if let Some(analyses) = parse_per_file_response(&response) {
                        analysis.file_analyses = analyses;
                    }
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id.short(), error = %e, "Per-file analysis failed");
                }
            }
        }

        tracing::info!(
            session_id = %session_id.short(),
            quality_score = analysis.quality_score,
            suggested_price = analysis.suggested_price,
            safety_passed = analysis.safety_passed,
            insights = analysis.insights.len(),
            concerns = analysis.concerns.len(),
            "Analysis completed"
        );
        self.metrics
            .stage_duration_seconds
            .with_label_values(&["analysis"])
            .observe(started.elapsed().as_secs_f64());
        self.update_stage(session_id, VerificationStage::Analysis, 0.85)
            .await?;
        Ok(analysis)
    }

    fn reward_input(&self, results: &VerificationResults, job: &PipelineJob) -> RewardInput {
        // The rarity researcher is an external collaborator; until its tier
        // lands on the session, the analysis quality score is the rarity proxy.
        let rarity_score = (results.analysis.quality_score * 100.0).round() as u8;
        RewardInput {
            session_id: job.session_id,
            wallet_address: if results.approved {
                job.metadata.wallet_address.clone()
            } else {
                None
            },
            rarity_score,
            quality_score: results.analysis.quality_score,
            sample_count: job.metadata.sample_count.max(1),
            is_first_bulk: false,
            subject_rarity_tier: None,
            specificity_grade: None,
            verification_status: None,
        }
    }

    /// Inter-stage cancellation check mandated by the concurrency model.
    async fn observed_cancellation(&self, session_id: SessionId) -> Result<bool, VerifierError> {
        let session = self.sessions.get(session_id).await?;
        match session {
            Some(s) if s.status == SessionStatus::Cancelled => {
                tracing::info!(session_id = %session_id.short(), "Cancellation observed, halting");
                self.metrics.sessions_cancelled.inc();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                tracing::warn!(session_id = %session_id.short(), "Session vanished mid-run, halting");
                Ok(true)
            }
        }
    }

    async fn update_stage(
        &self,
        session_id: SessionId,
        stage: VerificationStage,
        progress: f64,
    ) -> Result<(), VerifierError> {
        let updated = self.sessions.update_stage(session_id, stage, progress).await?;
        if !updated {
            return Err(VerifierError::storage_error(format!(
                "Failed to update stage '{}' for session {}",
                stage,
                session_id.short()
            )));
        }
        tracing::info!(
            session_id = %session_id.short(),
            stage = %stage,
            progress = progress,
            "stage_update"
        );
        Ok(())
    }

    async fn add_warnings(&self, session_id: SessionId, warnings: &[String]) {
        if let Err(e) = self.sessions.add_warnings(session_id, warnings).await {
            tracing::warn!(session_id = %session_id.short(), error = %e, "Failed to record warnings");
        }
    }

    /// Writes the terminal failure; its own failure is logged, never raised.
    async fn record_failure(&self, session_id: SessionId, failure: FailureInfo) {
        match self.sessions.mark_failed(session_id, failure).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!(session_id = %session_id.short(), "Failed to mark session as failed")
            }
            Err(e) => {
                tracing::error!(
                    session_id = %session_id.short(),
                    error = %e,
                    "Error while marking session as failed"
                )
            }
        }
    }
}
