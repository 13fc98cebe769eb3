// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Verification Result Shell
//!
//! Typed records for every stage's output and the assembled final verdict.
//!
//! ## Design Rationale
//!
//! The pipeline carries one [`VerificationResults`] shell across its stages
//! and mutates fields on it as stages complete; untyped JSON maps never flow
//! between stages. Serialization to the session store's JSON column happens
//! exactly twice per run: on a stage update that needs it, and on
//! finalization.
//!
//! Fields that cross the wire to/from external collaborators use camelCase,
//! matching the analysis service's response contract.

use serde::{Deserialize, Serialize};

/// Technical quality metrics produced by the quality analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityReport {
    pub passed: bool,
    /// Duration in seconds.
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub rms_db: f64,
    pub clipping_detected: bool,
    pub silence_percent: f64,
    pub volume_ok: bool,
    /// Analyzer's own 0.0-1.0 score.
    pub quality_score: f64,
    /// Integer 0-100 rubric score, computed by the pipeline after the stage
    /// passes. Zero until then.
    pub score: u8,
}

/// A single copyright match reported by the fingerprint service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyrightMatch {
    pub title: String,
    pub artist: String,
    pub confidence: f64,
    pub recording_id: String,
}

/// Outcome of the copyright stage.
///
/// A detector failure is not fatal: it is downgraded to `checked = false`
/// with the failure text in `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyrightReport {
    pub checked: bool,
    pub detected: bool,
    pub confidence: f64,
    pub matches: Vec<CopyrightMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Score plus reasoning for one analysis aspect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoredAspect {
    pub score: f64,
    pub reasoning: String,
}

/// Per-aspect quality breakdown from the analysis service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityAnalysis {
    pub clarity: ScoredAspect,
    pub content_value: ScoredAspect,
    pub metadata_accuracy: ScoredAspect,
    pub completeness: ScoredAspect,
}

/// Pricing breakdown from the analysis service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceAnalysis {
    pub base_price: f64,
    pub quality_multiplier: f64,
    pub rarity_multiplier: f64,
    pub final_price: f64,
    pub breakdown: String,
}

/// Prioritized recommendations from the analysis service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendations {
    pub critical: Vec<String>,
    pub suggested: Vec<String>,
    pub optional: Vec<String>,
}

/// Per-file insight produced by the optional second analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileAnalysis {
    pub file_index: usize,
    pub title: String,
    pub score: f64,
    pub summary: String,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Parsed and clamped output of the content-analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisReport {
    /// Clamped to [0, 1].
    pub quality_score: f64,
    /// Clamped to [3, 10].
    pub suggested_price: f64,
    pub safety_passed: bool,
    pub insights: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendations: Recommendations,
    pub overall_summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_analysis: Option<QualityAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_analysis: Option<PriceAnalysis>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_analyses: Vec<FileAnalysis>,
}

impl Default for AnalysisReport {
    fn default() -> Self {
        Self {
            quality_score: 0.5,
            suggested_price: 3.0,
            safety_passed: true,
            insights: Vec::new(),
            concerns: Vec::new(),
            recommendations: Recommendations::default(),
            overall_summary: String::new(),
            quality_analysis: None,
            price_analysis: None,
            file_analyses: Vec::new(),
        }
    }
}

impl AnalysisReport {
    /// Safe fallback used when the analysis response cannot be parsed.
    ///
    /// Deliberately conservative: mid-scale quality, safety assumed passed
    /// (safety screening failures come back as explicit `false`, not as
    /// parse errors), and advisory text asking for manual review.
    pub fn fallback() -> Self {
        Self {
            insights: vec![
                "Analysis completed but response parsing failed".to_string(),
                "Manual review recommended".to_string(),
            ],
            concerns: vec!["Unable to parse detailed analysis".to_string()],
            ..Self::default()
        }
    }
}

/// The assembled final verdict, persisted on completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationResults {
    pub approved: bool,
    pub quality: QualityReport,
    pub copyright: CopyrightReport,
    pub transcript: String,
    /// First 200 characters of the transcript, for listing endpoints.
    pub transcript_preview: String,
    pub analysis: AnalysisReport,
    pub safety_passed: bool,
}

impl VerificationResults {
    /// Truncation length of `transcript_preview`.
    pub const PREVIEW_CHARS: usize = 200;

    /// Sets the transcript and derives its preview.
    pub fn set_transcript(&mut self, transcript: String) {
        self.transcript_preview = transcript.chars().take(Self::PREVIEW_CHARS).collect();
        self.transcript = transcript;
    }
}
