// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transcription Service Port
//!
//! Infrastructure port for the external transcription service, plus the
//! instruction text that defines the closed-caption transcript contract the
//! rest of the pipeline depends on (speaker labels, parenthesized sound
//! annotations, `(unintelligible)` markers).

use std::path::Path;

use async_trait::async_trait;

use crate::error::VerifierError;
use crate::value_objects::AudioFormat;

/// Instruction sent with every transcription request.
pub const TRANSCRIPTION_INSTRUCTION: &str = r#"Transcribe this audio with enhanced closed caption style formatting.

Include:
- Speaker labels if multiple speakers detected (e.g., "Speaker 1:", "Speaker 2:", or use names if identifiable)
- Sound effects in parentheses (e.g., "(bird calls)", "(door slam)", "(music playing)", "(applause)")
- Unintelligible sections as "(unintelligible)"
- Environmental sounds as "(ambient noise)", "(traffic sounds)", "(wind)", etc.
- Non-speech vocalizations as "(laughter)", "(sighs)", "(coughs)", "(gasps)", etc.
- Musical elements as "(music)", "(singing)", "(instrumental)", etc.

Format example:
Speaker 1: Hello, how are you doing today? (background music)
Speaker 2: I'm great, thanks! (door opens) Oh, someone's here.
(footsteps approaching)
Speaker 3: Hey everyone! (unintelligible)

Provide clean, readable transcript with these annotations. Each speaker's dialogue should start on a new line."#;

/// Port for the external transcription service.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribes the audio file at `path`.
    ///
    /// An empty returned transcript is meaningful to the caller (the
    /// pipeline fails the stage on it); implementations must not substitute
    /// placeholders.
    async fn transcribe(&self, path: &Path, format: AudioFormat) -> Result<String, VerifierError>;
}
