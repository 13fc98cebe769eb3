// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Audio Format Probe
//!
//! Magic-byte detection of the supported audio container formats.
//!
//! ## Overview
//!
//! The ingress gate rejects submissions whose decrypted payload does not
//! start with a recognizable audio signature, before any session row is
//! created. The probe inspects only the leading bytes:
//!
//! | Format | Signature |
//! |---|---|
//! | WAV | `RIFF` at 0, `WAVE` at 8 |
//! | MP3 | `ID3` tag, or MPEG frame sync `0xFFEx` |
//! | FLAC | `fLaC` |
//! | OGG/Opus | `OggS` |
//! | M4A/MP4 | `ftyp` box with `M4A`/`mp42`/`isom`/`mp41` brand |
//! | WebM | EBML header `1A 45 DF A3` |
//! | 3GP | `ftyp` box with `3gp`/`3g2` brand |
//! | AMR | `#!AMR` |
//!
//! The probe is deliberately shallow: it answers "is this plausibly audio we
//! can hand to the analyzers", not "is this file well formed".

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Supported audio container formats, detected from leading magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
    M4a,
    Webm,
    ThreeGp,
    Amr,
}

impl AudioFormat {
    /// Detects the container format from the first bytes of a payload.
    ///
    /// Returns `None` when no known signature matches; the ingress gate
    /// treats that as an unsupported submission.
    pub fn detect(data: &[u8]) -> Option<AudioFormat> {
        if is_riff_wave(data) {
            Some(AudioFormat::Wav)
        } else if looks_like_mp3(data) {
            Some(AudioFormat::Mp3)
        } else if data.len() >= 4 && &data[..4] == b"fLaC" {
            Some(AudioFormat::Flac)
        } else if data.len() >= 4 && &data[..4] == b"OggS" {
            Some(AudioFormat::Ogg)
        } else if has_ftyp_brand(data, &[b"ftypM4A", b"ftypmp42", b"ftypisom", b"ftypmp41"]) {
            Some(AudioFormat::M4a)
        } else if data.len() >= 4 && data[..4] == [0x1a, 0x45, 0xdf, 0xa3] {
            Some(AudioFormat::Webm)
        } else if has_ftyp_brand(data, &[b"ftyp3gp", b"ftyp3g2"]) {
            Some(AudioFormat::ThreeGp)
        } else if data.len() >= 5 && &data[..5] == b"#!AMR" {
            Some(AudioFormat::Amr)
        } else {
            None
        }
    }

    /// MIME type used when embedding the audio into a chat message.
    pub fn mime(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Webm => "audio/webm",
            AudioFormat::ThreeGp => "audio/3gpp",
            AudioFormat::Amr => "audio/amr",
        }
    }

    /// Scratch-file extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::M4a => "m4a",
            AudioFormat::Webm => "webm",
            AudioFormat::ThreeGp => "3gp",
            AudioFormat::Amr => "amr",
        }
    }

    /// Human-readable format name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "WAV",
            AudioFormat::Mp3 => "MP3",
            AudioFormat::Flac => "FLAC",
            AudioFormat::Ogg => "OGG/Opus",
            AudioFormat::M4a => "M4A/MP4",
            AudioFormat::Webm => "WebM",
            AudioFormat::ThreeGp => "3GP",
            AudioFormat::Amr => "AMR",
        }
    }
}

impl Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn is_riff_wave(data: &[u8]) -> bool {
    data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WAVE"
}

fn looks_like_mp3(data: &[u8]) -> bool {
    if data.len() < 2 {
        return false;
    }
    if data.len() >= 3 && &data[..3] == b"ID3" {
        return true;
    }
    // MPEG audio frame sync: 0xFFE? in the first two bytes
    data[0] == 0xff && (data[1] & 0xe0) == 0xe0
}

// The ftyp box usually sits at offset 4 (after the box size), so search the
// first 20 bytes rather than assuming a fixed position.
fn has_ftyp_brand(data: &[u8], brands: &[&[u8]]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let window = &data[..data.len().min(20)];
    brands
        .iter()
        .any(|brand| window.windows(brand.len()).any(|w| &w == brand))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_header() -> Vec<u8> {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&36u32.to_le_bytes());
        data.extend_from_slice(b"WAVE");
        data
    }

    #[test]
    fn test_detects_wav() {
        assert_eq!(AudioFormat::detect(&wav_header()), Some(AudioFormat::Wav));
    }

    #[test]
    fn test_detects_mp3_id3_and_frame_sync() {
        assert_eq!(AudioFormat::detect(b"ID3\x04\x00rest"), Some(AudioFormat::Mp3));
        assert_eq!(
            AudioFormat::detect(&[0xff, 0xfb, 0x90, 0x00]),
            Some(AudioFormat::Mp3)
        );
        // 0xFF followed by a byte without the sync bits is not MP3
        assert_eq!(AudioFormat::detect(&[0xff, 0x1b, 0x90, 0x00]), None);
    }

    #[test]
    fn test_detects_flac_ogg_webm_amr() {
        assert_eq!(AudioFormat::detect(b"fLaC\x00\x00\x00\x22"), Some(AudioFormat::Flac));
        assert_eq!(AudioFormat::detect(b"OggS\x00\x02rest"), Some(AudioFormat::Ogg));
        assert_eq!(
            AudioFormat::detect(&[0x1a, 0x45, 0xdf, 0xa3, 0x01]),
            Some(AudioFormat::Webm)
        );
        assert_eq!(AudioFormat::detect(b"#!AMR\x0a"), Some(AudioFormat::Amr));
    }

    #[test]
    fn test_detects_ftyp_variants() {
        let mut m4a = vec![0x00, 0x00, 0x00, 0x20];
        m4a.extend_from_slice(b"ftypM4A \x00\x00\x00\x00");
        assert_eq!(AudioFormat::detect(&m4a), Some(AudioFormat::M4a));

        let mut threegp = vec![0x00, 0x00, 0x00, 0x18];
        threegp.extend_from_slice(b"ftyp3gp4\x00\x00\x02\x00");
        assert_eq!(AudioFormat::detect(&threegp), Some(AudioFormat::ThreeGp));
    }

    #[test]
    fn test_unknown_bytes_rejected() {
        assert_eq!(AudioFormat::detect(b"PK\x03\x04 not audio"), None);
        assert_eq!(AudioFormat::detect(&[]), None);
        // RIFF without WAVE (e.g. AVI) is not accepted
        let mut avi = b"RIFF".to_vec();
        avi.extend_from_slice(&36u32.to_le_bytes());
        avi.extend_from_slice(b"AVI ");
        assert_eq!(AudioFormat::detect(&avi), None);
    }
}
