// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # WAV Quality Analyzer
//!
//! Built-in implementation of the [`QualityAnalyzer`] port for PCM WAV
//! streams.
//!
//! ## Overview
//!
//! The analyzer parses the RIFF container, then streams the data chunk in
//! roughly half-second blocks so multi-gigabyte files never load into
//! memory. Per block it downmixes to mono and accumulates:
//!
//! - **RMS** over all samples (reported in dBFS)
//! - **silence ratio** against the -50 dBFS threshold
//! - **clipping** detection at normalized amplitude ≥ 0.99
//!
//! The pass verdict combines duration, sample-rate, clipping, silence and
//! volume criteria against the shared [`QualityThresholds`].
//!
//! ## Scope
//!
//! Only PCM and IEEE-float WAV is decoded here. Every other container is
//! the external audio-feature library's business; until that collaborator
//! is wired in, such files report `format_probe_failed` without a metrics
//! payload.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use audio_verifier_domain::entities::QualityReport;
use audio_verifier_domain::services::{QualityAnalyzer, QualityCheck, QualityThresholds};
use audio_verifier_domain::value_objects::FailureReason;
use audio_verifier_domain::VerifierError;

/// Sample encodings the built-in analyzer can stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleCodec {
    PcmU8,
    PcmI16,
    PcmI24,
    PcmI32,
    Float32,
}

impl SampleCodec {
    fn from_format(format_code: u16, bits_per_sample: u16) -> Option<SampleCodec> {
        match (format_code, bits_per_sample) {
            (1, 8) => Some(SampleCodec::PcmU8),
            (1, 16) => Some(SampleCodec::PcmI16),
            (1, 24) => Some(SampleCodec::PcmI24),
            (1, 32) => Some(SampleCodec::PcmI32),
            (3, 32) => Some(SampleCodec::Float32),
            _ => None,
        }
    }

    fn bytes_per_sample(&self) -> usize {
        match self {
            SampleCodec::PcmU8 => 1,
            SampleCodec::PcmI16 => 2,
            SampleCodec::PcmI24 => 3,
            SampleCodec::PcmI32 | SampleCodec::Float32 => 4,
        }
    }

    fn decode(&self, bytes: &[u8]) -> f64 {
        match self {
            SampleCodec::PcmU8 => (f64::from(bytes[0]) - 128.0) / 128.0,
            SampleCodec::PcmI16 => {
                f64::from(i16::from_le_bytes([bytes[0], bytes[1]])) / 32768.0
            }
            SampleCodec::PcmI24 => {
                let raw = i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8;
                f64::from(raw) / 8_388_608.0
            }
            SampleCodec::PcmI32 => {
                f64::from(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
                    / 2_147_483_648.0
            }
            SampleCodec::Float32 => {
                f64::from(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct WavHeader {
    codec: SampleCodec,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    data_offset: u64,
    data_len: u64,
}

/// Built-in PCM WAV quality analyzer.
pub struct WavQualityAnalyzer {
    thresholds: QualityThresholds,
}

impl WavQualityAnalyzer {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    /// Probes only the container header for the stream duration in seconds.
    ///
    /// Used by the ingress gate for the `initial_data` duration hint;
    /// returns `None` for anything the built-in parser cannot read.
    pub fn probe_duration(path: &Path) -> Option<f64> {
        let file = File::open(path).ok()?;
        let mut reader = BufReader::new(file);
        let header = parse_header(&mut reader).ok()?;
        if header.sample_rate == 0 || header.channels == 0 {
            return None;
        }
        let frame_len = (header.codec.bytes_per_sample() * header.channels as usize) as u64;
        Some((header.data_len / frame_len) as f64 / f64::from(header.sample_rate))
    }

    fn analyze_sync(path: PathBuf, thresholds: QualityThresholds) -> QualityCheck {
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                return probe_failure(format!("Failed to open audio file: {}", e));
            }
        };
        let mut reader = BufReader::new(file);

        let header = match parse_header(&mut reader) {
            Ok(h) => h,
            Err(reason) => return probe_failure(reason),
        };

        let mut warnings = Vec::new();
        let stats = match stream_stats(&mut reader, &header, &thresholds, &mut warnings) {
            Ok(s) => s,
            Err(reason) => return probe_failure(reason),
        };

        if stats.total_samples == 0 {
            return probe_failure("Audio file contained no samples".to_string());
        }

        let duration = stats.total_samples as f64 / f64::from(header.sample_rate);
        let rms = (stats.sum_squares / stats.total_samples as f64).sqrt();
        let rms_db = 20.0 * rms.max(1e-10).log10();
        let silence_percent = stats.silence_samples as f64 / stats.total_samples as f64 * 100.0;
        let volume_ok = thresholds.volume_ok(rms_db);

        let passed = thresholds.duration_ok(duration)
            && header.sample_rate >= thresholds.min_sample_rate
            && !stats.clipping_detected
            && silence_percent < thresholds.max_silence_percent
            && volume_ok;

        let quality = QualityReport {
            passed,
            duration: round2(duration),
            sample_rate: header.sample_rate,
            channels: header.channels,
            bit_depth: header.bits_per_sample,
            rms_db: round2(rms_db),
            clipping_detected: stats.clipping_detected,
            silence_percent: round2(silence_percent),
            volume_ok,
            quality_score: analyzer_score(
                passed,
                volume_ok,
                stats.clipping_detected,
                silence_percent,
            ),
            score: 0,
        };

        let (errors, failure_reason) = criteria_errors(&quality, &thresholds);

        QualityCheck {
            quality: Some(quality),
            errors,
            warnings,
            failure_reason,
        }
    }
}

#[async_trait]
impl QualityAnalyzer for WavQualityAnalyzer {
    async fn analyze(&self, path: &Path) -> Result<QualityCheck, VerifierError> {
        let path = path.to_path_buf();
        let thresholds = self.thresholds;
        tokio::task::spawn_blocking(move || Self::analyze_sync(path, thresholds))
            .await
            .map_err(|e| VerifierError::internal_error(format!("Analyzer worker panicked: {}", e)))
    }
}

struct StreamStats {
    total_samples: u64,
    silence_samples: u64,
    sum_squares: f64,
    clipping_detected: bool,
}

fn parse_header<R: Read + Seek>(reader: &mut R) -> Result<WavHeader, String> {
    let mut riff = [0u8; 12];
    reader
        .read_exact(&mut riff)
        .map_err(|e| format!("Failed to read RIFF header: {}", e))?;
    if &riff[..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
        return Err("Not a RIFF/WAVE stream".to_string());
    }

    let mut fmt: Option<(u16, u16, u32, u16)> = None;
    loop {
        let mut chunk_header = [0u8; 8];
        if reader.read_exact(&mut chunk_header).is_err() {
            return Err("WAV stream has no data chunk".to_string());
        }
        let chunk_id = [chunk_header[0], chunk_header[1], chunk_header[2], chunk_header[3]];
        let chunk_len = u32::from_le_bytes([
            chunk_header[4],
            chunk_header[5],
            chunk_header[6],
            chunk_header[7],
        ]) as u64;

        match &chunk_id {
            b"fmt " => {
                let mut body = vec![0u8; chunk_len.min(40) as usize];
                reader
                    .read_exact(&mut body)
                    .map_err(|e| format!("Truncated fmt chunk: {}", e))?;
                if body.len() < 16 {
                    return Err("fmt chunk too short".to_string());
                }
                let mut format_code = u16::from_le_bytes([body[0], body[1]]);
                let channels = u16::from_le_bytes([body[2], body[3]]);
                let sample_rate = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
                let bits_per_sample = u16::from_le_bytes([body[14], body[15]]);
                // WAVE_FORMAT_EXTENSIBLE carries the real code in the subformat GUID
                if format_code == 0xfffe && body.len() >= 26 {
                    format_code = u16::from_le_bytes([body[24], body[25]]);
                }
                fmt = Some((format_code, channels, sample_rate, bits_per_sample));
                skip_padding(reader, chunk_len, body.len() as u64)?;
            }
            b"data" => {
                let (format_code, channels, sample_rate, bits_per_sample) =
                    fmt.ok_or("data chunk precedes fmt chunk")?;
                if channels == 0 {
                    return Err("fmt chunk declares zero channels".to_string());
                }
                if sample_rate == 0 {
                    return Err(format!(
                        "Invalid audio metadata: sample_rate={}Hz",
                        sample_rate
                    ));
                }
                let codec = SampleCodec::from_format(format_code, bits_per_sample).ok_or(
                    format!(
                        "Unsupported WAV encoding (format {}, {} bits)",
                        format_code, bits_per_sample
                    ),
                )?;
                let data_offset = reader
                    .stream_position()
                    .map_err(|e| format!("Seek failed: {}", e))?;
                return Ok(WavHeader {
                    codec,
                    channels,
                    sample_rate,
                    bits_per_sample,
                    data_offset,
                    data_len: chunk_len,
                });
            }
            _ => {
                // Skip unknown chunks (LIST, fact, cue ...), honoring padding
                let padded = chunk_len + (chunk_len & 1);
                reader
                    .seek(SeekFrom::Current(padded as i64))
                    .map_err(|e| format!("Seek failed: {}", e))?;
            }
        }
    }
}

fn skip_padding<R: Read + Seek>(reader: &mut R, declared: u64, consumed: u64) -> Result<(), String> {
    let padded = declared + (declared & 1);
    if padded > consumed {
        reader
            .seek(SeekFrom::Current((padded - consumed) as i64))
            .map_err(|e| format!("Seek failed: {}", e))?;
    }
    Ok(())
}

fn stream_stats<R: Read + Seek>(
    reader: &mut R,
    header: &WavHeader,
    thresholds: &QualityThresholds,
    warnings: &mut Vec<String>,
) -> Result<StreamStats, String> {
    reader
        .seek(SeekFrom::Start(header.data_offset))
        .map_err(|e| format!("Seek failed: {}", e))?;

    let bytes_per_sample = header.codec.bytes_per_sample();
    let frame_len = bytes_per_sample * header.channels as usize;
    // Roughly half a second per block
    let block_frames = (header.sample_rate as usize / 2).max(4096);
    let silence_linear = thresholds.silence_linear_threshold();

    let mut stats = StreamStats {
        total_samples: 0,
        silence_samples: 0,
        sum_squares: 0.0,
        clipping_detected: false,
    };

    let mut remaining = header.data_len;
    let mut buffer = vec![0u8; block_frames * frame_len];
    while remaining >= frame_len as u64 {
        let want = buffer.len().min(remaining as usize) / frame_len * frame_len;
        let read = read_up_to(reader, &mut buffer[..want]).map_err(|e| format!("Read failed: {}", e))?;
        if read < frame_len {
            if remaining >= frame_len as u64 {
                warnings.push("Audio data chunk shorter than declared length".to_string());
            }
            break;
        }
        let whole = read / frame_len * frame_len;

        for frame in buffer[..whole].chunks_exact(frame_len) {
            // Downmix to mono for the aggregate checks
            let mut acc = 0.0;
            for sample in frame.chunks_exact(bytes_per_sample) {
                acc += header.codec.decode(sample);
            }
            let mono = acc / f64::from(header.channels);
            let magnitude = mono.abs();

            stats.total_samples += 1;
            stats.sum_squares += mono * mono;
            if magnitude < silence_linear {
                stats.silence_samples += 1;
            }
            if !stats.clipping_detected && magnitude >= thresholds.clipping_threshold {
                stats.clipping_detected = true;
            }
        }
        remaining -= whole as u64;
    }

    Ok(stats)
}

fn read_up_to<R: Read>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// The analyzer's own 0.0-1.0 score, independent of the pipeline rubric.
fn analyzer_score(passed: bool, volume_ok: bool, clipping: bool, silence_percent: f64) -> f64 {
    if !passed {
        return 0.0;
    }
    let mut score = 1.0;
    if !volume_ok {
        score -= 0.2;
    }
    if clipping {
        score -= 0.3;
    }
    score -= silence_percent / 100.0 * 0.5;
    score.clamp(0.0, 1.0)
}

fn criteria_errors(
    quality: &QualityReport,
    thresholds: &QualityThresholds,
) -> (Vec<String>, Option<FailureReason>) {
    let mut errors = Vec::new();
    let mut failure_reason = None;
    let mut record = |message: String, reason: FailureReason, slot: &mut Option<FailureReason>| {
        errors.push(message);
        if slot.is_none() {
            *slot = Some(reason);
        }
    };

    if quality.duration < thresholds.min_duration {
        record(
            format!(
                "Audio too short: {:.1}s (minimum {:.0}s)",
                quality.duration, thresholds.min_duration
            ),
            FailureReason::DurationOutOfRange,
            &mut failure_reason,
        );
    } else if quality.duration > thresholds.max_duration {
        record(
            format!(
                "Audio too long: {:.1}s (maximum {:.0}s)",
                quality.duration, thresholds.max_duration
            ),
            FailureReason::DurationOutOfRange,
            &mut failure_reason,
        );
    }

    if quality.sample_rate < thresholds.min_sample_rate {
        record(
            format!(
                "Sample rate too low: {}Hz (minimum {}Hz)",
                quality.sample_rate, thresholds.min_sample_rate
            ),
            FailureReason::SampleRateTooLow,
            &mut failure_reason,
        );
    }

    if quality.clipping_detected {
        record(
            "Audio is clipping - reduce input gain".to_string(),
            FailureReason::ClippingDetected,
            &mut failure_reason,
        );
    }

    if quality.silence_percent >= thresholds.max_silence_percent {
        record(
            format!(
                "Too much silence: {:.1}% (maximum {:.0}%)",
                quality.silence_percent, thresholds.max_silence_percent
            ),
            FailureReason::ExcessiveSilence,
            &mut failure_reason,
        );
    }

    if !quality.volume_ok {
        record(
            format!(
                "Volume levels outside recommended range ({:.0}dB to {:.0}dB)",
                thresholds.min_rms_db, thresholds.max_rms_db
            ),
            FailureReason::VolumeOutOfRange,
            &mut failure_reason,
        );
    }

    (errors, failure_reason)
}

fn probe_failure(message: String) -> QualityCheck {
    QualityCheck {
        quality: None,
        errors: vec![message],
        warnings: Vec::new(),
        failure_reason: Some(FailureReason::FormatProbeFailed),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
