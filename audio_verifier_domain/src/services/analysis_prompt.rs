// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Analysis Prompt Builder
//!
//! Pure construction of the content-analysis prompts. The prompt carries the
//! dataset metadata, the contributor's categorization claims, the technical
//! quality summary, and the first [`TRANSCRIPT_SAMPLE_CHARS`] characters of
//! the transcript. The response contract it requests is what
//! [`parse_analysis_response`](super::parse_analysis_response) expects.

use crate::entities::{DatasetMetadata, PerFileMetadata, QualityReport};

/// Transcript excerpt length embedded into analysis prompts.
pub const TRANSCRIPT_SAMPLE_CHARS: usize = 2000;

/// Builds the main content-analysis prompt.
pub fn build_analysis_prompt(
    transcript: &str,
    metadata: &DatasetMetadata,
    quality: &QualityReport,
) -> String {
    let categorization = &metadata.categorization;
    let use_case = categorization.use_case.as_deref().unwrap_or("Not specified");
    let content_type = categorization
        .content_type
        .as_deref()
        .unwrap_or("Not specified");
    let domain = categorization.domain.as_deref().unwrap_or("Not specified");

    format!(
        r#"You are an expert audio dataset quality analyst for a decentralized audio data marketplace. Analyze this audio dataset submission and provide a comprehensive quality assessment with transparent reasoning.

## Dataset Metadata
- Title: {title}
- Description: {description}
- Languages: {languages}
- Tags: {tags}

## Content Categorization (User-Provided)
- Use Case: {use_case}
- Content Type: {content_type}
- Domain: {domain}

## Audio Technical Specs
- Duration: {duration:.1}s
- Sample Rate: {sample_rate}Hz
- Channels: {channels}
- Bit Depth: {bit_depth}

## Transcript Sample
{transcript_sample}

## Analysis Required

Provide your analysis in the following JSON format with detailed reasoning:

```json
{{
  "qualityScore": 0.85,
  "suggestedPrice": 5.0,
  "safetyPassed": true,
  "overallSummary": "2-3 sentence narrative describing the audio's overall quality, clarity, and key characteristics",
  "qualityAnalysis": {{
    "clarity": {{"score": 0.9, "reasoning": "Explanation of clarity assessment"}},
    "contentValue": {{"score": 0.8, "reasoning": "Explanation of content value for AI training"}},
    "metadataAccuracy": {{"score": 0.85, "reasoning": "Explanation of how well content matches provided metadata"}},
    "completeness": {{"score": 0.8, "reasoning": "Explanation of completeness"}}
  }},
  "priceAnalysis": {{
    "basePrice": 3.0,
    "qualityMultiplier": 1.4,
    "rarityMultiplier": 1.0,
    "finalPrice": 5.0,
    "breakdown": "Step-by-step explanation of the pricing calculation"
  }},
  "insights": ["Key strength or characteristic"],
  "concerns": ["Any quality concerns (if applicable)"],
  "recommendations": {{
    "critical": ["High-priority improvements needed"],
    "suggested": ["Recommended improvements"],
    "optional": ["Nice-to-have enhancements"]
  }}
}}
```

### Quality Scoring Criteria (0-1 scale):
- **Audio Clarity** (0.3): Is the transcript coherent with minimal errors and clear articulation?
- **Content Value** (0.3): Is the content meaningful, diverse, and useful for AI training?
- **Metadata Accuracy** (0.2): Does the content match the provided metadata? CRITICAL: verify that the user-provided categorization accurately describes the actual audio content (Use Case, Content Type and Domain), and flag significant mismatches in the "concerns" array with specific details.
- **Completeness** (0.2): Is the content complete without obvious truncation?

Default to 0.5 for average, unremarkable audio with no notable issues or standout features.

### Purchase Price Suggestion (3-10 tokens):
Suggest a fair market price (minimum: 3, maximum: 10) weighing quality (40%), content uniqueness (30%), duration and completeness (20%), and metadata richness (10%). Show your calculation.

### Safety Screening:
Flag as unsafe (safetyPassed: false) ONLY if content contains sexually explicit material, graphic violence, or recognizable copyrighted media. Conversational datasets with profanity, political discussion, or other sensitive topics are ACCEPTABLE.

### Insights / Concerns / Recommendations:
Provide 3-5 specific, actionable insights; list concrete concerns; categorize recommendations by priority. Use empty arrays where there is nothing to report.

Respond ONLY with the JSON object, no additional text."#,
        title = or_unknown(&metadata.title),
        description = or_default(&metadata.description, "No description"),
        languages = metadata.languages.join(", "),
        tags = metadata.tags.join(", "),
        use_case = use_case,
        content_type = content_type,
        domain = domain,
        duration = quality.duration,
        sample_rate = quality.sample_rate,
        channels = quality.channels,
        bit_depth = quality.bit_depth,
        transcript_sample = transcript_sample(transcript),
    )
}

/// Builds the per-file analysis prompt for multi-file datasets.
pub fn build_per_file_prompt(transcript: &str, files: &[PerFileMetadata]) -> String {
    let mut files_description = String::new();
    for (i, file) in files.iter().enumerate() {
        files_description.push_str(&format!("\n{}. {}", i + 1, or_unknown(&file.title)));
        if !file.description.is_empty() {
            files_description.push_str(&format!(" - {}", file.description));
        }
    }

    format!(
        r#"You are analyzing a multi-file audio dataset. Based on the transcript and file information, provide per-file quality insights.

## Files in Dataset:{files_description}

## Transcript Sample
{transcript_sample}

Provide your analysis in the following JSON format:

```json
{{
  "fileAnalyses": [
    {{
      "fileIndex": 0,
      "title": "File Title",
      "score": 0.85,
      "summary": "One-sentence assessment of this file's quality",
      "strengths": ["Strength 1"],
      "concerns": ["Concern 1"],
      "recommendations": ["Recommendation 1"]
    }}
  ]
}}
```

For each file, estimate its relative quality based on the transcript, identify file-specific strengths and concerns, and keep assessments concise.

Respond ONLY with the JSON object, no additional text."#,
        files_description = files_description,
        transcript_sample = transcript_sample(transcript),
    )
}

fn transcript_sample(transcript: &str) -> String {
    if transcript.chars().count() > TRANSCRIPT_SAMPLE_CHARS {
        let sample: String = transcript.chars().take(TRANSCRIPT_SAMPLE_CHARS).collect();
        format!("{}...", sample)
    } else {
        transcript.to_string()
    }
}

fn or_unknown(s: &str) -> &str {
    or_default(s, "Unknown")
}

fn or_default<'a>(s: &'a str, default: &'a str) -> &'a str {
    if s.is_empty() {
        default
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Categorization;

    #[test]
    fn test_prompt_carries_metadata_and_categorization() {
        let metadata = DatasetMetadata {
            title: "Dawn chorus".to_string(),
            description: "Birdsong at sunrise".to_string(),
            tags: vec!["birds".to_string(), "field".to_string()],
            languages: vec!["en".to_string()],
            categorization: Categorization {
                use_case: Some("training".to_string()),
                content_type: Some("field recording".to_string()),
                domain: None,
            },
            ..DatasetMetadata::default()
        };
        let prompt = build_analysis_prompt(&"hello ".repeat(10), &metadata, &QualityReport::default());
        assert!(prompt.contains("Dawn chorus"));
        assert!(prompt.contains("birds, field"));
        assert!(prompt.contains("Use Case: training"));
        assert!(prompt.contains("Domain: Not specified"));
    }

    #[test]
    fn test_transcript_truncated_at_sample_length() {
        let transcript = "x".repeat(TRANSCRIPT_SAMPLE_CHARS + 500);
        let prompt = build_analysis_prompt(
            &transcript,
            &DatasetMetadata::default(),
            &QualityReport::default(),
        );
        assert!(!prompt.contains(&transcript));
        let sample: String = transcript.chars().take(TRANSCRIPT_SAMPLE_CHARS).collect();
        assert!(prompt.contains(&format!("{}...", sample)));
    }

    #[test]
    fn test_per_file_prompt_lists_files() {
        let files = vec![
            PerFileMetadata {
                title: "first".to_string(),
                description: "intro".to_string(),
            },
            PerFileMetadata {
                title: "second".to_string(),
                description: String::new(),
            },
        ];
        let prompt = build_per_file_prompt("short transcript", &files);
        assert!(prompt.contains("1. first - intro"));
        assert!(prompt.contains("2. second"));
    }
}
