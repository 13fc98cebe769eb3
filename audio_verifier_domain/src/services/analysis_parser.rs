// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Analysis Response Parser
//!
//! Tolerant parser for the content-analysis service's JSON response.
//!
//! ## Contract
//!
//! - markdown ```json fences are stripped when present
//! - `qualityScore` must be a number, `safetyPassed` a bool, `insights` an
//!   array; anything else is a parse error
//! - `qualityScore` is clamped to [0, 1]; `suggestedPrice` to [3, 10]
//!   (invalid or missing price falls back to the minimum)
//! - legacy flat-list `recommendations` are folded into the `suggested`
//!   bucket of the categorized form
//!
//! The parser returns a result variant and never unwinds; the pipeline maps
//! a parse error to [`AnalysisReport::fallback`] rather than failing the
//! stage.

use serde_json::Value;

use crate::entities::{
    AnalysisReport, FileAnalysis, PriceAnalysis, QualityAnalysis, Recommendations,
};

/// Parses the analysis response text into a clamped [`AnalysisReport`].
///
/// Returns `Err(reason)` when the response does not satisfy the contract;
/// the caller decides the fallback.
pub fn parse_analysis_response(response_text: &str) -> Result<AnalysisReport, String> {
    let json_string = extract_json_block(response_text);
    let parsed: Value = serde_json::from_str(json_string.trim())
        .map_err(|e| format!("Response is not valid JSON: {}", e))?;

    let quality_score = parsed
        .get("qualityScore")
        .and_then(Value::as_f64)
        .ok_or("Missing or non-numeric qualityScore")?;
    let safety_passed = parsed
        .get("safetyPassed")
        .and_then(Value::as_bool)
        .ok_or("Missing or non-boolean safetyPassed")?;
    let insights = parsed
        .get("insights")
        .and_then(Value::as_array)
        .ok_or("Missing or non-array insights")?;

    let suggested_price = parsed
        .get("suggestedPrice")
        .and_then(Value::as_f64)
        .unwrap_or(3.0)
        .clamp(3.0, 10.0);

    let recommendations = match parsed.get("recommendations") {
        Some(Value::Object(_)) => {
            serde_json::from_value(parsed["recommendations"].clone()).unwrap_or_default()
        }
        Some(Value::Array(items)) => Recommendations {
            suggested: string_list(items),
            ..Recommendations::default()
        },
        _ => Recommendations::default(),
    };

    let quality_analysis: Option<QualityAnalysis> = parsed
        .get("qualityAnalysis")
        .filter(|v| v.is_object())
        .and_then(|v| serde_json::from_value(v.clone()).ok());
    let price_analysis: Option<PriceAnalysis> = parsed
        .get("priceAnalysis")
        .filter(|v| v.is_object())
        .and_then(|v| serde_json::from_value(v.clone()).ok());

    Ok(AnalysisReport {
        quality_score: quality_score.clamp(0.0, 1.0),
        suggested_price,
        safety_passed,
        insights: string_list(insights),
        concerns: parsed
            .get("concerns")
            .and_then(Value::as_array)
            .map(|v| string_list(v))
            .unwrap_or_default(),
        recommendations,
        overall_summary: parsed
            .get("overallSummary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        quality_analysis,
        price_analysis,
        file_analyses: Vec::new(),
    })
}

/// Parses the optional per-file analysis response.
///
/// Returns `None` on any mismatch; per-file insights are never critical.
pub fn parse_per_file_response(response_text: &str) -> Option<Vec<FileAnalysis>> {
    let json_string = extract_json_block(response_text);
    let parsed: Value = serde_json::from_str(json_string.trim()).ok()?;
    let analyses = parsed.get("fileAnalyses")?.as_array()?;
    let parsed: Vec<FileAnalysis> = analyses
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect();
    if parsed.is_empty() {
        None
    } else {
        Some(parsed)
    }
}

// Extract the body of a ```json fence when present, otherwise the whole text.
fn extract_json_block(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let body = &text[start + 7..];
        match body.find("```") {
            Some(end) => &body[..end],
            None => body,
        }
    } else {
        text
    }
}

fn string_list(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_parses_plain_json() {
        let report = parse_analysis_response(
            r#"{"qualityScore": 0.85, "safetyPassed": true, "insights": ["clear speech"],
                "concerns": [], "suggestedPrice": 5.0, "overallSummary": "good"}"#,
        )
        .unwrap();
        assert_eq!(report.quality_score, 0.85);
        assert!(report.safety_passed);
        assert_eq!(report.insights, vec!["clear speech"]);
        assert_eq!(report.suggested_price, 5.0);
    }

    #[test]
    fn test_parses_fenced_json() {
        let text = "Here is my analysis:\n```json\n{\"qualityScore\": 0.7, \"safetyPassed\": false, \"insights\": []}\n```\nDone.";
        let report = parse_analysis_response(text).unwrap();
        assert_eq!(report.quality_score, 0.7);
        assert!(!report.safety_passed);
    }

    #[test]
    fn test_clamps_quality_score_and_price() {
        let report = parse_analysis_response(
            r#"{"qualityScore": 1.7, "safetyPassed": true, "insights": [], "suggestedPrice": 99}"#,
        )
        .unwrap();
        assert_eq!(report.quality_score, 1.0);
        assert_eq!(report.suggested_price, 10.0);

        let report = parse_analysis_response(
            r#"{"qualityScore": -0.2, "safetyPassed": true, "insights": [], "suggestedPrice": 0.5}"#,
        )
        .unwrap();
        assert_eq!(report.quality_score, 0.0);
        assert_eq!(report.suggested_price, 3.0);
    }

    #[test]
    fn test_invalid_price_defaults_to_minimum() {
        let report = parse_analysis_response(
            r#"{"qualityScore": 0.5, "safetyPassed": true, "insights": [], "suggestedPrice": "cheap"}"#,
        )
        .unwrap();
        assert_eq!(report.suggested_price, 3.0);
    }

    #[test]
    fn test_legacy_flat_recommendations() {
        let report = parse_analysis_response(
            r#"{"qualityScore": 0.5, "safetyPassed": true, "insights": [],
                "recommendations": ["add metadata", "trim silence"]}"#,
        )
        .unwrap();
        assert_eq!(report.recommendations.suggested.len(), 2);
        assert!(report.recommendations.critical.is_empty());
    }

    #[test]
    fn test_missing_required_fields_is_error() {
        assert!(parse_analysis_response(r#"{"safetyPassed": true, "insights": []}"#).is_err());
        assert!(parse_analysis_response(r#"{"qualityScore": 0.5, "insights": []}"#).is_err());
        assert!(
            parse_analysis_response(r#"{"qualityScore": 0.5, "safetyPassed": "yes", "insights": []}"#)
                .is_err()
        );
        assert!(parse_analysis_response("not json at all").is_err());
    }

    #[test]
    fn test_per_file_response() {
        let text = r#"```json
            {"fileAnalyses": [
                {"fileIndex": 0, "title": "a", "score": 0.8, "summary": "fine",
                 "strengths": ["clear"], "concerns": [], "recommendations": []}
            ]}
        ```"#;
        let analyses = parse_per_file_response(text).unwrap();
        assert_eq!(analyses.len(), 1);
        assert_eq!(analyses[0].score, 0.8);

        assert!(parse_per_file_response("garbage").is_none());
        assert!(parse_per_file_response(r#"{"fileAnalyses": []}"#).is_none());
    }

    proptest! {
        // For arbitrary response strings the parser either succeeds with
        // clamped fields or returns an error; it never panics.
        #[test]
        fn prop_parser_never_panics(text in ".{0,512}") {
            match parse_analysis_response(&text) {
                Ok(report) => {
                    prop_assert!((0.0..=1.0).contains(&report.quality_score));
                    prop_assert!((3.0..=10.0).contains(&report.suggested_price));
                }
                Err(reason) => prop_assert!(!reason.is_empty()),
            }
        }

        #[test]
        fn prop_numeric_fields_always_clamped(score in -100.0f64..100.0, price in -100.0f64..100.0) {
            let text = format!(
                r#"{{"qualityScore": {}, "safetyPassed": true, "insights": [], "suggestedPrice": {}}}"#,
                score, price
            );
            let report = parse_analysis_response(&text).unwrap();
            prop_assert!((0.0..=1.0).contains(&report.quality_score));
            prop_assert!((3.0..=10.0).contains(&report.suggested_price));
        }
    }
}
