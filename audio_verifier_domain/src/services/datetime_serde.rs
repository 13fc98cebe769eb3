// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # DateTime Serde Module
//!
//! RFC3339-compliant serialization and deserialization for `DateTime<Utc>`
//! fields across the verification system.
//!
//! ## Overview
//!
//! All timestamps in the domain are UTC with millisecond precision. This
//! module keeps the wire representation consistent:
//!
//! - **Standard Format**: `YYYY-MM-DDTHH:MM:SS.sssZ`
//! - **UTC Normalization**: non-UTC inputs are converted on deserialization
//! - **Validation**: invalid datetime strings are rejected with clear errors
//!
//! ## Usage
//!
//! Apply with the `#[serde(with = "...")]` attribute:
//!
//! ```rust,ignore
//! #[serde(with = "datetime_serde")]
//! created_at: DateTime<Utc>,
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Serializes a `DateTime<Utc>` to RFC3339 format with millisecond
/// precision and a `Z` suffix.
pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let rfc3339_string = dt.to_rfc3339_opts(SecondsFormat::Millis, true);
    serializer.serialize_str(&rfc3339_string)
}

/// Deserializes an RFC3339 datetime string to `DateTime<Utc>`, converting
/// any offset to UTC.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "super")]
        at: DateTime<Utc>,
    }

    #[test]
    fn test_serializes_millis_with_z_suffix() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap()
            + chrono::Duration::milliseconds(123);
        let json = serde_json::to_string(&Stamped { at }).unwrap();
        assert_eq!(json, r#"{"at":"2024-01-15T10:30:45.123Z"}"#);
    }

    #[test]
    fn test_round_trip() {
        let at = Utc::now().with_nanosecond(123_000_000).unwrap();
        let json = serde_json::to_string(&Stamped { at }).unwrap();
        let back: Stamped = serde_json::from_str(&json).unwrap();
        assert_eq!(back.at, at);
    }

    #[test]
    fn test_offset_normalized_to_utc() {
        let back: Stamped =
            serde_json::from_str(r#"{"at":"2024-01-15T12:30:45.000+02:00"}"#).unwrap();
        assert_eq!(back.at.hour(), 10);
    }

    #[test]
    fn test_invalid_input_rejected() {
        assert!(serde_json::from_str::<Stamped>(r#"{"at":"yesterday"}"#).is_err());
    }
}
