// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Session Identifier
//!
//! Type-safe identifier for verification sessions.
//!
//! ## Design Rationale
//!
//! Session identifiers are UUIDs because they are assigned by the service at
//! creation time and must be unguessable by other contributors polling the
//! status endpoint. Wrapping the UUID in a newtype prevents accidental mixing
//! with verification ids or blob references, which are also strings on the
//! wire.
//!
//! ## Characteristics
//!
//! - **Type Safety**: cannot be confused with other identifier types
//! - **Immutable**: value object semantics, equality by value
//! - **Serializable**: transparent serde representation (plain UUID string)

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use uuid::Uuid;

use crate::error::VerifierError;

/// Unique identifier for a verification session.
///
/// Assigned by the session store at creation; opaque to every other
/// component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a session id from its canonical string form.
    pub fn parse(s: &str) -> Result<Self, VerifierError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| VerifierError::ValidationError(format!("Invalid session id '{}': {}", s, e)))
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Short prefix for log correlation (first 8 hex chars).
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = VerifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<SessionId> for Uuid {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_uniqueness() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_id_round_trip() {
        let id = SessionId::new();
        let parsed = SessionId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_session_id_rejects_garbage() {
        assert!(SessionId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_short_prefix_length() {
        assert_eq!(SessionId::new().short().len(), 8);
    }
}
