// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Logger
//!
//! Lightweight logging abstraction for the bootstrap phase.
//!
//! ## Design Rationale
//!
//! Configuration loading and environment validation run before the tracing
//! subscriber is installed, and their failures must still reach the
//! operator. The bootstrap logger is a **simplified logging interface** for
//! exactly that window:
//!
//! - **Minimal API** - only essential log levels
//! - **Trait-based** - testable with a no-op implementation
//! - **Integration-ready** - the console implementation routes through
//!   tracing once the subscriber is up, and stderr before

use std::io::Write;

/// Bootstrap logging abstraction
///
/// Provides a simple logging interface for bootstrap operations.
pub trait BootstrapLogger: Send + Sync {
    /// Fatal errors during bootstrap that will cause termination.
    fn error(&self, message: &str);

    /// Non-fatal issues (missing optional config, disabled features).
    fn warn(&self, message: &str);

    /// Normal bootstrap progress messages.
    fn info(&self, message: &str);
}

/// Console logger implementation
///
/// Writes to stderr before the tracing subscriber exists and mirrors into
/// tracing afterwards, so bootstrap messages appear in both places during
/// the handover.
pub struct ConsoleLogger {
    prefix: String,
}

impl ConsoleLogger {
    /// Create a new console logger with the default prefix
    pub fn new() -> Self {
        Self::with_prefix("bootstrap")
    }

    /// Create a new console logger with a custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    fn emit(&self, level: &str, message: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "[{}] {} {}", self.prefix, level, message);
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapLogger for ConsoleLogger {
    fn error(&self, message: &str) {
        self.emit("ERROR", message);
        tracing::error!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn warn(&self, message: &str) {
        self.emit("WARN", message);
        tracing::warn!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }
}

/// No-op logger for testing
///
/// Discards all log messages.
pub struct NoOpLogger;

impl NoOpLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapLogger for NoOpLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
}

/// Capturing logger for testing
///
/// Captures log messages in memory for assertion in tests.
#[cfg(test)]
pub struct CapturingLogger {
    messages: std::sync::Arc<std::sync::Mutex<Vec<(&'static str, String)>>>,
}

#[cfg(test)]
impl CapturingLogger {
    pub fn new() -> Self {
        Self {
            messages: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn messages(&self) -> Vec<(&'static str, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl BootstrapLogger for CapturingLogger {
    fn error(&self, message: &str) {
        self.messages.lock().unwrap().push(("error", message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.messages.lock().unwrap().push(("warn", message.to_string()));
    }

    fn info(&self, message: &str) {
        self.messages.lock().unwrap().push(("info", message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_logger_does_not_panic() {
        let logger = ConsoleLogger::new();
        logger.info("starting verifier bootstrap");
        logger.warn("fingerprint key unset, copyright checks disabled");
    }

    #[test]
    fn test_capturing_logger_records_in_order() {
        let logger = CapturingLogger::new();
        logger.info("one");
        logger.error("two");
        let messages = logger.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ("info", "one".to_string()));
        assert_eq!(messages[1].0, "error");
    }

    #[test]
    fn test_noop_logger_discards() {
        NoOpLogger::new().error("nothing happens");
    }
}
