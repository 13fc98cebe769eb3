// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Task Supervision
//!
//! Supervised task spawning for the verifier's background work.
//!
//! Wrapping `tokio::spawn` here keeps two guarantees the bare call does
//! not: every task outcome is logged under its name, and panics surface as
//! typed errors instead of vanishing into a dropped `JoinHandle`.

use tokio::task::JoinHandle;
use tracing::{debug, error};

use audio_verifier_domain::VerifierError;

/// Spawns a named task whose outcome is always logged.
///
/// The returned handle should be awaited with [`join_supervised`]; workers
/// that legitimately outlive their spawner (the reward hand-off) may drop
/// it after the task's own logging is in place.
pub fn spawn_supervised<F, T>(name: &'static str, fut: F) -> JoinHandle<Result<T, VerifierError>>
where
    F: std::future::Future<Output = Result<T, VerifierError>> + Send + 'static,
    T: Send + 'static,
{
    debug!(task = name, "task starting");

    tokio::spawn(async move {
        let result = fut.await;
        match &result {
            Ok(_) => debug!(task = name, "task completed"),
            Err(e) => error!(task = name, error = %e, "task failed"),
        }
        result
    })
}

/// Awaits a supervised handle, converting panics and aborts to typed errors.
pub async fn join_supervised<T>(
    handle: JoinHandle<Result<T, VerifierError>>,
) -> Result<T, VerifierError> {
    match handle.await {
        Ok(task_result) => task_result,
        Err(e) if e.is_panic() => Err(VerifierError::internal_error(format!(
            "task panicked: {}",
            e
        ))),
        Err(e) if e.is_cancelled() => Err(VerifierError::Cancelled("task aborted".to_string())),
        Err(e) => Err(VerifierError::internal_error(format!(
            "task join failed: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_propagates() {
        let handle = spawn_supervised("test-success", async { Ok(41 + 1) });
        assert_eq!(join_supervised(handle).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_error_propagates() {
        let handle = spawn_supervised("test-error", async {
            Err::<(), _>(VerifierError::processing_failed("boom"))
        });
        assert!(join_supervised(handle).await.is_err());
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let handle: JoinHandle<Result<(), VerifierError>> =
            tokio::spawn(async { panic!("deliberate") });
        let err = join_supervised(handle).await.unwrap_err();
        assert!(matches!(err, VerifierError::InternalError(_)));
    }
}
