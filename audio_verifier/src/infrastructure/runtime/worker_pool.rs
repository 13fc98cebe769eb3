// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bounded Worker Pool
//!
//! The dispatch boundary between the ingress reactor and pipeline
//! execution.
//!
//! ## Design
//!
//! A fixed set of supervised workers drains one bounded job queue. The
//! ingress handler enqueues with `try_dispatch` and returns immediately;
//! when the queue is full the submission is rejected as transient
//! unavailability instead of piling unbounded work onto the process.
//!
//! Workers observe the shutdown token between jobs: on cancellation they
//! stop taking new work, and in-flight jobs finish their own cleanup.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use audio_verifier_bootstrap::shutdown::CancellationToken;
use audio_verifier_domain::VerifierError;

use super::supervisor::spawn_supervised;

/// Bounded pool of identical job workers.
pub struct WorkerPool<J: Send + 'static> {
    sender: mpsc::Sender<J>,
}

impl<J: Send + 'static> WorkerPool<J> {
    /// Spawns `workers` consumers over a queue of `queue_capacity` slots.
    ///
    /// `handler` runs one job to completion; it owns all job-level error
    /// handling (a pipeline run never propagates errors out of its worker).
    pub fn new<F, Fut>(
        workers: usize,
        queue_capacity: usize,
        token: CancellationToken,
        handler: F,
    ) -> Self
    where
        F: Fn(J) -> Fut + Clone + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let (sender, receiver) = mpsc::channel::<J>(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        for _ in 0..workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let handler = handler.clone();
            let token = token.clone();
            let _ = spawn_supervised("pipeline-worker", async move {
                loop {
                    let job = {
                        let mut receiver = receiver.lock().await;
                        tokio::select! {
                            job = receiver.recv() => job,
                            _ = token.cancelled() => None,
                        }
                    };
                    match job {
                        Some(job) => handler(job).await,
                        None => break,
                    }
                }
                Ok(())
            });
        }

        Self { sender }
    }

    /// Enqueues a job without waiting. A full queue is backpressure:
    /// callers surface it as transient unavailability.
    pub fn try_dispatch(&self, job: J) -> Result<(), VerifierError> {
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => VerifierError::ServiceUnavailable(
                "Verification capacity exhausted, retry shortly".to_string(),
            ),
            mpsc::error::TrySendError::Closed(_) => {
                VerifierError::ServiceUnavailable("Verification workers stopped".to_string())
            }
        })
    }
}
