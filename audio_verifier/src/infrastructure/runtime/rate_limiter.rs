// /////////////////////////////////////////////////////////////////////////////
// Audio Verifier
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Token-Bucket Rate Limiter
//!
//! Per-process pacing for outbound collaborator calls. The bucket refills
//! continuously at the configured rate; `acquire` waits exactly as long as
//! the deficit requires, so callers never busy-poll.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default outbound rate: 5 requests/second/process.
pub const DEFAULT_RATE_PER_SEC: f64 = 5.0;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Continuous-refill token bucket, safe for concurrent use.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a bucket holding at most `capacity` tokens, refilling at
    /// `refill_per_sec`.
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_per_sec,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Bucket at the default 5 req/s with matching burst capacity.
    pub fn per_process_default() -> Self {
        Self::new(DEFAULT_RATE_PER_SEC, DEFAULT_RATE_PER_SEC)
    }

    /// Takes one token, sleeping until the bucket can supply it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock();
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_per_sec)
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Takes one token only if available right now.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
