//! Request pacing for remote API calls.
//!
//! Provides rate limiting using a token bucket algorithm, so long runs stay
//! under the provider's per-token request limits.

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Request rate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestRate {
    /// Requests per second; 0 means unpaced.
    pub per_second: u32,
}

impl RequestRate {
    pub fn new(per_second: u32) -> Self {
        Self { per_second }
    }

    /// No limit.
    pub fn unlimited() -> Self {
        Self { per_second: 0 }
    }

    pub fn is_limited(&self) -> bool {
        self.per_second > 0
    }

    /// Format as human-readable string.
    pub fn display(&self) -> String {
        if !self.is_limited() {
            return "unlimited".to_string();
        }
        format!("{} req/s", self.per_second)
    }
}

impl Default for RequestRate {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Token-bucket throttle shared by every request of a client.
#[derive(Clone)]
pub struct RequestThrottle {
    limiter: Option<Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
    rate: RequestRate,
}

impl RequestThrottle {
    pub fn new(rate: RequestRate) -> Self {
        let limiter = NonZeroU32::new(rate.per_second)
            .map(|n| Arc::new(RateLimiter::direct(Quota::per_second(n))));
        Self { limiter, rate }
    }

    pub fn unlimited() -> Self {
        Self::new(RequestRate::unlimited())
    }

    /// Wait until one more request may be sent. No-op when unpaced.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(RequestRate::default())
    }
}

impl std::fmt::Debug for RequestThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestThrottle")
            .field("rate", &self.rate)
            .finish()
    }
}

/// Elapsed-time tracking for a run.
#[derive(Debug, Clone, Default)]
pub struct RunTimer {
    start_time: Option<std::time::Instant>,
    end_time: Option<std::time::Instant>,
}

impl RunTimer {
    pub fn start() -> Self {
        Self {
            start_time: Some(std::time::Instant::now()),
            end_time: None,
        }
    }

    pub fn stop(&mut self) {
        self.end_time = Some(std::time::Instant::now());
    }

    pub fn elapsed(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }
}
