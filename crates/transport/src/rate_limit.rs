//! Client-side request rate limiting.
//!
//! Two per-minute strategies are supported, each combined with an hourly
//! ceiling:
//!
//! - `token-bucket`: the bucket starts full (`perMinute` tokens) and is
//!   refilled wholesale once more than 60 s have passed since the last refill.
//! - `fixed-window`: a counter that resets when the 60 s window expires.
//!
//! Any other strategy name lets every request through.

use std::sync::Mutex;
use std::time::Duration;

use formbind_core::config::{RateLimitConfig, RateLimitStrategy};
use tokio::time::Instant;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

#[derive(Debug)]
struct Window {
    start: Instant,
    count: u32,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self { start: now, count: 0 }
    }

    fn roll(&mut self, now: Instant, length: Duration) {
        if now.duration_since(self.start) > length {
            self.start = now;
            self.count = 0;
        }
    }
}

#[derive(Debug)]
struct LimiterState {
    tokens: u32,
    last_refill: Instant,
    minute: Window,
    hour: Window,
}

/// Shared limiter; one per transport.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let now = Instant::now();
        let state = LimiterState {
            tokens: config.limits.per_minute,
            last_refill: now,
            minute: Window::new(now),
            hour: Window::new(now),
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// Take one request slot. Returns `false` when the request must be
    /// rejected.
    pub fn try_acquire(&self) -> bool {
        if !self.config.enabled {
            return true;
        }
        let limits = self.config.limits;
        let now = Instant::now();
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        state.hour.roll(now, HOUR);
        let hourly_ok = state.hour.count < limits.per_hour;

        let allowed = match self.config.strategy {
            RateLimitStrategy::TokenBucket => {
                if now.duration_since(state.last_refill) > MINUTE {
                    state.tokens = limits.per_minute;
                    state.last_refill = now;
                }
                if hourly_ok && state.tokens > 0 {
                    state.tokens -= 1;
                    true
                } else {
                    false
                }
            }
            RateLimitStrategy::FixedWindow => {
                state.minute.roll(now, MINUTE);
                if hourly_ok && state.minute.count < limits.per_minute {
                    state.minute.count += 1;
                    true
                } else {
                    false
                }
            }
            RateLimitStrategy::Unlimited => return true,
        };

        if allowed {
            state.hour.count += 1;
        } else {
            tracing::warn!(strategy = ?self.config.strategy, "Rate limit exceeded");
        }
        allowed
    }
}
