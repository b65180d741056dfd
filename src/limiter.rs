//! Fixed-window request admission.
//!
//! Counts requests in the current window and refuses them once the budget is
//! spent. The window restarts on the first check made after it has elapsed,
//! so bursts of up to twice the budget are possible across a window boundary.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};

/// In-memory fixed-window rate limiter.
pub struct WindowRateLimiter {
    max_requests: u32,
    window: Duration,
    window_start_ms: u64,
    count: u32,
    clock: Arc<dyn Clock>,
}

impl WindowRateLimiter {
    /// Creates a limiter admitting `max_requests` per `window`.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_clock(max_requests, window, Arc::new(SystemClock))
    }

    /// Creates a limiter reading time from `clock`. The first window starts
    /// now.
    #[must_use]
    pub fn with_clock(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        let window_start_ms = clock.now_millis();
        Self {
            max_requests,
            window,
            window_start_ms,
            count: 0,
            clock,
        }
    }

    /// Admits one request if the current window still has budget.
    pub fn check_limit(&mut self) -> bool {
        if self.max_requests == 0 {
            return false;
        }

        let now = self.clock.now_millis();
        let elapsed = Duration::from_millis(now.saturating_sub(self.window_start_ms));
        if elapsed >= self.window {
            self.window_start_ms = now;
            self.count = 0;
        }

        if self.count < self.max_requests {
            self.count += 1;
            true
        } else {
            false
        }
    }
}
