//! Wall-clock time sources.
//!
//! The cache, the fixed-window limiter and the persistent throttle all reason
//! about elapsed milliseconds. They read time through [`Clock`] so tests can
//! substitute a manually advanced source.

use std::time::{SystemTime, UNIX_EPOCH};

/// A source of the current time, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Clock backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-support"))]
mod manual {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use super::Clock;

    /// Clock that only moves when told to.
    ///
    /// Clones share the same underlying instant, so a test can keep one handle
    /// and pass another into the component under test.
    #[derive(Debug, Clone, Default)]
    pub struct ManualClock {
        now: Arc<AtomicU64>,
    }

    impl ManualClock {
        /// Creates a clock frozen at `start_millis`.
        #[must_use]
        pub fn at(start_millis: u64) -> Self {
            Self {
                now: Arc::new(AtomicU64::new(start_millis)),
            }
        }

        /// Moves the clock forward by `step`.
        pub fn advance(&self, step: Duration) {
            let millis = u64::try_from(step.as_millis()).unwrap_or(u64::MAX);
            self.now.fetch_add(millis, Ordering::SeqCst);
        }

        /// Sets the clock to an absolute instant.
        pub fn set(&self, millis: u64) {
            self.now.store(millis, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> u64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}
