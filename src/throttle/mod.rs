//! Per-user request throttle anchored to durable storage.
//!
//! Two records are kept for every user id: the latest quota GitHub reported
//! (`rate_limit:{user_id}`, JSON) and the time of the last throttled request
//! (`last_request:{user_id}`, RFC 3339 UTC with millisecond precision). Both
//! survive restarts, so a new process keeps honouring a spent quota.
//!
//! The last-request record is read and then written without a transaction;
//! concurrent callers for one user may occasionally both skip or both take the
//! minimum delay.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::clock::{Clock, SystemClock};
use crate::github::{GitHubError, RateLimitInfo};
use crate::persistence::KeyValueStore;
use crate::telemetry::{NoopTelemetrySink, TelemetryEvent, TelemetrySink};

/// Minimum spacing between two throttled requests of one user.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(1_000);

/// Rate-limit-triggered waits allowed per call before giving up.
pub const DEFAULT_MAX_RATE_LIMIT_WAITS: u32 = 3;

/// Cumulative waiting allowed per call before a rate limit is surfaced.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(15 * 60);

/// Durable per-user throttle.
pub struct RequestThrottle {
    store: Arc<dyn KeyValueStore>,
    user_id: String,
    min_delay: Duration,
    clock: Arc<dyn Clock>,
    telemetry: Arc<dyn TelemetrySink>,
    max_rate_limit_waits: u32,
    max_wait: Duration,
}

impl RequestThrottle {
    /// Creates a throttle for `user_id` over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            min_delay: DEFAULT_MIN_DELAY,
            clock: Arc::new(SystemClock),
            telemetry: Arc::new(NoopTelemetrySink),
            max_rate_limit_waits: DEFAULT_MAX_RATE_LIMIT_WAITS,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    /// Overrides the minimum spacing between requests.
    #[must_use]
    pub const fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    /// Overrides the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Routes quota and wait events to `telemetry`.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Overrides how many rate-limit-triggered waits one call may take.
    #[must_use]
    pub const fn with_max_rate_limit_waits(mut self, waits: u32) -> Self {
        self.max_rate_limit_waits = waits;
        self
    }

    /// Overrides the cumulative wait allowed per call.
    #[must_use]
    pub const fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// The user id whose records this throttle manages.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Waits for quota, runs `operation`, and re-runs it after the reset when
    /// it fails because of a rate limit.
    ///
    /// Rate-limit-triggered re-runs stop after the configured number of waits
    /// or once another wait would exceed the cumulative deadline; the
    /// rate-limit error is returned at that point.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::Storage`] or [`GitHubError::Configuration`] when
    /// the durable store fails, any non-rate-limit error from `operation`
    /// unchanged, or the last rate-limit error once the bounds are reached.
    pub async fn execute_with_rate_limit<T, F, Fut>(&self, mut operation: F) -> Result<T, GitHubError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GitHubError>>,
    {
        let mut rate_limit_waits = 0_u32;
        let mut waited = Duration::ZERO;

        loop {
            waited = waited.saturating_add(self.wait_for_quota().await?);

            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if !error.indicates_rate_limit() => return Err(error),
                Err(error) => error,
            };

            if let Some(info) = error.rate_limit() {
                self.update_rate_limit(info).await?;
            }

            if rate_limit_waits >= self.max_rate_limit_waits {
                tracing::warn!(
                    "user {} still rate limited after {rate_limit_waits} waits: {error}",
                    self.user_id
                );
                return Err(error);
            }

            let pause = self.time_until_reset().await?;
            if waited.saturating_add(pause) > self.max_wait {
                tracing::warn!(
                    "user {} rate limited; waiting {pause:?} more would exceed {:?}: {error}",
                    self.user_id,
                    self.max_wait
                );
                return Err(error);
            }

            rate_limit_waits += 1;
            tracing::debug!(
                "user {} rate limited, retrying after {pause:?}: {error}",
                self.user_id
            );
            self.pause(pause).await;
            waited = waited.saturating_add(pause);
        }
    }

    /// Persists the quota GitHub reported for this user.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::Storage`] when the record cannot be written.
    pub async fn update_rate_limit(&self, info: RateLimitInfo) -> Result<(), GitHubError> {
        let serialised = serde_json::to_string(&info).map_err(|error| GitHubError::Storage {
            message: format!("failed to encode rate limit: {error}"),
        })?;
        self.store
            .upsert(&self.rate_limit_key(), &serialised)
            .await
            .map_err(|error| GitHubError::from_persistence("update rate limit", &error))?;

        self.telemetry.record(TelemetryEvent::RateLimitRecorded {
            user_id: self.user_id.clone(),
            remaining: info.remaining(),
            limit: info.limit(),
            reset: info.reset_at(),
        });
        Ok(())
    }

    /// Releases the durable store's connection.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::Storage`] when the store fails to close.
    pub async fn close(&self) -> Result<(), GitHubError> {
        self.store
            .close()
            .await
            .map_err(|error| GitHubError::from_persistence("close throttle store", &error))
    }

    /// Sleeps for whatever the persisted state demands and records this
    /// request as the latest. Returns the time spent waiting.
    async fn wait_for_quota(&self) -> Result<Duration, GitHubError> {
        let now = self.clock.now_millis();
        let wait_ms = match self.load_rate_limit().await? {
            Some(info) if info.is_exhausted() => info.reset_at_millis().saturating_sub(now),
            _ => self
                .load_last_request()
                .await?
                .map_or(0, |last| self.remaining_min_delay(now, last)),
        };

        let wait = Duration::from_millis(wait_ms);
        self.pause(wait).await;
        self.store_last_request(self.clock.now_millis()).await?;
        Ok(wait)
    }

    async fn time_until_reset(&self) -> Result<Duration, GitHubError> {
        let now = self.clock.now_millis();
        let wait_ms = self
            .load_rate_limit()
            .await?
            .map_or(0, |info| info.reset_at_millis().saturating_sub(now));
        Ok(Duration::from_millis(wait_ms))
    }

    fn remaining_min_delay(&self, now: u64, last: u64) -> u64 {
        let min_delay = u64::try_from(self.min_delay.as_millis()).unwrap_or(u64::MAX);
        min_delay.saturating_sub(now.saturating_sub(last))
    }

    async fn pause(&self, wait: Duration) {
        if wait.is_zero() {
            return;
        }
        self.telemetry.record(TelemetryEvent::ThrottleWaited {
            user_id: self.user_id.clone(),
            wait_ms: u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
        });
        tokio::time::sleep(wait).await;
    }

    async fn load_rate_limit(&self) -> Result<Option<RateLimitInfo>, GitHubError> {
        let stored = self
            .store
            .get(&self.rate_limit_key())
            .await
            .map_err(|error| GitHubError::from_persistence("load rate limit", &error))?;

        let Some(raw) = stored else {
            return Ok(None);
        };

        match serde_json::from_str::<RateLimitInfo>(&raw) {
            Ok(info) => Ok(Some(info)),
            Err(error) => {
                tracing::warn!(
                    "ignoring unreadable rate limit record for user {}: {error}",
                    self.user_id
                );
                Ok(None)
            }
        }
    }

    async fn load_last_request(&self) -> Result<Option<u64>, GitHubError> {
        let stored = self
            .store
            .get(&self.last_request_key())
            .await
            .map_err(|error| GitHubError::from_persistence("load last request", &error))?;

        Ok(stored.as_deref().and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                tracing::warn!(
                    "ignoring unreadable last request time for user {}: {raw}",
                    self.user_id
                );
            }
            parsed
        }))
    }

    async fn store_last_request(&self, now_millis: u64) -> Result<(), GitHubError> {
        let formatted = format_timestamp(now_millis).ok_or_else(|| GitHubError::Storage {
            message: format!("timestamp {now_millis} is out of range"),
        })?;
        self.store
            .upsert(&self.last_request_key(), &formatted)
            .await
            .map_err(|error| GitHubError::from_persistence("record last request", &error))
    }

    fn rate_limit_key(&self) -> String {
        format!("rate_limit:{}", self.user_id)
    }

    fn last_request_key(&self) -> String {
        format!("last_request:{}", self.user_id)
    }
}

fn format_timestamp(millis: u64) -> Option<String> {
    let signed = i64::try_from(millis).ok()?;
    DateTime::<Utc>::from_timestamp_millis(signed)
        .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn parse_timestamp(raw: &str) -> Option<u64> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim()).ok()?;
    u64::try_from(parsed.timestamp_millis()).ok()
}
