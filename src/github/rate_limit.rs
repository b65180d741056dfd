//! Rate limit information from GitHub API responses.
//!
//! GitHub reports the caller's quota through the `X-RateLimit-Limit`,
//! `X-RateLimit-Remaining` and `X-RateLimit-Reset` headers. The throttle
//! persists these values so later requests can wait for the reset instead of
//! burning through a spent quota.

use http::HeaderMap;
use serde::{Deserialize, Serialize};

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Rate limit information extracted from GitHub API response headers.
///
/// Serialises as `{"remaining": .., "reset": .., "limit": ..}`, the layout
/// stored under `rate_limit:{user_id}`.
///
/// # Example
///
/// ```
/// use pullgate::github::RateLimitInfo;
///
/// let info = RateLimitInfo::new(5000, 4999, 1700000000);
/// assert!(!info.is_exhausted());
/// assert_eq!(info.remaining(), 4999);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    /// Remaining requests in the current window.
    remaining: u32,
    /// Unix timestamp (seconds) when the rate limit resets.
    reset: u64,
    /// Maximum requests allowed in the current window.
    limit: u32,
}

impl RateLimitInfo {
    /// Creates a new rate limit info instance.
    #[must_use]
    pub const fn new(limit: u32, remaining: u32, reset: u64) -> Self {
        Self {
            remaining,
            reset,
            limit,
        }
    }

    /// Reads the rate limit headers of a GitHub response.
    ///
    /// Returns `None` unless all three headers are present and numeric.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let limit = header_number(headers, LIMIT_HEADER)?;
        let remaining = header_number(headers, REMAINING_HEADER)?;
        let reset = header_number(headers, RESET_HEADER)?;

        Some(Self::new(
            u32::try_from(limit).ok()?,
            u32::try_from(remaining).ok()?,
            reset,
        ))
    }

    /// Returns the maximum requests allowed in the current window.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns the remaining requests in the current window.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Returns the Unix timestamp (seconds) when the rate limit resets.
    #[must_use]
    pub const fn reset_at(&self) -> u64 {
        self.reset
    }

    /// Returns the reset instant in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn reset_at_millis(&self) -> u64 {
        self.reset.saturating_mul(1_000)
    }

    /// Returns true if the rate limit has been exhausted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}
