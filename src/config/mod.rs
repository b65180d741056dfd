//! Application configuration loaded from CLI, environment, and files.
//!
//! Values are merged with ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.pullgate.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PULLGATE_PR_URL`, `PULLGATE_TOKEN`, or
//!    `GITHUB_TOKEN` as a fallback for the token
//! 4. **Command-line arguments** – `--pr-url`/`-u`, `--token`/`-t` and so on
//!
//! # Configuration File
//!
//! ```toml
//! pr_url = "https://github.com/owner/repo/pull/123"
//! token = "gho_example"
//! scope = "read:user,repo"
//! user_id = "4242"
//! database_url = "pullgate.sqlite"
//! cache_ttl_seconds = 300
//! rate_limit_max_requests = 30
//! ```

use std::env;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::github::{AccessToken, ClientSettings, GitHubError, SessionCredentials};
use crate::retry::RetryPolicy;

/// GitHub REST API root used when `api_url` is not configured.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Throttle identity used when `user_id` is not configured.
pub const DEFAULT_USER_ID: &str = "local";

const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;
const DEFAULT_CACHE_MAX_ENTRIES: usize = 100;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 30;
const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;
const DEFAULT_MIN_REQUEST_DELAY_MS: u64 = 1_000;
const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(1_000);

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use pullgate::PullgateConfig;
/// use ortho_config::OrthoConfig;
///
/// let config = PullgateConfig::load().expect("failed to load configuration");
/// let pr_url = config.require_pr_url().expect("PR URL required");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PULLGATE",
    discovery(
        dotfile_name = ".pullgate.toml",
        config_file_name = "pullgate.toml",
        app_name = "pullgate"
    )
)]
pub struct PullgateConfig {
    /// GitHub pull request URL to validate and load.
    ///
    /// Can be provided via:
    /// - CLI: `--pr-url <URL>` or `-u <URL>`
    /// - Environment: `PULLGATE_PR_URL`
    /// - Config file: `pr_url = "..."`
    #[ortho_config(cli_short = 'u')]
    pub pr_url: Option<String>,

    /// OAuth or personal access token forwarded to GitHub.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `PULLGATE_TOKEN` or `GITHUB_TOKEN`
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// OAuth scope string granted to the token (e.g. `read:user,repo`).
    ///
    /// Private repository access is only assumed when it contains `repo`.
    #[ortho_config(cli_short = 's')]
    pub scope: Option<String>,

    /// Identity the durable throttle keys its records by.
    #[ortho_config()]
    pub user_id: Option<String>,

    /// GitHub REST API root, mainly for GitHub Enterprise and tests.
    #[ortho_config()]
    pub api_url: Option<String>,

    /// Local `SQLite` database URL/path holding throttle state.
    ///
    /// Without it the throttle keeps its records in memory for the lifetime
    /// of the process.
    ///
    /// Can be provided via:
    /// - CLI: `--database-url <PATH>`
    /// - Environment: `PULLGATE_DATABASE_URL`
    /// - Config file: `database_url = "..."`
    #[ortho_config()]
    pub database_url: Option<String>,

    /// Runs database migrations and exits.
    ///
    /// Note: `ortho_config` does not load boolean values from the environment,
    /// so use `--migrate-db` or `migrate_db = true` in a config file.
    #[ortho_config()]
    pub migrate_db: bool,

    /// Seconds a cached GitHub answer stays fresh.
    #[ortho_config()]
    pub cache_ttl_seconds: u64,

    /// Entries kept per in-memory cache; zero disables caching.
    #[ortho_config()]
    pub cache_max_entries: usize,

    /// Requests admitted per window by the in-memory limiter.
    #[ortho_config()]
    pub rate_limit_max_requests: u32,

    /// Length of the in-memory limiter window, in milliseconds.
    #[ortho_config()]
    pub rate_limit_window_ms: u64,

    /// Minimum spacing between two throttled requests of one user, in
    /// milliseconds.
    #[ortho_config()]
    pub min_request_delay_ms: u64,

    /// Attempts per upstream call, including the first.
    #[ortho_config()]
    pub max_retry_attempts: u32,

    /// Emits telemetry events to stderr as JSON lines.
    #[ortho_config()]
    pub telemetry: bool,
}

impl Default for PullgateConfig {
    fn default() -> Self {
        Self {
            pr_url: None,
            token: None,
            scope: None,
            user_id: None,
            api_url: None,
            database_url: None,
            migrate_db: false,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            rate_limit_max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window_ms: DEFAULT_RATE_LIMIT_WINDOW_MS,
            min_request_delay_ms: DEFAULT_MIN_REQUEST_DELAY_MS,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            telemetry: false,
        }
    }
}

impl PullgateConfig {
    /// Resolves the token from configuration or the `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::MissingToken`] when no source provides a
    /// non-blank value.
    pub fn resolve_token(&self) -> Result<AccessToken, GitHubError> {
        let raw = self
            .token
            .clone()
            .or_else(|| env::var("GITHUB_TOKEN").ok())
            .ok_or(GitHubError::MissingToken)?;
        AccessToken::new(raw)
    }

    /// Returns the pull request URL or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::Configuration`] when no URL is configured.
    pub fn require_pr_url(&self) -> Result<&str, GitHubError> {
        self.pr_url
            .as_deref()
            .ok_or_else(|| GitHubError::Configuration {
                message: "pull request URL is required (use --pr-url or -u)".to_owned(),
            })
    }

    /// GitHub REST API root, without a trailing slash.
    #[must_use]
    pub fn api_base(&self) -> &str {
        self.api_url
            .as_deref()
            .map_or(DEFAULT_API_URL, |url| url.trim_end_matches('/'))
    }

    /// Identity used for throttle records.
    #[must_use]
    pub fn throttle_user_id(&self) -> &str {
        self.user_id
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_USER_ID)
    }

    /// Minimum spacing between throttled requests.
    #[must_use]
    pub const fn min_request_delay(&self) -> Duration {
        Duration::from_millis(self.min_request_delay_ms)
    }

    /// Guarded client settings derived from the cache, limiter and retry
    /// fields.
    #[must_use]
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            cache_ttl: Duration::from_secs(self.cache_ttl_seconds),
            cache_max_entries: self.cache_max_entries,
            rate_limit_max_requests: self.rate_limit_max_requests,
            rate_limit_window: Duration::from_millis(self.rate_limit_window_ms),
            retry: RetryPolicy::new(self.max_retry_attempts, RETRY_BASE_DELAY),
        }
    }

    /// Session credentials for the configured token and scope.
    #[must_use]
    pub fn session(&self) -> SessionCredentials {
        let token = self.resolve_token().ok().map(|token| token.value().to_owned());
        SessionCredentials::from_oauth(token, self.scope.clone())
    }

    /// Validates that numeric settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::Configuration`] when `max_retry_attempts` or
    /// `rate_limit_window_ms` is zero.
    pub fn validate(&self) -> Result<(), GitHubError> {
        if self.max_retry_attempts == 0 {
            return Err(GitHubError::Configuration {
                message: "max_retry_attempts must be at least 1".to_owned(),
            });
        }
        if self.rate_limit_window_ms == 0 {
            return Err(GitHubError::Configuration {
                message: "rate_limit_window_ms must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
