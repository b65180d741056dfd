//! Error types exposed by the GitHub access layer.

use http::StatusCode;
use thiserror::Error;

use super::rate_limit::RateLimitInfo;
use crate::persistence::PersistenceError;

/// Errors surfaced while talking to GitHub or the local stores that guard it.
///
/// Upstream failures are classified once, where the HTTP response is first
/// inspected. Every layer above the gateway passes these variants through
/// unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GitHubError {
    /// GitHub refused the request because a rate limit was hit (403 with a rate
    /// limit message, or 429), or the local request window is exhausted.
    #[error("GitHub API rate limit exceeded: {message}")]
    RateLimited {
        /// HTTP status, absent when the local limiter refused the request.
        status: Option<StatusCode>,
        /// Quota reported alongside the refusal, if any.
        rate_limit: Option<RateLimitInfo>,
        /// Error message from GitHub or the local limiter.
        message: String,
    },

    /// The token was rejected (401).
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// GitHub error message returned with the response.
        message: String,
    },

    /// The token is valid but lacks permission (403 without a rate limit
    /// message).
    #[error("GitHub denied access: {message}")]
    Forbidden {
        /// GitHub error message returned with the response.
        message: String,
    },

    /// The resource does not exist or is hidden from the caller (404).
    #[error("GitHub resource not found: {message}")]
    NotFound {
        /// GitHub error message returned with the response.
        message: String,
    },

    /// GitHub rejected the request payload (422).
    #[error("GitHub rejected the request: {message}")]
    Validation {
        /// GitHub error message returned with the response.
        message: String,
    },

    /// GitHub failed internally (5xx).
    #[error("GitHub server error {status}: {message}")]
    Server {
        /// HTTP status returned by GitHub.
        status: StatusCode,
        /// Response detail.
        message: String,
    },

    /// Networking failed while calling GitHub.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// Any other API failure, including unexpected statuses and payloads that
    /// could not be decoded.
    #[error("GitHub API error: {message}")]
    Api {
        /// HTTP status when one was received.
        status: Option<StatusCode>,
        /// Error detail.
        message: String,
    },

    /// A URL could not be parsed.
    #[error("URL is invalid: {0}")]
    InvalidUrl(String),

    /// The authentication token was blank.
    #[error("access token must not be blank")]
    MissingToken,

    /// The durable throttle store failed.
    #[error("rate limit storage error: {message}")]
    Storage {
        /// Error detail from the store.
        message: String,
    },

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },
}

impl GitHubError {
    /// HTTP status associated with the failure, when GitHub answered.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::RateLimited { status, .. } | Self::Api { status, .. } => *status,
            Self::Authentication { .. } => Some(StatusCode::UNAUTHORIZED),
            Self::Forbidden { .. } => Some(StatusCode::FORBIDDEN),
            Self::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Self::Validation { .. } => Some(StatusCode::UNPROCESSABLE_ENTITY),
            Self::Server { status, .. } => Some(*status),
            Self::Network { .. }
            | Self::InvalidUrl(_)
            | Self::MissingToken
            | Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Io { .. } => None,
        }
    }

    /// Returns true for failures worth retrying: rate limits, server errors
    /// and transport failures.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Network { .. }
        )
    }

    /// Returns true when the failure means "wait for the quota to reset".
    ///
    /// Classified rate limits always qualify. Unclassified API errors qualify
    /// when their message mentions a rate limit, which covers secondary limits
    /// GitHub reports with unusual statuses.
    #[must_use]
    pub fn indicates_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api { message, .. } => mentions_rate_limit(message),
            _ => false,
        }
    }

    /// Wraps a durable store failure raised during `operation`.
    ///
    /// A missing or blank database URL and an unmigrated schema are
    /// configuration problems; everything else is a storage failure.
    #[must_use]
    pub fn from_persistence(operation: &str, error: &PersistenceError) -> Self {
        let message = format!("{operation}: {error}");
        match error {
            PersistenceError::MissingDatabaseUrl
            | PersistenceError::BlankDatabaseUrl
            | PersistenceError::SchemaNotInitialised => Self::Configuration { message },
            _ => Self::Storage { message },
        }
    }

    /// Quota information carried by a rate limit error.
    #[must_use]
    pub const fn rate_limit(&self) -> Option<RateLimitInfo> {
        match self {
            Self::RateLimited { rate_limit, .. } => *rate_limit,
            _ => None,
        }
    }
}

/// Checks whether a GitHub message describes a rate limit.
pub(crate) fn mentions_rate_limit(message: &str) -> bool {
    message.to_lowercase().contains("rate limit")
}
