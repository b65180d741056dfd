//! Classification of GitHub failures into [`GitHubError`] variants.
//!
//! This is the only place where HTTP statuses and transport errors are
//! inspected; every other layer works with the classified error.

use http::StatusCode;

use crate::github::error::{GitHubError, mentions_rate_limit};
use crate::github::rate_limit::RateLimitInfo;

use super::http_utils::ErrorBody;

/// Checks if an octocrab error represents a network/transport issue.
pub(super) const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

/// Checks whether a 403/429 answer is a rate limit rather than a permission
/// problem, based on the message, the documentation URL, and the quota
/// headers.
fn is_rate_limit_answer(
    status: StatusCode,
    body: &ErrorBody,
    rate_limit: Option<RateLimitInfo>,
) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }

    status == StatusCode::FORBIDDEN
        && (body.message.as_deref().is_some_and(mentions_rate_limit)
            || body
                .documentation_url
                .as_deref()
                .is_some_and(|url| url.contains("rate-limit"))
            || rate_limit.is_some_and(|info| info.is_exhausted()))
}

/// Classifies a non-success GitHub response.
pub(super) fn classify_response(
    operation: &str,
    status: StatusCode,
    body: &ErrorBody,
    rate_limit: Option<RateLimitInfo>,
) -> GitHubError {
    let detail = body.message.as_deref().unwrap_or("unknown error");
    let message = format!("{operation} failed: GitHub returned {status} {detail}");

    if is_rate_limit_answer(status, body, rate_limit) {
        return GitHubError::RateLimited {
            status: Some(status),
            rate_limit,
            message,
        };
    }

    match status {
        StatusCode::UNAUTHORIZED => GitHubError::Authentication { message },
        StatusCode::FORBIDDEN => GitHubError::Forbidden { message },
        StatusCode::NOT_FOUND => GitHubError::NotFound { message },
        StatusCode::UNPROCESSABLE_ENTITY => GitHubError::Validation { message },
        server if server.is_server_error() => GitHubError::Server {
            status: server,
            message,
        },
        other => GitHubError::Api {
            status: Some(other),
            message,
        },
    }
}

/// Classifies an error raised by Octocrab itself.
pub(super) fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> GitHubError {
    if let octocrab::Error::GitHub { source, .. } = error {
        let body = ErrorBody {
            message: Some(source.message.clone()),
            documentation_url: source.documentation_url.clone(),
        };
        return classify_response(operation, source.status_code, &body, None);
    }

    if is_network_error(error) {
        return GitHubError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    GitHubError::Api {
        status: None,
        message: format!("{operation} failed: {error}"),
    }
}
