//! Pull request URL validation before analysis.

use http::StatusCode;
use thiserror::Error;

use super::client::PullRequestLookup;
use super::error::GitHubError;
use super::locator::PullRequestReference;

/// User-facing reasons a pull request cannot be analysed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrValidationError {
    /// The URL is not a `github.com` pull request URL.
    #[error("Invalid PR URL format")]
    InvalidUrl,

    /// GitHub rejected the token (401).
    #[error("Invalid GitHub token")]
    InvalidToken,

    /// GitHub refused the request (403).
    #[error("Rate limit exceeded or access denied")]
    AccessDenied,

    /// The pull request or its repository is missing or hidden (404).
    #[error("Pull request or repository not found")]
    NotFound,

    /// The pull request exists but is closed or merged.
    #[error("Pull request is not open")]
    NotOpen,

    /// Any other failure while fetching the pull request.
    #[error("Failed to validate PR")]
    Failed {
        /// Underlying GitHub failure.
        #[source]
        source: GitHubError,
    },
}

impl From<GitHubError> for PrValidationError {
    fn from(error: GitHubError) -> Self {
        match error.status() {
            Some(StatusCode::UNAUTHORIZED) => Self::InvalidToken,
            Some(StatusCode::FORBIDDEN) => Self::AccessDenied,
            Some(StatusCode::NOT_FOUND) => Self::NotFound,
            _ => Self::Failed { source: error },
        }
    }
}

/// Confirms a pull request URL points at an open pull request.
pub struct PrValidator<Lookup> {
    lookup: Lookup,
}

impl<Lookup> PrValidator<Lookup>
where
    Lookup: PullRequestLookup,
{
    /// Creates a validator fetching through `lookup`.
    #[must_use]
    pub const fn new(lookup: Lookup) -> Self {
        Self { lookup }
    }

    /// Parses `url` and checks that the pull request it names is open.
    ///
    /// # Errors
    ///
    /// Returns [`PrValidationError::InvalidUrl`] when the URL does not parse,
    /// a status-specific variant when the fetch fails, and
    /// [`PrValidationError::NotOpen`] when the pull request is not open.
    pub async fn validate_pr(&self, url: &str) -> Result<(), PrValidationError> {
        let reference = PullRequestReference::parse(url).ok_or(PrValidationError::InvalidUrl)?;
        let metadata = self.lookup.pull_request(&reference).await?;

        if metadata.is_open() {
            Ok(())
        } else {
            Err(PrValidationError::NotOpen)
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use rstest::rstest;

    use super::{PrValidationError, PrValidator};
    use crate::github::client::MockPullRequestLookup;
    use crate::github::{GitHubError, PullRequestMetadata};

    const URL: &str = "https://github.com/octo/widgets/pull/7";

    fn lookup_returning(result: Result<PullRequestMetadata, GitHubError>) -> MockPullRequestLookup {
        let mut lookup = MockPullRequestLookup::new();
        lookup
            .expect_pull_request()
            .times(1)
            .returning(move |_| result.clone());
        lookup
    }

    fn pull_request(state: &str) -> PullRequestMetadata {
        PullRequestMetadata {
            number: 7,
            state: Some(state.to_owned()),
            ..PullRequestMetadata::default()
        }
    }

    #[rstest]
    #[case::not_a_url("not a url")]
    #[case::other_host("https://gitlab.com/octo/widgets/pull/7")]
    #[case::issues("https://github.com/octo/widgets/issues/7")]
    #[tokio::test]
    async fn malformed_urls_fail_without_fetching(#[case] url: &str) {
        let mut lookup = MockPullRequestLookup::new();
        lookup.expect_pull_request().times(0);
        let validator = PrValidator::new(lookup);

        let result = validator.validate_pr(url).await;

        assert_eq!(result, Err(PrValidationError::InvalidUrl));
        assert_eq!(
            result.map_err(|error| error.to_string()),
            Err("Invalid PR URL format".to_owned())
        );
    }

    #[rstest]
    #[tokio::test]
    async fn open_pull_request_passes() {
        let validator = PrValidator::new(lookup_returning(Ok(pull_request("open"))));

        assert_eq!(validator.validate_pr(URL).await, Ok(()));
    }

    #[rstest]
    #[case::closed("closed")]
    #[case::merged_state("merged")]
    #[tokio::test]
    async fn non_open_pull_request_is_rejected(#[case] state: &str) {
        let validator = PrValidator::new(lookup_returning(Ok(pull_request(state))));

        let result = validator.validate_pr(URL).await;

        assert_eq!(result, Err(PrValidationError::NotOpen));
        assert_eq!(
            result.map_err(|error| error.to_string()),
            Err("Pull request is not open".to_owned())
        );
    }

    #[rstest]
    #[case::unauthorised(
        GitHubError::Authentication { message: "Bad credentials".to_owned() },
        "Invalid GitHub token"
    )]
    #[case::forbidden(
        GitHubError::Forbidden { message: "denied".to_owned() },
        "Rate limit exceeded or access denied"
    )]
    #[case::primary_rate_limit(
        GitHubError::RateLimited {
            status: Some(StatusCode::FORBIDDEN),
            rate_limit: None,
            message: "API rate limit exceeded".to_owned(),
        },
        "Rate limit exceeded or access denied"
    )]
    #[case::not_found(
        GitHubError::NotFound { message: "Not Found".to_owned() },
        "Pull request or repository not found"
    )]
    #[case::too_many_requests(
        GitHubError::RateLimited {
            status: Some(StatusCode::TOO_MANY_REQUESTS),
            rate_limit: None,
            message: "slow down".to_owned(),
        },
        "Failed to validate PR"
    )]
    #[case::server(
        GitHubError::Server { status: StatusCode::BAD_GATEWAY, message: "bad".to_owned() },
        "Failed to validate PR"
    )]
    #[case::network(
        GitHubError::Network { message: "connection refused".to_owned() },
        "Failed to validate PR"
    )]
    #[tokio::test]
    async fn fetch_failures_map_to_user_messages(
        #[case] failure: GitHubError,
        #[case] expected: &str,
    ) {
        let validator = PrValidator::new(lookup_returning(Err(failure)));

        let error = validator
            .validate_pr(URL)
            .await
            .expect_err("validation should fail");

        assert_eq!(error.to_string(), expected);
    }
}
