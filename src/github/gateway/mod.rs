//! Gateways for talking to the GitHub REST API through Octocrab.
//!
//! The raw gateway performs one request per call, following pages for
//! listings, and reports the quota headers GitHub returned with it. Retry,
//! throttling and caching live one layer up in [`crate::github::client`].

mod client;
mod error_mapping;
mod http_utils;
mod rest;

pub use rest::OctocrabGateway;

use async_trait::async_trait;

use crate::github::error::GitHubError;
use crate::github::locator::{PullRequestReference, RepositoryName, RepositoryOwner};
use crate::github::models::{PullRequestMetadata, PullRequestReview, RepositoryMetadata};
use crate::github::rate_limit::RateLimitInfo;

/// A successful GitHub answer and the quota reported with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    /// Decoded payload.
    pub value: T,
    /// Quota headers, when GitHub sent all of them.
    pub rate_limit: Option<RateLimitInfo>,
}

impl<T> ApiResponse<T> {
    /// Wraps a payload that arrived without quota headers.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            value,
            rate_limit: None,
        }
    }

    /// Attaches quota information.
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitInfo) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Converts the payload, keeping the quota.
    pub fn map<U>(self, convert: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            value: convert(self.value),
            rate_limit: self.rate_limit,
        }
    }
}

/// Gateway performing unguarded GitHub requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitHubGateway: Send + Sync {
    /// Fetch repository metadata.
    async fn repository(
        &self,
        owner: &RepositoryOwner,
        repository: &RepositoryName,
    ) -> Result<ApiResponse<RepositoryMetadata>, GitHubError>;

    /// Fetch pull request metadata.
    async fn pull_request(
        &self,
        reference: &PullRequestReference,
    ) -> Result<ApiResponse<PullRequestMetadata>, GitHubError>;

    /// Fetch the reviews submitted on a pull request.
    async fn pull_request_reviews(
        &self,
        reference: &PullRequestReference,
    ) -> Result<ApiResponse<Vec<PullRequestReview>>, GitHubError>;
}
