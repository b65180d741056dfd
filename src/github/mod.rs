//! GitHub access layer.
//!
//! Pull request URLs are parsed into typed references, repository visibility
//! and caller access are decided from repository metadata, and every upstream
//! call goes through a guarded client that caches answers, limits request
//! rate, throttles per user and retries transient failures. Failures are
//! classified once, where the HTTP response is first inspected, into
//! [`GitHubError`].

pub mod access;
pub mod client;
pub mod error;
pub mod gateway;
pub mod intake;
pub mod locator;
pub mod models;
pub mod rate_limit;
pub mod validator;

pub use access::{
    AccessContext, RepositoryAccessService, SessionCredentials, scope_grants_private_access,
};
pub use client::{ClientSettings, GitHubClient, PullRequestLookup, RepositoryLookup};
pub use error::GitHubError;
pub use gateway::{ApiResponse, GitHubGateway, OctocrabGateway};
pub use intake::ReviewIntake;
pub use locator::{
    AccessToken, PullRequestNumber, PullRequestReference, RepositoryName, RepositoryOwner,
};
pub use models::{PullRequestDetails, PullRequestMetadata, PullRequestReview, RepositoryMetadata};
pub use rate_limit::RateLimitInfo;
pub use validator::{PrValidationError, PrValidator};

#[cfg(test)]
pub use client::{MockPullRequestLookup, MockRepositoryLookup};
#[cfg(test)]
pub use gateway::MockGitHubGateway;
