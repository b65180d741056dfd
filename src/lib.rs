//! Pullgate: a guarded GitHub access layer for pull request review tools.
//!
//! The library validates pull request URLs, decides whether a repository is
//! public or reachable with the caller's OAuth scopes, and fetches pull
//! request metadata and reviews through a client that caches answers, limits
//! request rate in memory, throttles each user against durable state, and
//! retries transient GitHub failures with exponential backoff.

pub mod cache;
pub mod clock;
pub mod config;
pub mod github;
pub mod limiter;
pub mod persistence;
pub mod retry;
pub mod telemetry;
pub mod throttle;

pub use config::PullgateConfig;
pub use github::{
    GitHubClient, GitHubError, OctocrabGateway, PrValidationError, PrValidator,
    PullRequestReference, RepositoryAccessService,
};
