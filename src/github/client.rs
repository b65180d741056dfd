//! Guarded GitHub client.
//!
//! Every upstream call passes through the same chain: a TTL cache lookup, then
//! (inside the retry policy) the durable per-user throttle when one is
//! configured, and for every upstream invocation the in-memory window limiter
//! followed by the raw gateway.
//! Quota headers from successful answers are persisted through the throttle
//! and only successful values are cached.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::limiter::WindowRateLimiter;
use crate::retry::RetryPolicy;
use crate::throttle::RequestThrottle;

use super::error::GitHubError;
use super::gateway::{ApiResponse, GitHubGateway};
use super::locator::{PullRequestReference, RepositoryName, RepositoryOwner, repository_path};
use super::models::{PullRequestMetadata, PullRequestReview, RepositoryMetadata};

/// Tuning knobs for [`GitHubClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    /// How long a cached answer stays fresh.
    pub cache_ttl: Duration,
    /// Entries kept per cache; zero disables caching.
    pub cache_max_entries: usize,
    /// Requests admitted per window by the in-memory limiter.
    pub rate_limit_max_requests: u32,
    /// Length of the limiter window.
    pub rate_limit_window: Duration,
    /// Retry policy wrapped around every upstream call.
    pub retry: RetryPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 100,
            rate_limit_max_requests: 30,
            rate_limit_window: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Source of repository metadata.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepositoryLookup: Send + Sync {
    /// Fetch metadata for `owner/repository`.
    async fn repository(
        &self,
        owner: &RepositoryOwner,
        repository: &RepositoryName,
    ) -> Result<RepositoryMetadata, GitHubError>;
}

/// Source of pull request metadata and reviews.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestLookup: Send + Sync {
    /// Fetch pull request metadata.
    async fn pull_request(
        &self,
        reference: &PullRequestReference,
    ) -> Result<PullRequestMetadata, GitHubError>;

    /// Fetch the reviews submitted on a pull request.
    async fn pull_request_reviews(
        &self,
        reference: &PullRequestReference,
    ) -> Result<Vec<PullRequestReview>, GitHubError>;
}

/// GitHub client combining caching, rate limiting, throttling and retries
/// around a [`GitHubGateway`].
pub struct GitHubClient<Gateway> {
    gateway: Gateway,
    throttle: Option<RequestThrottle>,
    retry: RetryPolicy,
    limiter: Mutex<WindowRateLimiter>,
    repositories: Mutex<TtlCache<String, RepositoryMetadata>>,
    pull_requests: Mutex<TtlCache<String, PullRequestMetadata>>,
    reviews: Mutex<TtlCache<String, Vec<PullRequestReview>>>,
}

impl<Gateway> GitHubClient<Gateway>
where
    Gateway: GitHubGateway,
{
    /// Creates a client without a durable throttle.
    #[must_use]
    pub fn new(gateway: Gateway, settings: ClientSettings, clock: Arc<dyn Clock>) -> Self {
        let cache_ttl = settings.cache_ttl;
        let cache_size = settings.cache_max_entries;
        Self {
            gateway,
            throttle: None,
            retry: settings.retry,
            limiter: Mutex::new(WindowRateLimiter::with_clock(
                settings.rate_limit_max_requests,
                settings.rate_limit_window,
                Arc::clone(&clock),
            )),
            repositories: Mutex::new(TtlCache::with_clock(cache_ttl, cache_size, Arc::clone(&clock))),
            pull_requests: Mutex::new(TtlCache::with_clock(cache_ttl, cache_size, Arc::clone(&clock))),
            reviews: Mutex::new(TtlCache::with_clock(cache_ttl, cache_size, clock)),
        }
    }

    /// Routes every upstream call through `throttle`.
    #[must_use]
    pub fn with_throttle(mut self, throttle: RequestThrottle) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// The configured durable throttle, if any.
    #[must_use]
    pub const fn throttle(&self) -> Option<&RequestThrottle> {
        self.throttle.as_ref()
    }

    /// Fetch repository metadata, serving fresh cached answers locally.
    ///
    /// # Errors
    ///
    /// Returns the classified [`GitHubError`] once retries are exhausted or a
    /// non-retryable failure occurs.
    pub async fn repository(
        &self,
        owner: &RepositoryOwner,
        repository: &RepositoryName,
    ) -> Result<RepositoryMetadata, GitHubError> {
        let key = repository_path(owner.as_str(), repository.as_str());
        let cached = lock(&self.repositories).get(&key);
        if let Some(metadata) = cached {
            return Ok(metadata);
        }

        let gateway = &self.gateway;
        let metadata = self
            .guarded("repository", move || gateway.repository(owner, repository))
            .await?;
        lock(&self.repositories).set(key, metadata.clone());
        Ok(metadata)
    }

    /// Fetch pull request metadata, serving fresh cached answers locally.
    ///
    /// # Errors
    ///
    /// Returns the classified [`GitHubError`] once retries are exhausted or a
    /// non-retryable failure occurs.
    pub async fn pull_request(
        &self,
        reference: &PullRequestReference,
    ) -> Result<PullRequestMetadata, GitHubError> {
        let key = reference.cache_key();
        let cached = lock(&self.pull_requests).get(&key);
        if let Some(metadata) = cached {
            return Ok(metadata);
        }

        let gateway = &self.gateway;
        let metadata = self
            .guarded("pull request", move || gateway.pull_request(reference))
            .await?;
        lock(&self.pull_requests).set(key, metadata.clone());
        Ok(metadata)
    }

    /// Fetch pull request reviews, serving fresh cached answers locally.
    ///
    /// # Errors
    ///
    /// Returns the classified [`GitHubError`] once retries are exhausted or a
    /// non-retryable failure occurs.
    pub async fn pull_request_reviews(
        &self,
        reference: &PullRequestReference,
    ) -> Result<Vec<PullRequestReview>, GitHubError> {
        let key = reference.cache_key();
        let cached = lock(&self.reviews).get(&key);
        if let Some(reviews) = cached {
            return Ok(reviews);
        }

        let gateway = &self.gateway;
        let reviews = self
            .guarded("pull request reviews", move || {
                gateway.pull_request_reviews(reference)
            })
            .await?;
        lock(&self.reviews).set(key, reviews.clone());
        Ok(reviews)
    }

    async fn guarded<T, F, Fut>(&self, operation: &str, call: F) -> Result<T, GitHubError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<ApiResponse<T>, GitHubError>>,
    {
        self.retry
            .run(operation, || self.attempt(operation, &call))
            .await
    }

    async fn attempt<T, F, Fut>(&self, operation: &str, call: &F) -> Result<T, GitHubError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<ApiResponse<T>, GitHubError>>,
    {
        // Every upstream invocation, including throttle re-runs, needs a slot.
        let admitted_call = move || async move {
            self.admit(operation)?;
            call().await
        };

        let Some(throttle) = &self.throttle else {
            return admitted_call().await.map(|response| response.value);
        };

        let response = throttle.execute_with_rate_limit(admitted_call).await?;
        if let Some(info) = response.rate_limit {
            throttle.update_rate_limit(info).await?;
        }
        Ok(response.value)
    }

    fn admit(&self, operation: &str) -> Result<(), GitHubError> {
        if lock(&self.limiter).check_limit() {
            return Ok(());
        }
        Err(GitHubError::RateLimited {
            status: None,
            rate_limit: None,
            message: format!("local request window exhausted before {operation}"),
        })
    }
}

#[async_trait]
impl<Gateway> RepositoryLookup for GitHubClient<Gateway>
where
    Gateway: GitHubGateway,
{
    async fn repository(
        &self,
        owner: &RepositoryOwner,
        repository: &RepositoryName,
    ) -> Result<RepositoryMetadata, GitHubError> {
        Self::repository(self, owner, repository).await
    }
}

#[async_trait]
impl<Gateway> PullRequestLookup for GitHubClient<Gateway>
where
    Gateway: GitHubGateway,
{
    async fn pull_request(
        &self,
        reference: &PullRequestReference,
    ) -> Result<PullRequestMetadata, GitHubError> {
        Self::pull_request(self, reference).await
    }

    async fn pull_request_reviews(
        &self,
        reference: &PullRequestReference,
    ) -> Result<Vec<PullRequestReview>, GitHubError> {
        Self::pull_request_reviews(self, reference).await
    }
}

#[async_trait]
impl<Lookup> RepositoryLookup for &Lookup
where
    Lookup: RepositoryLookup + ?Sized,
{
    async fn repository(
        &self,
        owner: &RepositoryOwner,
        repository: &RepositoryName,
    ) -> Result<RepositoryMetadata, GitHubError> {
        (**self).repository(owner, repository).await
    }
}

#[async_trait]
impl<Lookup> PullRequestLookup for &Lookup
where
    Lookup: PullRequestLookup + ?Sized,
{
    async fn pull_request(
        &self,
        reference: &PullRequestReference,
    ) -> Result<PullRequestMetadata, GitHubError> {
        (**self).pull_request(reference).await
    }

    async fn pull_request_reviews(
        &self,
        reference: &PullRequestReference,
    ) -> Result<Vec<PullRequestReview>, GitHubError> {
        (**self).pull_request_reviews(reference).await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
