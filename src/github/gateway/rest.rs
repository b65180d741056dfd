//! Octocrab implementation of the GitHub gateway.

use async_trait::async_trait;
use http::Uri;
use octocrab::Octocrab;
use serde::de::DeserializeOwned;

use crate::github::error::GitHubError;
use crate::github::locator::{
    AccessToken, PullRequestReference, RepositoryName, RepositoryOwner, repository_path,
};
use crate::github::models::{
    ApiPullRequest, ApiRepository, ApiReview, PullRequestMetadata, PullRequestReview,
    RepositoryMetadata,
};
use crate::github::rate_limit::RateLimitInfo;

use super::client::build_octocrab_client;
use super::error_mapping::{classify_response, map_octocrab_error};
use super::http_utils::{ErrorBody, next_page_link};
use super::{ApiResponse, GitHubGateway};

/// Items requested per page when following a paginated listing.
const PAGE_SIZE: u8 = 100;

/// Octocrab-backed gateway.
pub struct OctocrabGateway {
    client: Octocrab,
}

impl OctocrabGateway {
    /// Creates a new gateway from an Octocrab client.
    #[must_use]
    pub const fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Builds a gateway for `api_base`, authenticated with `token` when one is
    /// supplied and anonymous otherwise.
    ///
    /// # Errors
    ///
    /// Returns `GitHubError::InvalidUrl` when the base URI cannot be parsed or
    /// `GitHubError::Api` when Octocrab fails to construct a client.
    pub fn for_token(token: Option<&AccessToken>, api_base: &str) -> Result<Self, GitHubError> {
        let octocrab = build_octocrab_client(token, api_base)?;
        Ok(Self::new(octocrab))
    }

    async fn fetch<Payload>(
        &self,
        operation: &str,
        path: &str,
    ) -> Result<ApiResponse<Payload>, GitHubError>
    where
        Payload: DeserializeOwned,
    {
        self.fetch_page(operation, parse_uri(path)?)
            .await
            .map(|(response, _)| response)
    }

    /// Follows `rel="next"` links until the listing is complete. The quota
    /// reported with the final page is the one returned.
    async fn fetch_all<Item>(
        &self,
        operation: &str,
        path: &str,
    ) -> Result<ApiResponse<Vec<Item>>, GitHubError>
    where
        Item: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut next = Some(parse_uri(&format!("{path}?per_page={PAGE_SIZE}"))?);
        let mut rate_limit = None;

        while let Some(uri) = next.take() {
            let (page, next_link) = self.fetch_page::<Vec<Item>>(operation, uri).await?;
            items.extend(page.value);
            rate_limit = page.rate_limit.or(rate_limit);
            next = next_link.as_deref().map(parse_uri).transpose()?;
        }

        Ok(with_quota(ApiResponse::new(items), rate_limit))
    }

    async fn fetch_page<Payload>(
        &self,
        operation: &str,
        uri: Uri,
    ) -> Result<(ApiResponse<Payload>, Option<String>), GitHubError>
    where
        Payload: DeserializeOwned,
    {
        let response = self
            .client
            ._get_with_headers(uri, None)
            .await
            .map_err(|error| map_octocrab_error(operation, &error))?;

        let status = response.status();
        let rate_limit = RateLimitInfo::from_headers(response.headers());
        let next_link = next_page_link(response.headers());
        let body = self
            .client
            .body_to_string(response)
            .await
            .map_err(|error| map_octocrab_error(operation, &error))?;

        if !status.is_success() {
            return Err(classify_response(
                operation,
                status,
                &ErrorBody::parse(&body),
                rate_limit,
            ));
        }

        let payload: Payload =
            serde_json::from_str(&body).map_err(|error| GitHubError::Api {
                status: Some(status),
                message: format!("{operation} response deserialisation failed: {error}"),
            })?;

        Ok((with_quota(ApiResponse::new(payload), rate_limit), next_link))
    }
}

fn with_quota<T>(response: ApiResponse<T>, rate_limit: Option<RateLimitInfo>) -> ApiResponse<T> {
    match rate_limit {
        Some(info) => response.with_rate_limit(info),
        None => response,
    }
}

fn parse_uri(path: &str) -> Result<Uri, GitHubError> {
    path.parse::<Uri>()
        .map_err(|error| GitHubError::InvalidUrl(error.to_string()))
}

#[async_trait]
impl GitHubGateway for OctocrabGateway {
    async fn repository(
        &self,
        owner: &RepositoryOwner,
        repository: &RepositoryName,
    ) -> Result<ApiResponse<RepositoryMetadata>, GitHubError> {
        let path = repository_path(owner.as_str(), repository.as_str());
        self.fetch::<ApiRepository>("repository", &path)
            .await
            .map(|response| response.map(RepositoryMetadata::from))
    }

    async fn pull_request(
        &self,
        reference: &PullRequestReference,
    ) -> Result<ApiResponse<PullRequestMetadata>, GitHubError> {
        self.fetch::<ApiPullRequest>("pull request", &reference.pull_request_path())
            .await
            .map(|response| response.map(PullRequestMetadata::from))
    }

    async fn pull_request_reviews(
        &self,
        reference: &PullRequestReference,
    ) -> Result<ApiResponse<Vec<PullRequestReview>>, GitHubError> {
        self.fetch_all::<ApiReview>("pull request reviews", &reference.reviews_path())
            .await
            .map(|response| {
                response.map(|reviews| reviews.into_iter().map(PullRequestReview::from).collect())
            })
    }
}
