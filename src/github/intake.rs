//! Loads a pull request and its reviews for analysis.

use super::client::PullRequestLookup;
use super::error::GitHubError;
use super::locator::PullRequestReference;
use super::models::PullRequestDetails;

/// Aggregates pull request metadata and reviews through a lookup.
pub struct ReviewIntake<'client, Lookup>
where
    Lookup: PullRequestLookup,
{
    client: &'client Lookup,
}

impl<'client, Lookup> ReviewIntake<'client, Lookup>
where
    Lookup: PullRequestLookup,
{
    /// Create a new intake facade over `client`.
    #[must_use]
    pub const fn new(client: &'client Lookup) -> Self {
        Self { client }
    }

    /// Load metadata and reviews for the target pull request.
    ///
    /// # Errors
    ///
    /// Propagates any failure from the underlying lookup unchanged.
    pub async fn load(
        &self,
        reference: &PullRequestReference,
    ) -> Result<PullRequestDetails, GitHubError> {
        let metadata = self.client.pull_request(reference).await?;
        let reviews = self.client.pull_request_reviews(reference).await?;
        Ok(PullRequestDetails { metadata, reviews })
    }
}
