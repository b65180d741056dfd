//! Data models for the GitHub payloads the access layer consumes.
//!
//! Types prefixed with `Api` are internal deserialisation targets that convert
//! into public domain types.

use serde::Deserialize;

/// Repository metadata used for visibility decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryMetadata {
    /// `owner/name` as reported by GitHub.
    pub full_name: Option<String>,
    /// True for private and internal repositories.
    pub private: bool,
    /// Default branch name.
    pub default_branch: Option<String>,
    /// HTML URL for displaying to a user.
    pub html_url: Option<String>,
}

/// Minimal pull request metadata used for validation and analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestMetadata {
    /// Pull request number.
    pub number: u64,
    /// Title of the pull request.
    pub title: Option<String>,
    /// State (e.g. open, closed).
    pub state: Option<String>,
    /// HTML URL for displaying to a user.
    pub html_url: Option<String>,
    /// Author login if present.
    pub author: Option<String>,
}

impl PullRequestMetadata {
    /// Returns true when GitHub reports the pull request as open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.as_deref() == Some("open")
    }
}

/// A submitted pull request review.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestReview {
    /// Review identifier.
    pub id: u64,
    /// Review state (e.g. `APPROVED`, `CHANGES_REQUESTED`, `COMMENTED`).
    pub state: Option<String>,
    /// Review body.
    pub body: Option<String>,
    /// Author login.
    pub author: Option<String>,
    /// Submission timestamp (ISO 8601 format).
    pub submitted_at: Option<String>,
}

/// Pull request metadata together with its reviews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDetails {
    /// PR metadata.
    pub metadata: PullRequestMetadata,
    /// Reviews submitted on the PR.
    pub reviews: Vec<PullRequestReview>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiRepository {
    pub(super) full_name: Option<String>,
    #[serde(default)]
    pub(super) private: bool,
    pub(super) default_branch: Option<String>,
    pub(super) html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiPullRequest {
    pub(super) number: u64,
    pub(super) title: Option<String>,
    pub(super) state: Option<String>,
    pub(super) html_url: Option<String>,
    pub(super) user: Option<ApiUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiReview {
    pub(super) id: u64,
    pub(super) state: Option<String>,
    pub(super) body: Option<String>,
    pub(super) user: Option<ApiUser>,
    pub(super) submitted_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiUser {
    pub(super) login: Option<String>,
}

impl From<ApiRepository> for RepositoryMetadata {
    fn from(value: ApiRepository) -> Self {
        Self {
            full_name: value.full_name,
            private: value.private,
            default_branch: value.default_branch,
            html_url: value.html_url,
        }
    }
}

impl From<ApiPullRequest> for PullRequestMetadata {
    fn from(value: ApiPullRequest) -> Self {
        Self {
            number: value.number,
            title: value.title,
            state: value.state,
            html_url: value.html_url,
            author: value.user.and_then(|user| user.login),
        }
    }
}

impl From<ApiReview> for PullRequestReview {
    fn from(value: ApiReview) -> Self {
        Self {
            id: value.id,
            state: value.state,
            body: value.body,
            author: value.user.and_then(|user| user.login),
            submitted_at: value.submitted_at,
        }
    }
}
