//! URL parsing and identity wrappers for pull request access.

use std::fmt;

use url::Url;

use super::error::GitHubError;

const GITHUB_HOST: &str = "github.com";
const PULL_MARKER: &str = "pull";

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    /// Wraps a non-empty owner login.
    #[must_use]
    pub fn new(value: &str) -> Option<Self> {
        (!value.is_empty()).then(|| Self(value.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Wraps a non-empty repository name.
    #[must_use]
    pub fn new(value: &str) -> Option<Self> {
        (!value.is_empty()).then(|| Self(value.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Pull request number, always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    /// Wraps a positive pull request number.
    #[must_use]
    pub const fn new(value: u64) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Bearer token forwarded unchanged to GitHub.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns `GitHubError::MissingToken` when the supplied string is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, GitHubError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(GitHubError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for AccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("AccessToken(***)")
    }
}

/// A pull request identified by owner, repository and number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PullRequestReference {
    owner: RepositoryOwner,
    repository: RepositoryName,
    number: PullRequestNumber,
}

impl PullRequestReference {
    /// Builds a reference from its parts.
    #[must_use]
    pub const fn new(
        owner: RepositoryOwner,
        repository: RepositoryName,
        number: PullRequestNumber,
    ) -> Self {
        Self {
            owner,
            repository,
            number,
        }
    }

    /// Parses a pull request URL of the form
    /// `https://github.com/<owner>/<repo>/pull/<number>`.
    ///
    /// Returns `None` when the URL does not parse, the host is not exactly
    /// `github.com`, the path does not have exactly those four segments, or
    /// the number is not a positive integer. Query strings and fragments are
    /// ignored; trailing slashes are not normalised away.
    ///
    /// # Example
    ///
    /// ```
    /// use pullgate::github::PullRequestReference;
    ///
    /// let reference = PullRequestReference::parse("https://github.com/octo/repo/pull/12")
    ///     .expect("should parse");
    /// assert_eq!(reference.owner().as_str(), "octo");
    /// assert_eq!(reference.number().get(), 12);
    /// assert!(PullRequestReference::parse("https://gitlab.com/octo/repo/pull/12").is_none());
    /// ```
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let parsed = Url::parse(input).ok()?;
        if parsed.host_str() != Some(GITHUB_HOST) {
            return None;
        }

        let segments: Vec<&str> = parsed.path_segments()?.collect();
        let [owner, repository, marker, number] = segments.as_slice() else {
            return None;
        };
        if *marker != PULL_MARKER {
            return None;
        }

        let parsed_number = number.parse::<u64>().ok()?;
        Some(Self::new(
            RepositoryOwner::new(owner)?,
            RepositoryName::new(repository)?,
            PullRequestNumber::new(parsed_number)?,
        ))
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    pub(crate) fn pull_request_path(&self) -> String {
        format!(
            "{}/pulls/{}",
            repository_path(self.owner.as_str(), self.repository.as_str()),
            self.number.get()
        )
    }

    pub(crate) fn reviews_path(&self) -> String {
        format!("{}/reviews", self.pull_request_path())
    }

    pub(crate) fn cache_key(&self) -> String {
        format!(
            "{}/{}#{}",
            self.owner.as_str(),
            self.repository.as_str(),
            self.number.get()
        )
    }
}

impl fmt::Display for PullRequestReference {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.cache_key())
    }
}

pub(crate) fn repository_path(owner: &str, repository: &str) -> String {
    format!("/repos/{owner}/{repository}")
}
