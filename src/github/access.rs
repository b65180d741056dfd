//! Repository visibility and access decisions.
//!
//! Both checks answer with a plain boolean. A repository that does not exist
//! and one the caller may not see are indistinguishable upstream (GitHub
//! answers 404 for both), so both collapse to `false`.

use super::client::RepositoryLookup;
use super::locator::{AccessToken, RepositoryName, RepositoryOwner};

const PRIVATE_REPOSITORY_SCOPE: &str = "repo";

/// Credentials carried by a signed-in user's session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCredentials {
    /// OAuth access token, if the user has one.
    pub access_token: Option<String>,
    /// OAuth scope string granted to the token.
    pub scope: Option<String>,
    /// Whether the granted scopes cover private repositories.
    pub has_private_access: bool,
}

impl SessionCredentials {
    /// Builds session credentials from an OAuth grant, deriving private
    /// access from the scope string.
    #[must_use]
    pub fn from_oauth(access_token: Option<String>, scope: Option<String>) -> Self {
        let has_private_access = scope.as_deref().is_some_and(scope_grants_private_access);
        Self {
            access_token,
            scope,
            has_private_access,
        }
    }
}

/// Returns true when an OAuth scope list contains the literal `repo` scope.
///
/// Scopes may be separated by commas, whitespace, or both.
///
/// # Example
///
/// ```
/// use pullgate::github::scope_grants_private_access;
///
/// assert!(scope_grants_private_access("read:user, repo"));
/// assert!(!scope_grants_private_access("public_repo read:org"));
/// ```
#[must_use]
pub fn scope_grants_private_access(scope: &str) -> bool {
    scope
        .split(|character: char| character == ',' || character.is_whitespace())
        .any(|entry| entry == PRIVATE_REPOSITORY_SCOPE)
}

/// Credential view used by [`RepositoryAccessService`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessContext {
    github_token: Option<AccessToken>,
    has_private_access: bool,
}

impl AccessContext {
    /// Creates a context from its parts.
    #[must_use]
    pub const fn new(github_token: Option<AccessToken>, has_private_access: bool) -> Self {
        Self {
            github_token,
            has_private_access,
        }
    }

    /// Derives a context from session credentials. Blank tokens count as
    /// absent.
    #[must_use]
    pub fn from_session(session: &SessionCredentials) -> Self {
        let github_token = session
            .access_token
            .as_deref()
            .and_then(|token| AccessToken::new(token).ok());
        Self::new(github_token, session.has_private_access)
    }

    /// The caller's token, if any.
    #[must_use]
    pub const fn github_token(&self) -> Option<&AccessToken> {
        self.github_token.as_ref()
    }

    /// Whether the caller's scopes cover private repositories.
    #[must_use]
    pub const fn has_private_access(&self) -> bool {
        self.has_private_access
    }
}

/// Answers visibility and access questions for repositories.
pub struct RepositoryAccessService<Lookup> {
    lookup: Lookup,
    context: AccessContext,
}

impl<Lookup> RepositoryAccessService<Lookup>
where
    Lookup: RepositoryLookup,
{
    /// Creates a service over `lookup` for the caller described by `context`.
    ///
    /// `lookup` must authenticate with `context.github_token()`; otherwise
    /// [`Self::has_repository_access`] answers for a different credential
    /// than the one it checks. [`Self::from_session`] wires both from one
    /// token.
    #[must_use]
    pub const fn new(lookup: Lookup, context: AccessContext) -> Self {
        Self { lookup, context }
    }

    /// Creates a service for the caller behind `session`, building the lookup
    /// from the session's own token (`None` when it is absent or blank).
    ///
    /// # Errors
    ///
    /// Returns whatever `connect` fails with.
    pub fn from_session<E>(
        session: &SessionCredentials,
        connect: impl FnOnce(Option<&AccessToken>) -> Result<Lookup, E>,
    ) -> Result<Self, E> {
        let context = AccessContext::from_session(session);
        let lookup = connect(context.github_token())?;
        Ok(Self::new(lookup, context))
    }

    /// The caller's credential view.
    #[must_use]
    pub const fn context(&self) -> &AccessContext {
        &self.context
    }

    /// Returns true when the repository can be fetched and is not private.
    ///
    /// Any failure, including a 404 for a repository the caller cannot see,
    /// yields `false`.
    pub async fn is_repository_public(
        &self,
        owner: &RepositoryOwner,
        repository: &RepositoryName,
    ) -> bool {
        match self.lookup.repository(owner, repository).await {
            Ok(metadata) => !metadata.private,
            Err(error) => {
                tracing::debug!(
                    "treating {}/{} as not public: {error}",
                    owner.as_str(),
                    repository.as_str()
                );
                false
            }
        }
    }

    /// Returns true when the caller holds a token with private scope and the
    /// repository can be fetched with it.
    pub async fn has_repository_access(
        &self,
        owner: &RepositoryOwner,
        repository: &RepositoryName,
    ) -> bool {
        if self.context.github_token.is_none() || !self.context.has_private_access {
            return false;
        }

        match self.lookup.repository(owner, repository).await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!(
                    "no access to {}/{}: {error}",
                    owner.as_str(),
                    repository.as_str()
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        AccessContext, RepositoryAccessService, SessionCredentials, scope_grants_private_access,
    };
    use crate::github::client::MockRepositoryLookup;
    use crate::github::{AccessToken, GitHubError, RepositoryMetadata, RepositoryName, RepositoryOwner};

    fn owner() -> RepositoryOwner {
        RepositoryOwner::new("octo").expect("owner should be valid")
    }

    fn repo() -> RepositoryName {
        RepositoryName::new("widgets").expect("repository should be valid")
    }

    fn repository(private: bool) -> RepositoryMetadata {
        RepositoryMetadata {
            private,
            ..RepositoryMetadata::default()
        }
    }

    fn privileged() -> AccessContext {
        AccessContext::new(Some(AccessToken::new("token").expect("token should be valid")), true)
    }

    fn lookup_returning(
        result: Result<RepositoryMetadata, GitHubError>,
        times: usize,
    ) -> MockRepositoryLookup {
        let mut lookup = MockRepositoryLookup::new();
        lookup
            .expect_repository()
            .times(times)
            .returning(move |_, _| result.clone());
        lookup
    }

    #[rstest]
    #[case::plain("repo", true)]
    #[case::comma_list("read:user,repo", true)]
    #[case::comma_space_list("read:user, repo", true)]
    #[case::space_list("user repo gist", true)]
    #[case::public_repo_only("public_repo", false)]
    #[case::prefix_only("repo:status", false)]
    #[case::empty("", false)]
    fn scope_parsing(#[case] scope: &str, #[case] expected: bool) {
        assert_eq!(scope_grants_private_access(scope), expected);
    }

    #[rstest]
    fn session_from_oauth_derives_private_access() {
        let session = SessionCredentials::from_oauth(
            Some("token".to_owned()),
            Some("read:user,repo".to_owned()),
        );

        assert!(session.has_private_access);
        let context = AccessContext::from_session(&session);
        assert!(context.has_private_access());
        assert_eq!(context.github_token().map(AccessToken::value), Some("token"));
    }

    #[rstest]
    fn blank_session_token_counts_as_absent() {
        let session = SessionCredentials {
            access_token: Some("   ".to_owned()),
            scope: Some("repo".to_owned()),
            has_private_access: true,
        };

        assert!(AccessContext::from_session(&session).github_token().is_none());
    }

    #[rstest]
    #[case::public(false, true)]
    #[case::private(true, false)]
    #[tokio::test]
    async fn visibility_follows_private_flag(#[case] private: bool, #[case] expected: bool) {
        let service = RepositoryAccessService::new(
            lookup_returning(Ok(repository(private)), 1),
            AccessContext::default(),
        );

        assert_eq!(service.is_repository_public(&owner(), &repo()).await, expected);
    }

    #[rstest]
    #[tokio::test]
    async fn unreachable_repository_is_not_public() {
        let service = RepositoryAccessService::new(
            lookup_returning(
                Err(GitHubError::NotFound {
                    message: "Not Found".to_owned(),
                }),
                1,
            ),
            AccessContext::default(),
        );

        assert!(!service.is_repository_public(&owner(), &repo()).await);
    }

    #[rstest]
    #[case::no_token(AccessContext::new(None, true))]
    #[case::no_private_scope(AccessContext::new(
        Some(AccessToken::new("token").expect("token should be valid")),
        false
    ))]
    #[tokio::test]
    async fn access_is_denied_without_privileged_credentials(#[case] context: AccessContext) {
        let service = RepositoryAccessService::new(lookup_returning(Ok(repository(true)), 0), context);

        assert!(!service.has_repository_access(&owner(), &repo()).await);
    }

    #[rstest]
    #[tokio::test]
    async fn privileged_caller_has_access_when_fetch_succeeds() {
        let service =
            RepositoryAccessService::new(lookup_returning(Ok(repository(true)), 1), privileged());

        assert!(service.has_repository_access(&owner(), &repo()).await);
    }

    #[rstest]
    #[case::not_found(GitHubError::NotFound { message: "Not Found".to_owned() })]
    #[case::forbidden(GitHubError::Forbidden { message: "denied".to_owned() })]
    #[tokio::test]
    async fn failed_fetch_collapses_to_no_access(#[case] failure: GitHubError) {
        let service = RepositoryAccessService::new(lookup_returning(Err(failure), 1), privileged());

        assert!(!service.has_repository_access(&owner(), &repo()).await);
    }

    #[rstest]
    #[tokio::test]
    async fn from_session_connects_with_the_session_token() {
        let session =
            SessionCredentials::from_oauth(Some(" gho_secret ".to_owned()), Some("repo".to_owned()));
        let mut seen_token = None;

        let service = RepositoryAccessService::from_session(&session, |token| {
            seen_token = token.map(|value| value.value().to_owned());
            Ok::<_, GitHubError>(lookup_returning(Ok(repository(true)), 1))
        })
        .expect("lookup should connect");

        assert_eq!(seen_token.as_deref(), Some("gho_secret"));
        assert_eq!(
            service.context().github_token().map(AccessToken::value),
            seen_token.as_deref()
        );
        assert!(service.has_repository_access(&owner(), &repo()).await);
    }

    #[rstest]
    fn from_session_connects_anonymously_without_a_token() {
        let session = SessionCredentials::from_oauth(None, Some("repo".to_owned()));
        let mut connected_with_token = true;

        RepositoryAccessService::from_session(&session, |token| {
            connected_with_token = token.is_some();
            Ok::<_, GitHubError>(lookup_returning(Ok(repository(true)), 0))
        })
        .expect("lookup should connect");

        assert!(!connected_with_token);
    }

    #[rstest]
    fn from_session_surfaces_connection_failures() {
        let session = SessionCredentials::from_oauth(Some("token".to_owned()), None);

        let result = RepositoryAccessService::<MockRepositoryLookup>::from_session(&session, |_| {
            Err(GitHubError::InvalidUrl("not a uri".to_owned()))
        });

        assert!(matches!(result, Err(GitHubError::InvalidUrl(_))));
    }
}
