//! Octocrab client construction helpers for gateway implementations.

use http::Uri;
use octocrab::Octocrab;
use octocrab::service::middleware::retry::RetryConfig;

use crate::github::error::GitHubError;
use crate::github::locator::AccessToken;

use super::error_mapping::map_octocrab_error;

/// Builds an Octocrab client for the given token and API base URL.
///
/// Without a token the client talks to GitHub anonymously. Octocrab's own
/// retry middleware is switched off so [`crate::retry::RetryPolicy`] is the
/// only layer deciding when to try again.
///
/// # Errors
///
/// Returns `GitHubError::InvalidUrl` when the base URI cannot be parsed or
/// `GitHubError::Api` when Octocrab fails to construct a client.
pub(super) fn build_octocrab_client(
    token: Option<&AccessToken>,
    api_base: &str,
) -> Result<Octocrab, GitHubError> {
    let base_uri: Uri = api_base
        .parse::<Uri>()
        .map_err(|error| GitHubError::InvalidUrl(error.to_string()))?;

    let mut builder = Octocrab::builder().add_retry_config(RetryConfig::None);
    if let Some(personal_token) = token {
        builder = builder.personal_token(personal_token.as_ref());
    }

    builder
        .base_uri(base_uri)
        .map_err(|error| GitHubError::Api {
            status: None,
            message: format!("build client failed: {error}"),
        })?
        .build()
        .map_err(|error| map_octocrab_error("build client", &error))
}
