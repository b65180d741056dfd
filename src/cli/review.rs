//! Validates a pull request and loads it for analysis.

use std::sync::Arc;

use pullgate::PullgateConfig;
use pullgate::clock::SystemClock;
use pullgate::github::{
    AccessContext, GitHubClient, GitHubError, OctocrabGateway, PrValidationError, PrValidator,
    PullRequestReference, RepositoryAccessService, ReviewIntake,
};
use pullgate::persistence::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
use pullgate::telemetry::{NoopTelemetrySink, StderrJsonlTelemetrySink, TelemetrySink};
use pullgate::throttle::RequestThrottle;

use super::CliError;
use super::output::{Visibility, write_pr_summary};

/// Checks access to the configured pull request, confirms it is open, and
/// prints its metadata and reviews.
///
/// # Errors
///
/// Returns [`CliError::Validation`] when the URL is malformed or the pull
/// request cannot be analysed, [`CliError::RepositoryInaccessible`] when the
/// repository is private and out of reach, and [`CliError::GitHub`] for
/// configuration, storage and upstream failures.
pub async fn run(config: &PullgateConfig) -> Result<(), CliError> {
    config.validate()?;
    let pr_url = config.require_pr_url()?;
    let reference = PullRequestReference::parse(pr_url).ok_or(PrValidationError::InvalidUrl)?;

    let session = config.session();
    let context = AccessContext::from_session(&session);
    let gateway = OctocrabGateway::for_token(context.github_token(), config.api_base())?;
    let client = GitHubClient::new(gateway, config.client_settings(), Arc::new(SystemClock))
        .with_throttle(build_throttle(config)?);

    let outcome = review(&client, context, pr_url, &reference).await;

    if let Some(throttle) = client.throttle() {
        throttle.close().await?;
    }
    outcome
}

async fn review(
    client: &GitHubClient<OctocrabGateway>,
    context: AccessContext,
    pr_url: &str,
    reference: &PullRequestReference,
) -> Result<(), CliError> {
    let access = RepositoryAccessService::new(client, context);
    let visibility = if access
        .is_repository_public(reference.owner(), reference.repository())
        .await
    {
        Visibility::Public
    } else if access
        .has_repository_access(reference.owner(), reference.repository())
        .await
    {
        Visibility::PrivateWithAccess
    } else {
        return Err(CliError::RepositoryInaccessible {
            repository: format!(
                "{}/{}",
                reference.owner().as_str(),
                reference.repository().as_str()
            ),
        });
    };

    PrValidator::new(client).validate_pr(pr_url).await?;
    let details = ReviewIntake::new(client).load(reference).await?;
    write_pr_summary(&details, visibility)?;
    Ok(())
}

fn build_throttle(config: &PullgateConfig) -> Result<RequestThrottle, GitHubError> {
    let store: Arc<dyn KeyValueStore> = match config.database_url.as_deref() {
        Some(database_url) => Arc::new(
            SqliteKeyValueStore::new(database_url)
                .map_err(|error| GitHubError::from_persistence("open throttle store", &error))?,
        ),
        None => Arc::new(MemoryKeyValueStore::new()),
    };

    let telemetry: Arc<dyn TelemetrySink> = if config.telemetry {
        Arc::new(StderrJsonlTelemetrySink)
    } else {
        Arc::new(NoopTelemetrySink)
    };

    Ok(RequestThrottle::new(store, config.throttle_user_id())
        .with_min_delay(config.min_request_delay())
        .with_telemetry(telemetry))
}
