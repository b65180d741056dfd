//! Database migration operations.

use pullgate::PullgateConfig;
use pullgate::github::GitHubError;
use pullgate::persistence::{PersistenceError, migrate_database};
use pullgate::telemetry::StderrJsonlTelemetrySink;

/// Runs database migrations.
///
/// # Errors
///
/// Returns [`GitHubError::Configuration`] if the database URL is missing or
/// blank, and [`GitHubError::Storage`] for connection or migration failures.
pub fn run(config: &PullgateConfig) -> Result<(), GitHubError> {
    let database_url = config.database_url.as_deref().ok_or_else(|| {
        GitHubError::from_persistence("migrate database", &PersistenceError::MissingDatabaseUrl)
    })?;

    let telemetry = StderrJsonlTelemetrySink;
    let schema_version = migrate_database(database_url, &telemetry)
        .map_err(|error| GitHubError::from_persistence("migrate database", &error))?;
    tracing::info!("database schema at version {}", schema_version.as_str());
    Ok(())
}
