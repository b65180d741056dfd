//! CLI operation mode handlers.
//!
//! - [`migrations`]: Database schema migrations
//! - [`review`]: Validate a pull request, check repository access and load
//!   its reviews
//!
//! Output formatting utilities are in [`output`].

use pullgate::github::{GitHubError, PrValidationError};
use thiserror::Error;

pub mod migrations;
pub mod output;
pub mod review;

/// Failures reported by the command-line front end.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration, storage or upstream failure.
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    /// The pull request cannot be analysed.
    #[error(transparent)]
    Validation(#[from] PrValidationError),

    /// The repository is private and the caller's credentials do not reach it.
    #[error("repository {repository} is not public and the configured token cannot access it")]
    RepositoryInaccessible {
        /// `owner/name` of the repository.
        repository: String,
    },
}
