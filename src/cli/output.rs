//! Output formatting utilities for CLI operations.

use std::io::{self, Write};

use pullgate::github::{GitHubError, PullRequestDetails};

/// How the caller reaches the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Anyone can read the repository.
    Public,
    /// Private, reachable with the caller's token.
    PrivateWithAccess,
}

impl Visibility {
    const fn describe(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::PrivateWithAccess => "private (access granted)",
        }
    }
}

/// Writes a summary of pull request details to stdout.
pub fn write_pr_summary(
    details: &PullRequestDetails,
    visibility: Visibility,
) -> Result<(), GitHubError> {
    let mut stdout = io::stdout().lock();
    write_pr_summary_to(&mut stdout, details, visibility)
}

/// Writes a summary of pull request details to the given writer.
pub fn write_pr_summary_to<W: Write>(
    writer: &mut W,
    details: &PullRequestDetails,
    visibility: Visibility,
) -> Result<(), GitHubError> {
    let title = details
        .metadata
        .title
        .as_deref()
        .unwrap_or("untitled pull request");
    let author = details
        .metadata
        .author
        .as_deref()
        .unwrap_or("unknown author");
    let url = details
        .metadata
        .html_url
        .as_deref()
        .unwrap_or("no HTML URL provided");
    let approvals = details
        .reviews
        .iter()
        .filter(|review| review.state.as_deref() == Some("APPROVED"))
        .count();
    let message = format!(
        "Loaded PR #{} by {author}: {title}\nURL: {url}\nRepository: {}\nReviews: {} ({approvals} approved)",
        details.metadata.number,
        visibility.describe(),
        details.reviews.len()
    );

    writeln!(writer, "{message}").map_err(|error| GitHubError::Io {
        message: error.to_string(),
    })
}
