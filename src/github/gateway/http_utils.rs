//! Shared HTTP utilities for gateway implementations.

use http::HeaderMap;
use serde::Deserialize;

/// The error payload GitHub attaches to failed responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct ErrorBody {
    pub(super) message: Option<String>,
    pub(super) documentation_url: Option<String>,
}

impl ErrorBody {
    /// Parses a response body, falling back to an empty payload when the body
    /// is not the usual JSON error object.
    pub(super) fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}

/// Extracts the `rel="next"` target from a `Link` header, if any.
pub(super) fn next_page_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(http::header::LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.trim().split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| param.trim() == r#"rel="next""#);
        let url = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        is_next.then(|| url.to_owned())
    })
}
