//! Error types for search engine adapters
//!
//! Every adapter failure carries an [`ErrorKind`] that decides whether the
//! adapter retries and how the router reports it.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::browser::BrowserError;
use crate::utils::constants::BLOCKING_FINGERPRINTS;

/// Retry class of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Blocked, forbidden, not found. Never retried.
    Permanent,
    /// Timeout or server-side 5xx. Retried within budget.
    Temporary,
    /// Connection-level and anything unrecognised. Retried within budget.
    Network,
    /// Caller gave up. Never retried, never charged to the engine.
    Cancelled,
}

impl ErrorKind {
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Temporary | ErrorKind::Network)
    }
}

/// Result type alias for adapter operations
pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("search query must not be empty")]
    EmptyQuery,

    /// The provider served an anti-automation challenge
    #[error("{engine} detected automated access (captcha): matched \"{indicator}\"")]
    Blocked { engine: String, indicator: String },

    /// Page loaded and was not a challenge, but held no parseable results
    #[error("{engine}: no results found, page structure changed or blocked")]
    NoResults { engine: String },

    #[error("failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<SearchError>,
    },

    #[error(transparent)]
    Render(#[from] BrowserError),

    #[error("search cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl SearchError {
    /// Classify for retry and failover
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::EmptyQuery | SearchError::Blocked { .. } | SearchError::NoResults { .. } => {
                ErrorKind::Permanent
            }
            SearchError::RetriesExhausted { last, .. } => last.kind(),
            SearchError::Cancelled => ErrorKind::Cancelled,
            SearchError::Render(e) => browser_error_kind(e),
            SearchError::Other(message) => classify_message(message),
        }
    }

    /// True when the failure is a blocking/CAPTCHA signal
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        match self {
            SearchError::Blocked { .. } => true,
            SearchError::RetriesExhausted { last, .. } => last.is_blocking(),
            // Challenges are only detected in page content
            SearchError::Render(_) => false,
            SearchError::Other(message) => is_blocking_message(message),
            _ => false,
        }
    }

    /// True for "loaded fine, nothing to parse"
    #[must_use]
    pub fn is_structural_empty(&self) -> bool {
        match self {
            SearchError::NoResults { .. } => true,
            SearchError::RetriesExhausted { last, .. } => last.is_structural_empty(),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }

    /// Short label used in structured logs
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        if self.is_blocking() {
            return "captcha";
        }
        if self.is_structural_empty() {
            return "structural_empty";
        }
        match self.kind() {
            ErrorKind::Permanent => "permanent",
            ErrorKind::Temporary => "temporary",
            ErrorKind::Network => "network",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

static SERVER_ERROR_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b5\d{2}\b").expect("BUG: hardcoded 5xx status regex is invalid")
});

const PERMANENT_MARKERS: &[&str] = &["403", "404", "forbidden", "not found"];

const TEMPORARY_MARKERS: &[&str] = &["timeout", "timed out", "deadline"];

/// Classify a renderer failure from its variant and cause only
///
/// The rendered URL carries the query text, so it never takes part.
fn browser_error_kind(err: &BrowserError) -> ErrorKind {
    match err {
        BrowserError::Cancelled => ErrorKind::Cancelled,
        BrowserError::Timeout { .. } => ErrorKind::Temporary,
        BrowserError::ExecutableNotFound(_) => ErrorKind::Permanent,
        // The next attempt relaunches the browser
        BrowserError::SessionBroken(_) => ErrorKind::Network,
        BrowserError::Navigation { message, .. } => classify_message(message),
        BrowserError::Launch(message) | BrowserError::TabOpen(message) | BrowserError::Script(message) => {
            classify_message(message)
        }
    }
}

/// Classify a free-text failure message
#[must_use]
pub fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();

    if is_blocking_message(&lower) || PERMANENT_MARKERS.iter().any(|m| lower.contains(m)) {
        return ErrorKind::Permanent;
    }

    if TEMPORARY_MARKERS.iter().any(|m| lower.contains(m)) || SERVER_ERROR_STATUS.is_match(&lower) {
        return ErrorKind::Temporary;
    }

    ErrorKind::Network
}

/// Case-insensitive scan for a known blocking fingerprint
#[must_use]
pub fn is_blocking_message(message: &str) -> bool {
    find_fingerprint(message, BLOCKING_FINGERPRINTS).is_some()
}

/// First fingerprint contained in `text`, compared case-insensitively
#[must_use]
pub fn find_fingerprint(text: &str, fingerprints: &[&'static str]) -> Option<&'static str> {
    let lower = text.to_lowercase();
    fingerprints
        .iter()
        .copied()
        .find(|f| lower.contains(&f.to_lowercase()))
}
