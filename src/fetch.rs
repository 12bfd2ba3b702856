//! Page Fetch Service
//!
//! Single-URL retrieval: render through the shared browser, extract readable
//! text, truncate. No failover; errors go straight back to the caller.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::browser::{BrowserError, PageRenderer, RenderMode};
use crate::config::FetchSettings;
use crate::extractor::{ExtractError, extract};
use crate::utils::{is_valid_url, safe_truncate_chars};

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("URL cannot be empty")]
    EmptyUrl,

    #[error("invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("failed to render page: {0}")]
    Render(#[from] BrowserError),

    #[error("failed to extract content: {0}")]
    Extract(#[from] ExtractError),
}

/// Extracted page text, possibly truncated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FetchedPage {
    pub url: String,
    pub title: String,
    pub content: String,
    /// True when `content` was cut at the requested length
    pub has_more: bool,
    /// Length of the untruncated content, in characters
    pub total_length: usize,
}

/// Cut `content` to at most `max_chars` characters
///
/// Returns the kept prefix, whether anything was cut, and the full length in
/// characters.
#[must_use]
pub fn truncate_content(content: &str, max_chars: usize) -> (&str, bool, usize) {
    let total = content.chars().count();
    if total <= max_chars {
        return (content, false, total);
    }
    (safe_truncate_chars(content, max_chars), true, total)
}

pub struct PageFetcher {
    renderer: Arc<dyn PageRenderer>,
    settings: FetchSettings,
}

impl PageFetcher {
    #[must_use]
    pub fn new(renderer: Arc<dyn PageRenderer>, settings: FetchSettings) -> Self {
        Self { renderer, settings }
    }

    /// Fetch `url` and return at most `max_length` characters of its text
    ///
    /// `None` or zero uses the configured default.
    pub async fn fetch(
        &self,
        url: &str,
        max_length: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, FetchError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FetchError::EmptyUrl);
        }
        if !is_valid_url(url) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let max_length = max_length
            .filter(|n| *n > 0)
            .unwrap_or(self.settings.default_max_length);

        info!("Fetching page content: {url}");
        let page = self
            .renderer
            .render(url, RenderMode::Html, self.settings.timeout, cancel)
            .await?;

        let extracted = extract(&page.content)?;
        let content = if extracted.content.is_empty() {
            warn!("No readable text extracted from {url}, returning raw HTML");
            page.content.as_str()
        } else {
            extracted.content.as_str()
        };

        let (kept, has_more, total_length) = truncate_content(content, max_length);
        debug!(
            "Fetched {url}: returning {}/{} characters",
            kept.chars().count(),
            total_length
        );

        Ok(FetchedPage {
            url: url.to_string(),
            title: extracted.title.clone(),
            content: kept.to_string(),
            has_more,
            total_length,
        })
    }
}
