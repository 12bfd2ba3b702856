//! Helpers shared by the engine adapters
//!
//! Retry loop around the renderer, query normalization, and the generic
//! "container / heading link / snippet" result parser each provider
//! configures with its own class tokens.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::SearchResultItem;
use super::errors::{ErrorKind, SearchError};
use crate::browser::{PageRenderer, RenderMode, RenderedPage};
use crate::config::SearchConfig;
use crate::search_log;
use crate::utils::{collapse_whitespace, host_of};

/// Attempts and spacing for one adapter call
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            delay: config.retry_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

/// Render `url` as HTML, retrying temporary and network failures
///
/// Permanent failures return at once. Cancellation is checked before each
/// attempt and interrupts the inter-attempt wait.
pub async fn fetch_with_retry(
    renderer: &dyn PageRenderer,
    engine: &str,
    url: &str,
    timeout: Duration,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Result<RenderedPage, SearchError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let err = match renderer.render(url, RenderMode::Html, timeout, cancel).await {
            Ok(page) => return Ok(page),
            Err(e) => SearchError::from(e),
        };

        match err.kind() {
            ErrorKind::Cancelled => return Err(SearchError::Cancelled),
            ErrorKind::Permanent => return Err(err),
            ErrorKind::Temporary | ErrorKind::Network => {}
        }

        if attempt >= attempts {
            if attempts == 1 {
                return Err(err);
            }
            return Err(SearchError::RetriesExhausted {
                attempts,
                last: Box::new(err),
            });
        }

        warn!("Fetching {engine} results failed (attempt {attempt}/{attempts}): {err}");
        search_log::engine_retry(engine, attempt, attempts, &err.to_string());

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(SearchError::Cancelled),
            () = tokio::time::sleep(policy.delay) => {}
        }
    }
}

/// Collapse internal whitespace; empty means the query was blank
#[must_use]
pub fn normalize_query(query: &str) -> String {
    collapse_whitespace(query)
}

/// How one provider marks up a result
#[derive(Debug, Clone, Copy)]
pub struct ResultMarkup {
    /// Class token identifying a result container
    pub container_class: &'static str,
    /// Selector for the snippet element inside a container
    pub snippet_selector: &'static str,
}

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href]").expect("BUG: hardcoded CSS selector 'a[href]' is invalid")
});

static HEADING_LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h2 a[href], h3 a[href]")
        .expect("BUG: hardcoded CSS selector 'h2 a[href], h3 a[href]' is invalid")
});

static HEADING_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h2, h3").expect("BUG: hardcoded CSS selector 'h2, h3' is invalid")
});

/// Text content with all whitespace runs collapsed to single spaces
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Parse every result container in `html`
///
/// `resolve_url` turns a raw href into the destination URL, or `None` to drop
/// the item (internal links, unparseable redirects). Items without a title
/// or URL are discarded, and repeated URLs keep their first occurrence.
pub fn parse_results<F>(html: &str, markup: &ResultMarkup, resolve_url: F) -> Vec<SearchResultItem>
where
    F: Fn(&str) -> Option<String>,
{
    let document = Html::parse_document(html);

    let (Ok(container_selector), Ok(snippet_selector)) = (
        Selector::parse(&format!(".{}", markup.container_class)),
        Selector::parse(markup.snippet_selector),
    ) else {
        warn!(
            "Invalid result markup selectors: container={}, snippet={}",
            markup.container_class, markup.snippet_selector
        );
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for container in document.select(&container_selector) {
        let Some(item) = extract_item(container, &snippet_selector, &resolve_url) else {
            continue;
        };
        if seen.insert(item.url.clone()) {
            results.push(item);
        }
    }

    results
}

fn extract_item<F>(
    container: ElementRef<'_>,
    snippet_selector: &Selector,
    resolve_url: &F,
) -> Option<SearchResultItem>
where
    F: Fn(&str) -> Option<String>,
{
    // Prefer the heading link; fall back to the first link with text
    let anchor = container
        .select(&HEADING_LINK_SELECTOR)
        .next()
        .or_else(|| {
            container
                .select(&ANCHOR_SELECTOR)
                .find(|a| a.select(&HEADING_SELECTOR).next().is_some())
        })
        .or_else(|| {
            container
                .select(&ANCHOR_SELECTOR)
                .find(|a| !element_text(*a).is_empty())
        })?;

    let title = match anchor.select(&HEADING_SELECTOR).next() {
        Some(heading) => element_text(heading),
        None => element_text(anchor),
    };
    let url = anchor.value().attr("href").and_then(resolve_url)?;

    if title.is_empty() || url.is_empty() {
        return None;
    }

    let snippet = container
        .select(snippet_selector)
        .map(element_text)
        .find(|s| !s.is_empty())
        .unwrap_or_default();
    let source = host_of(&url).unwrap_or_default();

    Some(SearchResultItem {
        title,
        url,
        snippet,
        source,
    })
}
