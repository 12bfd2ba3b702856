//! Google search adapter

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::common::{RetryPolicy, ResultMarkup, fetch_with_retry, normalize_query, parse_results};
use super::errors::{SearchError, find_fingerprint};
use super::{SearchEngine, SearchResultItem};
use crate::browser::PageRenderer;
use crate::config::SearchConfig;
use crate::utils::constants::BLOCKING_FINGERPRINTS;

pub const GOOGLE_ENGINE: &str = "google";

const SEARCH_URL: &str = "https://www.google.com/search";

const MARKUP: ResultMarkup = ResultMarkup {
    container_class: "g",
    snippet_selector: ".VwiC3b, .aCOpRe, .st",
};

pub struct GoogleEngine {
    renderer: Arc<dyn PageRenderer>,
    timeout: Duration,
    retry: RetryPolicy,
    language: String,
}

impl GoogleEngine {
    #[must_use]
    pub fn new(renderer: Arc<dyn PageRenderer>, config: &SearchConfig) -> Self {
        Self {
            renderer,
            timeout: config.timeout_for(GOOGLE_ENGINE),
            retry: RetryPolicy::from_config(config),
            language: config.interface_language.clone(),
        }
    }

    /// Results page URL for an already-normalized query
    ///
    /// Only `q` and `hl`: a `num` parameter gets API-style pages.
    #[must_use]
    pub fn search_url(&self, query: &str) -> String {
        let mut url = Url::parse(SEARCH_URL).expect("BUG: hardcoded Google search URL is invalid");
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("hl", &self.language);
        url.into()
    }

    /// Parse a results page; zero items is [`SearchError::NoResults`]
    pub fn parse(html: &str) -> Result<Vec<SearchResultItem>, SearchError> {
        let results = parse_results(html, &MARKUP, resolve_google_href);
        if results.is_empty() {
            return Err(SearchError::NoResults {
                engine: GOOGLE_ENGINE.to_string(),
            });
        }
        Ok(results)
    }
}

/// Unwrap `/url?q=` redirects; drop other Google-internal links
fn resolve_google_href(href: &str) -> Option<String> {
    if href.starts_with("/url?") {
        let base = Url::parse("https://www.google.com").ok()?;
        let wrapped = base.join(href).ok()?;
        let target = wrapped
            .query_pairs()
            .find(|(k, _)| k == "q" || k == "url")
            .map(|(_, v)| v.into_owned())?;
        return target.starts_with("http").then_some(target);
    }

    (href.starts_with("http://") || href.starts_with("https://")).then(|| href.to_string())
}

#[async_trait]
impl SearchEngine for GoogleEngine {
    fn name(&self) -> &str {
        GOOGLE_ENGINE
    }

    async fn search(
        &self,
        query: &str,
        num_results: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResultItem>, SearchError> {
        let query = normalize_query(query);
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let url = self.search_url(&query);
        info!("Executing Google search: {url}");

        let page = fetch_with_retry(
            self.renderer.as_ref(),
            GOOGLE_ENGINE,
            &url,
            self.timeout,
            self.retry,
            cancel,
        )
        .await?;

        if let Some(indicator) = find_fingerprint(&page.content, BLOCKING_FINGERPRINTS) {
            return Err(SearchError::Blocked {
                engine: GOOGLE_ENGINE.to_string(),
                indicator: indicator.to_string(),
            });
        }

        let mut results = Self::parse(&page.content)?;
        if num_results > 0 {
            results.truncate(num_results);
        }

        debug!("Google returned {} results", results.len());
        Ok(results)
    }
}
