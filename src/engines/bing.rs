//! Bing search adapter

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::common::{RetryPolicy, ResultMarkup, fetch_with_retry, normalize_query, parse_results};
use super::errors::{SearchError, find_fingerprint};
use super::filter::RelevanceFilter;
use super::{SearchEngine, SearchResultItem};
use crate::browser::PageRenderer;
use crate::config::{FilterConfig, SearchConfig};
use crate::utils::constants::BLOCKING_FINGERPRINTS;

pub const BING_ENGINE: &str = "bing";

const SEARCH_URL: &str = "https://www.bing.com/search";

const MARKUP: ResultMarkup = ResultMarkup {
    container_class: "b_algo",
    snippet_selector: ".b_caption p, .b_caption, .b_lineclamp2",
};

/// Bing-specific challenge wording on top of the shared list
const BING_FINGERPRINTS: &[&str] = &["bing has detected"];

pub struct BingEngine {
    renderer: Arc<dyn PageRenderer>,
    timeout: Duration,
    retry: RetryPolicy,
    language: String,
    filter: RelevanceFilter,
}

impl BingEngine {
    #[must_use]
    pub fn new(renderer: Arc<dyn PageRenderer>, config: &SearchConfig, filter: FilterConfig) -> Self {
        Self {
            renderer,
            timeout: config.timeout_for(BING_ENGINE),
            retry: RetryPolicy::from_config(config),
            language: config.interface_language.clone(),
            filter: RelevanceFilter::new(filter),
        }
    }

    /// Results page URL resembling a search-box submission
    ///
    /// No `count` (switches Bing to API mode) and no `mkt`/`cc` (biases
    /// toward regional trending content).
    #[must_use]
    pub fn search_url(&self, query: &str) -> String {
        let mut url = Url::parse(SEARCH_URL).expect("BUG: hardcoded Bing search URL is invalid");
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("qs", "n")
            .append_pair("form", "QBRE")
            .append_pair("sp", "-1")
            .append_pair("lq", "0")
            .append_pair("setlang", &self.language);
        url.into()
    }

    /// Parse a results page; zero items is [`SearchError::NoResults`]
    pub fn parse(html: &str) -> Result<Vec<SearchResultItem>, SearchError> {
        let results = parse_results(html, &MARKUP, resolve_bing_href);
        if results.is_empty() {
            return Err(SearchError::NoResults {
                engine: BING_ENGINE.to_string(),
            });
        }
        Ok(results)
    }
}

/// Unwrap `/ck/a?...&u=a1<base64url>` click-tracking links
fn resolve_bing_href(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let is_tracking = url.host_str().is_some_and(|h| h.ends_with("bing.com")) && url.path() == "/ck/a";
    if !is_tracking {
        return Some(href.to_string());
    }

    let encoded = url
        .query_pairs()
        .find(|(k, _)| k == "u")
        .map(|(_, v)| v.into_owned())?;
    decode_tracking_target(&encoded).or_else(|| Some(href.to_string()))
}

fn decode_tracking_target(encoded: &str) -> Option<String> {
    let payload = encoded.strip_prefix("a1")?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let target = String::from_utf8(bytes).ok()?;
    target.starts_with("http").then_some(target)
}

#[async_trait]
impl SearchEngine for BingEngine {
    fn name(&self) -> &str {
        BING_ENGINE
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
        info!("Executing Bing search: {url}");

        let page = fetch_with_retry(
            self.renderer.as_ref(),
            BING_ENGINE,
            &url,
            self.timeout,
            self.retry,
            cancel,
        )
        .await?;

        let indicator = find_fingerprint(&page.content, BLOCKING_FINGERPRINTS)
            .or_else(|| find_fingerprint(&page.content, BING_FINGERPRINTS));
        if let Some(indicator) = indicator {
            return Err(SearchError::Blocked {
                engine: BING_ENGINE.to_string(),
                indicator: indicator.to_string(),
            });
        }

        let parsed = Self::parse(&page.content)?;
        let mut results = self.filter.apply(parsed, &query);
        if num_results > 0 {
            results.truncate(num_results);
        }

        debug!("Bing returned {} results", results.len());
        Ok(results)
    }
}
