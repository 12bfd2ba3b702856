//! Search engine adapters
//!
//! Each provider is one [`SearchEngine`]: it builds its own results URL,
//! renders it through the shared [`PageRenderer`](crate::browser::PageRenderer),
//! detects blocking, and parses its own markup. The router only sees the
//! trait, so providers can be added or re-scraped without touching it.

mod bing;
mod common;
mod errors;
mod filter;
mod google;

pub use bing::{BING_ENGINE, BingEngine};
pub use common::{RetryPolicy, ResultMarkup, element_text, fetch_with_retry, normalize_query, parse_results};
pub use errors::{
    ErrorKind, SearchError, SearchResult, classify_message, find_fingerprint, is_blocking_message,
};
pub use filter::RelevanceFilter;
pub use google::{GOOGLE_ENGINE, GoogleEngine};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// One normalized search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResultItem {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    /// Host name of `url`
    #[serde(default)]
    pub source: String,
}

/// A search provider driven through the shared browser
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Stable name used for config, health tracking, and logs
    fn name(&self) -> &str;

    /// Run `query` and return at most `num_results` items
    ///
    /// Retries temporary and network failures internally; what comes back is
    /// final for this call.
    async fn search(
        &self,
        query: &str,
        num_results: usize,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<SearchResultItem>>;
}
