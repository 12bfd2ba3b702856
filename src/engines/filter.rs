//! Noise filter for generic results that ignore the query
//!
//! Drops results from denylisted hosts, and results whose snippet is
//! calendar/holiday boilerplate without any of the query's core keywords.
//! Never filters a non-empty list down to nothing.

use tracing::{debug, warn};

use super::SearchResultItem;
use crate::config::FilterConfig;

#[derive(Debug, Clone, Default)]
pub struct RelevanceFilter {
    config: FilterConfig,
}

impl RelevanceFilter {
    #[must_use]
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Filter `results` for `query`; returns the input unchanged if every item would go
    #[must_use]
    pub fn apply(&self, results: Vec<SearchResultItem>, query: &str) -> Vec<SearchResultItem> {
        let keywords = self.core_keywords(query);

        let filtered: Vec<SearchResultItem> = results
            .iter()
            .filter(|r| {
                if self.is_irrelevant_domain(&r.source) {
                    debug!("[Filter] Dropping irrelevant domain: {}", r.source);
                    return false;
                }
                if self.is_irrelevant_snippet(&r.snippet, &keywords) {
                    debug!("[Filter] Dropping irrelevant snippet: title={}", r.title);
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        if filtered.is_empty() && !results.is_empty() {
            warn!(
                "[Filter] Filtering removed all {} results, returning them unfiltered",
                results.len()
            );
            return results;
        }

        filtered
    }

    /// Query tokens usable as relevance evidence
    ///
    /// Tokens shorter than two characters or containing a noise word (dates,
    /// "latest", ...) are ignored.
    #[must_use]
    pub fn core_keywords(&self, query: &str) -> Vec<String> {
        query
            .split_whitespace()
            .filter(|w| w.chars().count() >= 2)
            .filter(|w| {
                let lower = w.to_lowercase();
                !self
                    .config
                    .query_noise_words
                    .iter()
                    .any(|noise| lower.contains(&noise.to_lowercase()))
            })
            .map(str::to_lowercase)
            .collect()
    }

    fn is_irrelevant_domain(&self, source: &str) -> bool {
        let source = source.to_lowercase();
        self.config
            .irrelevant_domains
            .iter()
            .any(|d| source.contains(&d.to_lowercase()))
    }

    fn is_irrelevant_snippet(&self, snippet: &str, keywords: &[String]) -> bool {
        if snippet.is_empty() {
            return false;
        }
        let lower = snippet.to_lowercase();

        let boilerplate = self
            .config
            .irrelevant_snippet_phrases
            .iter()
            .any(|p| lower.contains(&p.to_lowercase()));
        if !boilerplate {
            return false;
        }

        // Boilerplate that still mentions the query is kept
        !keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}
