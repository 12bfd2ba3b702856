//! `web_search` tool
//!
//! Routes the query across engines with failover. Never fails: callers
//! branch on `status`.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{Tool, ToolError};
use crate::engines::SearchResultItem;
use crate::events::{ToolEvent, ToolEventBus};
use crate::router::{SearchOutcome, SearchRouter};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WebSearchArgs {
    /// Free-text search query
    pub query: String,

    /// Maximum number of results (defaults to the configured count)
    #[serde(default)]
    pub num_results: Option<usize>,
}

/// Wire shape of a search answer
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WebSearchResponse {
    pub query: String,
    pub results: Vec<SearchResultItem>,
    pub request_id: String,
    /// `success`, `failed`, `captcha`, or `cancelled`
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub engine: String,
}

impl From<SearchOutcome> for WebSearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            query: outcome.query,
            results: outcome.results,
            request_id: outcome.request_id,
            status: outcome.status.as_str().to_string(),
            error: outcome.error,
            message: outcome.message,
            engine: outcome.used_engine,
        }
    }
}

#[derive(Clone)]
pub struct WebSearchTool {
    router: Arc<SearchRouter>,
    events: Arc<ToolEventBus>,
    default_results: usize,
}

impl WebSearchTool {
    #[must_use]
    pub fn new(router: Arc<SearchRouter>, events: Arc<ToolEventBus>, default_results: usize) -> Self {
        Self {
            router,
            events,
            default_results,
        }
    }

    /// Run a search and return the typed response
    pub async fn search(&self, args: WebSearchArgs, cancel: &CancellationToken) -> WebSearchResponse {
        let num_results = args
            .num_results
            .filter(|n| *n > 0)
            .unwrap_or(self.default_results);

        self.events
            .publish(ToolEvent::started(Self::name(), format!("query: {}", args.query)));

        let outcome = self.router.search(&args.query, num_results, cancel).await;

        let finished = if outcome.is_success() {
            ToolEvent::finished(
                Self::name(),
                format!("found {} results via {}", outcome.results.len(), outcome.used_engine),
                None,
            )
        } else {
            ToolEvent::finished(Self::name(), "", Some(outcome.message.clone()))
        };
        self.events.publish(finished);

        outcome.into()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    type Args = WebSearchArgs;

    fn name() -> &'static str {
        "web_search"
    }

    fn description() -> &'static str {
        "Search the web and return structured results with titles, URLs, snippets, and source hosts.\n\n\
         Engines are tried in priority order with automatic failover. The call never fails; \
         check `status`: `success`, `failed` (try again later), `captcha` (automated access \
         was detected; try again later or answer from existing knowledge), or `cancelled`.\n\n\
         Example: web_search({\"query\": \"rust async programming\"})"
    }

    async fn execute(&self, args: Self::Args, cancel: &CancellationToken) -> Result<Value, ToolError> {
        let response = self.search(args, cancel).await;
        serde_json::to_value(response).map_err(|e| ToolError::Failed(e.to_string()))
    }
}
