//! `fetch_page_content` tool

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use super::{Tool, ToolError};
use crate::events::{ToolEvent, ToolEventBus};
use crate::fetch::{FetchError, FetchedPage, PageFetcher};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FetchPageArgs {
    /// Absolute http(s) URL of the page
    pub url: String,

    /// Maximum characters of content to return (default 5000)
    #[serde(default)]
    pub max_length: Option<usize>,
}

#[derive(Clone)]
pub struct FetchPageTool {
    fetcher: Arc<PageFetcher>,
    events: Arc<ToolEventBus>,
}

impl FetchPageTool {
    #[must_use]
    pub fn new(fetcher: Arc<PageFetcher>, events: Arc<ToolEventBus>) -> Self {
        Self { fetcher, events }
    }

    /// Fetch and return the typed page
    pub async fn fetch(
        &self,
        args: FetchPageArgs,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, FetchError> {
        self.events
            .publish(ToolEvent::started(Self::name(), format!("url: {}", args.url)));

        match self.fetcher.fetch(&args.url, args.max_length, cancel).await {
            Ok(page) => {
                self.events.publish(ToolEvent::finished(
                    Self::name(),
                    format!(
                        "returned {} of {} characters",
                        page.content.chars().count(),
                        page.total_length
                    ),
                    None,
                ));
                Ok(page)
            }
            Err(e) => {
                error!("Fetching {} failed: {e}", args.url);
                self.events
                    .publish(ToolEvent::finished(Self::name(), "", Some(e.to_string())));
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Tool for FetchPageTool {
    type Args = FetchPageArgs;

    fn name() -> &'static str {
        "fetch_page_content"
    }

    fn description() -> &'static str {
        "Fetch a web page in a real browser and return its readable text.\n\n\
         Returns url, title, content (truncated to max_length characters, default 5000), \
         has_more, and total_length.\n\n\
         Example: fetch_page_content({\"url\": \"https://www.rust-lang.org/\"})"
    }

    async fn execute(&self, args: Self::Args, cancel: &CancellationToken) -> Result<Value, ToolError> {
        let page = self.fetch(args, cancel).await.map_err(|e| match e {
            FetchError::EmptyUrl | FetchError::InvalidUrl(_) => ToolError::invalid_arguments(e.to_string()),
            other => ToolError::Failed(other.to_string()),
        })?;
        serde_json::to_value(page).map_err(|e| ToolError::Failed(e.to_string()))
    }
}
