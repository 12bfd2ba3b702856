//! Callable tools exposed to an agent layer
//!
//! Each tool takes JSON arguments described by a JSON schema and returns a
//! JSON value, and reports its start and finish on the [`ToolEventBus`].
//!
//! [`ToolEventBus`]: crate::events::ToolEventBus

mod fetch_page;
mod web_search;

pub use fetch_page::{FetchPageArgs, FetchPageTool};
pub use web_search::{WebSearchArgs, WebSearchResponse, WebSearchTool};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        ToolError::InvalidArguments(message.into())
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    type Args: DeserializeOwned + JsonSchema + Send + 'static;

    fn name() -> &'static str;

    fn description() -> &'static str;

    fn read_only() -> bool {
        true
    }

    fn open_world() -> bool {
        true
    }

    /// JSON schema of [`Self::Args`]
    fn input_schema() -> Value {
        serde_json::to_value(schemars::schema_for!(Self::Args)).unwrap_or(Value::Null)
    }

    async fn execute(&self, args: Self::Args, cancel: &CancellationToken) -> Result<Value, ToolError>;

    /// Parse raw JSON arguments and execute
    async fn call(&self, raw: Value, cancel: &CancellationToken) -> Result<Value, ToolError> {
        let args = serde_json::from_value(raw).map_err(|e| ToolError::invalid_arguments(e.to_string()))?;
        self.execute(args, cancel).await
    }
}
