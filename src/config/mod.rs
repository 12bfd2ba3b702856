//! Configuration for search routing, browser rendering, filtering, and fetching

mod builder;
pub(crate) mod serde_millis;
mod types;

pub use builder::SearchConfigBuilder;
pub use types::{BrowserSettings, FetchSettings, FilterConfig, SearchConfig, ToolkitConfig};
