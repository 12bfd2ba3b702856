pub mod browser;
pub mod browser_setup;
pub mod config;
pub mod engines;
pub mod events;
pub mod extractor;
pub mod fetch;
pub mod health;
pub mod router;
pub mod search_log;
pub mod stealth;
pub mod toolkit;
pub mod tools;
pub mod utils;

pub use browser::{BrowserError, BrowserManager, PageRenderer, RenderMode, RenderedPage};
pub use browser_setup::{DetectedBrowser, detect_browser, find_browser_executable};
pub use config::{
    BrowserSettings, FetchSettings, FilterConfig, SearchConfig, SearchConfigBuilder, ToolkitConfig,
};
pub use engines::{ErrorKind, SearchEngine, SearchError, SearchResultItem};
pub use events::{ToolEvent, ToolEventBus};
pub use extractor::{ExtractedContent, extract};
pub use fetch::{FetchError, FetchedPage, PageFetcher};
pub use health::{EngineHealth, HealthState, HealthTracker};
pub use router::{SearchOutcome, SearchRouter, SearchStatus};
pub use toolkit::Toolkit;
pub use tools::{FetchPageTool, Tool, ToolError, WebSearchTool};
