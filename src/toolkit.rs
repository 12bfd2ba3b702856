//! Wiring of the shared browser, engines, router, fetcher and tools

use anyhow::{Result, bail};
use std::sync::Arc;
use tracing::{info, warn};

use crate::browser::{BrowserManager, PageRenderer};
use crate::config::ToolkitConfig;
use crate::engines::{BING_ENGINE, BingEngine, GOOGLE_ENGINE, GoogleEngine, SearchEngine};
use crate::events::ToolEventBus;
use crate::fetch::PageFetcher;
use crate::health::HealthTracker;
use crate::router::SearchRouter;
use crate::tools::{FetchPageTool, WebSearchTool};

pub struct Toolkit {
    config: ToolkitConfig,
    browser: Option<Arc<BrowserManager>>,
    router: Arc<SearchRouter>,
    fetcher: Arc<PageFetcher>,
    events: Arc<ToolEventBus>,
}

impl Toolkit {
    /// Build on a lazily launched local Chromium
    pub fn new(config: ToolkitConfig) -> Result<Self> {
        let browser = Arc::new(BrowserManager::new(config.browser.clone()));
        let renderer: Arc<dyn PageRenderer> = browser.clone();
        let mut toolkit = Self::with_renderer(config, renderer)?;
        toolkit.browser = Some(browser);
        Ok(toolkit)
    }

    /// Build on any renderer
    pub fn with_renderer(config: ToolkitConfig, renderer: Arc<dyn PageRenderer>) -> Result<Self> {
        let engines = build_engines(&config, &renderer);
        if engines.is_empty() {
            bail!(
                "no usable search engines configured (got {:?}, known: {GOOGLE_ENGINE}, {BING_ENGINE})",
                config.search.engines
            );
        }

        let tracker = Arc::new(HealthTracker::from_config(&config.search));
        let router = Arc::new(SearchRouter::new(engines, tracker, &config.search));
        let fetcher = Arc::new(PageFetcher::new(renderer, config.fetch.clone()));

        info!("Search engines in priority order: {:?}", router.engine_names());

        Ok(Self {
            config,
            browser: None,
            router,
            fetcher,
            events: Arc::new(ToolEventBus::default()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    #[must_use]
    pub fn router(&self) -> &Arc<SearchRouter> {
        &self.router
    }

    #[must_use]
    pub fn fetcher(&self) -> &Arc<PageFetcher> {
        &self.fetcher
    }

    #[must_use]
    pub fn events(&self) -> &Arc<ToolEventBus> {
        &self.events
    }

    #[must_use]
    pub fn web_search_tool(&self) -> WebSearchTool {
        WebSearchTool::new(
            self.router.clone(),
            self.events.clone(),
            self.config.search.num_results,
        )
    }

    #[must_use]
    pub fn fetch_page_tool(&self) -> FetchPageTool {
        FetchPageTool::new(self.fetcher.clone(), self.events.clone())
    }

    /// Close the browser session, if one was launched
    pub async fn shutdown(&self) {
        if let Some(browser) = &self.browser {
            browser.shutdown().await;
        }
    }
}

fn build_engines(config: &ToolkitConfig, renderer: &Arc<dyn PageRenderer>) -> Vec<Arc<dyn SearchEngine>> {
    let mut engines: Vec<Arc<dyn SearchEngine>> = Vec::new();
    for name in &config.search.engines {
        let engine: Arc<dyn SearchEngine> = match name.trim().to_ascii_lowercase().as_str() {
            GOOGLE_ENGINE => Arc::new(GoogleEngine::new(renderer.clone(), &config.search)),
            BING_ENGINE => Arc::new(BingEngine::new(
                renderer.clone(),
                &config.search,
                config.filter.clone(),
            )),
            other => {
                warn!("Skipping unknown search engine '{other}'");
                continue;
            }
        };
        if engines.iter().any(|e| e.name() == engine.name()) {
            warn!("Skipping duplicate search engine '{}'", engine.name());
            continue;
        }
        engines.push(engine);
    }
    engines
}
