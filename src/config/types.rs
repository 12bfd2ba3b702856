//! Core configuration types
//!
//! All types are read-only once handed to the component that uses them. Every
//! field has a default, so a config file only needs the values it overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::serde_millis;
use crate::utils::constants::{
    CHROME_USER_AGENT, DEFAULT_ENGINE_TIMEOUT, DEFAULT_FETCH_MAX_LENGTH, DEFAULT_FETCH_TIMEOUT,
    DEFAULT_NUM_RESULTS, DEFAULT_PACING_MAX, DEFAULT_PACING_MIN, READY_POLL_INTERVAL,
};

/// Routing, retry, and circuit-breaker policy for web searches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Engine names in priority order. Unknown names are ignored at wiring time.
    pub engines: Vec<String>,

    /// Per-engine render timeout for a single attempt
    #[serde(with = "serde_millis::duration_map")]
    pub engine_timeouts: HashMap<String, Duration>,

    /// Timeout for engines without an entry in `engine_timeouts`
    #[serde(with = "serde_millis::duration")]
    pub default_engine_timeout: Duration,

    /// Pause before trying the next engine after a failure
    #[serde(with = "serde_millis::duration")]
    pub failover_delay: Duration,

    /// Attempts an adapter makes per search call for retryable failures
    pub max_retries: u32,

    /// Pause between an adapter's attempts
    #[serde(with = "serde_millis::duration")]
    pub retry_delay: Duration,

    /// Consecutive failures that open an engine's circuit
    pub failure_threshold: u32,

    /// How long an unhealthy engine is skipped
    #[serde(with = "serde_millis::duration")]
    pub cooldown: Duration,

    /// Results requested when the caller does not say
    pub num_results: usize,

    /// Interface language passed to providers that accept one
    pub interface_language: String,
}

impl SearchConfig {
    /// Render timeout for one attempt against `engine`
    #[must_use]
    pub fn timeout_for(&self, engine: &str) -> Duration {
        self.engine_timeouts
            .get(engine)
            .copied()
            .unwrap_or(self.default_engine_timeout)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engines: vec!["google".to_string(), "bing".to_string()],
            engine_timeouts: HashMap::from([
                ("google".to_string(), Duration::from_secs(60)),
                ("bing".to_string(), Duration::from_secs(30)),
            ]),
            default_engine_timeout: DEFAULT_ENGINE_TIMEOUT,
            failover_delay: Duration::from_secs(2),
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
            failure_threshold: 3,
            cooldown: Duration::from_secs(5 * 60),
            num_results: DEFAULT_NUM_RESULTS,
            interface_language: "en-US".to_string(),
        }
    }
}

/// How the shared headless browser is launched and paced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,

    /// Randomized delay after the page is ready, before the DOM is read
    #[serde(with = "serde_millis::duration")]
    pub pacing_min: Duration,
    #[serde(with = "serde_millis::duration")]
    pub pacing_max: Duration,

    #[serde(with = "serde_millis::duration")]
    pub ready_poll_interval: Duration,

    /// Explicit executable path. Falls back to `CHROMIUM_PATH` and then discovery.
    pub executable: Option<PathBuf>,

    /// Extra command-line switches appended after the built-in ones
    pub extra_args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: CHROME_USER_AGENT.to_string(),
            window_width: 1920,
            window_height: 1080,
            pacing_min: DEFAULT_PACING_MIN,
            pacing_max: DEFAULT_PACING_MAX,
            ready_poll_interval: READY_POLL_INTERVAL,
            executable: None,
            extra_args: Vec::new(),
        }
    }
}

/// Denylists used to drop generic results that ignore the query
///
/// These are heuristics that need tuning per market, so they are data rather
/// than code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Hosts whose results are dropped outright (substring match on the host)
    pub irrelevant_domains: Vec<String>,

    /// Snippet phrases that mark calendar/holiday boilerplate
    pub irrelevant_snippet_phrases: Vec<String>,

    /// Query tokens containing any of these are not used as relevance keywords
    pub query_noise_words: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let owned = |xs: &[&str]| xs.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        Self {
            irrelevant_domains: owned(&[
                "calendar411.com",
                "5adanci.com",
                "rili.51240.com",
                "wannianli.com",
                "nongli.com",
                "jiaqi.51240.com",
            ]),
            irrelevant_snippet_phrases: owned(&[
                "农历",
                "放假调休",
                "节假日安排",
                "日历表",
                "法定节假日",
                "春节假期共",
                "元旦、春节、清明节",
                "printable calendar",
                "public holidays",
            ]),
            query_noise_words: owned(&[
                "年", "月", "日", "最新", "今年", "今天", "最近", "2024", "2025", "2026", "2027",
                "latest", "today", "recent",
            ]),
        }
    }
}

/// Single-page fetch defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    #[serde(with = "serde_millis::duration")]
    pub timeout: Duration,
    pub default_max_length: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            default_max_length: DEFAULT_FETCH_MAX_LENGTH,
        }
    }
}

/// Everything the composition root needs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub search: SearchConfig,
    pub browser: BrowserSettings,
    pub filter: FilterConfig,
    pub fetch: FetchSettings,
}

impl ToolkitConfig {
    /// Parse a JSON document; absent sections and fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
