//! Shared defaults for search, rendering, and fetching
//!
//! Values used by more than one component live here so the config defaults,
//! the engines, and the tests agree on them.

use std::time::Duration;

/// Chrome user agent string presented by the headless renderer
///
/// Headless Chrome advertises `HeadlessChrome` in its default UA, which most
/// search providers treat as a bot signal. Keep this within a few releases of
/// current stable.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Default number of results requested per search
pub const DEFAULT_NUM_RESULTS: usize = 10;

/// Default truncation length for fetched page content, in characters
pub const DEFAULT_FETCH_MAX_LENGTH: usize = 5000;

/// Render timeout applied to single-page fetches
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout used for an engine with no explicit entry in the config
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(30);

/// Lower bound of the randomized post-load pacing delay
pub const DEFAULT_PACING_MIN: Duration = Duration::from_millis(800);

/// Upper bound (exclusive) of the randomized post-load pacing delay
pub const DEFAULT_PACING_MAX: Duration = Duration::from_millis(1500);

/// Poll interval while waiting for `<body>` to exist after navigation
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Phrases that identify an anti-automation interstitial instead of results.
///
/// Matched case-insensitively against page content and error messages.
pub const BLOCKING_FINGERPRINTS: &[&str] = &[
    "captcha",
    "unusual traffic",
    "verify you are not a robot",
    "请证明您不是机器人",
];
