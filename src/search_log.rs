//! Structured search events
//!
//! Each event is one `tracing` record under [`SEARCH_EVENTS_TARGET`] with an
//! `event` field naming it, so logs can be filtered and replayed per request
//! id. Adapter-side events (`engine_retry`) are emitted inside the router's
//! per-request span and inherit its `request_id` from there.

use chrono::Utc;
use rand::Rng;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, info, warn};

/// Log target for all search events
pub const SEARCH_EVENTS_TARGET: &str = "websearch_relay::search_events";

/// Correlation id: `SRCH-{unix_millis}-{4 digits}`
#[must_use]
pub fn generate_request_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let random: u16 = rand::rng().random_range(0..10_000);
    format!("SRCH-{millis}-{random:04}")
}

/// Event emitter bound to one search request
#[derive(Debug, Clone)]
pub struct SearchLogger {
    request_id: String,
}

impl SearchLogger {
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// Logger with a freshly generated correlation id
    #[must_use]
    pub fn for_new_request() -> Self {
        Self::new(generate_request_id())
    }

    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn search_start(&self, query: &str, engine: &str) {
        info!(
            target: SEARCH_EVENTS_TARGET,
            event = "search_start",
            request_id = %self.request_id,
            engine,
            query,
            "Starting search"
        );
    }

    pub fn search_success(&self, engine: &str, duration: Duration, result_count: usize) {
        info!(
            target: SEARCH_EVENTS_TARGET,
            event = "search_success",
            request_id = %self.request_id,
            engine,
            duration_ms = duration.as_millis() as u64,
            result_count,
            "Search completed successfully"
        );
    }

    pub fn failover(&self, from_engine: &str, to_engine: &str, reason: &str) {
        warn!(
            target: SEARCH_EVENTS_TARGET,
            event = "failover",
            request_id = %self.request_id,
            from_engine,
            to_engine,
            reason,
            "Engine failover"
        );
    }

    pub fn captcha_detected(&self, engine: &str, indicator: &str) {
        warn!(
            target: SEARCH_EVENTS_TARGET,
            event = "captcha_detected",
            request_id = %self.request_id,
            engine,
            error_type = "captcha",
            indicator,
            "CAPTCHA detected"
        );
    }

    pub fn engine_error(&self, engine: &str, error_type: &str, message: &str) {
        error!(
            target: SEARCH_EVENTS_TARGET,
            event = "engine_error",
            request_id = %self.request_id,
            engine,
            error_type,
            error_message = message,
            "Search engine error"
        );
    }

    pub fn engine_skipped(&self, engine: &str) {
        warn!(
            target: SEARCH_EVENTS_TARGET,
            event = "engine_skipped",
            request_id = %self.request_id,
            engine,
            reason = "cooldown",
            "Skipping engine (in cooldown)"
        );
    }

    pub fn all_engines_failed(&self, failed_engines: &BTreeMap<String, String>) {
        error!(
            target: SEARCH_EVENTS_TARGET,
            event = "all_engines_failed",
            request_id = %self.request_id,
            failed_engines = ?failed_engines,
            total_attempts = failed_engines.len(),
            status = "failed",
            "All search engines failed"
        );
    }

    pub fn search_cancelled(&self, engine: Option<&str>, duration: Duration) {
        info!(
            target: SEARCH_EVENTS_TARGET,
            event = "search_cancelled",
            request_id = %self.request_id,
            engine = engine.unwrap_or(""),
            duration_ms = duration.as_millis() as u64,
            "Search cancelled by caller"
        );
    }
}

/// Adapter retry; the request id comes from the enclosing request span
pub fn engine_retry(engine: &str, attempt: u32, max_retries: u32, reason: &str) {
    info!(
        target: SEARCH_EVENTS_TARGET,
        event = "engine_retry",
        engine,
        retry_count = attempt,
        max_retries,
        reason,
        "Retrying search engine"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_has_expected_shape() {
        let id = generate_request_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3, "unexpected id {id}");
        assert_eq!(parts[0], "SRCH");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn logger_keeps_its_request_id() {
        let logger = SearchLogger::new("SRCH-1-0001");
        assert_eq!(logger.request_id(), "SRCH-1-0001");
        assert!(SearchLogger::for_new_request().request_id().starts_with("SRCH-"));
    }
}
