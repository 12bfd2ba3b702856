//! Search Router
//!
//! Walks the configured engines strictly in priority order, one at a time,
//! and turns whatever happens into a single [`SearchOutcome`]. The router
//! never retries an engine itself; adapters own their retry budget.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span};

use crate::config::SearchConfig;
use crate::config::serde_millis;
use crate::engines::{SearchEngine, SearchError, SearchResultItem, normalize_query};
use crate::health::HealthTracker;
use crate::search_log::SearchLogger;

pub const ERROR_ALL_ENGINES_FAILED: &str = "all_engines_failed";
pub const ERROR_DETECTED_AUTOMATION: &str = "detected_automation";
pub const ERROR_CANCELLED: &str = "cancelled";
pub const ERROR_INVALID_QUERY: &str = "invalid_query";

/// Ledger reason for engines skipped by the circuit breaker
pub const REASON_COOLDOWN: &str = "cooldown";

const MESSAGE_FAILED: &str = "Search is temporarily unavailable, please try again later.";
const MESSAGE_CAPTCHA: &str = "Search is temporarily unavailable, possibly because of rate limiting \
     or automated-access detection. Please try again later, or answer from existing knowledge.";
const MESSAGE_CANCELLED: &str = "Search was cancelled before it completed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    Success,
    Failed,
    Captcha,
    Cancelled,
}

impl SearchStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SearchStatus::Success => "success",
            SearchStatus::Failed => "failed",
            SearchStatus::Captcha => "captcha",
            SearchStatus::Cancelled => "cancelled",
        }
    }
}

/// Why one engine did not produce results for a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineFailure {
    pub reason: String,
    /// The provider served a blocking/CAPTCHA page
    pub blocked: bool,
}

/// Terminal result of one routed search. Never mutated after return.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub results: Vec<SearchResultItem>,
    pub status: SearchStatus,
    /// Engine that produced `results`; empty unless `status` is success
    pub used_engine: String,
    pub request_id: String,
    /// Machine-readable error code; empty on success
    pub error: String,
    /// User-facing explanation; empty on success
    pub message: String,
    #[serde(rename = "duration_ms", with = "serde_millis::duration")]
    pub duration: Duration,
    /// Engine name to failure, for every engine that was skipped or failed
    pub failures: BTreeMap<String, EngineFailure>,
}

impl SearchOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SearchStatus::Success
    }
}

pub struct SearchRouter {
    engines: Vec<Arc<dyn SearchEngine>>,
    tracker: Arc<HealthTracker>,
    failover_delay: Duration,
}

impl SearchRouter {
    /// `engines` are tried in the order given
    #[must_use]
    pub fn new(
        engines: Vec<Arc<dyn SearchEngine>>,
        tracker: Arc<HealthTracker>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            engines,
            tracker,
            failover_delay: config.failover_delay,
        }
    }

    #[must_use]
    pub fn tracker(&self) -> &Arc<HealthTracker> {
        &self.tracker
    }

    /// Engine names in priority order
    #[must_use]
    pub fn engine_names(&self) -> Vec<String> {
        self.engines.iter().map(|e| e.name().to_string()).collect()
    }

    /// Run `query` with failover. Every path ends in a populated outcome.
    pub async fn search(
        &self,
        query: &str,
        num_results: usize,
        cancel: &CancellationToken,
    ) -> SearchOutcome {
        let logger = SearchLogger::for_new_request();
        let span = info_span!("search_request", request_id = %logger.request_id());
        self.route(query, num_results, cancel, &logger)
            .instrument(span)
            .await
    }

    async fn route(
        &self,
        query: &str,
        num_results: usize,
        cancel: &CancellationToken,
        logger: &SearchLogger,
    ) -> SearchOutcome {
        let started = Instant::now();
        let mut outcome = SearchOutcome {
            query: query.to_string(),
            results: Vec::new(),
            status: SearchStatus::Failed,
            used_engine: String::new(),
            request_id: logger.request_id().to_string(),
            error: String::new(),
            message: String::new(),
            duration: Duration::ZERO,
            failures: BTreeMap::new(),
        };

        // A blank query is the caller's fault; no engine is charged for it
        if normalize_query(query).is_empty() {
            outcome.error = ERROR_INVALID_QUERY.to_string();
            outcome.message = SearchError::EmptyQuery.to_string();
            return outcome;
        }

        let mut attempted_any = false;
        let mut pending_failover: Option<(String, String)> = None;

        for engine in &self.engines {
            let name = engine.name();

            if cancel.is_cancelled() {
                return cancelled(outcome, logger, None, started);
            }

            if !self.tracker.should_try(name) {
                logger.engine_skipped(name);
                outcome.failures.insert(
                    name.to_string(),
                    EngineFailure {
                        reason: REASON_COOLDOWN.to_string(),
                        blocked: false,
                    },
                );
                continue;
            }

            if let Some((from, reason)) = pending_failover.take() {
                logger.failover(&from, name, &reason);
            }

            if attempted_any && !self.failover_delay.is_zero() {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return cancelled(outcome, logger, None, started),
                    () = tokio::time::sleep(self.failover_delay) => {}
                }
            }
            attempted_any = true;

            logger.search_start(query, name);
            let attempt_started = Instant::now();

            match engine.search(query, num_results, cancel).await {
                Ok(results) => {
                    self.tracker.record_success(name);
                    logger.search_success(name, attempt_started.elapsed(), results.len());
                    outcome.results = results;
                    outcome.status = SearchStatus::Success;
                    outcome.used_engine = name.to_string();
                    outcome.duration = started.elapsed();
                    return outcome;
                }
                Err(e) if e.is_cancelled() => {
                    return cancelled(outcome, logger, Some(name), started);
                }
                Err(e) => {
                    self.tracker.record_failure(name, &e);

                    let reason = e.to_string();
                    let blocked = e.is_blocking();
                    if blocked {
                        logger.captcha_detected(name, &reason);
                    } else {
                        logger.engine_error(name, e.error_type(), &reason);
                    }

                    outcome.failures.insert(
                        name.to_string(),
                        EngineFailure {
                            reason: reason.clone(),
                            blocked,
                        },
                    );
                    pending_failover = Some((name.to_string(), reason));
                }
            }
        }

        let reasons: BTreeMap<String, String> = outcome
            .failures
            .iter()
            .map(|(engine, f)| (engine.clone(), f.reason.clone()))
            .collect();
        logger.all_engines_failed(&reasons);

        if outcome.failures.values().any(|f| f.blocked) {
            outcome.status = SearchStatus::Captcha;
            outcome.error = ERROR_DETECTED_AUTOMATION.to_string();
            outcome.message = MESSAGE_CAPTCHA.to_string();
        } else {
            outcome.status = SearchStatus::Failed;
            outcome.error = ERROR_ALL_ENGINES_FAILED.to_string();
            outcome.message = MESSAGE_FAILED.to_string();
        }
        outcome.duration = started.elapsed();
        outcome
    }
}

fn cancelled(
    mut outcome: SearchOutcome,
    logger: &SearchLogger,
    engine: Option<&str>,
    started: Instant,
) -> SearchOutcome {
    outcome.duration = started.elapsed();
    logger.search_cancelled(engine, outcome.duration);
    outcome.status = SearchStatus::Cancelled;
    outcome.error = ERROR_CANCELLED.to_string();
    outcome.message = MESSAGE_CANCELLED.to_string();
    outcome
}
