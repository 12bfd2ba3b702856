//! Per-engine circuit breaker
//!
//! Tracks engine health across three states:
//! - Healthy: normal operation, the engine is tried
//! - Unhealthy: too many failures or a blocking signal, skipped until the
//!   cooldown expires
//! - Degraded: cooldown expired, on probation; one success heals it and any
//!   failure re-opens it
//!
//! Reads (`should_try` on a non-expired record) share a read lock; every
//! state change takes the write lock.

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::SearchConfig;
use crate::engines::SearchError;

/// Source of "now" for cooldown arithmetic
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Monotonic wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    /// Cooldown expired; on probation
    Degraded,
    /// Skipped until `cooldown_until`
    Unhealthy,
}

/// Health record for a single engine
#[derive(Debug, Clone)]
pub struct EngineHealth {
    pub engine: String,
    pub state: HealthState,
    /// Failures since the last success
    pub consecutive_failures: u32,
    pub last_failure: Option<Instant>,
    /// When an unhealthy engine may be probed again
    pub cooldown_until: Option<Instant>,
    pub total_failures: u64,
    pub total_successes: u64,
}

impl EngineHealth {
    fn new(engine: &str) -> Self {
        Self {
            engine: engine.to_string(),
            state: HealthState::Healthy,
            consecutive_failures: 0,
            last_failure: None,
            cooldown_until: None,
            total_failures: 0,
            total_successes: 0,
        }
    }

    fn cooling_down(&self, now: Instant) -> bool {
        self.state == HealthState::Unhealthy && self.cooldown_until.is_some_and(|until| now < until)
    }
}

pub struct HealthTracker {
    records: RwLock<HashMap<String, EngineHealth>>,
    /// Consecutive failures before the circuit opens
    failure_threshold: u32,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
}

impl HealthTracker {
    #[must_use]
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self::with_clock(failure_threshold, cooldown, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(failure_threshold: u32, cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            failure_threshold: failure_threshold.max(1),
            cooldown,
            clock,
        }
    }

    #[must_use]
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.failure_threshold, config.cooldown)
    }

    /// Whether `engine` should be attempted now
    ///
    /// An unhealthy engine whose cooldown has elapsed moves to degraded here,
    /// before this returns true.
    pub fn should_try(&self, engine: &str) -> bool {
        let now = self.clock.now();

        {
            let records = self.records.read();
            match records.get(engine) {
                None => return true,
                Some(health) if health.state != HealthState::Unhealthy => return true,
                Some(health) if health.cooling_down(now) => return false,
                Some(_) => {}
            }
        }

        // Cooldown elapsed: re-check under the write lock before transitioning
        let mut records = self.records.write();
        let Some(health) = records.get_mut(engine) else {
            return true;
        };
        if health.cooling_down(now) {
            return false;
        }
        if health.state == HealthState::Unhealthy {
            health.state = HealthState::Degraded;
            health.cooldown_until = None;
            info!("Engine {engine} cooldown expired, transitioning to DEGRADED");
        }
        true
    }

    /// Record a failed search
    ///
    /// Opens the circuit when the threshold is reached, on any blocking
    /// signal, or on any failure while degraded.
    pub fn record_failure(&self, engine: &str, err: &SearchError) {
        let now = self.clock.now();
        let blocking = err.is_blocking();

        let mut records = self.records.write();
        let health = records
            .entry(engine.to_string())
            .or_insert_with(|| EngineHealth::new(engine));

        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
        health.total_failures += 1;
        health.last_failure = Some(now);

        let open = blocking
            || health.state == HealthState::Degraded
            || health.consecutive_failures >= self.failure_threshold;

        if open {
            let previous = health.state;
            health.state = HealthState::Unhealthy;
            health.cooldown_until = Some(now + self.cooldown);
            warn!(
                "Engine {} marked UNHEALTHY (was {:?}, {} consecutive failures, blocking: {}), cooling down for {:?}",
                engine, previous, health.consecutive_failures, blocking, self.cooldown
            );
        } else {
            debug!(
                "Engine {} failure {}/{}",
                engine, health.consecutive_failures, self.failure_threshold
            );
        }
    }

    /// Record a successful search
    ///
    /// Heals a degraded engine; never revives an unhealthy one early.
    pub fn record_success(&self, engine: &str) {
        let mut records = self.records.write();
        let health = records
            .entry(engine.to_string())
            .or_insert_with(|| EngineHealth::new(engine));

        health.total_successes += 1;
        match health.state {
            HealthState::Degraded => {
                health.state = HealthState::Healthy;
                health.consecutive_failures = 0;
                info!("Engine {engine} recovered, transitioning to HEALTHY");
            }
            HealthState::Healthy => health.consecutive_failures = 0,
            HealthState::Unhealthy => {
                debug!("Ignoring success for {engine} while its cooldown is running");
            }
        }
    }

    /// Current record for `engine`, if it has been observed
    #[must_use]
    pub fn health(&self, engine: &str) -> Option<EngineHealth> {
        self.records.read().get(engine).cloned()
    }

    /// All records, sorted by engine name
    #[must_use]
    pub fn snapshot(&self) -> Vec<EngineHealth> {
        let mut all: Vec<EngineHealth> = self.records.read().values().cloned().collect();
        all.sort_by(|a, b| a.engine.cmp(&b.engine));
        all
    }

    /// Time left on `engine`'s cooldown, zero if none
    #[must_use]
    pub fn cooldown_remaining(&self, engine: &str) -> Duration {
        let now = self.clock.now();
        self.records
            .read()
            .get(engine)
            .filter(|h| h.cooling_down(now))
            .and_then(|h| h.cooldown_until)
            .map_or(Duration::ZERO, |until| until.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(threshold: u32) -> (HealthTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let tracker = HealthTracker::with_clock(threshold, Duration::from_secs(60), clock.clone());
        (tracker, clock)
    }

    fn timeout() -> SearchError {
        SearchError::Other("navigation timed out".into())
    }

    #[test]
    fn unknown_engine_is_tried_and_not_recorded() {
        let (tracker, _) = tracker(3);
        assert!(tracker.should_try("google"));
        assert!(tracker.health("google").is_none());
    }

    #[test]
    fn failures_below_threshold_keep_engine_healthy() {
        let (tracker, _) = tracker(3);
        tracker.record_failure("google", &timeout());
        tracker.record_failure("google", &timeout());
        let health = tracker.health("google").expect("record");
        assert_eq!(health.state, HealthState::Healthy);
        assert_eq!(health.consecutive_failures, 2);
        assert!(tracker.should_try("google"));
    }

    #[test]
    fn success_on_healthy_resets_count() {
        let (tracker, _) = tracker(3);
        tracker.record_failure("bing", &timeout());
        tracker.record_success("bing");
        assert_eq!(tracker.health("bing").expect("record").consecutive_failures, 0);
    }

    #[test]
    fn success_does_not_revive_unhealthy_engine() {
        let (tracker, clock) = tracker(1);
        tracker.record_failure("bing", &timeout());
        tracker.record_success("bing");
        assert_eq!(tracker.health("bing").expect("record").state, HealthState::Unhealthy);
        assert!(!tracker.should_try("bing"));
        clock.advance(Duration::from_secs(30));
        assert_eq!(tracker.cooldown_remaining("bing"), Duration::from_secs(30));
    }

    #[test]
    fn failure_while_degraded_reopens_circuit() {
        let (tracker, clock) = tracker(3);
        for _ in 0..3 {
            tracker.record_failure("google", &timeout());
        }
        clock.advance(Duration::from_secs(61));
        assert!(tracker.should_try("google"));
        assert_eq!(tracker.health("google").expect("record").state, HealthState::Degraded);

        tracker.record_failure("google", &timeout());
        let health = tracker.health("google").expect("record");
        assert_eq!(health.state, HealthState::Unhealthy);
        assert_eq!(health.cooldown_until, Some(clock.now() + Duration::from_secs(60)));
        assert!(!tracker.should_try("google"));
    }

    #[test]
    fn snapshot_is_sorted() {
        let (tracker, _) = tracker(3);
        tracker.record_success("google");
        tracker.record_failure("bing", &timeout());
        let names: Vec<String> = tracker.snapshot().into_iter().map(|h| h.engine).collect();
        assert_eq!(names, vec!["bing", "google"]);
    }
}
