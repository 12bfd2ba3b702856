//! Fluent builder for `SearchConfig`
//!
//! Validates the handful of values that would make the router misbehave
//! (no engines, zero threshold, zero attempts) at build time instead of at
//! the first search.

use anyhow::{Result, bail};
use std::time::Duration;

use super::types::SearchConfig;

#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the engine priority list
    #[must_use]
    pub fn engines<I, S>(mut self, engines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.engines = engines.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn engine_timeout(mut self, engine: impl Into<String>, timeout: Duration) -> Self {
        self.config.engine_timeouts.insert(engine.into(), timeout);
        self
    }

    #[must_use]
    pub fn failover_delay(mut self, delay: Duration) -> Self {
        self.config.failover_delay = delay;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    #[must_use]
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    #[must_use]
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.config.cooldown = cooldown;
        self
    }

    #[must_use]
    pub fn num_results(mut self, n: usize) -> Self {
        self.config.num_results = n;
        self
    }

    #[must_use]
    pub fn interface_language(mut self, lang: impl Into<String>) -> Self {
        self.config.interface_language = lang.into();
        self
    }

    /// Build the config
    ///
    /// # Errors
    ///
    /// Returns an error if no engines are configured, the failure threshold is
    /// zero, or an adapter would make zero attempts.
    pub fn build(self) -> Result<SearchConfig> {
        if self.config.engines.is_empty() {
            bail!("at least one search engine must be configured");
        }
        if self.config.failure_threshold == 0 {
            bail!("failure_threshold must be at least 1");
        }
        if self.config.max_retries == 0 {
            bail!("max_retries must be at least 1 (it counts attempts, including the first)");
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = SearchConfigBuilder::new()
            .engines(["bing"])
            .failover_delay(Duration::ZERO)
            .failure_threshold(5)
            .build()
            .expect("valid config");

        assert_eq!(cfg.engines, vec!["bing".to_string()]);
        assert_eq!(cfg.failover_delay, Duration::ZERO);
        assert_eq!(cfg.failure_threshold, 5);
        assert_eq!(cfg.cooldown, Duration::from_secs(300));
    }

    #[test]
    fn builder_rejects_empty_engine_list() {
        let empty: [&str; 0] = [];
        assert!(SearchConfigBuilder::new().engines(empty).build().is_err());
    }

    #[test]
    fn builder_rejects_zero_threshold() {
        assert!(SearchConfigBuilder::new().failure_threshold(0).build().is_err());
    }
}
