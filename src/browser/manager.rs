//! Browser lifecycle manager
//!
//! One shared Process/Session, launched on first use and reused by every
//! request. Each `render` call gets its own Tab which is closed before the
//! call returns, whatever the outcome.
//!
//! # Lifecycle
//! - Nothing is launched on construction
//! - First `render()` launches the Process (~2-3s); concurrent first callers
//!   wait on the same launch
//! - A Session found defunct is shut down and replaced on the next call
//! - `shutdown()` closes the Process; safe to call repeatedly

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::{Launcher, Session, Tab};
use super::chromium::ChromiumLauncher;
use super::errors::BrowserError;
use super::tab_guard::TabGuard;
use super::{PageRenderer, RenderMode, RenderedPage};
use crate::config::BrowserSettings;

/// Shared rendering resource for all search and fetch requests
pub struct BrowserManager<L: Launcher = ChromiumLauncher> {
    launcher: L,
    // Read lock: steady-state Tab creation. Write lock: launch, rebuild, shutdown.
    session: RwLock<Option<Arc<L::Session>>>,
    launches: AtomicUsize,
    open_tabs: Arc<AtomicUsize>,
    pacing_min: Duration,
    pacing_max: Duration,
    ready_poll_interval: Duration,
}

impl BrowserManager<ChromiumLauncher> {
    /// Manager backed by a local Chrome/Chromium
    ///
    /// The browser is NOT launched yet; it is started by the first render.
    #[must_use]
    pub fn new(settings: BrowserSettings) -> Self {
        let launcher = ChromiumLauncher::new(settings.clone());
        Self::with_launcher(launcher, &settings)
    }
}

impl<L: Launcher> BrowserManager<L> {
    #[must_use]
    pub fn with_launcher(launcher: L, settings: &BrowserSettings) -> Self {
        Self {
            launcher,
            session: RwLock::new(None),
            launches: AtomicUsize::new(0),
            open_tabs: Arc::new(AtomicUsize::new(0)),
            pacing_min: settings.pacing_min,
            pacing_max: settings.pacing_max,
            ready_poll_interval: settings.ready_poll_interval,
        }
    }

    /// Number of Processes started over the manager's lifetime
    #[must_use]
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Tabs currently open across all in-flight requests
    #[must_use]
    pub fn open_tab_count(&self) -> usize {
        self.open_tabs.load(Ordering::SeqCst)
    }

    /// True while a live Session is held
    pub async fn is_running(&self) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .is_some_and(|s| !s.is_defunct())
    }

    /// Get the shared Session, launching or rebuilding it if needed
    async fn session(&self) -> Result<Arc<L::Session>, BrowserError> {
        {
            let guard = self.session.read().await;
            if let Some(session) = guard.as_ref()
                && !session.is_defunct()
            {
                return Ok(Arc::clone(session));
            }
        }

        let mut guard = self.session.write().await;

        // Another task may have launched while we waited for the write lock
        if let Some(session) = guard.as_ref() {
            if !session.is_defunct() {
                return Ok(Arc::clone(session));
            }
            warn!("Browser session is defunct. Triggering recovery...");
            if let Some(stale) = guard.take() {
                stale.shutdown().await;
            }
            info!("Defunct browser session cleaned up, launching new instance");
        }

        info!("Launching browser (first time or after recovery)");
        let session = Arc::new(self.launcher.launch().await?);
        self.launches.fetch_add(1, Ordering::SeqCst);
        *guard = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Close the Session and its Process
    ///
    /// Safe to call multiple times (subsequent calls are no-ops). Tabs still
    /// in flight fail and are released by their owners.
    pub async fn shutdown(&self) {
        let mut guard = self.session.write().await;
        if let Some(session) = guard.take() {
            info!("Shutting down browser");
            session.shutdown().await;
        }
    }

    fn pacing_delay(&self) -> Duration {
        if self.pacing_max <= self.pacing_min {
            return self.pacing_min;
        }
        let min = self.pacing_min.as_millis() as u64;
        let max = self.pacing_max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    async fn drive<T: Tab>(
        &self,
        tab: &T,
        url: &str,
        mode: RenderMode,
        pacing: Duration,
    ) -> Result<String, BrowserError> {
        tab.navigate(url).await?;
        tab.wait_ready(self.ready_poll_interval).await?;
        // Anti-bot pacing between load and read
        tokio::time::sleep(pacing).await;
        tab.evaluate(mode.script()).await
    }
}

#[async_trait]
impl<L: Launcher> PageRenderer for BrowserManager<L> {
    async fn render(
        &self,
        url: &str,
        mode: RenderMode,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RenderedPage, BrowserError> {
        if cancel.is_cancelled() {
            return Err(BrowserError::Cancelled);
        }

        let session = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(BrowserError::Cancelled),
            session = self.session() => session?,
        };

        let started = Instant::now();
        let deadline = started + timeout;
        let timed_out = || BrowserError::Timeout {
            url: url.to_string(),
            timeout,
        };

        let tab = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(BrowserError::Cancelled),
            opened = tokio::time::timeout_at(deadline, session.open_tab()) => match opened {
                Ok(tab) => tab.map_err(|e| session_scoped(&*session, e))?,
                Err(_) => return Err(timed_out()),
            },
        };

        let guard = TabGuard::new(tab, Arc::clone(&self.open_tabs), url);
        let pacing = self.pacing_delay();

        let result = match guard.tab() {
            Some(tab) => tokio::select! {
                biased;
                () = cancel.cancelled() => Err(BrowserError::Cancelled),
                driven = tokio::time::timeout_at(deadline, self.drive(tab, url, mode, pacing)) => {
                    driven.unwrap_or_else(|_| Err(timed_out()))
                }
            },
            None => Err(BrowserError::TabOpen("tab already released".to_string())),
        };

        guard.close().await;

        match result {
            Ok(content) => {
                debug!(
                    "Rendered {} ({:?}, {} bytes) in {:?}",
                    url,
                    mode,
                    content.len(),
                    started.elapsed()
                );
                Ok(RenderedPage {
                    url: url.to_string(),
                    mode,
                    content,
                })
            }
            Err(BrowserError::Cancelled) => {
                debug!("Render of {url} cancelled after {:?}", started.elapsed());
                Err(BrowserError::Cancelled)
            }
            Err(e) => Err(session_scoped(&*session, e)),
        }
    }
}

/// Re-label a Tab error as a Session failure when the Process died under it
fn session_scoped<S: Session>(session: &S, err: BrowserError) -> BrowserError {
    if session.is_defunct() && !err.is_session_failure() {
        warn!("Render failed on a defunct session: {err}");
        BrowserError::SessionBroken(err.to_string())
    } else {
        err
    }
}
