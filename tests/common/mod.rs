//! In-memory stand-ins for the browser and the search engines

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use websearch_relay::browser::{Launcher, Session, Tab};
use websearch_relay::engines::{SearchEngine, SearchError, SearchResultItem};
use websearch_relay::{BrowserError, BrowserSettings, PageRenderer, RenderMode, RenderedPage};

/// Browser settings with pacing disabled
pub fn fast_browser_settings() -> BrowserSettings {
    BrowserSettings {
        pacing_min: Duration::ZERO,
        pacing_max: Duration::ZERO,
        ready_poll_interval: Duration::from_millis(1),
        ..BrowserSettings::default()
    }
}

pub fn result_item(n: usize, engine: &str) -> SearchResultItem {
    SearchResultItem {
        title: format!("{engine} result {n}"),
        url: format!("https://example{n}.com/page"),
        snippet: format!("snippet {n}"),
        source: format!("example{n}.com"),
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Reply {
    Page(String),
    Fail(BrowserError),
}

/// Answers renders from per-URL-fragment scripts
///
/// Each route pops one reply per call; the last reply repeats.
#[derive(Default)]
pub struct FakeRenderer {
    routes: Mutex<Vec<(String, VecDeque<Reply>)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, fragment: &str, replies: Vec<Reply>) -> Self {
        self.routes
            .lock()
            .push((fragment.to_string(), replies.into_iter().collect()));
        self
    }

    pub fn page(self, fragment: &str, html: impl Into<String>) -> Self {
        self.route(fragment, vec![Reply::Page(html.into())])
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_matching(&self, fragment: &str) -> usize {
        self.calls.lock().iter().filter(|u| u.contains(fragment)).count()
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
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
        self.calls.lock().push(url.to_string());

        let reply = {
            let mut routes = self.routes.lock();
            routes
                .iter_mut()
                .find(|(fragment, _)| url.contains(fragment.as_str()))
                .and_then(|(_, replies)| {
                    if replies.len() > 1 {
                        replies.pop_front()
                    } else {
                        replies.front().cloned()
                    }
                })
        };

        match reply {
            Some(Reply::Page(content)) => Ok(RenderedPage {
                url: url.to_string(),
                mode,
                content,
            }),
            Some(Reply::Fail(e)) => Err(e),
            None => Err(BrowserError::Timeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Browser backend
// ---------------------------------------------------------------------------

/// Counters shared by a fake launcher and everything it creates
#[derive(Default)]
pub struct BackendStats {
    pub launches: AtomicUsize,
    pub sessions_shut_down: AtomicUsize,
    pub tabs_opened: AtomicUsize,
    pub tabs_closed: AtomicUsize,
}

#[derive(Clone)]
pub struct FakeLauncher {
    pub stats: Arc<BackendStats>,
    /// Set to mark the current session's process as dead
    pub kill_switch: Arc<Mutex<Option<Arc<AtomicBool>>>>,
    pub launch_delay: Duration,
    pub navigate_delay: Duration,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(BackendStats::default()),
            kill_switch: Arc::new(Mutex::new(None)),
            launch_delay: Duration::from_millis(50),
            navigate_delay: Duration::ZERO,
        }
    }

    pub fn with_navigate_delay(mut self, delay: Duration) -> Self {
        self.navigate_delay = delay;
        self
    }

    /// Make the live session report itself defunct
    pub fn kill_current_session(&self) {
        if let Some(flag) = self.kill_switch.lock().as_ref() {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self) -> Result<FakeSession, BrowserError> {
        tokio::time::sleep(self.launch_delay).await;
        let generation = self.stats.launches.fetch_add(1, Ordering::SeqCst) + 1;
        let defunct = Arc::new(AtomicBool::new(false));
        *self.kill_switch.lock() = Some(Arc::clone(&defunct));
        Ok(FakeSession {
            generation,
            defunct,
            stats: Arc::clone(&self.stats),
            navigate_delay: self.navigate_delay,
        })
    }
}

pub struct FakeSession {
    generation: usize,
    defunct: Arc<AtomicBool>,
    stats: Arc<BackendStats>,
    navigate_delay: Duration,
}

#[async_trait]
impl Session for FakeSession {
    type Tab = FakeTab;

    fn is_defunct(&self) -> bool {
        self.defunct.load(Ordering::SeqCst)
    }

    async fn open_tab(&self) -> Result<FakeTab, BrowserError> {
        if self.is_defunct() {
            return Err(BrowserError::TabOpen("connection closed".to_string()));
        }
        self.stats.tabs_opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeTab {
            generation: self.generation,
            url: Mutex::new(None),
            stats: Arc::clone(&self.stats),
            navigate_delay: self.navigate_delay,
        })
    }

    async fn shutdown(&self) {
        self.stats.sessions_shut_down.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeTab {
    generation: usize,
    url: Mutex<Option<String>>,
    stats: Arc<BackendStats>,
    navigate_delay: Duration,
}

#[async_trait]
impl Tab for FakeTab {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        if !self.navigate_delay.is_zero() {
            tokio::time::sleep(self.navigate_delay).await;
        }
        *self.url.lock() = Some(url.to_string());
        Ok(())
    }

    async fn wait_ready(&self, _poll_interval: Duration) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn evaluate(&self, _expression: &str) -> Result<String, BrowserError> {
        let url = self.url.lock().clone().unwrap_or_default();
        Ok(format!(
            "<html><head><title>{url}</title></head><body><p>session {} served {url}</p></body></html>",
            self.generation
        ))
    }

    async fn close(&self) {
        self.stats.tabs_closed.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Search engines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Behavior {
    Results(usize),
    Fail(SearchError),
    /// Wait until the caller cancels
    Hang,
}

/// Engine that plays back a script; the last behavior repeats
pub struct ScriptedEngine {
    name: String,
    script: Mutex<VecDeque<Behavior>>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(name: &str, script: Vec<Behavior>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchEngine for ScriptedEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        _query: &str,
        num_results: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResultItem>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = {
            let mut script = self.script.lock();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        }
        .unwrap_or(Behavior::Results(1));

        match behavior {
            Behavior::Results(n) => Ok((0..n.min(num_results.max(1)))
                .map(|i| result_item(i, &self.name))
                .collect()),
            Behavior::Fail(e) => Err(e),
            Behavior::Hang => {
                cancel.cancelled().await;
                Err(SearchError::Cancelled)
            }
        }
    }
}

pub fn timeout_error(engine: &str) -> SearchError {
    SearchError::Render(BrowserError::Timeout {
        url: format!("https://{engine}.test/search"),
        timeout: Duration::from_secs(30),
    })
}

pub fn blocked_error(engine: &str) -> SearchError {
    SearchError::Blocked {
        engine: engine.to_string(),
        indicator: "unusual traffic".to_string(),
    }
}
