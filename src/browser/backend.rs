//! Process / Session / Tab seams behind the browser manager
//!
//! [`BrowserManager`](super::BrowserManager) owns the lifecycle policy (lazy
//! start, health check, rebuild, per-request tabs). The backend only knows how
//! to start a renderer and drive one tab. The chromium backend lives in
//! [`chromium`](super::chromium); tests plug in an in-memory one.

use async_trait::async_trait;
use std::time::Duration;

use super::errors::BrowserError;

/// Starts one rendering Process together with its long-lived Session
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    type Session: Session;

    /// Start a Process and return its Session.
    ///
    /// Called only while the manager holds its lifecycle lock, so at most one
    /// launch is in flight at a time.
    async fn launch(&self) -> Result<Self::Session, BrowserError>;
}

/// A long-lived browsing context shared by all in-flight requests
#[async_trait]
pub trait Session: Send + Sync + 'static {
    type Tab: Tab;

    /// True once the underlying Process has died or disconnected
    fn is_defunct(&self) -> bool;

    /// Derive a fresh, isolated Tab
    async fn open_tab(&self) -> Result<Self::Tab, BrowserError>;

    /// Tear down the Session and its Process. Must tolerate a dead Process.
    async fn shutdown(&self);
}

/// One single-use browsing context, owned by exactly one request
#[async_trait]
pub trait Tab: Send + Sync + 'static {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Wait until the document has a body to read
    async fn wait_ready(&self, poll_interval: Duration) -> Result<(), BrowserError>;

    /// Evaluate a script returning a string in the page
    async fn evaluate(&self, expression: &str) -> Result<String, BrowserError>;

    /// Close the Tab. Called at most once per Tab.
    async fn close(&self);
}
