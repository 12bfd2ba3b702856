//! Error types for the browser session manager

use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by [`BrowserManager::render`](super::BrowserManager::render)
///
/// Callers distinguish two scopes: a failed Tab (navigation error, timeout,
/// script error) leaves the shared Session usable, while a Session failure
/// means the next call will rebuild the Process.
#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    #[error("Chrome/Chromium executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Failed to open tab: {0}")]
    TabOpen(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Page script evaluation failed: {0}")]
    Script(String),

    #[error("Render of {url} timeout after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Render cancelled by caller")]
    Cancelled,

    #[error("Browser session is no longer alive: {0}")]
    SessionBroken(String),
}

impl BrowserError {
    /// True when the shared Session/Process is at fault rather than this Tab
    #[must_use]
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            BrowserError::SessionBroken(_) | BrowserError::Launch(_) | BrowserError::ExecutableNotFound(_)
        )
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BrowserError::Cancelled)
    }
}
