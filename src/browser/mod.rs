//! Browser Session Manager
//!
//! Three tiers: one Process owning one Session, from which each request
//! derives its own short-lived Tab. Everything above this module sees only
//! [`PageRenderer`].

mod backend;
mod chromium;
mod errors;
mod manager;
mod tab_guard;

pub use backend::{Launcher, Session, Tab};
pub use chromium::{ChromiumLauncher, ChromiumSession, ChromiumTab};
pub use errors::BrowserError;
pub use manager::BrowserManager;
pub use tab_guard::TabGuard;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What to read out of the rendered document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Full serialized DOM after scripts ran
    Html,
    /// Visible text of the body
    Text,
}

impl RenderMode {
    #[must_use]
    pub fn script(self) -> &'static str {
        match self {
            RenderMode::Html => "document.documentElement.outerHTML",
            RenderMode::Text => "document.body ? document.body.innerText : ''",
        }
    }
}

/// A page read through its own Tab. Consumed once by the caller.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub mode: RenderMode,
    pub content: String,
}

/// "Render this URL" capability used by engines and the fetch service
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render `url` in a fresh Tab and read it back
    ///
    /// The Tab is closed before this returns, including on timeout and
    /// cancellation.
    ///
    /// # Errors
    ///
    /// [`BrowserError::Cancelled`] if `cancel` fires first,
    /// [`BrowserError::Timeout`] if `timeout` elapses, otherwise the Tab or
    /// Session failure. Use [`BrowserError::is_session_failure`] to tell them
    /// apart.
    async fn render(
        &self,
        url: &str,
        mode: RenderMode,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RenderedPage, BrowserError>;
}
