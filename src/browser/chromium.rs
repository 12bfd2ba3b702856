//! chromiumoxide-backed Process, Session, and Tab
//!
//! One `Browser::launch` is one Process; its CDP connection plus event
//! handler task is the Session. Each Tab is a fresh target (`new_page`) with
//! the Session's stealth bundle installed before navigation.

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backend::{Launcher, Session, Tab};
use super::errors::BrowserError;
use crate::browser_setup::{DetectedBrowser, detect_browser};
use crate::config::BrowserSettings;
use crate::stealth::{StealthProfile, StealthScript};

/// Launches headless Chrome with anti-automation switches
pub struct ChromiumLauncher {
    settings: BrowserSettings,
    profile: StealthProfile,
    // Only a successful detection is cached; a failed one is retried next launch
    detected: OnceCell<DetectedBrowser>,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            profile: StealthProfile::default(),
            detected: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_profile(mut self, profile: StealthProfile) -> Self {
        self.profile = profile;
        self
    }

    async fn executable(&self) -> Result<PathBuf, BrowserError> {
        let detected = self
            .detected
            .get_or_try_init(|| detect_browser(self.settings.executable.as_deref()))
            .await?;
        Ok(detected.path.clone())
    }
}

#[async_trait]
impl Launcher for ChromiumLauncher {
    type Session = ChromiumSession;

    async fn launch(&self) -> Result<ChromiumSession, BrowserError> {
        let chrome_path = self.executable().await?;

        // Unique per launch: a rebuilt Process must not reuse a profile the
        // dead one may still hold locks on
        let user_data_dir = std::env::temp_dir().join(format!(
            "websearch_relay_chrome_{}_{}",
            std::process::id(),
            hex::encode(rand::random::<[u8; 4]>())
        ));
        std::fs::create_dir_all(&user_data_dir).map_err(|e| {
            BrowserError::Launch(format!(
                "failed to create user data directory {}: {e}",
                user_data_dir.display()
            ))
        })?;

        let s = &self.settings;
        let mut builder = BrowserConfigBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .window_size(s.window_width, s.window_height)
            .user_data_dir(user_data_dir.clone())
            .chrome_executable(chrome_path);
        builder = if s.headless {
            builder.headless_mode(HeadlessMode::default())
        } else {
            builder.with_head()
        };
        builder = builder
            .arg(format!("--user-agent={}", s.user_agent))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--exclude-switches=enable-automation")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-infobars")
            .arg("--disable-notifications")
            .arg("--blink-settings=imagesEnabled=false")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--mute-audio")
            .arg("--hide-scrollbars");
        for extra in &s.extra_args {
            builder = builder.arg(extra.clone());
        }
        let config = builder
            .build()
            .map_err(|e| BrowserError::Launch(format!("invalid browser config: {e}")))?;

        info!("Launching browser process");
        let (browser, mut handler) = match Browser::launch(config).await {
            Ok(pair) => pair,
            Err(e) => {
                let _ = std::fs::remove_dir_all(&user_data_dir);
                return Err(BrowserError::Launch(e.to_string()));
            }
        };

        // The handler drives the CDP connection; when it ends the Session is dead
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e:?}");
                }
            }
            info!("Browser event handler task completed");
        });

        let stealth = StealthScript::compose(self.profile.clone(), &s.user_agent);
        info!("Browser session ready; subsequent requests reuse this process");

        Ok(ChromiumSession {
            browser: RwLock::new(Some(browser)),
            handler,
            user_data_dir: std::sync::Mutex::new(Some(user_data_dir)),
            stealth,
        })
    }
}

/// A running Chrome Process and its CDP connection
pub struct ChromiumSession {
    // Tabs are opened under the read lock; shutdown takes the write lock
    browser: RwLock<Option<Browser>>,
    handler: JoinHandle<()>,
    user_data_dir: std::sync::Mutex<Option<PathBuf>>,
    stealth: StealthScript,
}

impl ChromiumSession {
    /// Remove the profile directory. Call only after the Process has exited.
    fn cleanup_temp_dir(&self) {
        let taken = match self.user_data_dir.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(path) = taken {
            debug!("Cleaning up temp directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "Failed to clean up temp directory {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
    }
}

#[async_trait]
impl Session for ChromiumSession {
    type Tab = ChromiumTab;

    fn is_defunct(&self) -> bool {
        self.handler.is_finished()
    }

    async fn open_tab(&self) -> Result<ChromiumTab, BrowserError> {
        let guard = self.browser.read().await;
        let browser = guard
            .as_ref()
            .ok_or_else(|| BrowserError::SessionBroken("session already shut down".to_string()))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::TabOpen(e.to_string()))?;
        drop(guard);

        let tab = ChromiumTab { page };
        if let Err(e) = self.stealth.install(&tab.page).await {
            // Masking is best effort; an unmasked tab still renders
            warn!("Stealth injection failed: {e}");
        }
        Ok(tab)
    }

    async fn shutdown(&self) {
        let mut guard = self.browser.write().await;
        if let Some(mut browser) = guard.take() {
            info!("Shutting down browser session");
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser cleanly: {e}");
            }
            if let Err(e) = browser.wait().await {
                warn!("Failed to wait for browser exit: {e}");
            }
        }
        drop(guard);
        self.handler.abort();
        self.cleanup_temp_dir();
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
        // Browser::drop kills the child; the profile dir is removed best effort
        let still_has_dir = self
            .user_data_dir
            .lock()
            .map(|g| g.is_some())
            .unwrap_or(false);
        if still_has_dir {
            warn!("ChromiumSession dropped without shutdown - removing temp dir in Drop");
            self.cleanup_temp_dir();
        }
    }
}

/// One chromium target
pub struct ChromiumTab {
    page: Page,
}

#[async_trait]
impl Tab for ChromiumTab {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_ready(&self, poll_interval: Duration) -> Result<(), BrowserError> {
        loop {
            if self.page.find_element("body").await.is_ok() {
                return Ok(());
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn evaluate(&self, expression: &str) -> Result<String, BrowserError> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        result
            .into_value::<String>()
            .map_err(|e| BrowserError::Script(format!("unexpected script result: {e}")))
    }

    async fn close(&self) {
        if let Err(e) = self.page.clone().close().await {
            error!("Failed to close tab: {e}");
        }
    }
}
