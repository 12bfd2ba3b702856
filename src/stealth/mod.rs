//! Fingerprint masking for the headless renderer
//!
//! The evasion bundle is composed once when a Session is created (with a
//! per-session seed) and installed on every Tab before it navigates, so each
//! document sees the same masked fingerprint for the life of the Session.

use chromiumoxide::Page;
use chromiumoxide_cdp::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide_cdp::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide_cdp::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use serde_json::json;
use tracing::debug;

mod profile;
pub use profile::StealthProfile;

use crate::browser::BrowserError;

// Order matters: the config object must exist before any evasion reads it
const EVASIONS: &[(&str, &str)] = &[
    (
        "navigator_webdriver",
        "Object.defineProperty(Navigator.prototype, 'webdriver', { get: () => undefined });",
    ),
    (
        "chrome_runtime",
        "if (!window.chrome) { window.chrome = {}; }\n\
         if (!window.chrome.runtime) { window.chrome.runtime = {}; }",
    ),
    (
        "navigator_plugins",
        "Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });",
    ),
    (
        "navigator_languages",
        "Object.defineProperty(navigator, 'languages', { get: () => window.__relayStealth.languages });\n\
         Object.defineProperty(navigator, 'language', { get: () => window.__relayStealth.language });",
    ),
    (
        "hardware_concurrency",
        "Object.defineProperty(navigator, 'hardwareConcurrency', { get: () => window.__relayStealth.hardwareConcurrency });",
    ),
    (
        "navigator_permissions",
        "if (navigator.permissions && navigator.permissions.query) {\n\
           const query = navigator.permissions.query.bind(navigator.permissions);\n\
           navigator.permissions.query = (p) => p && p.name === 'notifications'\n\
             ? Promise.resolve({ state: Notification.permission })\n\
             : query(p);\n\
         }",
    ),
    (
        "webgl_vendor",
        "(() => {\n\
           const patch = (proto) => {\n\
             const getParameter = proto.getParameter;\n\
             proto.getParameter = function (p) {\n\
               if (p === 37445) { return window.__relayStealth.webglVendor; }\n\
               if (p === 37446) { return window.__relayStealth.webglRenderer; }\n\
               return getParameter.call(this, p);\n\
             };\n\
           };\n\
           if (window.WebGLRenderingContext) { patch(WebGLRenderingContext.prototype); }\n\
           if (window.WebGL2RenderingContext) { patch(WebGL2RenderingContext.prototype); }\n\
         })();",
    ),
];

/// The composed evasion bundle for one Session
#[derive(Debug, Clone)]
pub struct StealthScript {
    source: String,
    profile: StealthProfile,
    user_agent: String,
    session_seed: String,
}

impl StealthScript {
    /// Compose the bundle with a fresh random session seed
    #[must_use]
    pub fn compose(profile: StealthProfile, user_agent: &str) -> Self {
        let seed: Vec<u8> = (0..16).map(|_| rand::random::<u8>()).collect();
        Self::compose_with_seed(profile, user_agent, &hex::encode(seed))
    }

    #[must_use]
    pub fn compose_with_seed(profile: StealthProfile, user_agent: &str, session_seed: &str) -> Self {
        let config = json!({
            "acceptLanguage": profile.accept_language,
            "platform": profile.platform,
            "language": profile.language,
            "languages": profile.languages,
            "screenWidth": profile.screen_width,
            "screenHeight": profile.screen_height,
            "webglVendor": profile.webgl_vendor,
            "webglRenderer": profile.webgl_renderer,
            "hardwareConcurrency": profile.hardware_concurrency,
            "sessionSeed": session_seed,
        });

        let mut source = format!("window.__relayStealth = {config};\n");
        for (name, body) in EVASIONS {
            source.push_str(&format!("// {name}\ntry {{\n{body}\n}} catch (e) {{}}\n"));
        }

        Self {
            source,
            profile,
            user_agent: user_agent.replace("Headless", ""),
            session_seed: session_seed.to_string(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn session_seed(&self) -> &str {
        &self.session_seed
    }

    /// Install the bundle on a blank page before it navigates anywhere
    pub async fn install(&self, page: &Page) -> Result<(), BrowserError> {
        page.execute(AddScriptToEvaluateOnNewDocumentParams {
            source: self.source.clone(),
            include_command_line_api: None,
            world_name: None,
            run_immediately: None,
        })
        .await
        .map_err(|e| BrowserError::TabOpen(format!("stealth script injection failed: {e}")))?;

        page.execute(SetUserAgentOverrideParams {
            user_agent: self.user_agent.clone(),
            accept_language: Some(self.profile.accept_language.clone()),
            platform: Some(self.profile.platform.clone()),
            user_agent_metadata: None,
        })
        .await
        .map_err(|e| BrowserError::TabOpen(format!("user agent override failed: {e}")))?;

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(self.profile.screen_width as i64)
            .height(self.profile.screen_height as i64)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(BrowserError::TabOpen)?;
        page.execute(metrics)
            .await
            .map_err(|e| BrowserError::TabOpen(format!("viewport override failed: {e}")))?;

        debug!("Stealth bundle installed ({} evasions)", EVASIONS.len());
        Ok(())
    }
}
