//! Locate the Chrome/Chromium executable the renderer needs
//!
//! Discovery order: explicit path from settings, `CHROMIUM_PATH`, well-known
//! install locations for the platform, then `which` on Unix. The chromium
//! launcher runs this once and caches the result.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};

use crate::browser::BrowserError;

/// A discovered executable and the version it reported, if any
#[derive(Debug, Clone)]
pub struct DetectedBrowser {
    pub path: PathBuf,
    pub version: Option<String>,
}

/// Find and probe the browser executable
///
/// # Errors
///
/// Returns [`BrowserError::ExecutableNotFound`] when no candidate exists.
pub async fn detect_browser(explicit: Option<&Path>) -> Result<DetectedBrowser, BrowserError> {
    let path = find_browser_executable(explicit).await?;
    let version = probe_version(&path).await;
    match &version {
        Some(v) => info!("Using browser {} ({})", path.display(), v),
        None => warn!(
            "Browser at {} did not report a version; continuing anyway",
            path.display()
        ),
    }
    Ok(DetectedBrowser { path, version })
}

/// Find Chrome/Chromium executable on the system with platform-specific search paths.
pub async fn find_browser_executable(explicit: Option<&Path>) -> Result<PathBuf, BrowserError> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        warn!("Configured browser executable does not exist: {}", path.display());
    }

    // Environment variable overrides discovery
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!(
                "Using browser from CHROMIUM_PATH environment variable: {}",
                path.display()
            );
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH environment variable points to non-existent file: {}",
            path.display()
        );
    }

    let candidates = if cfg!(target_os = "windows") {
        vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"%LOCALAPPDATA%\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        vec![
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    for candidate in candidates {
        let path = if let Some(rest) = candidate.strip_prefix("~/") {
            match dirs::home_dir() {
                Some(home) => home.join(rest),
                None => continue,
            }
        } else if candidate.contains('%') {
            PathBuf::from(expand_windows_env_vars(candidate))
        } else {
            PathBuf::from(candidate)
        };

        if path.exists() {
            info!("Found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
            let Ok(output) = Command::new("which").arg(cmd).output().await else {
                continue;
            };
            if output.status.success() {
                let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !found.is_empty() {
                    info!("Found browser using 'which' command: {found}");
                    return Ok(PathBuf::from(found));
                }
            }
        }
    }

    Err(BrowserError::ExecutableNotFound(
        "install Chrome or Chromium (https://www.google.com/chrome/) or set CHROMIUM_PATH"
            .to_string(),
    ))
}

/// Ask the executable for its version string
async fn probe_version(path: &Path) -> Option<String> {
    let output = Command::new(path)
        .arg("--version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (output.status.success() && !version.is_empty()).then_some(version)
}

/// Expand `%VAR%` tokens; unknown variables and unterminated tokens are kept as-is.
fn expand_windows_env_vars(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            result.push(ch);
            continue;
        }

        let mut var_name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '%' {
                closed = true;
                break;
            }
            var_name.push(c);
        }

        match (closed, var_name.is_empty()) {
            (true, false) => match std::env::var(&var_name) {
                Ok(value) => result.push_str(&value),
                Err(_) => {
                    result.push('%');
                    result.push_str(&var_name);
                    result.push('%');
                }
            },
            (true, true) => result.push('%'),
            (false, _) => {
                result.push('%');
                result.push_str(&var_name);
            }
        }
    }

    result
}
