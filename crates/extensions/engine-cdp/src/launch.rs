//! Locating and launching a Chromium-based browser.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use tabpilot_config::EngineConfig;

use crate::error::CdpError;

/// Readiness polling after launch.
const READY_POLL: Duration = Duration::from_millis(200);
const READY_ATTEMPTS: u32 = 30;

/// Find an installed Chromium-based browser.
pub fn find_browser() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    let paths: &[&str] = &[
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    ];

    #[cfg(target_os = "linux")]
    let paths: &[&str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
    ];

    #[cfg(target_os = "windows")]
    let paths: &[&str] = &[
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    ];

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    let paths: &[&str] = &[];

    paths.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Whether a browser answers on the debugging endpoint.
pub(crate) async fn is_running(endpoint: &str) -> bool {
    reqwest::get(&format!("{}/json/version", endpoint))
        .await
        .is_ok()
}

/// Command line for a browser with remote debugging on `config.debug_port`.
pub(crate) fn browser_args(config: &EngineConfig) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", config.debug_port),
        format!("--user-data-dir={}", config.profile_dir().display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-sync".to_string(),
        "--disable-translate".to_string(),
        "--metrics-recording-only".to_string(),
    ];
    if config.headless {
        args.push("--headless=new".to_string());
    }
    args
}

/// Launch a browser and wait until its debugging endpoint answers.
pub(crate) async fn launch(config: &EngineConfig, endpoint: &str) -> Result<Child, CdpError> {
    let path = find_browser().ok_or(CdpError::BrowserNotFound)?;
    let profile_dir = config.profile_dir();
    if let Err(e) = std::fs::create_dir_all(&profile_dir) {
        warn!("Failed to create profile directory: {}", e);
    }

    info!("Launching {} with profile at {}", path.display(), profile_dir.display());
    let mut child = Command::new(&path)
        .args(browser_args(config))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CdpError::LaunchFailed(e.to_string()))?;
    info!("Browser launched with PID: {:?}", child.id());

    for _ in 0..READY_ATTEMPTS {
        tokio::time::sleep(READY_POLL).await;
        if is_running(endpoint).await {
            debug!("Browser ready on {}", endpoint);
            return Ok(child);
        }
    }

    if let Err(e) = child.kill().await {
        warn!("Failed to stop unresponsive browser: {}", e);
    }
    Err(CdpError::LaunchFailed(
        "Browser failed to start within timeout".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_args() {
        let config = EngineConfig {
            debug_port: 9333,
            headless: true,
            profile_dir: Some(PathBuf::from("/tmp/tabpilot-profile")),
            launch: true,
        };
        let args = browser_args(&config);
        assert_eq!(args[0], "--remote-debugging-port=9333");
        assert_eq!(args[1], "--user-data-dir=/tmp/tabpilot-profile");
        assert!(args.contains(&"--headless=new".to_string()));
    }

    #[test]
    fn test_headed_by_default() {
        let args = browser_args(&EngineConfig::default());
        assert!(args[0].ends_with("9222"));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
    }
}
