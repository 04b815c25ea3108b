//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub tabs: TabsConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote controller connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// WebSocket endpoint of the controller.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Opaque credential sent in the register frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Ping interval; 0 disables heartbeats.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            heartbeat_interval_secs: default_heartbeat_interval(),
            connect_timeout_secs: default_connect_timeout(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ConnectionConfig {
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_secs > 0).then(|| Duration::from_secs(self.heartbeat_interval_secs))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_endpoint() -> String {
    "ws://127.0.0.1:8765/ws".to_string()
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

/// How the delay between reconnect attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectStrategy {
    Fixed,
    Exponential,
}

/// Reconnect policy after an abnormal closure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_strategy")]
    pub strategy: ReconnectStrategy,

    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Attempts before giving up; 0 retries forever.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            max_attempts: default_max_attempts(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
        }
    }
}

fn default_strategy() -> ReconnectStrategy {
    ReconnectStrategy::Exponential
}

fn default_base_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

/// Tab behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabsConfig {
    #[serde(default = "default_home_url")]
    pub home_url: String,

    #[serde(default = "default_true")]
    pub open_home_on_start: bool,

    /// Whether `newTab` focuses the new tab when the command does not say.
    #[serde(default = "default_true")]
    pub default_focus: bool,
}

impl Default for TabsConfig {
    fn default() -> Self {
        Self {
            home_url: default_home_url(),
            open_home_on_start: true,
            default_focus: true,
        }
    }
}

fn default_home_url() -> String {
    "about:blank".to_string()
}

fn default_true() -> bool {
    true
}

/// Browser engine (Chromium over the DevTools protocol).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    #[serde(default)]
    pub headless: bool,

    /// Profile directory for persistent browser state.
    /// Default: ~/.tabpilot/browser-profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_dir: Option<PathBuf>,

    /// Launch a browser when none is listening on `debug_port`.
    #[serde(default = "default_true")]
    pub launch: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug_port: default_debug_port(),
            headless: false,
            profile_dir: None,
            launch: true,
        }
    }
}

impl EngineConfig {
    pub fn profile_dir(&self) -> PathBuf {
        self.profile_dir
            .clone()
            .unwrap_or_else(|| tabpilot_dir().join("browser-profile"))
    }
}

fn default_debug_port() -> u16 {
    9222
}

/// Logging output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` overrides it.
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| tabpilot_dir().join("logs"))
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// The `~/.tabpilot` directory.
pub fn tabpilot_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".tabpilot"))
        .unwrap_or_else(|| PathBuf::from(".tabpilot"))
}
