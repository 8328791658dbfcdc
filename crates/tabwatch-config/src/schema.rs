//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub peer: PeerConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub control: ControlConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Default config file location (`~/.tabwatch/config.toml`).
    pub fn default_path() -> PathBuf {
        home_dir().join("config.toml")
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tabwatch")
}

/// Companion app connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Base URL for `/event`, `/capture`, `/sync` and `/health`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Command channel endpoint.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Fixed delay before a command channel reconnect attempt.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Interval of the liveness check that self-heals the command channel.
    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,
}

impl PeerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: default_ws_url(),
            request_timeout_secs: default_request_timeout_secs(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            health_interval_secs: default_health_interval_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:21890".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:21890/ws".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_health_interval_secs() -> u64 {
    10
}

/// Activity accounting and capture tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Interval of the periodic active-time flush.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// Minimum continuous foreground time before a capture.
    #[serde(default = "default_dwell_threshold_ms")]
    pub dwell_threshold_ms: u64,

    /// Interval of the periodic full resync. 0 disables it.
    #[serde(default = "default_resync_interval_secs")]
    pub resync_interval_secs: u64,

    #[serde(default = "default_description_max_words")]
    pub description_max_words: usize,
}

impl TrackerConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn dwell_threshold(&self) -> Duration {
        Duration::from_millis(self.dwell_threshold_ms)
    }

    pub fn resync_interval(&self) -> Option<Duration> {
        (self.resync_interval_secs > 0).then(|| Duration::from_secs(self.resync_interval_secs))
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval_secs(),
            dwell_threshold_ms: default_dwell_threshold_ms(),
            resync_interval_secs: default_resync_interval_secs(),
            description_max_words: default_description_max_words(),
        }
    }
}

fn default_flush_interval_secs() -> u64 {
    10
}

fn default_dwell_threshold_ms() -> u64 {
    3000
}

fn default_resync_interval_secs() -> u64 {
    300
}

fn default_description_max_words() -> usize {
    8000
}

/// Durable state location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_state_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_state_path() -> String {
    "~/.tabwatch/state.json".to_string()
}

/// Browser host (CDP) connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_cdp_endpoint")]
    pub cdp_endpoint: String,

    /// Interval between target listings used to derive tab signals.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// JPEG quality for screenshots (1-100).
    #[serde(default = "default_screenshot_quality")]
    pub screenshot_quality: u8,
}

impl HostConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            cdp_endpoint: default_cdp_endpoint(),
            poll_interval_ms: default_poll_interval_ms(),
            screenshot_quality: default_screenshot_quality(),
        }
    }
}

fn default_cdp_endpoint() -> String {
    "http://localhost:9222".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_screenshot_quality() -> u8 {
    60
}

/// Local control API for the UI surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_control_host")]
    pub host: String,

    #[serde(default = "default_control_port")]
    pub port: u16,
}

impl ControlConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            host: default_control_host(),
            port: default_control_port(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_control_host() -> String {
    "127.0.0.1".to_string()
}

fn default_control_port() -> u16 {
    21891
}

/// Log output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files.
    #[serde(default = "default_log_dir")]
    pub dir: String,

    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_dir() -> String {
    "~/.tabwatch/logs".to_string()
}

fn default_max_log_files() -> usize {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_companion_app() {
        let config = Config::default();
        assert_eq!(config.peer.base_url, "http://localhost:21890");
        assert_eq!(config.peer.ws_url, "ws://localhost:21890/ws");
        assert_eq!(config.peer.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.peer.health_interval(), Duration::from_secs(10));
        assert_eq!(config.tracker.flush_interval(), Duration::from_secs(10));
        assert_eq!(config.tracker.dwell_threshold(), Duration::from_millis(3000));
        assert_eq!(config.tracker.description_max_words, 8000);
        assert_eq!(config.host.screenshot_quality, 60);
    }

    #[test]
    fn test_resync_interval_zero_disables() {
        let mut tracker = TrackerConfig::default();
        assert_eq!(tracker.resync_interval(), Some(Duration::from_secs(300)));
        tracker.resync_interval_secs = 0;
        assert_eq!(tracker.resync_interval(), None);
    }

    #[test]
    fn test_control_base_url() {
        let control = ControlConfig::default();
        assert_eq!(control.base_url(), "http://127.0.0.1:21891");
    }

    #[test]
    fn test_default_path_under_home() {
        let path = Config::default_path();
        assert!(path.ends_with(".tabwatch/config.toml"));
    }
}
