//! Application settings and paths.
//!
//! Settings live in `settings.json` under the XDG config directory; a
//! missing file means defaults. Command-line flags override every field.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/pagehawk)
    pub config_dir: PathBuf,
}

impl Paths {
    pub fn resolve() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "pagehawk", "pagehawk")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Upstream proxy for every navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ProxySettings {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// `http://ip:port`, without credentials.
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Concurrent visits.
    pub threads: usize,
    /// Per-navigation timeout in milliseconds.
    pub timeout_ms: u64,
    /// How long to wait for the page to go idle after it loaded.
    pub idle_timeout_ms: u64,
    /// Lower bound of the random delay before each visit.
    pub delay_from_ms: u64,
    /// Upper bound of the random delay; 0 disables pacing.
    pub delay_to_ms: u64,
    pub user_agent: String,
    /// Headless-capable Chromium binary used for screenshots.
    pub browser: Option<PathBuf>,
    pub proxy: Option<ProxySettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threads: 10,
            timeout_ms: 30_000,
            idle_timeout_ms: 5_000,
            delay_from_ms: 0,
            delay_to_ms: 0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            browser: None,
            proxy: None,
        }
    }
}

impl Settings {
    /// Load settings from the default location.
    pub fn load() -> ConfigResult<Self> {
        let file = Paths::resolve()?.settings_file();

        if !file.exists() {
            tracing::debug!("No settings file at {}, using defaults", file.display());
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Reject combinations that cannot run.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.threads == 0 {
            return Err(ConfigError::InvalidFormat(
                "threads must be at least 1".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidFormat(
                "timeout must be greater than 0".to_string(),
            ));
        }
        if self.delay_from_ms > self.delay_to_ms && self.delay_to_ms > 0 {
            return Err(ConfigError::InvalidFormat(format!(
                "delay range is inverted: {}ms > {}ms",
                self.delay_from_ms, self.delay_to_ms
            )));
        }
        if let Some(proxy) = &self.proxy {
            if proxy.username.is_some() != proxy.password.is_some() {
                return Err(ConfigError::InvalidProxy(
                    "username and password must be given together".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}
