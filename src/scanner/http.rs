//! HTTP renderer.
//!
//! Navigates with `reqwest`, accepting any certificate and following
//! redirects. When a Chromium-compatible browser is configured, a headless
//! screenshot of the same URL is taken after the navigation succeeded.

use super::traits::{NavigationError, NavigationErrorKind, RenderOutput, Renderer};
use crate::config::{ProxySettings, DEFAULT_USER_AGENT};
use crate::error::{ConfigError, ConfigResult};
use async_trait::async_trait;
use std::error::Error as StdError;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Viewport used for screenshots.
const WINDOW_SIZE: (u32, u32) = (1366, 768);

/// Maximum redirects followed per navigation.
const MAX_REDIRECTS: usize = 10;

/// Configuration for [`HttpRenderer`].
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub user_agent: String,
    /// Wait for the body to finish after headers arrived.
    pub idle_timeout: Duration,
    pub browser: Option<PathBuf>,
    pub proxy: Option<ProxySettings>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            idle_timeout: Duration::from_secs(5),
            browser: None,
            proxy: None,
        }
    }
}

impl RendererConfig {
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_browser(mut self, browser: Option<PathBuf>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<ProxySettings>) -> Self {
        self.proxy = proxy;
        self
    }
}

/// Renderer backed by an HTTP client and an optional headless browser.
pub struct HttpRenderer {
    client: reqwest::Client,
    config: RendererConfig,
}

impl HttpRenderer {
    pub fn new(config: RendererConfig) -> ConfigResult<Self> {
        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(config.user_agent.clone());

        builder = match &config.proxy {
            Some(settings) => {
                let mut proxy = reqwest::Proxy::all(settings.server_url())
                    .map_err(|e| ConfigError::InvalidProxy(e.to_string()))?;
                if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
                    proxy = proxy.basic_auth(user, pass);
                }
                tracing::info!("Using proxy {}", settings.server_url());
                builder.proxy(proxy)
            }
            // Only an explicitly configured proxy is used.
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Read the rest of the body, giving up quietly after the idle timeout.
    async fn wait_for_idle(&self, mut response: reqwest::Response) {
        let drained = timeout(self.config.idle_timeout, async {
            while let Ok(Some(_)) = response.chunk().await {}
        })
        .await;

        if drained.is_err() {
            tracing::debug!("Network didn't become idle, but page loaded");
        }
    }

    /// Capture a screenshot with the configured browser. Any failure yields `None`.
    async fn capture(&self, browser: &Path, url: &str, limit: Duration) -> Option<Vec<u8>> {
        let file = std::env::temp_dir().join(format!("pagehawk-{:016x}.png", rand::random::<u64>()));

        let mut cmd = Command::new(browser);
        cmd.arg("--headless")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg("--ignore-certificate-errors")
            .arg(format!("--window-size={},{}", WINDOW_SIZE.0, WINDOW_SIZE.1))
            .arg(format!("--user-agent={}", self.config.user_agent))
            .arg(format!("--screenshot={}", file.display()));
        if let Some(proxy) = &self.config.proxy {
            cmd.arg(format!("--proxy-server={}", proxy.server_url()));
        }
        cmd.arg(url)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match timeout(limit, cmd.status()).await {
            Ok(Ok(status)) if status.success() => {}
            Ok(Ok(status)) => {
                tracing::debug!("Browser exited with {} for {}", status, url);
                return None;
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to run browser {}: {}", browser.display(), e);
                return None;
            }
            Err(_) => {
                tracing::debug!("Screenshot of {} timed out", url);
                return None;
            }
        }

        let bytes = tokio::fs::read(&file).await.ok();
        let _ = tokio::fs::remove_file(&file).await;
        bytes
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    fn user_agent(&self) -> &str {
        &self.config.user_agent
    }

    async fn visit(&self, url: &str, limit: Duration) -> Result<RenderOutput, NavigationError> {
        let response = match timeout(limit, self.client.get(url).send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(navigation_error(&e)),
            Err(_) => {
                return Err(NavigationError::new(
                    NavigationErrorKind::Timeout,
                    format!("navigation timeout of {}ms exceeded", limit.as_millis()),
                ))
            }
        };

        let status = response.status().as_u16();
        self.wait_for_idle(response).await;

        let screenshot = match &self.config.browser {
            Some(browser) => self.capture(browser, url, limit).await,
            None => None,
        };

        Ok(RenderOutput {
            status: Some(status),
            screenshot,
        })
    }
}

/// Map a client error onto a navigation error kind.
fn navigation_error(err: &reqwest::Error) -> NavigationError {
    let kind = if err.is_timeout() {
        NavigationErrorKind::Timeout
    } else {
        io_error_kind(err).unwrap_or(NavigationErrorKind::Other)
    };
    NavigationError::new(kind, error_chain(err))
}

fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<NavigationErrorKind> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => return Some(NavigationErrorKind::Refused),
                io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                    return Some(NavigationErrorKind::Reset)
                }
                io::ErrorKind::TimedOut => return Some(NavigationErrorKind::Timeout),
                _ => {}
            }
        }
        source = cause.source();
    }
    None
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
