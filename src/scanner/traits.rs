//! Renderer trait abstraction.
//!
//! A renderer performs one page visit and optionally captures a screenshot.
//! The orchestrator only talks to this trait, so visits can be scripted in
//! tests without any network.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Category of a failed navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationErrorKind {
    /// The navigation timeout expired.
    Timeout,
    /// The connection was actively refused.
    Refused,
    /// The connection was reset or aborted by the peer.
    Reset,
    /// Anything else (DNS, TLS, protocol errors).
    Other,
}

impl fmt::Display for NavigationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Refused => write!(f, "refused"),
            Self::Reset => write!(f, "reset"),
            Self::Other => write!(f, "error"),
        }
    }
}

/// A navigation that did not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("navigation failed ({kind}): {message}")]
pub struct NavigationError {
    pub kind: NavigationErrorKind,
    pub message: String,
}

impl NavigationError {
    pub fn new(kind: NavigationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// What a successful navigation returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    /// HTTP status of the main document, if a response object was produced.
    pub status: Option<u16>,
    /// PNG bytes of a viewport capture; may be absent even on success.
    pub screenshot: Option<Vec<u8>>,
}

impl RenderOutput {
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            screenshot: None,
        }
    }

    pub fn with_screenshot(mut self, bytes: Vec<u8>) -> Self {
        self.screenshot = Some(bytes);
        self
    }
}

/// Trait for page renderer implementations.
///
/// # Example
///
/// ```ignore
/// use pagehawk::scanner::{Renderer, RenderOutput};
///
/// async fn status_of<R: Renderer>(renderer: &R, url: &str) -> Option<u16> {
///     renderer.visit(url, Duration::from_secs(30)).await.ok()?.status
/// }
/// ```
#[async_trait]
pub trait Renderer: Send + Sync {
    /// User agent sent with every navigation.
    fn user_agent(&self) -> &str;

    /// Navigate to `url`, bounded by `timeout`.
    async fn visit(&self, url: &str, timeout: Duration) -> Result<RenderOutput, NavigationError>;
}

/// A shared renderer for dynamic dispatch across tasks.
pub type SharedRenderer = Arc<dyn Renderer>;
