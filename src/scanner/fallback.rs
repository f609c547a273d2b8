//! Protocol selection and HTTPS fallback.
//!
//! Port 80 is visited over HTTP and port 443 over HTTPS, each exactly once.
//! Every other port is tried over HTTP first and, on a navigation failure,
//! once more over HTTPS. The last attempt decides the recorded outcome.

use super::traits::{NavigationError, NavigationErrorKind, RenderOutput, Renderer};
use crate::storage::ResponseClass;
use crate::types::{HostIdentity, Port};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// URL scheme of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which schemes to try for a port, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub primary: Scheme,
    pub secondary: Option<Scheme>,
}

impl FallbackPolicy {
    pub fn for_port(port: Port) -> Self {
        match port {
            Port::HTTP => Self {
                primary: Scheme::Http,
                secondary: None,
            },
            Port::HTTPS => Self {
                primary: Scheme::Https,
                secondary: None,
            },
            _ => Self {
                primary: Scheme::Http,
                secondary: Some(Scheme::Https),
            },
        }
    }
}

/// Where a visit currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackState {
    Start,
    AttemptPrimary,
    AttemptSecondary,
    /// A navigation returned; no further attempts.
    Success,
    /// Every applicable attempt failed.
    Terminal,
}

/// Result of driving the fallback policy for one socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitOutcome {
    pub response: ResponseClass,
    /// Scheme of the attempt that produced `response`.
    pub scheme: Scheme,
    pub screenshot: Option<Vec<u8>>,
    /// `Success` or `Terminal`.
    pub state: FallbackState,
    pub attempts: u8,
}

/// Classify a failed attempt.
///
/// Unclassified failures read as `error` when no fallback was made and as
/// `unreachable` once the secondary attempt also failed.
pub fn classify_failure(kind: NavigationErrorKind, after_fallback: bool) -> ResponseClass {
    match kind {
        NavigationErrorKind::Timeout => ResponseClass::Timeout,
        NavigationErrorKind::Refused => ResponseClass::Refused,
        NavigationErrorKind::Reset => ResponseClass::Reset,
        NavigationErrorKind::Other if after_fallback => ResponseClass::Unreachable,
        NavigationErrorKind::Other => ResponseClass::Error,
    }
}

/// Any received status counts as success, whatever its value.
fn classify_success(output: &RenderOutput) -> ResponseClass {
    output
        .status
        .map_or(ResponseClass::NoResponse, ResponseClass::Status)
}

/// Build the URL navigated for an identity, port and scheme.
///
/// A scheme given with a name identity is dropped; the policy picks it.
/// The port is left out for 80 and 443, and when the authority already
/// names one.
pub fn visit_url(identity: &HostIdentity, port: Port, scheme: Scheme) -> String {
    let implicit_port = port == Port::HTTP || port == Port::HTTPS;

    match identity {
        HostIdentity::Ip(ip) => {
            let host = match ip.parse::<IpAddr>() {
                Ok(IpAddr::V6(_)) => format!("[{}]", ip),
                _ => ip.clone(),
            };
            if implicit_port {
                format!("{}://{}", scheme, host)
            } else {
                format!("{}://{}:{}", scheme, host, port)
            }
        }
        HostIdentity::Name(name) => {
            let bare = name
                .strip_prefix("http://")
                .or_else(|| name.strip_prefix("https://"))
                .unwrap_or(name);
            let (authority, path) = match bare.split_once('/') {
                Some((authority, path)) => (authority, Some(path)),
                None => (bare, None),
            };

            let mut url = format!("{}://{}", scheme, authority);
            if !implicit_port && !has_explicit_port(authority) {
                url.push(':');
                url.push_str(&port.to_string());
            }
            if let Some(path) = path {
                url.push('/');
                url.push_str(path);
            }
            url
        }
    }
}

fn has_explicit_port(authority: &str) -> bool {
    authority
        .rsplit_once(':')
        .map_or(false, |(_, p)| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

/// Drive the policy for one socket against a renderer.
pub async fn visit_with_fallback<R: Renderer + ?Sized>(
    renderer: &R,
    identity: &HostIdentity,
    port: Port,
    timeout: Duration,
) -> VisitOutcome {
    let policy = FallbackPolicy::for_port(port);
    let mut state = FallbackState::Start;
    let mut attempts = 0u8;
    let mut scheme = policy.primary;
    let mut response = ResponseClass::Pending;
    let mut screenshot = None;

    loop {
        state = match state {
            FallbackState::Start => FallbackState::AttemptPrimary,
            FallbackState::AttemptPrimary | FallbackState::AttemptSecondary => {
                let is_secondary = state == FallbackState::AttemptSecondary;
                if is_secondary {
                    scheme = policy.secondary.unwrap_or(policy.primary);
                }
                let url = visit_url(identity, port, scheme);
                tracing::debug!("Trying {}", url);
                attempts += 1;

                match renderer.visit(&url, timeout).await {
                    Ok(output) => {
                        response = classify_success(&output);
                        screenshot = output.screenshot;
                        tracing::debug!("{} response: {}", scheme.as_str().to_uppercase(), response);
                        FallbackState::Success
                    }
                    Err(NavigationError { kind, message }) => {
                        response = classify_failure(kind, is_secondary);
                        if !is_secondary && policy.secondary.is_some() {
                            tracing::debug!("HTTP failed ({}), trying HTTPS", response);
                            FallbackState::AttemptSecondary
                        } else {
                            tracing::debug!("Failed to connect to {} - {}", url, response);
                            tracing::debug!("Error details: {}", truncate(&message, 200));
                            FallbackState::Terminal
                        }
                    }
                }
            }
            FallbackState::Success | FallbackState::Terminal => {
                return VisitOutcome {
                    response,
                    scheme,
                    screenshot,
                    state,
                    attempts,
                };
            }
        };
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers navigations from a script and remembers the URLs it saw.
    struct Scripted {
        replies: Mutex<VecDeque<Result<RenderOutput, NavigationError>>>,
        seen: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<RenderOutput, NavigationError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Renderer for Scripted {
        fn user_agent(&self) -> &str {
            "scripted"
        }

        async fn visit(&self, url: &str, _timeout: Duration) -> Result<RenderOutput, NavigationError> {
            self.seen.lock().unwrap().push(url.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(NavigationError::new(NavigationErrorKind::Other, "script exhausted")))
        }
    }

    fn fail(kind: NavigationErrorKind) -> Result<RenderOutput, NavigationError> {
        Err(NavigationError::new(kind, "net::ERR"))
    }

    fn port(p: u16) -> Port {
        Port::new(p).unwrap()
    }

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[test]
    fn test_policy_per_port() {
        assert_eq!(FallbackPolicy::for_port(Port::HTTP).secondary, None);
        assert_eq!(FallbackPolicy::for_port(Port::HTTPS).primary, Scheme::Https);
        assert_eq!(
            FallbackPolicy::for_port(port(8080)),
            FallbackPolicy {
                primary: Scheme::Http,
                secondary: Some(Scheme::Https)
            }
        );
    }

    #[test]
    fn test_visit_urls() {
        let ip = HostIdentity::from_host("10.0.0.1");
        assert_eq!(visit_url(&ip, Port::HTTP, Scheme::Http), "http://10.0.0.1");
        assert_eq!(visit_url(&ip, port(8443), Scheme::Https), "https://10.0.0.1:8443");

        let v6 = HostIdentity::from_host("2001:db8::1");
        assert_eq!(visit_url(&v6, port(8080), Scheme::Http), "http://[2001:db8::1]:8080");

        let path = HostIdentity::from_host("a.com/admin/login");
        assert_eq!(
            visit_url(&path, port(8080), Scheme::Https),
            "https://a.com:8080/admin/login"
        );

        let with_scheme = HostIdentity::from_host("https://a.com/x");
        assert_eq!(visit_url(&with_scheme, Port::HTTP, Scheme::Http), "http://a.com/x");

        let with_port = HostIdentity::from_host("a.com:9000");
        assert_eq!(visit_url(&with_port, port(8080), Scheme::Http), "http://a.com:9000");
    }

    #[test]
    fn test_failure_classification() {
        assert_eq!(classify_failure(NavigationErrorKind::Timeout, true), ResponseClass::Timeout);
        assert_eq!(classify_failure(NavigationErrorKind::Reset, false), ResponseClass::Reset);
        assert_eq!(classify_failure(NavigationErrorKind::Other, false), ResponseClass::Error);
        assert_eq!(classify_failure(NavigationErrorKind::Other, true), ResponseClass::Unreachable);
    }

    #[tokio::test]
    async fn test_port_80_never_falls_back() {
        let renderer = Scripted::new(vec![fail(NavigationErrorKind::Refused)]);
        let outcome =
            visit_with_fallback(&renderer, &HostIdentity::from_host("10.0.0.1"), Port::HTTP, TIMEOUT).await;

        assert_eq!(outcome.response, ResponseClass::Refused);
        assert_eq!(outcome.state, FallbackState::Terminal);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(renderer.seen(), vec!["http://10.0.0.1"]);
    }

    #[tokio::test]
    async fn test_port_443_generic_failure_is_error() {
        let renderer = Scripted::new(vec![fail(NavigationErrorKind::Other)]);
        let outcome =
            visit_with_fallback(&renderer, &HostIdentity::from_host("a.com"), Port::HTTPS, TIMEOUT).await;

        assert_eq!(outcome.response, ResponseClass::Error);
        assert_eq!(renderer.seen(), vec!["https://a.com"]);
    }

    #[tokio::test]
    async fn test_secondary_success_wins() {
        let renderer = Scripted::new(vec![
            fail(NavigationErrorKind::Reset),
            Ok(RenderOutput::with_status(200).with_screenshot(b"png".to_vec())),
        ]);
        let outcome =
            visit_with_fallback(&renderer, &HostIdentity::from_host("10.0.0.1"), port(8080), TIMEOUT).await;

        assert_eq!(outcome.response, ResponseClass::Status(200));
        assert_eq!(outcome.scheme, Scheme::Https);
        assert_eq!(outcome.screenshot.as_deref(), Some(&b"png"[..]));
        assert_eq!(
            renderer.seen(),
            vec!["http://10.0.0.1:8080", "https://10.0.0.1:8080"]
        );
    }

    #[tokio::test]
    async fn test_secondary_failure_replaces_primary() {
        let renderer = Scripted::new(vec![
            fail(NavigationErrorKind::Timeout),
            fail(NavigationErrorKind::Other),
        ]);
        let outcome =
            visit_with_fallback(&renderer, &HostIdentity::from_host("a.com"), port(8000), TIMEOUT).await;

        assert_eq!(outcome.response, ResponseClass::Unreachable);
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_error_status_is_success() {
        let renderer = Scripted::new(vec![Ok(RenderOutput::with_status(503))]);
        let outcome =
            visit_with_fallback(&renderer, &HostIdentity::from_host("a.com"), port(8080), TIMEOUT).await;

        assert_eq!(outcome.response, ResponseClass::Status(503));
        assert_eq!(outcome.state, FallbackState::Success);
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_missing_response_object() {
        let renderer = Scripted::new(vec![Ok(RenderOutput::default())]);
        let outcome =
            visit_with_fallback(&renderer, &HostIdentity::from_host("a.com"), Port::HTTP, TIMEOUT).await;

        assert_eq!(outcome.response, ResponseClass::NoResponse);
    }
}
