//! Target resolution.
//!
//! Turns raw input (direct, target-list file, or nmap export) into three
//! buckets: plain hosts, URLs/domains, and pre-built sockets. Resolution is
//! partial-success: failing items are collected and the rest carry on.
//! Duplicates are kept here and collapse later when the visit store groups
//! sockets by identity.

mod matrix;
mod nmap;
mod source;

use crate::types::{ClassifiedTarget, Socket, TargetError};
pub use matrix::build_sockets;
pub use nmap::{parse_file as parse_nmap_file, AdapterError};
pub use source::{parse_target_list, read_input, split_direct, TargetInput};

/// The accumulation buckets of one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTargets {
    /// IP literals as given, plus CIDR expansions.
    pub hosts: Vec<String>,
    /// URLs and domains, exactly as given.
    pub urls: Vec<String>,
    /// Explicit `host:port` pairs; these bypass port expansion.
    pub sockets: Vec<Socket>,
}

impl ResolvedTargets {
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.urls.is_empty() && self.sockets.is_empty()
    }
}

/// One raw item that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    pub input: String,
    pub error: TargetError,
}

/// Outcome of resolving a batch of raw targets.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub targets: ResolvedTargets,
    pub failures: Vec<TargetFailure>,
}

impl Resolution {
    /// True when every item classified.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Accumulates classified targets for one resolution.
///
/// Each resolver owns its buckets, so independent resolutions never share
/// state.
#[derive(Debug, Default)]
pub struct TargetResolver {
    targets: ResolvedTargets,
    failures: Vec<TargetFailure>,
}

impl TargetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a whole input batch in one call.
    pub fn resolve(input: &TargetInput) -> Resolution {
        let mut resolver = Self::new();
        resolver.add_input(input);
        resolver.finish()
    }

    /// Feed every item of an input batch.
    pub fn add_input(&mut self, input: &TargetInput) {
        match input {
            TargetInput::Direct(items) | TargetInput::TargetList(items) => {
                for item in items {
                    self.push(item);
                }
            }
            TargetInput::Export(sockets) => {
                for socket in sockets {
                    self.push_socket(socket);
                }
            }
        }
    }

    /// Classify one raw target and place it in its bucket.
    ///
    /// Returns `false` when the item failed; the failure is recorded.
    pub fn push(&mut self, raw: &str) -> bool {
        match ClassifiedTarget::classify(raw) {
            Ok(target) => {
                self.accept(target, raw.trim());
                true
            }
            Err(e) => {
                tracing::error!("Invalid target: {}", e);
                self.failures.push(TargetFailure {
                    input: raw.to_string(),
                    error: e,
                });
                false
            }
        }
    }

    /// Add an adapter-produced `host:port` string unchanged.
    pub fn push_socket(&mut self, raw: &str) -> bool {
        match raw.parse::<Socket>() {
            Ok(socket) => {
                tracing::debug!("Adding pre-built socket: {}", socket);
                self.targets.sockets.push(socket);
                true
            }
            Err(e) => {
                tracing::error!("Invalid socket from export: {}", e);
                self.failures.push(TargetFailure {
                    input: raw.to_string(),
                    error: e,
                });
                false
            }
        }
    }

    /// `text` is the trimmed input; IP literals keep its spelling.
    fn accept(&mut self, target: ClassifiedTarget, text: &str) {
        match target {
            ClassifiedTarget::IpAddress(_) => self.targets.hosts.push(text.to_string()),
            ClassifiedTarget::CidrBlock(network) => {
                let hosts = ClassifiedTarget::CidrBlock(network).hosts();
                tracing::debug!("Expanded {} into {} hosts", network, hosts.len());
                self.targets
                    .hosts
                    .extend(hosts.iter().map(ToString::to_string));
            }
            ClassifiedTarget::SocketAddress(_, port) => {
                let host = text.split_once(':').map_or(text, |(host, _)| host);
                self.targets.sockets.push(Socket::new(host, port));
            }
            ClassifiedTarget::Url(url) => self.targets.urls.push(url.as_str().to_string()),
            ClassifiedTarget::Domain(name) => self.targets.urls.push(name),
        }
    }

    /// Consume the resolver and hand back its buckets.
    pub fn finish(self) -> Resolution {
        tracing::info!(
            "Resolved {} hosts, {} URLs, {} sockets ({} failed)",
            self.targets.hosts.len(),
            self.targets.urls.len(),
            self.targets.sockets.len(),
            self.failures.len()
        );
        Resolution {
            targets: self.targets,
            failures: self.failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Port, PortSpec};

    fn direct(items: &[&str]) -> TargetInput {
        TargetInput::Direct(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_buckets() {
        let resolution = TargetResolver::resolve(&direct(&[
            "10.0.0.1",
            "192.168.0.0/30",
            "10.0.0.5:8080",
            "example.com",
            "https://a.com/login",
            "b.com:8443",
        ]));

        assert!(resolution.is_complete());
        let targets = resolution.targets;
        assert_eq!(targets.hosts.len(), 3);
        assert_eq!(targets.urls, vec!["example.com", "https://a.com/login", "b.com:8443"]);
        assert_eq!(
            targets.sockets,
            vec![Socket::new("10.0.0.5", Port::new(8080).unwrap())]
        );
    }

    #[test]
    fn test_partial_failure_continues() {
        let resolution = TargetResolver::resolve(&direct(&["10.0.0.1", "", "10.0.0.2:70000", "a.com"]));

        assert!(!resolution.is_complete());
        assert_eq!(resolution.failures.len(), 2);
        assert_eq!(resolution.failures[1].input, "10.0.0.2:70000");
        assert_eq!(resolution.targets.hosts.len(), 1);
        assert_eq!(resolution.targets.urls, vec!["a.com"]);
    }

    #[test]
    fn test_ip_text_is_kept_verbatim() {
        let resolution = TargetResolver::resolve(&direct(&[" 2001:DB8::1 ", "::1", "0:0:0:0:0:0:0:1"]));
        assert_eq!(resolution.targets.hosts, vec!["2001:DB8::1", "::1", "0:0:0:0:0:0:0:1"]);
    }

    #[test]
    fn test_no_dedup_at_resolution() {
        let resolution = TargetResolver::resolve(&direct(&["10.0.0.1", "10.0.0.1"]));
        assert_eq!(resolution.targets.hosts.len(), 2);
    }

    #[test]
    fn test_export_sockets_are_kept_unchanged() {
        let input = TargetInput::Export(vec![
            "intranet.local:80".to_string(),
            "10.0.0.6:9090".to_string(),
        ]);
        let resolution = TargetResolver::resolve(&input);

        assert!(resolution.targets.hosts.is_empty());
        assert_eq!(resolution.targets.sockets.len(), 2);
        assert_eq!(resolution.targets.sockets[0].host, "intranet.local");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let input = direct(&["10.0.0.0/29", "a.com/x", "10.0.0.9:81", "b.com"]);
        let ports = PortSpec::all_presets().to_ports();

        let first = build_sockets(&TargetResolver::resolve(&input).targets, &ports);
        let second = build_sockets(&TargetResolver::resolve(&input).targets, &ports);

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
