//! Target classification.
//!
//! Turns one raw target string into a [`ClassifiedTarget`]. Supported forms:
//! - URLs with an explicit scheme ("https://example.com/login")
//! - IP:port sockets ("10.0.0.5:8080")
//! - CIDR notation ("192.168.1.0/24", "2001:db8::/126")
//! - Single IP addresses (IPv4 and IPv6)
//! - Domains and scheme-less URLs ("example.com", "example.com/admin")
//!
//! The order of the checks in [`ClassifiedTarget::classify`] decides how
//! ambiguous strings are read and must not be rearranged.

use super::port::Port;
use ipnetwork::IpNetwork;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Error type for target classification and input reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("could not parse target: {0:?}")]
    Empty(String),
    #[error("port out of range in socket: {0}")]
    SocketPortOutOfRange(String),
    #[error("CIDR range too large: {0} addresses (max: {1})")]
    CidrTooLarge(u128, u128),
    #[error("invalid socket {0:?}: expected host:port")]
    InvalidSocket(String),
    #[error("failed to read target file {path}: {reason}")]
    FileRead { path: String, reason: String },
}

/// A URL split into its parts. The scheme is absent for scheme-less input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTarget {
    pub scheme: Option<String>,
    pub authority: String,
    pub path: Option<String>,
    raw: String,
}

impl UrlTarget {
    fn parse(raw: &str) -> Self {
        let (scheme, rest) = match raw.split_once("://") {
            Some((scheme, rest)) => (Some(scheme.to_string()), rest),
            None => (None, raw),
        };
        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority.to_string(), Some(path.to_string())),
            None => (rest.to_string(), None),
        };

        Self {
            scheme,
            authority,
            path,
            raw: raw.to_string(),
        }
    }

    /// The string exactly as it was given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// One classified target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedTarget {
    /// A single IP address.
    IpAddress(IpAddr),
    /// A CIDR network range.
    CidrBlock(IpNetwork),
    /// An explicit IP:port pair; bypasses port expansion.
    SocketAddress(IpAddr, Port),
    /// A URL, with or without scheme, carrying a path or an explicit scheme.
    Url(UrlTarget),
    /// A bare hostname (possibly with an unvalidated `:port` suffix).
    Domain(String),
}

impl ClassifiedTarget {
    /// Maximum number of addresses a single CIDR block may expand to: an
    /// IPv4 /8, or an IPv6 /104.
    pub const MAX_CIDR_HOSTS: u128 = 1 << 24;

    /// Classify a raw target string.
    ///
    /// Precedence:
    /// 1. `http://` / `https://` prefix: URL.
    /// 2. Contains `:` but no `/` and splits into exactly two parts: tried as
    ///    IP:port. A valid IP with an out-of-range port is an error; any other
    ///    failure falls through to domain handling.
    /// 3. Contains `/`: CIDR when the pre-slash segment is an IP literal and the
    ///    whole string is a valid network, otherwise a URL with a path.
    /// 4. A plain IP address.
    /// 5. Anything else that is non-empty: domain.
    pub fn classify(raw: &str) -> Result<Self, TargetError> {
        let target = raw.trim();

        if target.starts_with("http://") || target.starts_with("https://") {
            tracing::debug!("Found URL: {}", target);
            return Ok(Self::Url(UrlTarget::parse(target)));
        }

        if target.contains(':') && !target.contains('/') {
            let parts: Vec<&str> = target.split(':').collect();
            if let [host, port] = parts[..] {
                if let Some(socket) = classify_socket(target, host, port)? {
                    return Ok(socket);
                }
                tracing::debug!("Found domain:port or URL without protocol: {}", target);
                return Ok(Self::Domain(target.to_string()));
            }
        }

        if let Some((base, _)) = target.split_once('/') {
            if base.parse::<IpAddr>().is_ok() {
                if let Ok(network) = target.parse::<IpNetwork>() {
                    tracing::debug!("Found CIDR notation: {}", target);
                    let count = address_count(&network);
                    if count > Self::MAX_CIDR_HOSTS {
                        return Err(TargetError::CidrTooLarge(count, Self::MAX_CIDR_HOSTS));
                    }
                    return Ok(Self::CidrBlock(network));
                }
            }
            tracing::debug!("Found URL with path: {}", target);
            return Ok(Self::Url(UrlTarget::parse(target)));
        }

        if let Ok(ip) = target.parse::<IpAddr>() {
            tracing::debug!("Found IP address: {}", target);
            return Ok(Self::IpAddress(ip));
        }

        if target.is_empty() {
            return Err(TargetError::Empty(raw.to_string()));
        }

        tracing::debug!("Found domain name or URL: {}", target);
        Ok(Self::Domain(target.to_string()))
    }

    /// Expand this target into the host addresses it covers.
    ///
    /// CIDR blocks with more than two addresses yield their usable hosts in
    /// numeric order; degenerate blocks (/31, /32, /127, /128) yield the
    /// network address alone. Non-IP targets yield nothing.
    pub fn hosts(&self) -> Vec<IpAddr> {
        match self {
            Self::IpAddress(ip) => vec![*ip],
            Self::CidrBlock(network) => expand_cidr(network),
            _ => Vec::new(),
        }
    }
}

/// Try `host:port` as an IP socket. `Ok(None)` means "not an IP socket".
fn classify_socket(
    target: &str,
    host: &str,
    port: &str,
) -> Result<Option<ClassifiedTarget>, TargetError> {
    let Ok(ip) = host.parse::<IpAddr>() else {
        return Ok(None);
    };
    // A non-numeric port is not a socket at all; a numeric one must be in range.
    let digits = port.strip_prefix(['+', '-']).unwrap_or(port);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }

    match port.parse::<u16>().ok().and_then(Port::new) {
        Some(port) => {
            tracing::debug!("Found IP:port socket: {}", target);
            Ok(Some(ClassifiedTarget::SocketAddress(ip, port)))
        }
        None => Err(TargetError::SocketPortOutOfRange(target.to_string())),
    }
}

fn address_count(network: &IpNetwork) -> u128 {
    let (bits, prefix) = match network {
        IpNetwork::V4(net) => (32u32, u32::from(net.prefix())),
        IpNetwork::V6(net) => (128u32, u32::from(net.prefix())),
    };
    1u128
        .checked_shl(bits.saturating_sub(prefix))
        .unwrap_or(u128::MAX)
}

fn expand_cidr(network: &IpNetwork) -> Vec<IpAddr> {
    let base = network.network();
    if address_count(network) <= 2 {
        return vec![base];
    }

    match network {
        // IPv4 drops the network and broadcast addresses.
        IpNetwork::V4(net) => {
            let broadcast = net.broadcast();
            net.iter()
                .filter(|addr| *addr != net.network() && *addr != broadcast)
                .map(IpAddr::V4)
                .collect()
        }
        // IPv6 has no broadcast; only the subnet-router anycast address is dropped.
        IpNetwork::V6(net) => net
            .iter()
            .filter(|addr| *addr != net.network())
            .map(IpAddr::V6)
            .collect(),
    }
}

impl FromStr for ClassifiedTarget {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::classify(s)
    }
}

impl fmt::Display for ClassifiedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IpAddress(ip) => write!(f, "{}", ip),
            Self::CidrBlock(network) => write!(f, "{}", network),
            Self::SocketAddress(ip, port) => write!(f, "{}:{}", ip, port),
            Self::Url(url) => write!(f, "{}", url.as_str()),
            Self::Domain(name) => write!(f, "{}", name),
        }
    }
}
