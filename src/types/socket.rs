//! Sockets and host identities.
//!
//! In PageHawk a "socket" is a `host:port` pair where the host is an IP
//! literal, a domain, or a scheme-less URL, not a network handle.

use super::port::Port;
use super::target::TargetError;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// The grouping key of the visit state: an IP literal or a URL/domain string.
///
/// Both variants keep the host text exactly as given and compare by exact
/// string: `::1` and `0:0:0:0:0:0:0:1` are two identities. No case folding,
/// no DNS.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostIdentity {
    /// A host that parses as an IP literal.
    Ip(String),
    Name(String),
}

impl HostIdentity {
    /// Decide whether a host string is an IP literal or a name.
    pub fn from_host(host: &str) -> Self {
        if host.parse::<IpAddr>().is_ok() {
            Self::Ip(host.to_string())
        } else {
            Self::Name(host.to_string())
        }
    }

    /// Whether this identity is an IP literal.
    pub fn is_ip(&self) -> bool {
        matches!(self, Self::Ip(_))
    }

    /// The host text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ip(host) | Self::Name(host) => host,
        }
    }
}

impl fmt::Display for HostIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scan task: a host string and the port to visit it on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Socket {
    pub host: String,
    pub port: Port,
}

impl Socket {
    pub fn new(host: impl Into<String>, port: Port) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The identity this socket is grouped under.
    pub fn identity(&self) -> HostIdentity {
        HostIdentity::from_host(&self.host)
    }
}

impl FromStr for Socket {
    type Err = TargetError;

    /// Split on the last colon: everything before it is the host.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| TargetError::InvalidSocket(s.to_string()))?;
        if host.is_empty() {
            return Err(TargetError::InvalidSocket(s.to_string()));
        }
        let port = port
            .parse::<Port>()
            .map_err(|_| TargetError::InvalidSocket(s.to_string()))?;

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_last_colon() {
        let socket: Socket = "example.com:8080:443".parse().unwrap();
        assert_eq!(socket.host, "example.com:8080");
        assert_eq!(socket.port.as_u16(), 443);
        assert_eq!(
            socket.identity(),
            HostIdentity::Name("example.com:8080".to_string())
        );
    }

    #[test]
    fn test_ipv6_socket_identity() {
        let socket: Socket = "::1:8080".parse().unwrap();
        assert_eq!(socket.host, "::1");
        assert!(socket.identity().is_ip());
    }

    #[test]
    fn test_ip_spelling_is_preserved() {
        let short = HostIdentity::from_host("::1");
        let long = HostIdentity::from_host("0:0:0:0:0:0:0:1");
        assert!(short.is_ip() && long.is_ip());
        assert_ne!(short, long);
        assert_eq!(
            HostIdentity::from_host("2001:DB8::1").to_string(),
            "2001:DB8::1"
        );
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert_ne!(
            HostIdentity::from_host("Example.com"),
            HostIdentity::from_host("example.com")
        );
    }

    #[test]
    fn test_invalid_sockets() {
        assert!("example.com".parse::<Socket>().is_err());
        assert!(":80".parse::<Socket>().is_err());
        assert!("host:0".parse::<Socket>().is_err());
    }
}
