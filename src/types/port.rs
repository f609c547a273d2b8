//! Port types with validation and preset catalogs.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortSpec` turns a comma-separated mix of preset names and explicit
//! numbers into the ordered, deduplicated sequence every target is visited on.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Plain HTTP.
    pub const HTTP: Port = Port(80);
    /// HTTP over TLS.
    pub const HTTPS: Port = Port(443);

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(value.to_string()))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

impl FromStr for Port {
    type Err = PortError;

    /// Parse a decimal port number, rejecting anything outside 1-65535.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Parse wide so "99999" reports out-of-range rather than a format error.
        let value: u64 = s
            .parse()
            .map_err(|_| PortError::InvalidFormat(s.to_string()))?;

        u16::try_from(value)
            .ok()
            .and_then(Port::new)
            .ok_or_else(|| PortError::OutOfRange(s.to_string()))
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port out of range (1-65535): {0}")]
    OutOfRange(String),
    #[error("could not parse port number: {0}")]
    InvalidFormat(String),
}

/// Web-oriented ports most likely to serve something.
pub const DEFAULT_PORTS_1: [u16; 5] = [80, 443, 8000, 8080, 8443];

/// Alternate HTTP ports, dashboards and admin consoles.
pub const DEFAULT_PORTS_2: [u16; 22] = [
    81,   // alternate HTTP
    82,   // alternate HTTP
    591,  // FileMaker
    631,  // CUPS
    3000, // Node.js dev servers
    3001, // Node.js alternate dev
    3128, // proxy
    7000, // custom web apps
    7001, // WebLogic admin
    8081, // alternate HTTP / dashboards
    8082, // secondary web service
    8085, // Jenkins / CI
    8090, // Atlassian
    8181, // admin panels
    8686, // JBoss / WildFly management
    8880, // alternate admin UI
    8888, // dev / proxy
    9000, // SonarQube
    9001, // Supervisor
    9090, // Prometheus
    9443, // alternate admin HTTPS
    4443, // alternate HTTPS
];

/// Application servers, search engines and management UIs.
pub const DEFAULT_PORTS_3: [u16; 16] = [
    5000,  // Flask dev server
    5001,  // Flask / API alternate
    5600,  // dashboards
    5601,  // Kibana
    5672,  // RabbitMQ AMQP
    7180,  // Cloudera Manager
    8008,  // alternate HTTP / proxy
    8083,  // Kafka Manager
    8091,  // Atlassian alternate admin
    9091,  // Transmission
    9200,  // Elasticsearch
    9999,  // admin / debug
    10000, // Webmin
    10443, // alternate admin HTTPS
    15672, // RabbitMQ management
    20000, // Usermin
];

/// A named, fixed port catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortPreset {
    /// `default` / `default1`
    Default1,
    /// `default2`
    Default2,
    /// `default3`
    Default3,
    /// `default_all`: the three catalogs concatenated.
    DefaultAll,
}

impl PortPreset {
    /// Look up a preset by its (case-insensitive) name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "default" | "default1" => Some(Self::Default1),
            "default2" => Some(Self::Default2),
            "default3" => Some(Self::Default3),
            "default_all" => Some(Self::DefaultAll),
            _ => None,
        }
    }

    /// The ports of this catalog, in catalog order.
    pub fn ports(self) -> Vec<Port> {
        let raw: Vec<u16> = match self {
            Self::Default1 => DEFAULT_PORTS_1.to_vec(),
            Self::Default2 => DEFAULT_PORTS_2.to_vec(),
            Self::Default3 => DEFAULT_PORTS_3.to_vec(),
            Self::DefaultAll => DEFAULT_PORTS_1
                .iter()
                .chain(DEFAULT_PORTS_2.iter())
                .chain(DEFAULT_PORTS_3.iter())
                .copied()
                .collect(),
        };
        raw.into_iter().filter_map(Port::new).collect()
    }
}

impl fmt::Display for PortPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default1 => write!(f, "default1"),
            Self::Default2 => write!(f, "default2"),
            Self::Default3 => write!(f, "default3"),
            Self::DefaultAll => write!(f, "default_all"),
        }
    }
}

/// One item of a port specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortItem {
    Preset(PortPreset),
    Explicit(Port),
}

impl FromStr for PortItem {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match PortPreset::from_name(s) {
            Some(preset) => Ok(Self::Preset(preset)),
            None => s.parse().map(Self::Explicit),
        }
    }
}

/// A complete port specification.
///
/// Supports formats like:
/// - Preset: "default", "default2", "default_all"
/// - Explicit: "80,443,8080"
/// - Mixed: "default,9443"
///
/// Parsing is all-or-nothing: one invalid entry rejects the whole spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    items: Vec<PortItem>,
}

impl PortSpec {
    /// The spec used when none is given: every catalog.
    pub fn all_presets() -> Self {
        Self {
            items: vec![PortItem::Preset(PortPreset::DefaultAll)],
        }
    }

    /// Parse an optional spec string; `None` or blank means every catalog.
    pub fn parse_optional(spec: Option<&str>) -> Result<Self, PortError> {
        match spec.map(str::trim) {
            None | Some("") => {
                tracing::info!("No ports specified, using default_all");
                Ok(Self::all_presets())
            }
            Some(s) => s.parse(),
        }
    }

    /// The ordered port sequence with duplicates removed, first occurrence wins.
    pub fn to_ports(&self) -> Vec<Port> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .flat_map(|item| match item {
                PortItem::Preset(preset) => preset.ports(),
                PortItem::Explicit(port) => vec![*port],
            })
            .filter(|port| seen.insert(*port))
            .collect()
    }

    /// Number of unique ports.
    pub fn count(&self) -> usize {
        self.to_ports().len()
    }
}

impl Default for PortSpec {
    fn default() -> Self {
        Self::all_presets()
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut items = Vec::new();
        let mut first_error = None;

        for part in s.split(',') {
            match part.parse::<PortItem>() {
                Ok(item) => {
                    tracing::debug!(item = part.trim(), "accepted port entry");
                    items.push(item);
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(Self { items }),
        }
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .items
            .iter()
            .map(|item| match item {
                PortItem::Preset(preset) => preset.to_string(),
                PortItem::Explicit(port) => port.to_string(),
            })
            .collect();
        write!(f, "{}", parts.join(","))
    }
}
