//! nmap XML export adapter.
//!
//! Extracts `target:port` sockets for open, HTTP-like services from an nmap
//! `-oX` report. A user-supplied hostname is preferred over the address.

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Service names containing any of these are treated as web services.
const HTTP_KEYWORDS: [&str; 4] = ["http", "https", "web", "www"];

/// Error type for structured-export parsing.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The file is not an export of this kind; callers should try another reader.
    #[error("not an nmap XML file: {0}")]
    NotThisFormat(String),
    /// The file claims to be an export but could not be parsed.
    #[error("malformed nmap XML: {0}")]
    Malformed(String),
    #[error("failed to read export: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct NmapRun {
    #[serde(rename = "host", default)]
    hosts: Vec<Host>,
}

#[derive(Debug, Deserialize)]
struct Host {
    #[serde(rename = "address", default)]
    addresses: Vec<Address>,
    hostnames: Option<Hostnames>,
    ports: Option<Ports>,
}

#[derive(Debug, Deserialize)]
struct Address {
    #[serde(rename = "@addr")]
    addr: String,
    #[serde(rename = "@addrtype", default)]
    addrtype: String,
}

#[derive(Debug, Deserialize)]
struct Hostnames {
    #[serde(rename = "hostname", default)]
    entries: Vec<Hostname>,
}

#[derive(Debug, Deserialize)]
struct Hostname {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Ports {
    #[serde(rename = "port", default)]
    entries: Vec<PortEntry>,
}

#[derive(Debug, Deserialize)]
struct PortEntry {
    #[serde(rename = "@portid")]
    portid: String,
    state: Option<State>,
    service: Option<Service>,
}

#[derive(Debug, Deserialize)]
struct State {
    #[serde(rename = "@state")]
    state: String,
}

#[derive(Debug, Deserialize)]
struct Service {
    #[serde(rename = "@name", default)]
    name: String,
}

/// Parse an nmap XML file into `host:port` socket strings.
pub fn parse_file(path: &Path) -> Result<Vec<String>, AdapterError> {
    let content = fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parse nmap XML content into `host:port` socket strings.
pub fn parse_str(content: &str) -> Result<Vec<String>, AdapterError> {
    if !content.contains("<!DOCTYPE nmaprun>") {
        return Err(AdapterError::NotThisFormat(
            "missing DOCTYPE nmaprun".to_string(),
        ));
    }

    let run: NmapRun =
        quick_xml::de::from_str(content).map_err(|e| AdapterError::Malformed(e.to_string()))?;

    let mut sockets = Vec::new();
    for host in run.hosts {
        let Some(address) = host
            .addresses
            .iter()
            .find(|a| a.addrtype == "ipv4")
            .or_else(|| host.addresses.iter().find(|a| a.addrtype == "ipv6"))
        else {
            tracing::debug!("No IP address found for host, skipping");
            continue;
        };

        let target = host
            .hostnames
            .as_ref()
            .and_then(|names| names.entries.iter().find(|h| h.kind == "user"))
            .map_or(address.addr.as_str(), |h| h.name.as_str());
        tracing::debug!("Found host: {} (IP: {})", target, address.addr);

        let Some(ports) = host.ports else {
            tracing::debug!("No ports found for {}, skipping", target);
            continue;
        };

        for port in ports.entries {
            if port.state.as_ref().map(|s| s.state.as_str()) != Some("open") {
                tracing::debug!("Port {} on {} is not open, skipping", port.portid, target);
                continue;
            }

            let Some(service) = port.service else {
                tracing::debug!("No service information for port {} on {}", port.portid, target);
                continue;
            };

            let name = service.name.to_lowercase();
            if HTTP_KEYWORDS.iter().any(|keyword| name.contains(keyword)) {
                let socket = format!("{}:{}", target, port.portid);
                tracing::info!("Found HTTP service: {} (service: {})", socket, name);
                sockets.push(socket);
            } else {
                tracing::debug!(
                    "Port {} on {} has non-HTTP service: {}, skipping",
                    port.portid,
                    target,
                    name
                );
            }
        }
    }

    tracing::info!("Parsed {} HTTP sockets from nmap file", sockets.len());
    Ok(sockets)
}
