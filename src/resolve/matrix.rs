//! Socket matrix: resolved targets crossed with the port set.

use super::ResolvedTargets;
use crate::types::{Port, Socket};

/// Build the scan task list.
///
/// Pre-built sockets come first and are kept as-is, then every host and
/// every URL is paired with every port. Hosts and URLs always get the full
/// port set.
pub fn build_sockets(targets: &ResolvedTargets, ports: &[Port]) -> Vec<Socket> {
    let mut sockets = Vec::with_capacity(
        targets.sockets.len() + (targets.hosts.len() + targets.urls.len()) * ports.len(),
    );

    sockets.extend(targets.sockets.iter().cloned());

    for host in &targets.hosts {
        sockets.extend(ports.iter().map(|&port| Socket::new(host.clone(), port)));
    }

    for url in &targets.urls {
        sockets.extend(ports.iter().map(|&port| Socket::new(url.clone(), port)));
    }

    tracing::info!("Built {} sockets across {} ports", sockets.len(), ports.len());
    sockets
}
