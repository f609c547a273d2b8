//! # PageHawk - Web Surface Reconnaissance
//!
//! PageHawk turns a heterogeneous target list into `host:port` sockets,
//! visits every socket over HTTP or HTTPS and records what came back.
//!
//! ## Features
//!
//! - **Flexible Targeting**: IPs, CIDR ranges, `ip:port` sockets, URLs,
//!   domains, target-list files and nmap XML exports
//! - **Protocol Fallback**: HTTP on 80, HTTPS on 443, and HTTP then HTTPS
//!   on every other port when the first attempt fails to navigate
//! - **Crash-Safe Results**: the visit state is rewritten atomically after
//!   every visit, so interrupted runs can be resumed
//! - **Bounded Concurrency**: async visits with optional random pacing
//! - **Screenshots**: captured through a headless Chromium when configured
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use pagehawk::resolve::{build_sockets, read_input, TargetResolver};
//! use pagehawk::types::PortSpec;
//!
//! let ports = PortSpec::parse_optional(Some("80,443"))?.to_ports();
//! let input = read_input("10.0.0.0/30,example.com")?;
//! let resolution = TargetResolver::resolve(&input);
//! for socket in build_sockets(&resolution.targets, &ports) {
//!     println!("{}", socket);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, sockets and target classification
//! - [`resolve`] - Input sources, the nmap adapter and the socket matrix
//! - [`scanner`] - The renderer seam, protocol fallback and scan orchestration
//! - [`storage`] - Visit records, the persisted visit store and screenshots
//! - [`config`] - Settings and the output directory layout
//! - [`output`] - Console output
//! - [`logging`] - Tracing subscriber setup
//! - [`error`] - Cross-cutting error types

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod resolve;
pub mod scanner;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ConfigError, StorageError};
pub use resolve::{build_sockets, TargetResolver};
pub use scanner::{Renderer, ScanOrchestrator, ScanSummary};
pub use storage::{ResponseClass, VisitRecord, VisitStore};
pub use types::{Port, PortSpec, Socket};
