//! Error types for PageHawk.
//!
//! Uses `thiserror` for ergonomic error definitions. Domain-specific errors
//! (`TargetError`, `PortError`, `AdapterError`, `NavigationError`) live next
//! to the types they describe; this module holds the cross-cutting ones.

use crate::types::{PortError, TargetError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while persisting or loading visit state.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to serialize visit state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },

    #[error("failed to write screenshot {path}: {source}")]
    ScreenshotFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised while loading settings or preparing the output layout.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine the configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    #[error("output path does not exist: {0}")]
    OutputMissing(PathBuf),

    #[error("no write permission for {path}: {reason}")]
    OutputNotWritable { path: PathBuf, reason: String },

    #[error("failed to create directory {path}: {reason}")]
    CreateDirFailed { path: PathBuf, reason: String },

    #[error("invalid proxy configuration: {0}")]
    InvalidProxy(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level error surfaced by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("input validation failed: {0} target(s) could not be parsed")]
    InputValidation(usize),

    #[error("no targets to process")]
    NothingToScan,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for CLI commands.
pub type CliResult<T> = Result<T, CliError>;
