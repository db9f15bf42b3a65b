//! Error types for Lineage
//!
//! Per-file failures (read, build) are recoverable and reported through the
//! engine's debounced reporter; none of them abort a resolution batch.

use std::path::PathBuf;
use thiserror::Error;

/// Tag carried by every error surfaced to the host pipeline.
pub const PLUGIN_NAME: &str = "lineage";

/// A template could not be read at scan time.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The scanner produced a token stream that does not pair up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A directive keyword was not followed by its path.
    #[error("malformed directive stream in {owner}: `{keyword}` at token {index} has no path")]
    ExpectedPath {
        owner: PathBuf,
        keyword: &'static str,
        index: usize,
    },

    /// A path token appeared without a preceding keyword.
    #[error("malformed directive stream in {owner}: path {path} at token {index} has no directive")]
    DanglingPath {
        owner: PathBuf,
        path: PathBuf,
        index: usize,
    },
}

/// The persisted cache could not be read or written.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to read cache {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write cache {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid cache document {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported cache version {found} in {path} (expected {expected})")]
    Version {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("cache {path} belongs to project root {found}, not {expected}")]
    RootMismatch {
        path: PathBuf,
        found: PathBuf,
        expected: PathBuf,
    },
}

/// Configuration file problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Umbrella error for resolution operations.
#[derive(Error, Debug)]
pub enum LineageError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// User-facing error object emitted on the pipeline's failure channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginError {
    pub plugin: &'static str,
    pub message: String,
}

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        PluginError {
            plugin: PLUGIN_NAME,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PluginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.plugin, self.message)
    }
}

impl std::error::Error for PluginError {}
