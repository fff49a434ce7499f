//! Error types for foldersync-core.
//!
//! `ConfigError` is fatal and raised before any scan. `ScanError` and
//! `CopyError` are accumulated into results; they carry rendered messages
//! rather than `io::Error` so results stay `Clone` and serializable.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::types::{PlanAction, Side};

/// Invalid invocation, detected before anything is read or written.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{side} directory does not exist: {path}")]
    MissingRoot { side: &'static str, path: PathBuf },

    #[error("{side} path is not a directory: {path}")]
    NotADirectory { side: &'static str, path: PathBuf },

    #[error("{side} directory is not accessible: {path}: {source}")]
    NotAccessible {
        side: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{side} directory is read-only: {path}")]
    ReadOnly { side: &'static str, path: PathBuf },

    #[error("source and target overlap: {source_root} and {target_root}")]
    OverlappingRoots {
        source_root: PathBuf,
        target_root: PathBuf,
    },

    #[error("invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("watch interval must be greater than zero")]
    ZeroInterval,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings YAML serialization error (write path).
    #[error("settings serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Settings YAML parse error on load.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// An entry under a root whose metadata or listing could not be read.
#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[error("cannot read {side} entry {path}: {message}")]
pub struct ScanError {
    pub side: Side,
    pub path: PathBuf,
    pub message: String,
}

/// A plan item that failed to apply.
#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[error("failed to apply {action:?} for {relative_path}: {message}")]
pub struct CopyError {
    pub relative_path: String,
    pub action: PlanAction,
    pub message: String,
}

/// Non-fatal problem recorded during a cycle.
#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SyncIssue {
    #[error(transparent)]
    Scan(ScanError),
    #[error(transparent)]
    Copy(CopyError),
}

impl From<ScanError> for SyncIssue {
    fn from(err: ScanError) -> Self {
        SyncIssue::Scan(err)
    }
}

impl From<CopyError> for SyncIssue {
    fn from(err: CopyError) -> Self {
        SyncIssue::Copy(err)
    }
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
