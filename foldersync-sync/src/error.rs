//! Error types for foldersync-sync.

use std::path::PathBuf;

use thiserror::Error;

use foldersync_core::ConfigError;

/// Fatal errors of a sync run. Per-item problems live in
/// [`SyncResult::errors`](foldersync_core::SyncResult) instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Invalid roots or options rather than a runtime failure.
    pub fn is_config(&self) -> bool {
        matches!(self, SyncError::Config(_))
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
