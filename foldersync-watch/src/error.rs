use thiserror::Error;

use foldersync_core::ConfigError;

/// Error surface of the watch loop. A failing tick is not an error; it is
/// reported through the tick callback and the loop keeps going.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("tick task join failure: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("ctrl-c handler failed: {0}")]
    Signal(#[source] std::io::Error),
}
