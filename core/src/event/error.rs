//! Error types for signal file watching

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the watch mechanism itself. Bad signal content is never an error.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create signal directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create signal file {path}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialize file watcher")]
    InitWatcher(#[source] notify::Error),

    #[error("failed to watch path {path}")]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}
