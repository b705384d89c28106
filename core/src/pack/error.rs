//! Error types for sound pack loading

use std::path::PathBuf;
use thiserror::Error;

/// Why a pack directory could not be turned into a SoundPack
#[derive(Debug, Error)]
pub enum PackError {
    #[error("no manifest.json in {dir}")]
    MissingManifest { dir: PathBuf },

    #[error("failed to read manifest {path}")]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest JSON in {path}")]
    ParseManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest {path} is missing \"id\"")]
    MissingId { path: PathBuf },

    #[error("manifest {path} is missing \"sounds\"")]
    MissingSounds { path: PathBuf },
}
