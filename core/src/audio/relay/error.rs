use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to bind relay page on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to configure relay listener")]
    Listener(#[source] std::io::Error),

    #[error("invalid relay address")]
    Address(#[from] url::ParseError),

    #[error("{path} is outside the packs directory {packs_dir}")]
    OutsidePacks { path: PathBuf, packs_dir: PathBuf },

    #[error("{path} cannot be served over HTTP")]
    Unservable { path: PathBuf },
}
