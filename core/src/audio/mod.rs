//! Audio delivery
//!
//! Two interchangeable backends behind [`AudioBackend`]:
//! - [`NativeBackend`]: runs the platform player (afplay / paplay / PowerShell).
//!   Only useful when this process runs next to the speakers.
//! - [`RelayBackend`]: serves a small audio page on loopback and pushes play
//!   requests to it over SSE, so a browser on the user's machine does the
//!   playback. Works over SSH port forwarding.
//!
//! The host picks one at startup with [`create_backend`].

mod native;
mod relay;

use std::path::PathBuf;

use tokio::sync::mpsc::UnboundedSender;

pub use native::{NativeBackend, player_command};
pub use relay::{RelayBackend, RelayError, RelayMessage, RelayNotice, RelayOptions};

use crate::context::PeonConfig;

/// A file to play and the volume to play it at
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRequest {
    pub path: PathBuf,
    /// Requested volume. Backends clamp to 0.0 - 1.0.
    pub volume: f32,
}

impl PlaybackRequest {
    pub fn new(path: impl Into<PathBuf>, volume: f32) -> Self {
        Self {
            path: path.into(),
            volume,
        }
    }
}

/// Play-and-forget audio output.
///
/// Neither method reports failure: playback problems are logged at the
/// backend boundary and never reach the caller.
pub trait AudioBackend: Send {
    fn play(&mut self, request: PlaybackRequest);

    /// Release timers, child processes and servers. Safe to call repeatedly.
    fn dispose(&mut self);

    /// Short name for log lines
    fn kind(&self) -> &'static str;
}

/// Clamp a volume into 0.0 - 1.0, treating NaN as silence
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Select the backend once at startup.
///
/// `remote` is the host's judgement of whether the speakers are on another machine.
pub fn create_backend(
    remote: bool,
    config: &PeonConfig,
    notices: Option<UnboundedSender<RelayNotice>>,
) -> Box<dyn AudioBackend> {
    if remote {
        Box::new(RelayBackend::new(RelayOptions::from_config(config), notices))
    } else {
        Box::new(NativeBackend::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_volume() {
        assert_eq!(clamp_volume(0.5), 0.5);
        assert_eq!(clamp_volume(3.0), 1.0);
        assert_eq!(clamp_volume(-1.0), 0.0);
        assert_eq!(clamp_volume(f32::NAN), 0.0);
    }

    #[tokio::test]
    async fn test_backend_selection() {
        let config = PeonConfig::default();
        assert_eq!(create_backend(false, &config, None).kind(), "native");
        assert_eq!(create_backend(true, &config, None).kind(), "relay");
    }
}
