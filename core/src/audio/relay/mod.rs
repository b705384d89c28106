//! Browser relay backend
//!
//! The relay page is created lazily on the first play and torn down after
//! a quiet period:
//!
//! ```text
//!  Absent ──play──► Active ──post──► Armed ──idle timeout──► Disposed
//!    ▲                                 │ ▲                       │
//!    │                                 └─┘ play re-arms          │
//!    └────────────────────── next play ◄─────────────────────────┘
//! ```

mod error;
mod surface;


use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

pub use error::RelayError;
use surface::Surface;

use super::{AudioBackend, PlaybackRequest, clamp_volume};
use crate::context::{PeonConfig, PeonConfigExt};

/// Message pushed to the page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelayMessage {
    Play { src: String, volume: f32 },
}

impl RelayMessage {
    /// SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            RelayMessage::Play { .. } => "play",
        }
    }
}

/// Things the host should tell the user about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayNotice {
    /// A new page is listening at `url`
    SurfaceReady { url: String },
    /// The browser refused to autoplay; the user has to click the page once.
    /// Sent at most once per page.
    AutoplayBlocked { url: String },
}

#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Listen address, normally loopback
    pub bind: String,
    pub idle_timeout: Duration,
    pub packs_dir: PathBuf,
}

impl RelayOptions {
    pub fn from_config(config: &PeonConfig) -> Self {
        Self {
            bind: config.relay.bind.clone(),
            idle_timeout: config.relay_idle_timeout(),
            packs_dir: config.packs_dir(),
        }
    }
}

enum SurfaceState {
    Absent,
    /// Page created, nothing posted yet
    Active(Surface),
    /// Idle timer running
    Armed(Surface),
    Disposed,
}

pub struct RelayBackend {
    options: RelayOptions,
    notices: Option<UnboundedSender<RelayNotice>>,
    state: SurfaceState,
}

impl RelayBackend {
    pub fn new(mut options: RelayOptions, notices: Option<UnboundedSender<RelayNotice>>) -> Self {
        if let Ok(absolute) = std::path::absolute(&options.packs_dir) {
            options.packs_dir = absolute;
        }
        Self {
            options,
            notices,
            state: SurfaceState::Absent,
        }
    }

    /// URL of the live page, if there is one
    pub fn url(&self) -> Option<&str> {
        match &self.state {
            SurfaceState::Active(surface) | SurfaceState::Armed(surface) if !surface.is_closed() => {
                Some(surface.url())
            }
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.url().is_some()
    }

    /// Path segments of `path` below the packs directory
    fn pack_segments(&self, path: &Path) -> Result<Vec<String>, RelayError> {
        let packs_dir = &self.options.packs_dir;
        let outside = || RelayError::OutsidePacks {
            path: path.to_path_buf(),
            packs_dir: packs_dir.clone(),
        };

        let absolute = std::path::absolute(path).map_err(|_| outside())?;
        let relative = absolute.strip_prefix(packs_dir).map_err(|_| outside())?;

        let segments = relative
            .components()
            .map(|component| match component {
                Component::Normal(part) => part.to_str().map(str::to_owned).ok_or_else(|| {
                    RelayError::Unservable {
                        path: path.to_path_buf(),
                    }
                }),
                _ => Err(outside()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        if segments.is_empty() {
            return Err(outside());
        }
        Ok(segments)
    }

    /// Drop a surface whose idle timer fired or whose server died
    fn reap(&mut self) {
        let closed = matches!(
            &self.state,
            SurfaceState::Active(surface) | SurfaceState::Armed(surface) if surface.is_closed()
        );
        if closed {
            self.state = SurfaceState::Disposed;
        }
        if matches!(self.state, SurfaceState::Disposed) {
            self.state = SurfaceState::Absent;
        }
    }

    fn notify(&self, notice: RelayNotice) {
        if let Some(tx) = &self.notices {
            let _ = tx.send(notice);
        }
    }
}

impl AudioBackend for RelayBackend {
    fn play(&mut self, request: PlaybackRequest) {
        let segments = match self.pack_segments(&request.path) {
            Ok(segments) => segments,
            Err(e) => {
                tracing::warn!(error = %e, "Refusing to relay sound");
                return;
            }
        };

        self.reap();

        if matches!(self.state, SurfaceState::Absent) {
            match Surface::open(&self.options, self.notices.clone()) {
                Ok(surface) => {
                    self.notify(RelayNotice::SurfaceReady {
                        url: surface.url().to_string(),
                    });
                    self.state = SurfaceState::Active(surface);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to open relay audio page");
                    return;
                }
            }
        }

        self.state = match std::mem::replace(&mut self.state, SurfaceState::Absent) {
            SurfaceState::Active(mut surface) | SurfaceState::Armed(mut surface) => {
                let message = RelayMessage::Play {
                    src: surface.source_path(&segments),
                    volume: clamp_volume(request.volume),
                };
                if surface.post(message) == 0 {
                    tracing::debug!(url = surface.url(), "No relay page connected, play held for the next one");
                }
                surface.arm_idle_timer(self.options.idle_timeout);
                SurfaceState::Armed(surface)
            }
            other => other,
        };
    }

    fn dispose(&mut self) {
        if let SurfaceState::Active(_) | SurfaceState::Armed(_) = self.state {
            // Dropping the surface stops its server and timer
            self.state = SurfaceState::Disposed;
            tracing::debug!("Relay audio page disposed");
        }
    }

    fn kind(&self) -> &'static str {
        "relay"
    }
}
