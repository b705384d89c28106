//! Native player backend
//!
//! Shells out to the OS player without a shell in between. Each play is
//! fire-and-forget with a hard timeout so a hung player cannot pile up.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::{AudioBackend, PlaybackRequest, clamp_volume};

const PLAYER_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the platform player invocation, or `None` on platforms without one
#[cfg(target_os = "macos")]
pub fn player_command(path: &Path, volume: f32) -> Option<Command> {
    let mut command = Command::new("afplay");
    command.arg("-v").arg(volume.to_string()).arg(path);
    Some(command)
}

/// Build the platform player invocation, or `None` on platforms without one
#[cfg(target_os = "linux")]
pub fn player_command(path: &Path, volume: f32) -> Option<Command> {
    // PulseAudio volume: 65536 is 100%
    let pa_volume = (volume * 65536.0).round() as u32;
    let mut command = Command::new("paplay");
    command.arg(format!("--volume={pa_volume}")).arg(path);
    Some(command)
}

/// Build the platform player invocation, or `None` on platforms without one
#[cfg(target_os = "windows")]
pub fn player_command(path: &Path, _volume: f32) -> Option<Command> {
    // SoundPlayer has no volume control
    let escaped = path.to_string_lossy().replace('\'', "''");
    let mut command = Command::new("powershell");
    command.arg("-NonInteractive").arg("-Command").arg(format!(
        "(New-Object Media.SoundPlayer '{escaped}').PlaySync()"
    ));
    Some(command)
}

/// Build the platform player invocation, or `None` on platforms without one
#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
pub fn player_command(_path: &Path, _volume: f32) -> Option<Command> {
    None
}

#[derive(Default)]
pub struct NativeBackend {
    /// In-flight player waits; aborting one kills its child
    players: Vec<JoinHandle<()>>,
    warned_unsupported: bool,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of players that have not finished yet
    pub fn in_flight(&mut self) -> usize {
        self.players.retain(|handle| !handle.is_finished());
        self.players.len()
    }
}

impl AudioBackend for NativeBackend {
    fn play(&mut self, request: PlaybackRequest) {
        self.players.retain(|handle| !handle.is_finished());

        let Some(command) = player_command(&request.path, clamp_volume(request.volume)) else {
            if !self.warned_unsupported {
                tracing::warn!("No native audio player for this platform");
                self.warned_unsupported = true;
            }
            return;
        };

        let mut command = tokio::process::Command::from(command);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(
                    player = ?command.as_std().get_program(),
                    error = %e,
                    "Native audio playback failed"
                );
                return;
            }
        };

        let path = request.path;
        self.players.push(tokio::spawn(async move {
            match timeout(PLAYER_TIMEOUT, child.wait()).await {
                Ok(Ok(status)) if status.success() => {}
                Ok(Ok(status)) => {
                    tracing::warn!(%status, path = %path.display(), "Audio player exited with an error");
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Failed to wait for audio player");
                }
                Err(_) => {
                    tracing::warn!(path = %path.display(), "Audio player timed out, killing it");
                    let _ = child.kill().await;
                }
            }
        }));
    }

    fn dispose(&mut self) {
        for handle in self.players.drain(..) {
            handle.abort();
        }
    }

    fn kind(&self) -> &'static str {
        "native"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_command_uses_paplay_volume_scale() {
        let command = player_command(Path::new("/packs/peon/sounds/a b.mp3"), 0.7).unwrap();
        assert_eq!(command.get_program(), OsStr::new("paplay"));
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(
            args,
            [OsStr::new("--volume=45875"), OsStr::new("/packs/peon/sounds/a b.mp3")]
        );
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_macos_command_uses_afplay() {
        let command = player_command(Path::new("/packs/peon/sounds/a.mp3"), 0.5).unwrap();
        assert_eq!(command.get_program(), OsStr::new("afplay"));
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(args, [OsStr::new("-v"), OsStr::new("0.5"), OsStr::new("/packs/peon/sounds/a.mp3")]);
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn test_windows_command_escapes_quotes() {
        let command = player_command(Path::new(r"C:\packs\it's.wav"), 0.5).unwrap();
        let args: Vec<String> = command.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[2], r"(New-Object Media.SoundPlayer 'C:\packs\it''s.wav').PlaySync()");
    }

    #[tokio::test]
    async fn test_play_failures_stay_inside_backend() {
        let mut backend = NativeBackend::new();
        // Missing file (and possibly missing player binary): must only log
        backend.play(PlaybackRequest::new("/definitely/not/here.mp3", 5.0));
        backend.dispose();
        backend.dispose();
        assert_eq!(backend.in_flight(), 0);
        assert_eq!(backend.kind(), "native");
    }
}
