use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{AccessKind, AccessMode};
use notify::{Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};

use super::{AgentEvent, ChangeTracker, WatchError};
use crate::context::{PeonConfig, PeonConfigExt};

/// Delay before re-creating a failed watcher
const RETRY_BACKOFF: Duration = Duration::from_secs(1);
/// Poll interval used when change notification is unavailable
const FALLBACK_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How changes to the signal file are detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// OS change notification (inotify, FSEvents, ReadDirectoryChangesW) on the
    /// signal file's directory. Idle cost is zero.
    Notify,
    /// Stat the file at a fixed interval, for NFS, FUSE and similar filesystems
    Poll(Duration),
}

/// Watches the signal file and emits each accepted event, in write order.
pub struct EventSource {
    path: PathBuf,
    mode: WatchMode,
    tracker: ChangeTracker,
}

impl EventSource {
    pub fn new(path: PathBuf, debounce: Duration, mode: WatchMode) -> Self {
        Self {
            path,
            mode,
            tracker: ChangeTracker::new(debounce),
        }
    }

    pub fn from_config(config: &PeonConfig) -> Self {
        let mode = if config.use_polling {
            WatchMode::Poll(config.polling_interval())
        } else {
            WatchMode::Notify
        };
        Self::new(config.event_file_path(), config.debounce(), mode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> WatchMode {
        self.mode
    }

    /// Create the signal file's directory and an empty, owner-only signal file
    /// if they are missing, so the watch target always exists.
    pub fn ensure_signal_file(&self) -> Result<(), WatchError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| WatchError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        match options.open(&self.path) {
            Ok(_) => {
                tracing::debug!(path = %self.path.display(), "Created signal file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(WatchError::CreateFile {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Run the source as a background task
    pub fn spawn(self, tx: Sender<AgentEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(tx))
    }

    /// Watch until the receiving side is dropped.
    ///
    /// Watch failures never end the loop: the watcher is dropped and re-created
    /// after [`RETRY_BACKOFF`].
    pub async fn run(mut self, tx: Sender<AgentEvent>) {
        let mut failures: u32 = 0;

        loop {
            if let Err(e) = self.ensure_signal_file() {
                tracing::warn!(error = %e, "Signal file unavailable");
            }

            let mut watcher = match self.start_watcher() {
                Ok(watcher) => watcher,
                Err(e) => {
                    failures += 1;
                    tracing::warn!(error = %e, failures, "Failed to start signal watcher, retrying");
                    sleep(RETRY_BACKOFF).await;
                    continue;
                }
            };

            tracing::info!(path = %self.path.display(), mode = ?self.mode, "Watching signal file");

            loop {
                match watcher.next_event().await {
                    Some(Ok(event)) => {
                        if watcher.lost_target(&event) {
                            failures += 1;
                            tracing::warn!(
                                path = %watcher.target.display(),
                                failures,
                                "Watched path removed, restarting"
                            );
                            break;
                        }
                        if !self.is_relevant(&event) {
                            continue;
                        }
                        if let Some(agent_event) = self.tracker.observe(Instant::now(), &self.path) {
                            tracing::debug!(
                                category = %agent_event.category,
                                occurred_at = agent_event.occurred_at,
                                "Signal event"
                            );
                            if tx.send(agent_event).await.is_err() {
                                tracing::debug!("Event receiver dropped, stopping signal watcher");
                                return;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        failures += 1;
                        tracing::warn!(error = %e, failures, "Signal watcher error, restarting");
                        break;
                    }
                    None => {
                        failures += 1;
                        tracing::warn!(failures, "Signal watcher stopped, restarting");
                        break;
                    }
                }
            }

            drop(watcher);
            sleep(RETRY_BACKOFF).await;
        }
    }

    fn start_watcher(&mut self) -> Result<SignalWatcher, WatchError> {
        match self.mode {
            WatchMode::Poll(interval) => SignalWatcher::poll(&self.path, interval),
            WatchMode::Notify => match SignalWatcher::notify(&self.path) {
                Ok(watcher) => Ok(watcher),
                Err(WatchError::InitWatcher(e)) => {
                    tracing::warn!(error = %e, "Change notification unavailable, falling back to polling");
                    self.mode = WatchMode::Poll(FALLBACK_POLL_INTERVAL);
                    SignalWatcher::poll(&self.path, FALLBACK_POLL_INTERVAL)
                }
                Err(e) => Err(e),
            },
        }
    }

    /// Content-changing events that name the signal file
    fn is_relevant(&self, event: &Event) -> bool {
        let kind_matches = match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any | EventKind::Other => true,
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
            EventKind::Access(_) | EventKind::Remove(_) => false,
        };
        if !kind_matches {
            return false;
        }

        let file_name = self.path.file_name();
        event.paths.is_empty() || event.paths.iter().any(|p| p.file_name() == file_name)
    }
}

/// Notify watcher plus the channel its callback feeds
struct SignalWatcher {
    _watcher: Box<dyn Watcher + Send>,
    rx: Receiver<notify::Result<Event>>,
    /// Directory (notify) or file (poll) the watch is registered on
    target: PathBuf,
}

impl SignalWatcher {
    /// Watch the parent directory so write-then-rename replacement keeps reporting
    fn notify(path: &Path) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel(100);

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.blocking_send(res);
            },
            Config::default(),
        )
        .map_err(WatchError::InitWatcher)?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        Self::start(Box::new(watcher), dir, rx)
    }

    fn poll(path: &Path, interval: Duration) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel(100);

        let watcher = PollWatcher::new(
            move |res| {
                let _ = tx.blocking_send(res);
            },
            Config::default()
                .with_poll_interval(interval)
                .with_compare_contents(true),
        )
        .map_err(WatchError::InitWatcher)?;

        Self::start(Box::new(watcher), path, rx)
    }

    fn start(
        mut watcher: Box<dyn Watcher + Send>,
        target: &Path,
        rx: Receiver<notify::Result<Event>>,
    ) -> Result<Self, WatchError> {
        watcher
            .watch(target, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::WatchPath {
                path: target.to_path_buf(),
                source,
            })?;

        Ok(Self {
            _watcher: watcher,
            rx,
            target: target.to_path_buf(),
        })
    }

    async fn next_event(&mut self) -> Option<notify::Result<Event>> {
        self.rx.recv().await
    }

    /// The watch registration dies with its target; nothing more will arrive
    fn lost_target(&self, event: &Event) -> bool {
        matches!(event.kind, EventKind::Remove(_)) && event.paths.iter().any(|p| p == &self.target)
    }
}
