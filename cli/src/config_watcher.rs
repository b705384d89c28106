//! Config file change notifications for the daemon

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Editors touch a file several times per save; wait this long and collapse them
const SETTLE_DELAY: Duration = Duration::from_millis(200);

pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<notify::Result<Event>>,
    file_name: Option<OsString>,
}

impl ConfigWatcher {
    /// Watch the directory holding `config_path`, so replace-on-save editors are seen too
    pub fn new(config_path: &Path) -> notify::Result<Self> {
        let (tx, rx) = mpsc::channel(64);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.blocking_send(res);
            },
            Config::default(),
        )?;

        let dir = match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            file_name: config_path.file_name().map(OsString::from),
        })
    }

    /// Wait for the next settled change to the config file
    pub async fn next_change(&mut self) -> Option<()> {
        loop {
            match self.rx.recv().await? {
                Ok(event) if self.is_config_change(&event) => break,
                Ok(_) => continue,
                Err(e) => tracing::warn!(error = %e, "Config watcher error"),
            }
        }

        sleep(SETTLE_DELAY).await;
        while self.rx.try_recv().is_ok() {}
        Some(())
    }

    pub fn spawn(mut self, tx: mpsc::Sender<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while self.next_change().await.is_some() {
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        })
    }

    fn is_config_change(&self, event: &Event) -> bool {
        matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
        ) && event
            .paths
            .iter()
            .any(|path| path.file_name().map(OsString::from) == self.file_name)
    }
}
