//! The long-running notifier: signal file in, sounds out.

use peon_core::audio::{AudioBackend, PlaybackRequest, RelayNotice, create_backend};
use peon_core::context::{BackgroundTasks, PeonConfig, PeonConfigExt};
use peon_core::event::{AgentEvent, EventSource};
use peon_core::sound::SoundSelector;
use tokio::signal;
use tokio::sync::mpsc;

use crate::config_watcher::ConfigWatcher;
use crate::context::{CliContext, in_ssh_session};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Everything the loop mutates. Owned by the loop alone, so no locking.
struct Daemon {
    config: PeonConfig,
    selector: SoundSelector,
    backend: Box<dyn AudioBackend>,
    tasks: BackgroundTasks,
    events_tx: mpsc::Sender<AgentEvent>,
    notices: mpsc::UnboundedSender<RelayNotice>,
    /// Whether the relay may open the page in a local browser
    can_open_browser: bool,
}

pub async fn run(ctx: &CliContext) -> Result<(), String> {
    let config = ctx.load_config()?;

    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
    let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (config_tx, mut config_rx) = mpsc::channel(4);

    let mut daemon = Daemon::new(ctx, config, notice_tx, events_tx);

    daemon.start_event_source();
    match ctx.config_path().map(|path| ConfigWatcher::new(&path)) {
        Ok(Ok(watcher)) => daemon.tasks.config_watcher = Some(watcher.spawn(config_tx)),
        Ok(Err(e)) => tracing::warn!(error = %e, "Config changes will not be picked up until restart"),
        Err(e) => tracing::warn!(error = %e, "Config file location unknown, not watching it"),
    }

    if !daemon.selector.is_ready() {
        tracing::warn!(
            pack = %daemon.config.pack,
            packs_dir = %daemon.config.packs_dir().display(),
            "No sounds available; events will be silent"
        );
    }
    tracing::info!(
        backend = daemon.backend.kind(),
        pack = %daemon.config.pack,
        "remote-peon running, Ctrl-C to stop"
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = events_rx.recv() => daemon.dispatch(event),
            Some(()) = config_rx.recv() => daemon.reload(ctx),
            Some(notice) = notice_rx.recv() => daemon.handle_notice(notice),
            _ = &mut shutdown => break,
        }
    }

    daemon.tasks.abort_all();
    daemon.backend.dispose();
    tracing::info!("remote-peon stopped");
    Ok(())
}

impl Daemon {
    fn new(
        ctx: &CliContext,
        config: PeonConfig,
        notices: mpsc::UnboundedSender<RelayNotice>,
        events_tx: mpsc::Sender<AgentEvent>,
    ) -> Self {
        Self {
            selector: SoundSelector::new(&config),
            backend: create_backend(ctx.is_remote(&config), &config, Some(notices.clone())),
            tasks: BackgroundTasks::default(),
            events_tx,
            notices,
            can_open_browser: !in_ssh_session(),
            config,
        }
    }

    fn start_event_source(&mut self) {
        let source = EventSource::from_config(&self.config);
        self.tasks
            .restart_event_source(source.spawn(self.events_tx.clone()));
    }

    fn dispatch(&mut self, event: AgentEvent) {
        let Some(path) = self.selector.pick_sound(event.category, &self.config) else {
            tracing::debug!(category = %event.category, "No sound for event");
            return;
        };
        tracing::info!(
            state = event.category.label(),
            category = %event.category,
            sound = %path.display(),
            "Playing"
        );
        self.backend
            .play(PlaybackRequest::new(path, self.config.effective_volume()));
    }

    fn reload(&mut self, ctx: &CliContext) {
        let config = match ctx.load_config() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable config change");
                return;
            }
        };
        if config == self.config {
            return;
        }

        let restart_source = config.event_file != self.config.event_file
            || config.use_polling != self.config.use_polling
            || config.polling_interval_ms != self.config.polling_interval_ms
            || config.debounce_ms != self.config.debounce_ms;
        // The relay serves files from the packs directory it was built with
        let rebuild_backend = config.delivery != self.config.delivery
            || config.relay != self.config.relay
            || config.packs_directory != self.config.packs_directory;

        self.config = config;
        self.selector.reload(&self.config);
        if rebuild_backend {
            self.backend.dispose();
            self.backend = create_backend(
                ctx.is_remote(&self.config),
                &self.config,
                Some(self.notices.clone()),
            );
            tracing::info!(backend = self.backend.kind(), "Audio backend rebuilt");
        }
        if restart_source {
            self.start_event_source();
        }
        tracing::info!(pack = %self.config.pack, "Configuration reloaded");
    }

    fn handle_notice(&self, notice: RelayNotice) {
        match notice {
            RelayNotice::SurfaceReady { url } => {
                tracing::info!(
                    %url,
                    "Relay audio page ready; open it in a browser on the machine with the speakers (forward the port when on SSH)"
                );
                self.open_page(&url);
            }
            RelayNotice::AutoplayBlocked { url } => {
                tracing::warn!(%url, "Browser blocked autoplay; click the relay page once to enable sound");
                self.open_page(&url);
            }
        }
    }

    fn open_page(&self, url: &str) {
        if !self.config.relay.open_browser || !self.can_open_browser {
            return;
        }
        if let Err(e) = open::that(url) {
            tracing::warn!(error = %e, %url, "Failed to open browser");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}
