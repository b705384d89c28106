use tokio::task::JoinHandle;

/// Handles for the long-running tasks a host keeps alive alongside the pipeline
#[derive(Default)]
pub struct BackgroundTasks {
    pub event_source: Option<JoinHandle<()>>,
    pub config_watcher: Option<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn restart_event_source(&mut self, handle: JoinHandle<()>) {
        if let Some(old) = self.event_source.replace(handle) {
            old.abort();
        }
    }

    pub fn abort_all(&mut self) {
        if let Some(handle) = self.event_source.take() {
            handle.abort();
        }
        if let Some(handle) = self.config_watcher.take() {
            handle.abort();
        }
    }
}
