use std::io;
use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;

use super::{AgentEvent, parse_event_line};

/// Debounce and duplicate-content state for one signal file.
///
/// Only the last successful emission is remembered. A change inside the
/// debounce window is dropped outright; nothing is queued for later.
#[derive(Debug)]
pub struct ChangeTracker {
    debounce: Duration,
    last_emitted_at: Option<Instant>,
    last_content: String,
}

impl ChangeTracker {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            last_emitted_at: None,
            last_content: String::new(),
        }
    }

    /// Handle one raw change signal by re-reading `path`
    pub fn observe(&mut self, now: Instant, path: &Path) -> Option<AgentEvent> {
        self.observe_with(now, || std::fs::read_to_string(path))
    }

    /// Handle one raw change signal, reading the current content with `read`.
    ///
    /// `read` is only called once the debounce window is open.
    pub fn observe_with<F>(&mut self, now: Instant, read: F) -> Option<AgentEvent>
    where
        F: FnOnce() -> io::Result<String>,
    {
        if let Some(last) = self.last_emitted_at
            && now.saturating_duration_since(last) < self.debounce
        {
            tracing::trace!("Change inside debounce window, dropped");
            return None;
        }

        // The writer may be mid-write; the next change will retry
        let content = match read() {
            Ok(content) => content,
            Err(e) => {
                tracing::trace!(error = %e, "Signal file unreadable, dropped");
                return None;
            }
        };

        let content = content.trim();
        if content.is_empty() || content == self.last_content {
            return None;
        }

        let Some(event) = parse_event_line(content) else {
            tracing::debug!(content, "Malformed signal record, dropped");
            return None;
        };

        self.last_emitted_at = Some(now);
        self.last_content = content.to_string();
        Some(event)
    }
}
