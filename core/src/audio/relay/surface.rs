//! The relay page server
//!
//! Routes:
//! - `GET /`          the audio page
//! - `GET /events`    SSE stream of [`RelayMessage`]s
//! - `GET /packs/*`   sound files, straight from the packs directory
//! - `POST /feedback` page reports (autoplay blocked, unlocked)
//! - `GET /health`

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, watch};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_stream::wrappers::BroadcastStream;
use tower_http::services::ServeDir;
use url::Url;

use super::{RelayError, RelayMessage, RelayNotice, RelayOptions};

const PAGE: &str = include_str!("page.html");
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
/// A play posted while no page is connected is handed to the next page within this window
const PENDING_TTL: Duration = Duration::from_secs(10);
const CHANNEL_CAPACITY: usize = 16;

/// Reports the page sends back
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum Feedback {
    AutoplayBlocked,
    Unlocked,
}

/// State shared between the backend and the request handlers
struct Shared {
    messages: broadcast::Sender<RelayMessage>,
    pending: Mutex<Option<(Instant, RelayMessage)>>,
    prompted: AtomicBool,
    notices: Option<UnboundedSender<RelayNotice>>,
    url: String,
    /// Flips to `true` when the page is torn down
    closing: watch::Receiver<bool>,
}

impl Shared {
    fn take_pending(&self) -> Option<RelayMessage> {
        let mut slot = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        slot.take()
            .filter(|(posted_at, _)| posted_at.elapsed() < PENDING_TTL)
            .map(|(_, message)| message)
    }

    fn notify(&self, notice: RelayNotice) {
        if let Some(tx) = &self.notices {
            let _ = tx.send(notice);
        }
    }
}

/// Resolves once `close` is signalled or the surface is gone
async fn closed(mut closing: watch::Receiver<bool>) {
    let _ = closing.wait_for(|closing| *closing).await;
}

/// One live relay page: the HTTP server plus its idle timer
pub(super) struct Surface {
    base: Url,
    shared: Arc<Shared>,
    server: JoinHandle<()>,
    idle_timer: Option<JoinHandle<()>>,
    close: Arc<watch::Sender<bool>>,
}

impl Surface {
    /// Bind the listener and start serving. Must run inside a tokio runtime.
    pub(super) fn open(
        options: &RelayOptions,
        notices: Option<UnboundedSender<RelayNotice>>,
    ) -> Result<Self, RelayError> {
        let listener =
            std::net::TcpListener::bind(&options.bind).map_err(|source| RelayError::Bind {
                addr: options.bind.clone(),
                source,
            })?;
        listener.set_nonblocking(true).map_err(RelayError::Listener)?;
        let addr: SocketAddr = listener.local_addr().map_err(RelayError::Listener)?;
        let listener = tokio::net::TcpListener::from_std(listener).map_err(RelayError::Listener)?;

        let base = Url::parse(&format!("http://{addr}/"))?;
        let (messages, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (close, closing) = watch::channel(false);
        let shared = Arc::new(Shared {
            messages,
            pending: Mutex::new(None),
            prompted: AtomicBool::new(false),
            notices,
            url: base.to_string(),
            closing: closing.clone(),
        });

        // Open event streams end on close too, so the graceful shutdown completes
        let app = router(Arc::clone(&shared), &options.packs_dir);
        let server = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(closed(closing));
            if let Err(e) = serve.await {
                tracing::warn!(error = %e, "Relay page server stopped");
            }
        });

        tracing::info!(url = %base, "Relay audio page listening");

        Ok(Self {
            base,
            shared,
            server,
            idle_timer: None,
            close: Arc::new(close),
        })
    }

    pub(super) fn url(&self) -> &str {
        self.base.as_str()
    }

    /// Absolute request path for a file below the packs directory
    pub(super) fn source_path(&self, segments: &[String]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.clear().push("packs").extend(segments);
        }
        url.path().to_string()
    }

    /// Push a message to every connected page. Returns how many received it.
    pub(super) fn post(&self, message: RelayMessage) -> usize {
        match self.shared.messages.send(message) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(message)) => {
                let mut slot = self.shared.pending.lock().unwrap_or_else(PoisonError::into_inner);
                *slot = Some((Instant::now(), message));
                0
            }
        }
    }

    /// (Re)start the idle countdown; when it fires the page and its streams are closed
    pub(super) fn arm_idle_timer(&mut self, timeout: Duration) {
        if let Some(timer) = self.idle_timer.take() {
            timer.abort();
        }
        let close = Arc::clone(&self.close);
        let url = self.shared.url.clone();
        self.idle_timer = Some(tokio::spawn(async move {
            sleep(timeout).await;
            close.send_replace(true);
            tracing::info!(%url, "Relay audio page idle, closed");
        }));
    }

    pub(super) fn is_closed(&self) -> bool {
        *self.close.borrow() || self.server.is_finished()
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        if let Some(timer) = self.idle_timer.take() {
            timer.abort();
        }
        // The server task winds down on its own once every stream has ended
        self.close.send_replace(true);
    }
}

fn router(shared: Arc<Shared>, packs_dir: &Path) -> Router {
    Router::new()
        .route("/", get(page))
        .route("/health", get(health))
        .route("/events", get(event_stream))
        .route("/feedback", post(feedback))
        .nest_service("/packs", ServeDir::new(packs_dir))
        .with_state(shared)
}

async fn page() -> Html<&'static str> {
    Html(PAGE)
}

async fn health() -> &'static str {
    "ok"
}

async fn event_stream(
    State(shared): State<Arc<Shared>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe first so nothing posted in between is lost
    let receiver = shared.messages.subscribe();
    let replay = shared.take_pending();

    tracing::debug!("Relay page connected");

    let live = BroadcastStream::new(receiver).filter_map(|result| async move {
        match result {
            Ok(message) => to_sse_event(&message),
            Err(e) => {
                tracing::debug!(error = %e, "Relay page fell behind");
                None
            }
        }
    });
    let stream = stream::iter(replay.as_ref().and_then(to_sse_event))
        .chain(live)
        .take_until(closed(shared.closing.clone()));

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

fn to_sse_event(message: &RelayMessage) -> Option<Result<Event, Infallible>> {
    match Event::default().event(message.kind()).json_data(message) {
        Ok(event) => Some(Ok(event)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode relay message");
            None
        }
    }
}

async fn feedback(State(shared): State<Arc<Shared>>, Json(report): Json<Feedback>) -> StatusCode {
    match report {
        Feedback::AutoplayBlocked => {
            if !shared.prompted.swap(true, Ordering::SeqCst) {
                shared.notify(RelayNotice::AutoplayBlocked {
                    url: shared.url.clone(),
                });
            }
        }
        Feedback::Unlocked => tracing::debug!("Relay page audio unlocked"),
    }
    StatusCode::NO_CONTENT
}
