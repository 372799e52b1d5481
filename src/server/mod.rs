//! HTTP / WebSocket front end.
//!
//! ```text
//! GET /ws      → upgrade → WsTransport → SessionController::run (one task each)
//! GET /health  → {"status":"ok","active_sessions":N,"model":"..."}
//! ```
//!
//! Every session shares the one recognizer in [`AppState`].

pub mod ws;

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;

use crate::config::StreamConfig;
use crate::pipeline::{SessionController, SessionId, SessionSummary};
use crate::stt::SttEngine;

pub use ws::WsTransport;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Process-wide state handed to every connection.
pub struct AppState {
    engine: Arc<dyn SttEngine>,
    stream: Arc<StreamConfig>,
    model: String,
    next_id: AtomicU64,
    active: AtomicUsize,
}

impl AppState {
    pub fn new(engine: Arc<dyn SttEngine>, stream: StreamConfig, model: impl Into<String>) -> Self {
        Self {
            engine,
            stream: Arc::new(stream),
            model: model.into(),
            next_id: AtomicU64::new(1),
            active: AtomicUsize::new(0),
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    fn next_session_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

/// Counts a session as active for as long as it lives.
struct ActiveSession(Arc<AppState>);

impl ActiveSession {
    fn enter(state: Arc<AppState>) -> Self {
        state.active.fetch_add(1, Ordering::Relaxed);
        Self(state)
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Router / serve
// ---------------------------------------------------------------------------

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve until `shutdown` resolves.  Open sessions are not waited for.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "active_sessions": state.active_sessions(),
        "model": state.model,
    }))
}

async fn ws_handler(State(state): State<Arc<AppState>>, upgrade: WebSocketUpgrade) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| async move {
        let _active = ActiveSession::enter(Arc::clone(&state));
        let id = state.next_session_id();
        let session =
            SessionController::new(id, WsTransport::new(socket), Arc::clone(&state.engine), &state.stream);
        log_summary(&session.run().await);
    })
}

fn log_summary(summary: &SessionSummary) {
    let r = &summary.report;
    log::info!(
        "session {}: {} chunks ({} dropped), {} trims, {} inferences ({} coalesced, {} failed), {} results sent",
        summary.id,
        r.chunks,
        r.dropped_chunks,
        r.trims,
        r.inferences,
        r.coalesced,
        r.failed_inferences,
        r.emitted
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::MockSttEngine;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(
            Arc::new(MockSttEngine::ok("hello")),
            StreamConfig::default(),
            "ggml-tiny",
        ))
    }

    #[test]
    fn session_ids_are_unique_and_increasing() {
        let state = state();
        assert_eq!(state.next_session_id(), SessionId(1));
        assert_eq!(state.next_session_id(), SessionId(2));
    }

    #[test]
    fn active_count_follows_guard() {
        let state = state();
        let a = ActiveSession::enter(Arc::clone(&state));
        let b = ActiveSession::enter(Arc::clone(&state));
        assert_eq!(state.active_sessions(), 2);
        drop(a);
        assert_eq!(state.active_sessions(), 1);
        drop(b);
        assert_eq!(state.active_sessions(), 0);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, state(), async {
            let _ = stop_rx.await;
        }));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("\"status\":\"ok\""), "{response}");
        assert!(response.contains("\"active_sessions\":0"), "{response}");
        assert!(response.contains("ggml-tiny"), "{response}");

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn ws_route_requires_upgrade() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, state(), async {
            let _ = stop_rx.await;
        }));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /ws HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(!response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(!response.starts_with("HTTP/1.1 101"), "{response}");

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
