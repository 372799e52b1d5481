//! Streaming session pipeline.
//!
//! This module holds the per-connection controller that turns an unbounded
//! stream of audio frames into incremental transcriptions.
//!
//! # Architecture
//!
//! ```text
//! Transport (WebSocket)
//!        │ Inbound::Audio
//!        ▼
//! SessionController::run()  ← one tokio task per client
//!        │
//!        ├─ SampleBuffer::append + trim_if_over_capacity
//!        ├─ WindowPolicy::select_window
//!        └─ InferenceGate ── spawn_blocking(SttEngine::transcribe)   (≤ 1 in flight)
//!                 │
//!                 └─ completion → non-empty text → Transport::send_text
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stenny::config::StreamConfig;
//! use stenny::pipeline::{SessionController, SessionId, Transport};
//! use stenny::stt::SttEngine;
//!
//! # async fn example<T: Transport>(transport: T, engine: Arc<dyn SttEngine>) {
//! let session = SessionController::new(SessionId(1), transport, engine, &StreamConfig::default());
//! let summary = session.run().await;
//! println!("{:?}", summary.report);
//! # }
//! ```

pub mod gate;
pub mod session;
pub mod state;
pub mod transport;
pub mod window;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use gate::{Completion, GateStats, InferenceError, InferenceGate, TranscriptionResult, Trigger};
pub use session::{
    SessionController, SessionEnd, SessionError, SessionId, SessionReport, SessionSummary,
};
pub use state::GateState;
pub use transport::{Inbound, Transport, TransportError};
pub use window::{policy_from_config, Sliding, VoiceGated, WholeBuffer, Window, WindowPolicy};
