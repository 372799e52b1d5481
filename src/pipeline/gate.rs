//! Per-session inference gate.
//!
//! [`InferenceGate`] keeps at most one recognizer call in flight for its
//! session.  Calls run on tokio's blocking pool via `spawn_blocking`, so the
//! session keeps receiving and buffering audio while Whisper works.
//!
//! ```text
//! on_chunk_arrived ──Idle──▶ select window ──▶ spawn_blocking(transcribe)  [Running]
//!                  ──busy──▶ mark Pending (coalesced, nothing queued)
//!
//! next_completion ──▶ on_inference_complete
//!                       ├─ Ok,  was Running → Idle
//!                       ├─ Ok,  was Pending → select latest window, dispatch [Running]
//!                       └─ Err              → Idle (pending cleared)
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::stt::{SttEngine, SttError};

use super::session::SessionId;
use super::state::GateState;
use super::window::Window;

// ---------------------------------------------------------------------------
// InferenceError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum InferenceError {
    /// The recognizer returned an error.
    #[error(transparent)]
    Recognizer(#[from] SttError),

    /// The blocking worker panicked or was cancelled.
    #[error("inference worker failed: {0}")]
    Worker(String),
}

// ---------------------------------------------------------------------------
// Trigger / Completion / TranscriptionResult
// ---------------------------------------------------------------------------

/// What a trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A new inference started on the window ending at `end_seq`.
    Dispatched { end_seq: u64 },
    /// An inference was already in flight; the gate is now `Pending`.
    Coalesced,
    /// The policy produced no window; nothing started.
    Skipped,
}

/// A finished inference, successful or not.
#[derive(Debug)]
pub struct Completion {
    pub end_seq: u64,
    pub window_len: usize,
    pub elapsed: Duration,
    pub outcome: Result<String, InferenceError>,
}

impl Completion {
    pub fn into_result(self) -> Result<TranscriptionResult, InferenceError> {
        let text = self.outcome?;
        Ok(TranscriptionResult {
            text,
            end_seq: self.end_seq,
            window_len: self.window_len,
            elapsed: self.elapsed,
        })
    }
}

/// Text recognized from one window, tagged with the window's end sequence
/// so stale results can be told apart.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    pub text: String,
    pub end_seq: u64,
    pub window_len: usize,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// GateStats
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GateStats {
    pub dispatched: u64,
    pub coalesced: u64,
    pub skipped: u64,
    pub completed: u64,
    pub failed: u64,
    pub abandoned: u64,
}

// ---------------------------------------------------------------------------
// InferenceGate
// ---------------------------------------------------------------------------

struct InFlight {
    end_seq: u64,
    window_len: usize,
    started: Instant,
    handle: JoinHandle<Result<String, SttError>>,
}

pub struct InferenceGate {
    session: SessionId,
    engine: Arc<dyn SttEngine>,
    state: GateState,
    in_flight: Option<InFlight>,
    stats: GateStats,
}

impl InferenceGate {
    pub fn new(session: SessionId, engine: Arc<dyn SttEngine>) -> Self {
        Self {
            session,
            engine,
            state: GateState::Idle,
            in_flight: None,
            stats: GateStats::default(),
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn stats(&self) -> GateStats {
        self.stats
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// React to newly buffered audio.
    ///
    /// `select` is only called when the gate is idle, so a busy gate never
    /// pays for a window copy.
    pub fn on_chunk_arrived<F>(&mut self, select: F) -> Trigger
    where
        F: FnOnce() -> Option<Window>,
    {
        if !self.state.is_busy() {
            return self.dispatch_from(select);
        }
        self.state = GateState::Pending;
        self.stats.coalesced += 1;
        Trigger::Coalesced
    }

    /// Wait for the in-flight inference to finish.
    ///
    /// Never resolves while nothing is in flight.  Cancel-safe: dropping the
    /// future leaves the job in place for the next call.
    pub async fn next_completion(&mut self) -> Completion {
        let Some(job) = self.in_flight.as_mut() else {
            return std::future::pending().await;
        };

        let joined = (&mut job.handle).await;
        let end_seq = job.end_seq;
        let window_len = job.window_len;
        let elapsed = job.started.elapsed();
        self.in_flight = None;

        let outcome = match joined {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(InferenceError::Recognizer(e)),
            Err(e) => Err(InferenceError::Worker(e.to_string())),
        };

        Completion {
            end_seq,
            window_len,
            elapsed,
            outcome,
        }
    }

    /// Advance the state machine after `completion`.
    ///
    /// Returns the re-trigger when audio arrived during the finished run.
    pub fn on_inference_complete<F>(&mut self, completion: &Completion, select: F) -> Option<Trigger>
    where
        F: FnOnce() -> Option<Window>,
    {
        let was_pending = self.state == GateState::Pending;

        if completion.outcome.is_err() {
            self.stats.failed += 1;
            self.state = GateState::Idle;
            return None;
        }

        self.stats.completed += 1;
        self.state = GateState::Idle;
        was_pending.then(|| self.dispatch_from(select))
    }

    /// Detach the in-flight inference, if any.  It finishes on its worker
    /// thread and its output is dropped.
    pub fn abandon(&mut self) -> bool {
        self.state = GateState::Idle;
        match self.in_flight.take() {
            Some(job) => {
                log::debug!(
                    "session {}: abandoning inference on window ending at chunk {}",
                    self.session,
                    job.end_seq
                );
                self.stats.abandoned += 1;
                true
            }
            None => false,
        }
    }

    fn dispatch_from<F>(&mut self, select: F) -> Trigger
    where
        F: FnOnce() -> Option<Window>,
    {
        match select() {
            Some(window) if !window.is_empty() => {
                let end_seq = window.end_seq;
                self.dispatch(window);
                Trigger::Dispatched { end_seq }
            }
            _ => {
                self.state = GateState::Idle;
                self.stats.skipped += 1;
                Trigger::Skipped
            }
        }
    }

    fn dispatch(&mut self, window: Window) {
        log::debug!(
            "session {}: dispatching {} samples ending at chunk {}",
            self.session,
            window.len(),
            window.end_seq
        );

        let engine = Arc::clone(&self.engine);
        let end_seq = window.end_seq;
        let window_len = window.len();
        let handle = tokio::task::spawn_blocking(move || engine.transcribe(&window.samples));

        self.in_flight = Some(InFlight {
            end_seq,
            window_len,
            started: Instant::now(),
            handle,
        });
        self.state = GateState::Running;
        self.stats.dispatched += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
