//! Session controller, one per connected client.
//!
//! [`SessionController`] owns the session's [`SampleBuffer`], window policy
//! and [`InferenceGate`], and drives them from a single `select!` loop:
//!
//! ```text
//! transport.recv() ─ Audio ─▶ decode_f32le ─▶ AudioChunk(seq)
//!                                 │              └─▶ buffer.append → trim_if_over_capacity
//!                                 │                    └─▶ gate.on_chunk_arrived(policy.select_window)
//!                                 └─ DecodeError → drop chunk, keep going
//!                  ─ Close ─▶ teardown (ClientClosed)
//!                  ─ Err ───▶ teardown (TransportFailed)
//!
//! gate.next_completion() ─▶ gate.on_inference_complete (maybe re-run)
//!                          └─▶ non-empty, fresh text → transport.send_text
//! ```
//!
//! Inference runs on the blocking pool, so the loop keeps taking frames
//! while Whisper works.  On teardown an in-flight inference is detached and
//! its result never reaches the client.

use std::sync::Arc;

use thiserror::Error;

use crate::audio::{decode_f32le, AudioChunk, BufferError, DecodeError, SampleBuffer};
use crate::config::StreamConfig;
use crate::stt::SttEngine;

use super::gate::{Completion, InferenceError, InferenceGate, TranscriptionResult, Trigger};
use super::transport::{Inbound, Transport, TransportError};
use super::window::{policy_from_config, WindowPolicy};

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionError / SessionEnd
// ---------------------------------------------------------------------------

/// Everything that can go wrong inside a session.
///
/// Only `Transport` and `ResourceExhaustion` end the session; decode and
/// inference failures are logged and the session carries on.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("bad audio frame: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("sample buffer invariant violated: {0}")]
    ResourceExhaustion(#[from] BufferError),
}

/// Why a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// The client closed the connection normally.
    ClientClosed,
    /// The connection failed.
    TransportFailed(TransportError),
    /// A defect inside the session; the connection is closed.
    Fatal(SessionError),
}

impl SessionEnd {
    pub fn is_clean(&self) -> bool {
        matches!(self, SessionEnd::ClientClosed)
    }
}

// ---------------------------------------------------------------------------
// SessionReport
// ---------------------------------------------------------------------------

/// Per-session counters, logged at teardown.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub chunks: u64,
    pub samples: u64,
    pub dropped_chunks: u64,
    pub trims: u64,
    pub inferences: u64,
    pub coalesced: u64,
    pub failed_inferences: u64,
    pub abandoned_inferences: u64,
    pub emitted: u64,
    pub empty_results: u64,
    pub stale_results: u64,
}

pub struct SessionSummary {
    pub id: SessionId,
    pub end: SessionEnd,
    pub report: SessionReport,
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

pub struct SessionController<T: Transport> {
    id: SessionId,
    transport: T,
    buffer: SampleBuffer,
    policy: Box<dyn WindowPolicy>,
    gate: InferenceGate,
    next_seq: u64,
    /// End sequence of the last result sent to the client.
    last_emitted_seq: Option<u64>,
    suppress_stale: bool,
    report: SessionReport,
}

impl<T: Transport> SessionController<T> {
    pub fn new(id: SessionId, transport: T, engine: Arc<dyn SttEngine>, config: &StreamConfig) -> Self {
        Self {
            id,
            transport,
            buffer: SampleBuffer::new(config.buffer_limits(), config.sample_rate),
            policy: policy_from_config(config),
            gate: InferenceGate::new(id, engine),
            next_seq: 0,
            last_emitted_seq: None,
            suppress_stale: config.suppress_stale,
            report: SessionReport::default(),
        }
    }

    /// Run the session until the client leaves or the connection fails.
    pub async fn run(mut self) -> SessionSummary {
        log::info!(
            "session {}: opened (window policy: {})",
            self.id,
            self.policy.name()
        );

        let end = loop {
            tokio::select! {
                inbound = self.transport.recv() => match inbound {
                    Ok(Inbound::Audio(bytes)) => {
                        if let Err(e) = self.on_frame(&bytes) {
                            break SessionEnd::Fatal(e);
                        }
                    }
                    Ok(Inbound::Close) => break SessionEnd::ClientClosed,
                    Err(e) => break SessionEnd::TransportFailed(e),
                },
                completion = self.gate.next_completion() => {
                    if let Err(e) = self.on_completion(completion).await {
                        break SessionEnd::TransportFailed(e);
                    }
                }
            }
        };

        self.teardown(&end).await;
        SessionSummary {
            id: self.id,
            report: self.report(),
            end,
        }
    }

    /// Decode, buffer and maybe trigger inference for one binary frame.
    fn on_frame(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let samples = match decode_f32le(bytes) {
            Ok(samples) => samples,
            Err(e) => {
                log::warn!("session {}: {}, frame dropped", self.id, SessionError::from(e));
                self.report.dropped_chunks += 1;
                return Ok(());
            }
        };
        if samples.is_empty() {
            log::debug!("session {}: ignoring empty frame", self.id);
            return Ok(());
        }

        let chunk = AudioChunk::new(self.next_seq, samples);
        self.next_seq += 1;

        self.buffer.append(&chunk)?;
        if self.buffer.trim_if_over_capacity() {
            log::debug!(
                "session {}: trimmed buffer to {:.1}s",
                self.id,
                self.buffer.duration_secs()
            );
        }
        self.buffer.check_capacity()?;

        self.report.chunks += 1;
        self.report.samples += chunk.len() as u64;

        let (buffer, policy) = (&self.buffer, &self.policy);
        match self.gate.on_chunk_arrived(|| policy.select_window(buffer)) {
            Trigger::Dispatched { end_seq } => {
                log::debug!("session {}: inference started at chunk {end_seq}", self.id)
            }
            Trigger::Coalesced => {
                log::debug!("session {}: chunk {} coalesced", self.id, chunk.seq())
            }
            Trigger::Skipped => {
                log::debug!("session {}: no window for chunk {}", self.id, chunk.seq())
            }
        }
        Ok(())
    }

    /// Advance the gate and forward the result.  Only a failed send is an
    /// error here.
    async fn on_completion(&mut self, completion: Completion) -> Result<(), TransportError> {
        let (buffer, policy) = (&self.buffer, &self.policy);
        if let Some(Trigger::Dispatched { end_seq }) =
            self.gate.on_inference_complete(&completion, || policy.select_window(buffer))
        {
            log::debug!("session {}: re-running on audio up to chunk {end_seq}", self.id);
        }

        match completion.into_result() {
            Ok(result) => self.emit(result).await,
            Err(e) => {
                log::warn!("session {}: {}", self.id, SessionError::from(e));
                Ok(())
            }
        }
    }

    async fn emit(&mut self, result: TranscriptionResult) -> Result<(), TransportError> {
        let text = result.text.trim();
        if text.is_empty() {
            self.report.empty_results += 1;
            return Ok(());
        }
        if self.suppress_stale && self.last_emitted_seq.is_some_and(|last| result.end_seq < last) {
            log::debug!(
                "session {}: dropping stale result for chunk {}",
                self.id,
                result.end_seq
            );
            self.report.stale_results += 1;
            return Ok(());
        }

        log::debug!(
            "session {}: {} samples → {:?} in {} ms",
            self.id,
            result.window_len,
            text,
            result.elapsed.as_millis()
        );
        self.transport.send_text(text.to_string()).await?;
        self.last_emitted_seq = Some(result.end_seq);
        self.report.emitted += 1;
        Ok(())
    }

    async fn teardown(&mut self, end: &SessionEnd) {
        if self.gate.abandon() {
            log::debug!("session {}: in-flight result will be discarded", self.id);
        }
        if let Err(e) = self.transport.close().await {
            log::debug!("session {}: close failed: {e}", self.id);
        }

        match end {
            SessionEnd::ClientClosed => log::info!("session {}: closed by client", self.id),
            SessionEnd::TransportFailed(e) => {
                log::warn!("session {}: connection lost: {e}", self.id)
            }
            SessionEnd::Fatal(e) => log::error!("session {}: terminated: {e}", self.id),
        }
    }

    fn report(&self) -> SessionReport {
        let stats = self.gate.stats();
        SessionReport {
            trims: self.buffer.trim_count(),
            inferences: stats.dispatched,
            coalesced: stats.coalesced,
            failed_inferences: stats.failed,
            abandoned_inferences: stats.abandoned,
            ..self.report.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::task::JoinHandle;

    use crate::pipeline::transport::{ChannelPeer, ChannelTransport};
    use crate::stt::{MockReply, MockSttEngine, SttError};

    const QUARTER_SECOND: usize = 4_000;

    fn spawn_session(
        engine: &Arc<MockSttEngine>,
        config: StreamConfig,
    ) -> (JoinHandle<SessionSummary>, ChannelPeer) {
        let (transport, peer) = ChannelTransport::pair();
        let session = SessionController::new(SessionId(7), transport, engine.clone(), &config);
        (tokio::spawn(session.run()), peer)
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..400 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    async fn next_text(peer: &mut ChannelPeer) -> String {
        tokio::time::timeout(Duration::from_secs(2), peer.outbound.recv())
            .await
            .expect("timed out waiting for a transcription")
            .expect("outbound channel closed")
    }

    #[tokio::test]
    async fn chunk_is_transcribed_and_emitted() {
        let engine = Arc::new(MockSttEngine::ok("  hello world "));
        let (session, mut peer) = spawn_session(&engine, StreamConfig::default());

        peer.send_samples(&[0.2; QUARTER_SECOND]);
        assert_eq!(next_text(&mut peer).await, "hello world");

        peer.close();
        let summary = session.await.unwrap();
        assert!(summary.end.is_clean());
        assert_eq!(summary.report.chunks, 1);
        assert_eq!(summary.report.emitted, 1);
        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn silence_produces_no_output() {
        let engine = Arc::new(MockSttEngine::ok(""));
        let (session, mut peer) = spawn_session(&engine, StreamConfig::default());

        peer.send_samples(&vec![0.0; 16_000]);
        wait_until(|| engine.calls() == 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        peer.close();

        let summary = session.await.unwrap();
        assert_eq!(engine.seen_lens(), vec![16_000]);
        assert_eq!(summary.report.emitted, 0);
        assert!(peer.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn chunks_during_inference_cause_exactly_one_rerun() {
        let (engine, release) = MockSttEngine::echo().gated();
        let engine = Arc::new(engine);
        let (session, mut peer) = spawn_session(&engine, StreamConfig::default());

        peer.send_samples(&[0.1; QUARTER_SECOND]);
        wait_until(|| engine.calls() == 1).await;

        peer.send_samples(&[0.1; QUARTER_SECOND]);
        peer.send_samples(&[0.1; QUARTER_SECOND]);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.calls(), 1);

        release.release();
        assert_eq!(next_text(&mut peer).await, "4000 samples");

        wait_until(|| engine.calls() == 2).await;
        release.release();
        assert_eq!(next_text(&mut peer).await, "12000 samples");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.calls(), 2);
        assert_eq!(engine.max_in_flight(), 1);

        peer.close();
        let summary = session.await.unwrap();
        assert_eq!(summary.report.inferences, 2);
        assert_eq!(summary.report.coalesced, 2);
    }

    #[tokio::test]
    async fn results_arrive_in_window_order() {
        let engine = Arc::new(MockSttEngine::echo());
        let (session, mut peer) = spawn_session(&engine, StreamConfig::default());

        let mut lens = Vec::new();
        for _ in 0..5 {
            peer.send_samples(&[0.1; QUARTER_SECOND]);
            let text = next_text(&mut peer).await;
            let n: usize = text.trim_end_matches(" samples").parse().unwrap();
            lens.push(n);
        }
        peer.close();
        session.await.unwrap();

        assert!(lens.windows(2).all(|w| w[0] <= w[1]), "{lens:?}");
        assert_eq!(engine.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn bad_frame_is_dropped_and_session_continues() {
        let engine = Arc::new(MockSttEngine::echo());
        let (session, mut peer) = spawn_session(&engine, StreamConfig::default());

        peer.send_raw(vec![0, 0, 0, 0, 0]);
        peer.send_samples(&[0.3; 8]);
        assert_eq!(next_text(&mut peer).await, "8 samples");

        peer.close();
        let summary = session.await.unwrap();
        assert!(summary.end.is_clean());
        assert_eq!(summary.report.dropped_chunks, 1);
        assert_eq!(summary.report.chunks, 1);
    }

    #[tokio::test]
    async fn empty_frame_triggers_nothing() {
        let engine = Arc::new(MockSttEngine::echo());
        let (session, peer) = spawn_session(&engine, StreamConfig::default());

        peer.send_raw(Vec::new());
        tokio::time::sleep(Duration::from_millis(20)).await;
        peer.close();

        let summary = session.await.unwrap();
        assert_eq!(engine.calls(), 0);
        assert_eq!(summary.report.chunks, 0);
    }

    #[tokio::test]
    async fn recognizer_failure_keeps_session_open() {
        let engine = Arc::new(
            MockSttEngine::ok("back again")
                .scripted([MockReply::Fail(SttError::Transcription("boom".into()))]),
        );
        let (session, mut peer) = spawn_session(&engine, StreamConfig::default());

        peer.send_samples(&[0.1; QUARTER_SECOND]);
        wait_until(|| engine.calls() == 1).await;

        // Keep streaming until a fresh inference succeeds.
        let text = loop {
            peer.send_samples(&[0.1; QUARTER_SECOND]);
            match tokio::time::timeout(Duration::from_millis(50), peer.outbound.recv()).await {
                Ok(Some(text)) => break text,
                _ => continue,
            }
        };
        assert_eq!(text, "back again");

        peer.close();
        let summary = session.await.unwrap();
        assert!(summary.end.is_clean());
        assert_eq!(summary.report.failed_inferences, 1);
    }

    #[tokio::test]
    async fn recognizer_panic_keeps_session_open() {
        let engine = Arc::new(MockSttEngine::ok("still here").scripted([MockReply::Panic]));
        let (session, mut peer) = spawn_session(&engine, StreamConfig::default());

        peer.send_samples(&[0.1; QUARTER_SECOND]);
        wait_until(|| engine.calls() == 1).await;

        let text = loop {
            peer.send_samples(&[0.1; QUARTER_SECOND]);
            match tokio::time::timeout(Duration::from_millis(50), peer.outbound.recv()).await {
                Ok(Some(text)) => break text,
                _ => continue,
            }
        };
        assert_eq!(text, "still here");
        assert!(!peer.is_closed());

        peer.close();
        let summary = session.await.unwrap();
        assert!(summary.end.is_clean());
        assert_eq!(summary.report.failed_inferences, 1);
    }

    #[tokio::test]
    async fn in_flight_result_is_discarded_after_close() {
        let (engine, release) = MockSttEngine::ok("too late").gated();
        let engine = Arc::new(engine);
        let (session, mut peer) = spawn_session(&engine, StreamConfig::default());

        peer.send_samples(&[0.1; QUARTER_SECOND]);
        wait_until(|| engine.calls() == 1).await;
        peer.close();

        let summary = session.await.unwrap();
        assert!(summary.end.is_clean());
        assert_eq!(summary.report.abandoned_inferences, 1);
        assert!(peer.is_closed());

        release.release();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(peer.outbound.recv().await.is_none());
    }

    #[tokio::test]
    async fn abnormal_disconnect_is_reported() {
        let engine = Arc::new(MockSttEngine::ok("x"));
        let (session, peer) = spawn_session(&engine, StreamConfig::default());

        peer.fail(TransportError::Dropped("reset by peer".into()));
        let summary = session.await.unwrap();
        assert!(matches!(
            summary.end,
            SessionEnd::TransportFailed(TransportError::Dropped(_))
        ));
        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn long_stream_is_trimmed_to_keep_tail() {
        let engine = Arc::new(MockSttEngine::echo());
        let (session, mut peer) = spawn_session(&engine, StreamConfig::default());

        peer.send_samples(&vec![0.1; 20 * 16_000]);
        assert_eq!(next_text(&mut peer).await, "320000 samples");
        peer.send_samples(&vec![0.1; 20 * 16_000]);
        assert_eq!(next_text(&mut peer).await, "160000 samples");

        peer.close();
        let summary = session.await.unwrap();
        assert_eq!(summary.report.trims, 1);
        assert!(engine.seen_lens().iter().all(|&n| n <= 30 * 16_000));
    }

    #[tokio::test]
    async fn stale_results_are_suppressed() {
        let engine = Arc::new(MockSttEngine::ok("x"));
        let (transport, mut peer) = ChannelTransport::pair();
        let mut session =
            SessionController::new(SessionId(9), transport, engine.clone(), &StreamConfig::default());

        let fresh = TranscriptionResult {
            text: "new".into(),
            end_seq: 5,
            window_len: 10,
            elapsed: Duration::ZERO,
        };
        let stale = TranscriptionResult {
            text: "old".into(),
            end_seq: 3,
            ..fresh.clone()
        };
        session.emit(fresh).await.unwrap();
        session.emit(stale).await.unwrap();

        assert_eq!(peer.outbound.recv().await.as_deref(), Some("new"));
        assert!(peer.outbound.try_recv().is_err());
        assert_eq!(session.report().stale_results, 1);
    }

    #[test]
    fn session_id_display() {
        assert_eq!(SessionId(42).to_string(), "#42");
    }
}
