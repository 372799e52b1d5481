//! Test doubles for [`SttEngine`].
//!
//! [`MockSttEngine`] answers from a script (falling back to a fixed reply),
//! counts calls, tracks how many calls overlap, and can be *gated* so each
//! call blocks until the test releases it.  Gating is how the pipeline tests
//! hold an inference in flight while more audio arrives.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Mutex};

use super::engine::{SttEngine, SttError};
use super::transcribe::Segment;

/// What a single mock call answers.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Fixed text (may be empty for silence).
    Text(String),
    /// `"<n> samples"`, where `n` is the window length.
    Echo,
    /// Fail the call.
    Fail(SttError),
    /// Panic inside the call, as a crashed recognizer would.
    Panic,
}

pub struct MockSttEngine {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    gate: Option<Mutex<mpsc::Receiver<()>>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seen_lens: Mutex<Vec<usize>>,
}

/// Releases gated calls one at a time.  Dropping it releases every call.
pub struct MockRelease(mpsc::Sender<()>);

impl MockRelease {
    pub fn release(&self) {
        let _ = self.0.send(());
    }
}

impl MockSttEngine {
    fn with_fallback(fallback: MockReply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            gate: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            seen_lens: Mutex::new(Vec::new()),
        }
    }

    /// Always answers `text`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self::with_fallback(MockReply::Text(text.into()))
    }

    /// Always fails with `error`.
    pub fn err(error: SttError) -> Self {
        Self::with_fallback(MockReply::Fail(error))
    }

    /// Always answers `"<window length> samples"`.
    pub fn echo() -> Self {
        Self::with_fallback(MockReply::Echo)
    }

    /// Answer `replies` in order before falling back.
    pub fn scripted(mut self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        self.script = Mutex::new(replies.into_iter().collect());
        self
    }

    /// Block every call until the returned handle releases it.
    pub fn gated(mut self) -> (Self, MockRelease) {
        let (tx, rx) = mpsc::channel();
        self.gate = Some(Mutex::new(rx));
        (self, MockRelease(tx))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Window lengths in call order.
    pub fn seen_lens(&self) -> Vec<usize> {
        self.seen_lens.lock().unwrap().clone()
    }
}

impl SttEngine for MockSttEngine {
    fn segments(&self, audio: &[f32]) -> Result<Vec<Segment>, SttError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.seen_lens.lock().unwrap().push(audio.len());

        if let Some(gate) = &self.gate {
            // A dropped MockRelease unblocks instead of hanging the test.
            let _ = gate.lock().unwrap().recv();
        }

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let end_ms = audio.len() as u64 * 1000 / 16_000;
        let text = match reply {
            MockReply::Text(text) => text,
            MockReply::Echo => format!("{} samples", audio.len()),
            MockReply::Fail(e) => return Err(e),
            MockReply::Panic => panic!("mock recognizer panicked"),
        };
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Segment {
            text,
            start_ms: 0,
            end_ms,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn ok_returns_configured_text() {
        let engine = MockSttEngine::ok("hello");
        assert_eq!(engine.transcribe(&[0.0; 8]).unwrap(), "hello");
        assert_eq!(engine.calls(), 1);
    }

    #[test]
    fn err_returns_configured_error() {
        let engine = MockSttEngine::err(SttError::Transcription("boom".into()));
        assert!(matches!(
            engine.transcribe(&[0.0; 8]),
            Err(SttError::Transcription(_))
        ));
    }

    #[test]
    fn script_runs_before_fallback() {
        let engine = MockSttEngine::ok("after").scripted([
            MockReply::Fail(SttError::Transcription("first".into())),
            MockReply::Echo,
        ]);
        assert!(engine.transcribe(&[0.0; 3]).is_err());
        assert_eq!(engine.transcribe(&[0.0; 3]).unwrap(), "3 samples");
        assert_eq!(engine.transcribe(&[0.0; 3]).unwrap(), "after");
        assert_eq!(engine.seen_lens(), vec![3, 3, 3]);
    }

    #[test]
    fn panic_reply_panics_and_next_call_works() {
        let engine = MockSttEngine::ok("fine").scripted([MockReply::Panic]);
        let crashed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            engine.transcribe(&[0.0; 4])
        }));
        assert!(crashed.is_err());
        assert_eq!(engine.transcribe(&[0.0; 4]).unwrap(), "fine");
    }

    #[test]
    fn empty_text_has_no_segments() {
        let engine = MockSttEngine::ok("");
        assert!(engine.segments(&[0.0; 8]).unwrap().is_empty());
    }

    #[test]
    fn gated_call_waits_for_release() {
        let (engine, release) = MockSttEngine::ok("done").gated();
        let engine = Arc::new(engine);

        let worker = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.transcribe(&[0.0; 4]))
        };
        release.release();

        assert_eq!(worker.join().unwrap().unwrap(), "done");
        assert_eq!(engine.max_in_flight(), 1);
    }
}
