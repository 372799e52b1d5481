//! Process-wide serialization of recognizer calls.
//!
//! The per-session inference gate already keeps one call in flight per
//! session.  Some recognizers cannot take concurrent calls from *different*
//! sessions either; wrapping them in [`SerializedEngine`] puts a single
//! mutex in front of every call, shared by all sessions.

use std::sync::{Arc, Mutex, PoisonError};

use super::engine::{SttEngine, SttError};
use super::transcribe::Segment;

pub struct SerializedEngine {
    inner: Arc<dyn SttEngine>,
    lock: Mutex<()>,
}

impl SerializedEngine {
    pub fn new(inner: Arc<dyn SttEngine>) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
        }
    }
}

impl SttEngine for SerializedEngine {
    fn segments(&self, audio: &[f32]) -> Result<Vec<Segment>, SttError> {
        // A panicking recognizer poisons the lock; the `()` it guards is
        // still valid, so keep serving.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.segments(audio)
    }
}
