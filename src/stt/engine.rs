//! Core STT engine trait and the Whisper implementation.
//!
//! # Overview
//!
//! [`SttEngine`] is the recognizer interface consumed by the inference gate.
//! It is object-safe and `Send + Sync` so one loaded model can be shared by
//! every session behind an `Arc<dyn SttEngine>`.
//!
//! [`WhisperEngine`] is the production implementation that wraps a
//! `whisper_rs::WhisperContext`.  Construct it with [`WhisperEngine::load`].

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::stt::transcribe::{join_segments, Segment, TranscribeParams};

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the STT subsystem.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SttError {
    /// The GGML model file was not found at the given path.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// `whisper_rs` failed to initialise a `WhisperContext` or `WhisperState`.
    #[error("Whisper context initialisation failed: {0}")]
    ContextInit(String),

    /// An error occurred during the inference pass.
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// The recognizer was handed zero samples.
    #[error("No audio to transcribe")]
    EmptyAudio,
}

// ---------------------------------------------------------------------------
// SttEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech-to-text engines.
///
/// # Contract
///
/// - `audio` is **16 kHz, mono, f32** PCM in `[-1, 1]`.
/// - Calls block the current thread; run them on the blocking pool.
/// - With greedy decoding the same audio yields the same segments.
pub trait SttEngine: Send + Sync {
    /// Recognize `audio` and return its time-aligned segments in order.
    fn segments(&self, audio: &[f32]) -> Result<Vec<Segment>, SttError>;

    /// Recognize `audio` and return the joined, trimmed transcript.
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError> {
        self.segments(audio).map(|segments| join_segments(&segments))
    }
}

// Compile-time assertion: Box<dyn SttEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SttEngine>) {}
};

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Production STT engine that wraps a `whisper_rs::WhisperContext`.
///
/// A new `WhisperState` is created for every call, so concurrent calls from
/// different sessions do not share decoder state.
pub struct WhisperEngine {
    ctx: WhisperContext,
    params: TranscribeParams,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs; the model
// weights are read-only after loading.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    /// Load a GGML model from `model_path` and prepare it for inference.
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelNotFound`]: `model_path` does not exist.
    /// - [`SttError::ContextInit`]: whisper-rs failed to load the file.
    pub fn load(model_path: impl AsRef<Path>, params: TranscribeParams) -> Result<Self, SttError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        Ok(Self { ctx, params })
    }

    pub fn params(&self) -> &TranscribeParams {
        &self.params
    }
}

impl SttEngine for WhisperEngine {
    /// One inference pass on a fresh `WhisperState`.
    fn segments(&self, audio: &[f32]) -> Result<Vec<Segment>, SttError> {
        if audio.is_empty() {
            return Err(SttError::EmptyAudio);
        }

        let mut fp = FullParams::new(SamplingStrategy::Greedy {
            best_of: self.params.best_of,
        });

        // `fp` borrows the language string until `state.full` returns.
        let lang: Option<&str> = if self.params.language == "auto" {
            None
        } else {
            Some(self.params.language.as_str())
        };
        fp.set_language(lang);
        fp.set_n_threads(self.params.n_threads);

        if self.params.suppress_progress {
            fp.set_print_progress(false);
            fp.set_print_realtime(false);
        }

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        state
            .full(fp, audio)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut segments: Vec<Segment> = Vec::with_capacity(n_segments.max(0) as usize);
        for i in 0..n_segments {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;

            // Timestamps are in centiseconds.
            let t0 = state.full_get_segment_t0(i).unwrap_or(0).max(0) as u64 * 10;
            let t1 = state.full_get_segment_t1(i).unwrap_or(0).max(0) as u64 * 10;

            segments.push(Segment {
                text,
                start_ms: t0,
                end_ms: t1,
            });
        }

        Ok(segments)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
