//! Transcription parameter types and result types.
//!
//! [`TranscribeParams`] carries all settings that control a single Whisper
//! inference run.  [`Segment`] is what one run returns, in order.

// ---------------------------------------------------------------------------
// TranscribeParams
// ---------------------------------------------------------------------------

/// All parameters for a single Whisper transcription run.
///
/// ```
/// use stenny::stt::TranscribeParams;
///
/// let params = TranscribeParams {
///     language: "de".into(),
///     ..TranscribeParams::default()
/// };
/// assert_eq!(params.language, "de");
/// ```
#[derive(Debug, Clone)]
pub struct TranscribeParams {
    /// ISO-639-1 language code (e.g. `"en"`), or `"auto"` to let Whisper
    /// detect the language automatically.
    pub language: String,

    /// Candidates per step for greedy decoding.  Streaming re-transcribes
    /// the whole window on every trigger, so the default of 1 keeps each run
    /// fast and deterministic for a given window.
    pub best_of: i32,

    /// Number of CPU threads handed to Whisper.  Defaults to
    /// [`optimal_threads()`], capped at 8.
    pub n_threads: i32,

    /// Suppress Whisper's progress output to stderr.
    pub suppress_progress: bool,
}

impl Default for TranscribeParams {
    fn default() -> Self {
        Self {
            language: "en".into(),
            best_of: 1,
            n_threads: optimal_threads(),
            suppress_progress: true,
        }
    }
}

/// Returns the number of CPU threads to use for inference, capped at 8 to
/// avoid diminishing returns on Whisper.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A single time-aligned text chunk produced by the recognizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Segment text, usually with a leading space.
    pub text: String,
    /// Segment start time in milliseconds from the start of the audio.
    pub start_ms: u64,
    /// Segment end time in milliseconds from the start of the audio.
    pub end_ms: u64,
}

/// Concatenate segment texts in order and trim surrounding whitespace.
///
/// ```
/// use stenny::stt::{join_segments, Segment};
///
/// let segments = vec![
///     Segment { text: " Hello".into(), start_ms: 0, end_ms: 500 },
///     Segment { text: " world. ".into(), start_ms: 500, end_ms: 900 },
/// ];
/// assert_eq!(join_segments(&segments), "Hello world.");
/// ```
pub fn join_segments(segments: &[Segment]) -> String {
    let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
    joined.trim().to_string()
}
