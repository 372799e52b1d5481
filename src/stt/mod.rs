//! STT (Speech-to-Text) engine module.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  SttEngine (trait)                  │
//! │                                                     │
//! │   ┌──────────────────┐      ┌───────────────┐       │
//! │   │ SerializedEngine │─────▶│ WhisperEngine │       │
//! │   │ (optional mutex) │      │ - ctx         │       │
//! │   └──────────────────┘      │ - params      │       │
//! │                             └──────┬────────┘       │
//! │                                    ▼                │
//! │                     segments() → join_segments()    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use stenny::stt::{SttEngine, TranscribeParams, WhisperEngine};
//!
//! let engine = WhisperEngine::load("models/ggml-tiny.bin", TranscribeParams::default())
//!     .expect("model not found");
//!
//! // audio: 16 kHz, mono, f32 PCM
//! let audio: Vec<f32> = vec![0.0; 16_000]; // 1 s of silence
//! let text = engine.transcribe(&audio).unwrap();
//! println!("{text}");
//! ```

pub mod engine;
pub mod serialized;
pub mod transcribe;

#[cfg(test)]
pub mod mock;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{SttEngine, SttError, WhisperEngine};
pub use serialized::SerializedEngine;
pub use transcribe::{join_segments, Segment, TranscribeParams};

#[cfg(test)]
pub use mock::{MockReply, MockSttEngine};
