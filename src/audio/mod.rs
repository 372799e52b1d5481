//! Audio handling: frame decoding → chunks → bounded sample buffer.
//!
//! # Pipeline
//!
//! ```text
//! binary frame → decode_f32le → AudioChunk (seq) → SampleBuffer::append
//!                                                → SampleBuffer::trim_if_over_capacity
//! ```
//!
//! [`VoiceDetector`] is an optional energy gate used by the voice-gated
//! window policy.

pub mod buffer;
pub mod chunk;
pub mod decode;
pub mod vad;

pub use buffer::{BufferError, BufferLimits, SampleBuffer};
pub use chunk::AudioChunk;
pub use decode::{decode_f32le, DecodeError};
pub use vad::VoiceDetector;
