//! Streaming speech-to-text over WebSocket.
//!
//! Clients stream 16 kHz mono `f32` PCM as binary frames; each session
//! re-transcribes its buffered audio with Whisper and pushes the text back.

pub mod audio;
pub mod config;
pub mod pipeline;
pub mod server;
pub mod stt;
