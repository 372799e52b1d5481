//! Windowing policies: which samples go to the recognizer.
//!
//! A policy looks at the session's [`SampleBuffer`] and returns the
//! [`Window`] to transcribe, or `None` to skip inference for this trigger.
//! No policy ever returns an empty window.
//!
//! | Policy        | Window                                               |
//! |---------------|------------------------------------------------------|
//! | `WholeBuffer` | every retained sample (default)                      |
//! | `Sliding`     | the most recent `window_secs`                        |
//! | `VoiceGated`  | the inner policy's window, only if the tail has voice |

use crate::audio::{SampleBuffer, VoiceDetector};
use crate::config::{StreamConfig, WindowConfig};

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Owned snapshot of the samples submitted for one inference.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub samples: Vec<f32>,
    /// Sequence number of the newest chunk covered by the window.
    pub end_seq: u64,
}

impl Window {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ---------------------------------------------------------------------------
// WindowPolicy
// ---------------------------------------------------------------------------

pub trait WindowPolicy: Send + Sync {
    fn select_window(&self, buffer: &SampleBuffer) -> Option<Window>;

    fn name(&self) -> &'static str;
}

/// Wrap `samples` in a window ending at the buffer's newest chunk.
fn window_of(buffer: &SampleBuffer, samples: Vec<f32>) -> Option<Window> {
    if samples.is_empty() {
        return None;
    }
    let end_seq = buffer.end_seq()?;
    Some(Window { samples, end_seq })
}

/// Re-transcribe the entire retained buffer on every trigger.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeBuffer;

impl WindowPolicy for WholeBuffer {
    fn select_window(&self, buffer: &SampleBuffer) -> Option<Window> {
        window_of(buffer, buffer.snapshot())
    }

    fn name(&self) -> &'static str {
        "whole_buffer"
    }
}

/// Transcribe only the most recent `window_samples`.
#[derive(Debug, Clone, Copy)]
pub struct Sliding {
    window_samples: usize,
}

impl Sliding {
    /// # Panics
    ///
    /// Panics if `window_samples == 0`.
    pub fn new(window_samples: usize) -> Self {
        assert!(window_samples > 0, "Sliding window must be > 0 samples");
        Self { window_samples }
    }

    pub fn from_secs(window_secs: f32, sample_rate: u32) -> Self {
        Self::new(((window_secs * sample_rate as f32).round() as usize).max(1))
    }
}

impl WindowPolicy for Sliding {
    fn select_window(&self, buffer: &SampleBuffer) -> Option<Window> {
        window_of(buffer, buffer.tail(self.window_samples).to_vec())
    }

    fn name(&self) -> &'static str {
        "sliding"
    }
}

/// Skip inference while the most recent audio is silence.
pub struct VoiceGated {
    inner: Box<dyn WindowPolicy>,
    detector: VoiceDetector,
    lookback_samples: usize,
}

impl VoiceGated {
    pub fn new(inner: Box<dyn WindowPolicy>, detector: VoiceDetector, lookback_samples: usize) -> Self {
        Self {
            inner,
            detector,
            lookback_samples,
        }
    }
}

impl WindowPolicy for VoiceGated {
    fn select_window(&self, buffer: &SampleBuffer) -> Option<Window> {
        if !self.detector.has_voice(buffer.tail(self.lookback_samples)) {
            return None;
        }
        self.inner.select_window(buffer)
    }

    fn name(&self) -> &'static str {
        "voice_gated"
    }
}

/// Build the policy described by `config`.
pub fn policy_from_config(config: &StreamConfig) -> Box<dyn WindowPolicy> {
    let base: Box<dyn WindowPolicy> = match &config.window {
        WindowConfig::WholeBuffer => Box::new(WholeBuffer),
        WindowConfig::Sliding { window_secs } => {
            Box::new(Sliding::from_secs(*window_secs, config.sample_rate))
        }
    };

    match &config.voice_gate {
        Some(gate) => {
            let lookback = (gate.lookback_secs * config.sample_rate as f32).round() as usize;
            Box::new(VoiceGated::new(
                base,
                VoiceDetector::new(gate.threshold),
                lookback.max(1),
            ))
        }
        None => base,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
