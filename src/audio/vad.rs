//! Simple energy-based voice activity detection.
//!
//! Audio is split into 30 ms frames (480 samples @ 16 kHz).  A frame is
//! classified as *voice* when its RMS amplitude exceeds the configured
//! threshold.  The voice-gated window policy uses this to skip inference
//! while the client is only sending silence.

// ---------------------------------------------------------------------------
// VoiceDetector
// ---------------------------------------------------------------------------

/// Energy-based voice detector.
///
/// # Example
///
/// ```rust
/// use stenny::audio::VoiceDetector;
///
/// // 0.01 RMS threshold, typical for a quiet room
/// let vad = VoiceDetector::new(0.01);
///
/// let mut audio = vec![0.0_f32; 480];
/// assert!(!vad.has_voice(&audio));
///
/// audio.extend(vec![0.5_f32; 480]);
/// assert!(vad.has_voice(&audio));
/// ```
#[derive(Debug, Clone)]
pub struct VoiceDetector {
    /// RMS amplitude threshold; frames at or below this are silence.
    rms_threshold: f32,
    /// Frame size in samples.  Default: 480 samples = 30 ms at 16 kHz.
    frame_size: usize,
}

impl VoiceDetector {
    /// `rms_threshold` should be in `[0.0, 1.0]`.  A typical value is
    /// `0.01` for quiet microphones; use `0.02`–`0.05` in noisy environments.
    pub fn new(rms_threshold: f32) -> Self {
        Self {
            rms_threshold,
            frame_size: 480, // 30 ms at 16 kHz
        }
    }

    fn is_voice_frame(&self, frame: &[f32]) -> bool {
        if frame.is_empty() {
            return false;
        }
        let mean_sq: f32 = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
        mean_sq.sqrt() > self.rms_threshold
    }

    /// Returns `true` when at least one frame of `audio` carries voice.
    pub fn has_voice(&self, audio: &[f32]) -> bool {
        audio
            .chunks(self.frame_size)
            .any(|frame| self.is_voice_frame(frame))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
