//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  Every section is
//! `#[serde(default)]`, so a settings file only needs the keys it changes.
//!
//! ```toml
//! [server]
//! port = 8000
//!
//! [stt]
//! model = "ggml-base.en"
//!
//! [stream]
//! max_retention_secs = 30.0
//! keep_tail_secs = 10.0
//!
//! [stream.window]
//! policy = "sliding"
//! window_secs = 8.0
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;
use crate::audio::BufferLimits;
use crate::stt::TranscribeParams;

/// The only sample rate clients may send and Whisper accepts.
pub const SAMPLE_RATE: u32 = 16_000;

/// Upper bound for every duration setting (10 minutes, ~38 MB of samples).
pub const MAX_DURATION_SECS: f32 = 600.0;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Settings that parse but cannot be served.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("sample_rate must be {SAMPLE_RATE} Hz, got {0}")]
    UnsupportedSampleRate(u32),

    #[error("max_retention_secs must be finite, at least one sample and at most {MAX_DURATION_SECS}, got {0}")]
    InvalidRetention(f32),

    #[error("keep_tail_secs must be at least one sample and at most max_retention_secs, got {keep} (max {max})")]
    InvalidKeepTail { keep: f32, max: f32 },

    #[error("sliding window_secs must be finite, at least one sample and at most {MAX_DURATION_SECS}, got {0}")]
    InvalidWindow(f32),

    #[error("voice gate lookback_secs must be finite, at least one sample and at most {MAX_DURATION_SECS}, got {0}")]
    InvalidLookback(f32),

    #[error("voice gate threshold must be finite and >= 0, got {0}")]
    InvalidThreshold(f32),
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// HTTP / WebSocket listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (`0.0.0.0` for all).
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// `host:port`, ready for `SocketAddr` parsing.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper STT engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// GGML model file stem looked up in the models directory
    /// (e.g. `"ggml-tiny"` → `<models_dir>/ggml-tiny.bin`).
    pub model: String,
    /// Explicit model file; takes precedence over `model`.
    pub model_path: Option<PathBuf>,
    /// ISO-639-1 language code, or `"auto"`.
    pub language: String,
    /// Whisper CPU threads; `None` picks a default from the core count.
    pub n_threads: Option<i32>,
    /// Serialize recognizer calls across all sessions.
    pub serialize_calls: bool,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "ggml-tiny".into(),
            model_path: None,
            language: "en".into(),
            n_threads: None,
            serialize_calls: false,
        }
    }
}

impl SttConfig {
    pub fn resolve_model_path(&self, paths: &AppPaths) -> PathBuf {
        match &self.model_path {
            Some(path) => path.clone(),
            None => paths.models_dir.join(format!("{}.bin", self.model)),
        }
    }

    pub fn transcribe_params(&self) -> TranscribeParams {
        let defaults = TranscribeParams::default();
        TranscribeParams {
            language: self.language.clone(),
            n_threads: self.n_threads.unwrap_or(defaults.n_threads),
            ..defaults
        }
    }
}

// ---------------------------------------------------------------------------
// StreamConfig
// ---------------------------------------------------------------------------

/// Which samples each inference sees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum WindowConfig {
    /// Re-transcribe every retained sample.
    #[default]
    WholeBuffer,
    /// Transcribe only the most recent `window_secs`.
    Sliding { window_secs: f32 },
}

/// Energy gate that skips inference while the client sends silence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceGateConfig {
    /// RMS threshold for a 30 ms frame to count as voice.
    pub threshold: f32,
    /// How much recent audio must contain voice for inference to run.
    pub lookback_secs: f32,
}

impl Default for VoiceGateConfig {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            lookback_secs: 1.0,
        }
    }
}

/// Per-session buffering and windowing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Must be 16 000.
    pub sample_rate: u32,
    /// Retained audio above which the buffer is trimmed.
    pub max_retention_secs: f32,
    /// Retained audio right after a trim.
    pub keep_tail_secs: f32,
    pub window: WindowConfig,
    /// Disabled when absent.
    pub voice_gate: Option<VoiceGateConfig>,
    /// Drop results older than the last one sent.
    pub suppress_stale: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            max_retention_secs: 30.0,
            keep_tail_secs: 10.0,
            window: WindowConfig::default(),
            voice_gate: None,
            suppress_stale: true,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate != SAMPLE_RATE {
            return Err(ConfigError::UnsupportedSampleRate(self.sample_rate));
        }
        if !self.is_sane_duration(self.max_retention_secs) {
            return Err(ConfigError::InvalidRetention(self.max_retention_secs));
        }
        if !(self.is_sane_duration(self.keep_tail_secs)
            && self.keep_tail_secs <= self.max_retention_secs)
        {
            return Err(ConfigError::InvalidKeepTail {
                keep: self.keep_tail_secs,
                max: self.max_retention_secs,
            });
        }
        if let WindowConfig::Sliding { window_secs } = self.window {
            if !self.is_sane_duration(window_secs) {
                return Err(ConfigError::InvalidWindow(window_secs));
            }
        }
        if let Some(gate) = &self.voice_gate {
            if !self.is_sane_duration(gate.lookback_secs) {
                return Err(ConfigError::InvalidLookback(gate.lookback_secs));
            }
            if !(gate.threshold.is_finite() && gate.threshold >= 0.0) {
                return Err(ConfigError::InvalidThreshold(gate.threshold));
            }
        }
        Ok(())
    }

    /// Finite, at most [`MAX_DURATION_SECS`], and at least one whole sample
    /// once rounded.
    fn is_sane_duration(&self, secs: f32) -> bool {
        secs.is_finite()
            && secs <= MAX_DURATION_SECS
            && (secs * self.sample_rate as f32).round() >= 1.0
    }

    /// Sample-count limits for a session buffer.  Call on a validated config.
    pub fn buffer_limits(&self) -> BufferLimits {
        BufferLimits::from_secs(self.max_retention_secs, self.keep_tail_secs, self.sample_rate)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use stenny::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// println!("listening on {}", config.server.bind_addr());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub stt: SttConfig,
    pub stream: StreamConfig,
}

impl AppConfig {
    /// Load from `STENNY_CONFIG` or the platform `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load and validate from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stream.validate()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
