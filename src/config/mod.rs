//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the server,
//! the recognizer and the per-session stream, `AppPaths` for cross-platform
//! data directories, and TOML loading via `AppConfig::load`.

pub mod paths;
pub mod settings;

pub use paths::{AppPaths, CONFIG_ENV};
pub use settings::{
    AppConfig, ConfigError, ServerConfig, StreamConfig, SttConfig, VoiceGateConfig, WindowConfig,
    SAMPLE_RATE,
};
