//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\stenny\
//!   macOS:   ~/Library/Application Support/stenny/
//!   Linux:   ~/.config/stenny/
//!
//! Data dir (models):
//!   Windows: %LOCALAPPDATA%\stenny\
//!   macOS:   ~/Library/Application Support/stenny/
//!   Linux:   ~/.local/share/stenny/

use std::path::PathBuf;

/// Environment variable that points at an explicit `settings.toml`.
pub const CONFIG_ENV: &str = "STENNY_CONFIG";

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`, or the `STENNY_CONFIG` override.
    pub settings_file: PathBuf,
    /// Directory for downloaded GGML model files.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "stenny";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join("settings.toml"));
        let models_dir = data_dir.join("models");

        Self {
            config_dir,
            settings_file,
            models_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths.models_dir.ends_with("models"));
        assert!(paths
            .settings_file
            .to_str()
            .is_some_and(|s| !s.is_empty()));
    }
}
