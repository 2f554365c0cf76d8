//! Client settings, stored as JSON in the platform config directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides [`ClientSettings::api_base_url`]
pub const BASE_URL_ENV: &str = "AGENTSYNC_API_BASE_URL";

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_true() -> bool {
    true
}

/// Voice input settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeechSettings {
    /// Recognizer program followed by its arguments. Empty disables voice input.
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientSettings {
    #[serde(default = "default_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub speech: SpeechSettings,
    #[serde(default = "default_true")]
    pub dark_mode: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_base_url(),
            request_timeout_secs: default_timeout_secs(),
            speech: SpeechSettings::default(),
            dark_mode: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("no config directory available on this platform")]
    NoConfigDir,

    #[error("settings I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Default location of `settings.json`
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        directories::ProjectDirs::from("com.local", "AgentSync", "AgentSync")
            .map(|p| p.config_dir().join("settings.json"))
            .ok_or(SettingsError::NoConfigDir)
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let bytes = fs::read(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let bytes = serde_json::to_vec_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, bytes).map_err(io_err)
    }

    /// Load from `path`, falling back to defaults when the file is missing or
    /// unreadable. The base URL environment override is applied afterwards.
    pub fn load_or_default(path: &Path) -> Self {
        let mut settings = if path.exists() {
            match Self::load_from(path) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("{e}; using default settings");
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        settings.apply_env_override(std::env::var(BASE_URL_ENV).ok());
        settings
    }

    pub fn apply_env_override(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.map(|u| u.trim().to_string()) {
            if !url.is_empty() {
                self.api_base_url = url;
            }
        }
    }
}
