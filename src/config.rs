use crate::error::ConfigError;
use crate::layout::LayoutConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level editor configuration, usually read from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub notes: NoteConfig,
}

impl EditorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|cause| ConfigError::Read {
            path: path.display().to_string(),
            cause,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Where the remote step store lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Fallback notes for proceed actions drawn without an explicit reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteConfig {
    #[serde(default = "default_passed_note")]
    pub passed: String,
    #[serde(default = "default_failed_note")]
    pub failed: String,
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            passed: default_passed_note(),
            failed: default_failed_note(),
        }
    }
}

fn default_passed_note() -> String {
    "Condition passed".to_string()
}

fn default_failed_note() -> String {
    "Condition failed".to_string()
}
