use std::path::{Path, PathBuf};

use deductly_classify::OpenAiConfig;
use deductly_sync::SheetsConfig;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "DEDUCTLY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "deductly.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind: String,
    pub openai: OpenAiConfig,
    pub sheets: SheetsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            openai: OpenAiConfig::default(),
            sheets: SheetsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Config file (if present) overlaid with environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::from_file(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("DEDUCTLY_BIND") {
            self.bind = bind;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(email) = lookup("GOOGLE_CLIENT_EMAIL") {
            self.sheets.client_email = Some(email);
        }
        if let Some(key) = lookup("GOOGLE_PRIVATE_KEY") {
            // Keys pasted into env vars usually carry escaped newlines.
            self.sheets.private_key = Some(key.replace("\\n", "\n"));
        }
        if let Some(id) = lookup("GOOGLE_SHEETS_ID") {
            self.sheets.spreadsheet_id = Some(id);
        }
    }
}
