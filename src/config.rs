use brewlog_core::{JournalConfig, RemoteConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the local brew slot
    pub data_dir: ConfigValue<PathBuf>,
    /// Name of the local slot (file stem)
    pub storage_key: ConfigValue<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Remote document store
    pub remote: RemoteConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    storage_key: Option<String>,
    remote: Option<RemoteConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut storage_key = ConfigValue::new("coffee-brews".to_string(), ConfigSource::Default);
        let mut config_file = None;
        let mut remote = RemoteConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(key) = file_config.storage_key {
                storage_key = ConfigValue::new(key, ConfigSource::File);
            }
            if let Some(remote_config) = file_config.remote {
                remote = remote_config;
            }
        }

        // Apply environment variable overrides
        if let Ok(dir) = std::env::var("BREWLOG_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(key) = std::env::var("BREWLOG_STORAGE_KEY") {
            storage_key = ConfigValue::new(key, ConfigSource::Environment);
        }
        // Remote env var overrides
        if let Ok(endpoint) = std::env::var("BREWLOG_REMOTE_ENDPOINT") {
            remote.endpoint = Some(endpoint);
        }
        if let Ok(region) = std::env::var("BREWLOG_REGION") {
            remote.region = region;
        }
        if let Ok(key_id) = std::env::var("BREWLOG_ACCESS_KEY_ID") {
            remote.access_key_id = Some(key_id);
        }
        if let Ok(secret) = std::env::var("BREWLOG_SECRET_ACCESS_KEY") {
            remote.secret_access_key = Some(secret);
        }
        if let Ok(table) = std::env::var("BREWLOG_TABLE_NAME") {
            remote.table_name = table;
        }

        Ok(Self {
            data_dir,
            storage_key,
            config_file,
            remote,
        })
    }

    /// Settings for building the journal.
    pub fn journal(&self) -> JournalConfig {
        JournalConfig {
            data_dir: self.data_dir.value.clone(),
            storage_key: self.storage_key.value.clone(),
            remote: self.remote.clone(),
        }
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/brewlog/
    /// - macOS: ~/Library/Application Support/brewlog/
    /// - Windows: %APPDATA%/brewlog/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("brewlog")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/brewlog/
    /// - macOS: ~/Library/Application Support/brewlog/
    /// - Windows: %APPDATA%/brewlog/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("brewlog")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
