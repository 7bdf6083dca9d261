use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;
use std::{env, fs};

use crate::error::ConfigError;
use crate::feed::DEFAULT_ENDPOINT;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_LOGGLY_INPUTS: &str = "https://logs-01.loggly.com/inputs";

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Dynamodb,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_region")]
    pub region: String,
    /// Overrides the regional endpoint, e.g. `http://localhost:8000` for DynamoDB Local.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// How long a freshly created table may stay CREATING before provisioning fails.
    #[serde(default = "default_active_timeout")]
    pub active_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            region: default_region(),
            endpoint_url: None,
            active_timeout_secs: default_active_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSinkConfig {
    // Usually left blank in the file and supplied through LOGGLY_TOKEN.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default = "default_loggly_inputs")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollerConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint_url: String,
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub storage: StorageConfig,
    pub log_sink: LogSinkConfig,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_active_timeout() -> u64 {
    120
}

fn default_tag() -> String {
    "CryptoApi".to_string()
}

fn default_loggly_inputs() -> String {
    DEFAULT_LOGGLY_INPUTS.to_string()
}

/// Exports `.env` into the process environment. A missing file is fine; a
/// file that exists but cannot be read or parsed is not.
pub fn load_env_file(path: Option<&Path>) -> Result<(), ConfigError> {
    let result = match path {
        Some(p) => dotenv::from_path(p),
        None => dotenv::dotenv().map(|_| ()),
    };

    match result {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConfigError::Env(e)),
    }
}

impl PollerConfig {
    /// Loads `.env` (if any), then the YAML file named by `POLLER_CONFIG`
    /// (default `config.yaml` in the working directory), then applies
    /// environment overrides and validates.
    pub fn load() -> Result<Self, ConfigError> {
        load_env_file(None)?;

        let path = env::var("POLLER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let yaml_content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let mut config = Self::from_yaml(&yaml_content)?;
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Environment wins over the file for the values that differ per deployment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("LOGGLY_TOKEN") {
            self.log_sink.token = token;
        }
        if let Some(table) = lookup("POLLER_TABLE_NAME") {
            self.table_name = table;
        }
        if let Some(region) = lookup("POLLER_REGION") {
            self.storage.region = region;
        }
        if let Some(secs) = lookup("POLLER_INTERVAL_SECS") {
            self.poll_interval_secs = secs
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("POLLER_INTERVAL_SECS", secs.clone()))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint_url.trim().is_empty() {
            return Err(ConfigError::Missing("endpoint_url"));
        }
        if !self.endpoint_url.starts_with("http://") && !self.endpoint_url.starts_with("https://") {
            return Err(ConfigError::Invalid("endpoint_url", self.endpoint_url.clone()));
        }
        if self.table_name.trim().is_empty() {
            return Err(ConfigError::Missing("table_name"));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Missing("poll_interval_secs"));
        }
        if self.log_sink.token.trim().is_empty() {
            return Err(ConfigError::Missing("log_sink.token (or LOGGLY_TOKEN)"));
        }
        Ok(())
    }
}
