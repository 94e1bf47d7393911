//! Configuration system for hashdrop.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $HASHDROP_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/hashdrop/config.toml
//!   3. ~/.config/hashdrop/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::payload::{PayloadSpec, PayloadSpecError, DEFAULT_ALPHABET, DEFAULT_PAYLOAD_SIZE};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HashdropConfig {
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
    pub payload: PayloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Directory the current payload is written to.
    pub storage_dir: PathBuf,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Base URL of the producer service.
    pub producer_url: String,
    /// Directory received payloads are written to.
    pub storage_dir: PathBuf,
    /// Name the received payload is stored and logged under.
    pub payload_name: String,
    /// Per-request timeout for producer calls, in seconds.
    pub request_timeout_secs: u64,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub backend: LogBackend,
    /// SQLite database path. Ignored by the memory backend.
    pub path: PathBuf,
}

/// Digest algorithms the protocol accepts. Only SHA-256 is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadConfig {
    pub size: usize,
    pub alphabet: String,
    pub digest_algorithm: DigestAlgorithm,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 5001,
            storage_dir: data_dir().join("serverdata"),
            file_name: crate::wire::PAYLOAD_FILE_NAME.to_string(),
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 5000,
            producer_url: "http://127.0.0.1:5001".to_string(),
            storage_dir: data_dir().join("clientdata"),
            payload_name: "received.txt".to_string(),
            request_timeout_secs: 5,
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            backend: LogBackend::Sqlite,
            path: data_dir().join("verification.db"),
        }
    }
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_PAYLOAD_SIZE,
            alphabet: DEFAULT_ALPHABET.to_string(),
            digest_algorithm: DigestAlgorithm::Sha256,
        }
    }
}

impl ConsumerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Where the received payload is written.
    pub fn destination(&self) -> PathBuf {
        self.storage_dir.join(&self.payload_name)
    }
}

impl ProducerConfig {
    /// Where the current payload is written.
    pub fn payload_path(&self) -> PathBuf {
        self.storage_dir.join(&self.file_name)
    }
}

impl PayloadConfig {
    pub fn spec(&self) -> Result<PayloadSpec, PayloadSpecError> {
        PayloadSpec::new(self.size, &self.alphabet)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("hashdrop")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("hashdrop")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid payload settings: {0}")]
    InvalidPayload(#[from] PayloadSpecError),
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
    #[error("producer url must start with http:// or https://, got {0:?}")]
    InvalidProducerUrl(String),
    #[error("invalid value {value:?} for {name}")]
    InvalidOverride { name: String, value: String },
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl HashdropConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::file_path())?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file, falling back to defaults if it is absent.
    /// Environment overrides are not applied.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("HASHDROP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        Self::write_default_to(&path)?;
        Ok(path)
    }

    fn write_default_to(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        let text = toml::to_string_pretty(&HashdropConfig::default())
            .map_err(ConfigError::SerializeFailed)?;
        std::fs::write(path, text).map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))
    }

    /// Reject settings the services cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.payload.spec()?;
        if self.consumer.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        let url = &self.consumer.producer_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidProducerUrl(url.clone()));
        }
        Ok(())
    }

    /// Apply HASHDROP_* overrides, plus the legacy `SERVER_HOST`, `DATA_DIR`
    /// and `PORT` names understood by older consumer deployments. Prefixed
    /// names win over legacy ones.
    ///
    /// `var` looks up a variable by name; [`HashdropConfig::load`] passes
    /// the process environment. A value that cannot be parsed is an error.
    pub fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        // ── producer ──
        if let Some(v) = var("HASHDROP_PRODUCER__BIND_ADDR") {
            self.producer.bind_addr = v;
        }
        if let Some(v) = parsed(&var, "HASHDROP_PRODUCER__PORT")? {
            self.producer.port = v;
        }
        if let Some(v) = var("HASHDROP_PRODUCER__STORAGE_DIR") {
            self.producer.storage_dir = PathBuf::from(v);
        }
        if let Some(v) = var("HASHDROP_PRODUCER__FILE_NAME") {
            self.producer.file_name = v;
        }

        // ── consumer ──
        if let Some(v) = var("HASHDROP_CONSUMER__BIND_ADDR") {
            self.consumer.bind_addr = v;
        }
        if let Some(v) = parsed(&var, "PORT")? {
            self.consumer.port = v;
        }
        if let Some(v) = parsed(&var, "HASHDROP_CONSUMER__PORT")? {
            self.consumer.port = v;
        }
        if let Some(v) = var("SERVER_HOST") {
            self.consumer.producer_url = v;
        }
        if let Some(v) = var("HASHDROP_CONSUMER__PRODUCER_URL") {
            self.consumer.producer_url = v;
        }
        if let Some(v) = var("DATA_DIR") {
            self.consumer.storage_dir = PathBuf::from(v);
        }
        if let Some(v) = var("HASHDROP_CONSUMER__STORAGE_DIR") {
            self.consumer.storage_dir = PathBuf::from(v);
        }
        if let Some(v) = var("HASHDROP_CONSUMER__PAYLOAD_NAME") {
            self.consumer.payload_name = v;
        }
        if let Some(v) = parsed(&var, "HASHDROP_CONSUMER__REQUEST_TIMEOUT_SECS")? {
            self.consumer.request_timeout_secs = v;
        }
        if let Some(v) = var("HASHDROP_CONSUMER__LOG__BACKEND") {
            self.consumer.log.backend = match v.as_str() {
                "sqlite" => LogBackend::Sqlite,
                "memory" => LogBackend::Memory,
                _ => return Err(invalid("HASHDROP_CONSUMER__LOG__BACKEND", v)),
            };
        }
        if let Some(v) = var("HASHDROP_CONSUMER__LOG__PATH") {
            self.consumer.log.path = PathBuf::from(v);
        }

        // ── payload ──
        if let Some(v) = parsed(&var, "HASHDROP_PAYLOAD__SIZE")? {
            self.payload.size = v;
        }
        if let Some(v) = var("HASHDROP_PAYLOAD__ALPHABET") {
            self.payload.alphabet = v;
        }
        if let Some(v) = var("HASHDROP_PAYLOAD__DIGEST_ALGORITHM") {
            self.payload.digest_algorithm = match v.as_str() {
                "sha256" => DigestAlgorithm::Sha256,
                _ => return Err(invalid("HASHDROP_PAYLOAD__DIGEST_ALGORITHM", v)),
            };
        }
        Ok(())
    }
}

fn invalid(name: &str, value: String) -> ConfigError {
    ConfigError::InvalidOverride {
        name: name.to_string(),
        value,
    }
}

/// Look up `name` and parse it, failing on a value that does not parse.
fn parsed<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    match var(name) {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| invalid(name, v)),
    }
}
