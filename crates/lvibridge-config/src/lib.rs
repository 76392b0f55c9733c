//! Configuration for the lvibridge adapter.
//!
//! Layered loading (defaults, TOML file, `LVIBRIDGE_` environment), typed
//! validation, and the TOML state file that persists adapter settings and
//! the vendor session between runs.

mod state;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub use state::TomlStateStore;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<ConfigError> for lvibridge_core::CoreError {
    fn from(err: ConfigError) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub mqtt: MqttConfig,

    #[serde(default)]
    pub vendor: VendorConfig,

    #[serde(default)]
    pub adapter: AdapterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Broker connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    pub username: Option<String>,

    /// Plaintext broker password. Prefer `LVIBRIDGE_MQTT__PASSWORD`.
    pub password: Option<String>,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            client_id: default_client_id(),
            username: None,
            password: None,
            keep_alive_secs: default_keep_alive(),
        }
    }
}

impl MqttConfig {
    pub fn password(&self) -> Option<SecretString> {
        self.password.clone().map(SecretString::from)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

fn default_mqtt_host() -> String {
    "localhost".into()
}
fn default_mqtt_port() -> u16 {
    1883
}
fn default_client_id() -> String {
    "lvibridge".into()
}
fn default_keep_alive() -> u64 {
    30
}

/// Vendor HTTP API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VendorConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl VendorConfig {
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url: Url = self
            .base_url
            .parse()
            .map_err(|e| invalid("vendor.base_url", format!("{e}: {}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(
                "vendor.base_url",
                format!("expected http or https, got '{other}'"),
            )),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    lvibridge_api::DEFAULT_BASE_URL.into()
}
fn default_timeout() -> u64 {
    30
}

/// Adapter identity and working files.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdapterConfig {
    /// Service name used in FIMP topics (`rn:<service_name>`).
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Directory holding the manifest and state file.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Manifest file, relative to `work_dir` unless absolute.
    #[serde(default = "default_manifest_file")]
    pub manifest_file: PathBuf,

    /// Bounded inbound queue size.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            work_dir: default_work_dir(),
            manifest_file: default_manifest_file(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl AdapterConfig {
    pub fn manifest_path(&self) -> PathBuf {
        self.work_dir.join(&self.manifest_file)
    }

    pub fn state_path(&self) -> PathBuf {
        self.work_dir.join("state.toml")
    }
}

fn default_service_name() -> String {
    "lvi".into()
}
fn default_work_dir() -> PathBuf {
    ProjectDirs::from("com", "lvibridge", "lvibridge")
        .map_or_else(|| PathBuf::from("data"), |dirs| dirs.data_dir().to_path_buf())
}
fn default_manifest_file() -> PathBuf {
    PathBuf::from("app-manifest.json")
}
fn default_queue_capacity() -> usize {
    5
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` and `-v` take precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "lvibridge", "lvibridge").map_or_else(
        || PathBuf::from("lvibridge.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load and validate the config from defaults, the TOML file at `path`
/// (or [`config_path`]) and `LVIBRIDGE_*` environment variables.
///
/// Nested keys use a double underscore: `LVIBRIDGE_MQTT__HOST`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    tracing::debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("LVIBRIDGE_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.host.trim().is_empty() {
            return Err(invalid("mqtt.host", "must not be empty"));
        }
        if self.mqtt.port == 0 {
            return Err(invalid("mqtt.port", "must be between 1 and 65535"));
        }
        if self.mqtt.client_id.is_empty() {
            return Err(invalid("mqtt.client_id", "must not be empty"));
        }
        if self.mqtt.keep_alive_secs == 0 {
            return Err(invalid("mqtt.keep_alive_secs", "must be at least 1"));
        }

        self.vendor.base_url()?;
        if self.vendor.timeout_secs == 0 {
            return Err(invalid("vendor.timeout_secs", "must be at least 1"));
        }

        let name = &self.adapter.service_name;
        if name.is_empty() || name.contains(['/', '+', '#', ':']) {
            return Err(invalid(
                "adapter.service_name",
                format!("'{name}' is not usable in a topic"),
            ));
        }
        if self.adapter.queue_capacity == 0 {
            return Err(invalid("adapter.queue_capacity", "must be at least 1"));
        }
        Ok(())
    }

    /// TOML rendering with the broker password masked.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.mqtt.password.is_some() {
            shown.mqtt.password = Some("********".into());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.adapter.service_name, "lvi");
        assert_eq!(config.adapter.queue_capacity, 5);
        assert_eq!(config.vendor.timeout(), Duration::from_secs(30));
        assert!(config.adapter.manifest_path().ends_with("app-manifest.json"));
    }

    #[test]
    fn file_overrides_defaults() {
        let file = write_config(
            r#"
            [mqtt]
            host = "broker.local"
            username = "lvi"

            [adapter]
            work_dir = "/var/lib/lvibridge"
            queue_capacity = 16

            [logging]
            format = "json"
            "#,
        );

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.username.as_deref(), Some("lvi"));
        assert_eq!(config.adapter.queue_capacity, 16);
        assert_eq!(
            config.adapter.state_path(),
            PathBuf::from("/var/lib/lvibridge/state.toml")
        );
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Some(Path::new("/nonexistent/lvibridge.toml"))).unwrap();
        assert_eq!(config.mqtt.host, "localhost");
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = Config::default();
        config.adapter.service_name = "lvi/#".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { field, .. }) if field == "adapter.service_name"
        ));

        let mut config = Config::default();
        config.vendor.base_url = "ftp://example.com".into();
        assert!(config.validate().is_err());

        let file = write_config("[adapter]\nqueue_capacity = 0\n");
        assert!(load_config(Some(file.path())).is_err());
    }

    #[test]
    fn redacted_toml_masks_password() {
        let mut config = Config::default();
        config.mqtt.password = Some("hunter2".into());
        let shown = config.to_redacted_toml().unwrap();
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("********"));
    }
}
