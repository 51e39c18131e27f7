use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "https://api.ubibot.io";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const API_KEY_ENV: &str = "UBIBOT_API_KEY";
const CHANNEL_ENV: &str = "UBIBOT_CHANNEL";

#[derive(Clone, Deserialize)]
pub struct SensorConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub channel: String,
    /// Seconds between allowed fetches.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_owned()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

// The account key stays out of logs and debug output.
impl std::fmt::Debug for SensorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorConfig")
            .field("api_key", &"<redacted>")
            .field("channel", &self.channel)
            .field("refresh_interval", &self.refresh_interval)
            .field("endpoint", &self.endpoint)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

impl SensorConfig {
    pub fn new(api_key: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            channel: channel.into(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL_SECS,
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Default location: `<config dir>/ubibot/config.json`.
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("ubibot").join("config.json"))
    }

    /// Load from `path` (or the default location), apply environment
    /// overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_file_path()?,
        };
        let config = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            debug!(path = %path.display(), "config file not found, relying on environment");
            Self::new(String::new(), String::new())
        };
        let config = config.with_overrides(
            std::env::var(API_KEY_ENV).ok(),
            std::env::var(CHANNEL_ENV).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: SensorConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn with_overrides(mut self, api_key: Option<String>, channel: Option<String>) -> Self {
        if let Some(api_key) = api_key.filter(|value| !value.is_empty()) {
            self.api_key = api_key;
        }
        if let Some(channel) = channel.filter(|value| !value.is_empty()) {
            self.channel = channel;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField("api_key"));
        }
        if self.channel.trim().is_empty() {
            return Err(ConfigError::MissingField("channel"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_options_take_defaults() {
        let config: SensorConfig =
            serde_json::from_str(r#"{"api_key":"k","channel":"42"}"#).unwrap();
        assert_eq!(config.refresh_interval, 600);
        assert_eq!(config.refresh_period(), Duration::from_secs(600));
        assert_eq!(config.endpoint, "https://api.ubibot.io");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_requires_credentials() {
        let config = SensorConfig::new("", "42");
        assert!(matches!(config.validate(), Err(ConfigError::MissingField("api_key"))));
        let config = SensorConfig::new("key", " ");
        assert!(matches!(config.validate(), Err(ConfigError::MissingField("channel"))));
    }

    #[test]
    fn overrides_replace_non_empty_values_only() {
        let config = SensorConfig::new("file-key", "1")
            .with_overrides(Some("env-key".into()), Some(String::new()));
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.channel, "1");
    }

    #[test]
    fn debug_output_hides_account_key() {
        let config = SensorConfig::new("secret-key", "1");
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret-key"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn load_from_file_reads_json() {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "ubibot_config_{}.json",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let content = serde_json::json!({
            "api_key": "k",
            "channel": "7",
            "refresh_interval": 30,
            "endpoint": "http://localhost:1",
        });
        std::fs::write(&path, content.to_string()).unwrap();

        let config = SensorConfig::load_from_file(&path).unwrap();
        assert_eq!(config.channel, "7");
        assert_eq!(config.refresh_interval, 30);
        assert_eq!(config.endpoint, "http://localhost:1");

        let _ = std::fs::remove_file(&path);
    }
}
