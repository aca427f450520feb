use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chatbot::controller::{ControllerSettings, DEFAULT_STORAGE_KEY};
use crate::chatbot::handoff::{DEFAULT_ENDPOINT, DEFAULT_SUBJECT, RelaySettings};

/// Placeholder access key shipped with the page template.
const PLACEHOLDER_ACCESS_KEY: &str = "YOUR_WEB3FORMS_ACCESS_KEY";

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Unknown IANA timezone name.
    InvalidTimezone(String),
    /// Relay endpoint isn't an http(s) URL.
    InvalidEndpoint(String),
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::InvalidTimezone(tz) => write!(f, "unknown timezone '{}'", tz),
            Self::InvalidEndpoint(url) => write!(f, "invalid relay endpoint '{}'", url),
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::InvalidTimezone(_) | Self::InvalidEndpoint(_) | Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Web3Forms access key.
    access_key: String,
    #[serde(default = "default_endpoint")]
    relay_endpoint: String,
    #[serde(default = "default_subject")]
    subject: String,
    /// Page URL sent as the relay's redirect target.
    page_url: Option<String>,
    #[serde(default = "default_storage_key")]
    storage_key: String,
    #[serde(default = "default_timezone")]
    timezone: String,
    #[serde(default = "default_reply_delay_ms")]
    reply_delay_ms: u64,
    #[serde(default = "default_typing_delay_ms")]
    typing_delay_ms: u64,
    #[serde(default = "default_popup_delay_ms")]
    popup_delay_ms: u64,
    /// Directory for the chat database and logs. Defaults to current directory.
    data_dir: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_timezone() -> String {
    "Asia/Makassar".to_string()
}

fn default_reply_delay_ms() -> u64 {
    800
}

fn default_typing_delay_ms() -> u64 {
    1200
}

fn default_popup_delay_ms() -> u64 {
    500
}

pub struct Config {
    pub access_key: String,
    pub relay_endpoint: String,
    pub subject: String,
    pub page_url: Option<String>,
    pub storage_key: String,
    pub timezone: Tz,
    pub reply_delay: Duration,
    pub typing_delay: Duration,
    pub popup_delay: Duration,
    /// Directory for state files (chat database, logs).
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        let access_key = file.access_key.trim().to_string();
        if access_key.is_empty() {
            return Err(ConfigError::Validation("access_key is required".into()));
        }
        if access_key == PLACEHOLDER_ACCESS_KEY {
            return Err(ConfigError::Validation(
                "access_key is still the template placeholder".into(),
            ));
        }
        if file.storage_key.is_empty() {
            return Err(ConfigError::Validation("storage_key must not be empty".into()));
        }

        let endpoint = reqwest::Url::parse(&file.relay_endpoint)
            .map_err(|_| ConfigError::InvalidEndpoint(file.relay_endpoint.clone()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEndpoint(file.relay_endpoint));
        }

        let timezone: Tz = file
            .timezone
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(file.timezone.clone()))?;

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            access_key,
            relay_endpoint: file.relay_endpoint,
            subject: file.subject,
            page_url: file.page_url,
            storage_key: file.storage_key,
            timezone,
            reply_delay: Duration::from_millis(file.reply_delay_ms),
            typing_delay: Duration::from_millis(file.typing_delay_ms),
            popup_delay: Duration::from_millis(file.popup_delay_ms),
            data_dir,
        })
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            reply_delay: self.reply_delay,
            typing_delay: self.typing_delay,
            popup_delay: self.popup_delay,
            timezone: self.timezone,
            storage_key: self.storage_key.clone(),
            relay: RelaySettings {
                access_key: self.access_key.clone(),
                subject: self.subject.clone(),
                redirect: self.page_url.clone(),
            },
            ..ControllerSettings::default()
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("chat.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_minimal_config_defaults() {
        let file = write_config(r#"{ "access_key": "abc-123" }"#);
        let config = Config::load(file.path()).expect("should load valid config");
        assert_eq!(config.access_key, "abc-123");
        assert_eq!(config.relay_endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.subject, DEFAULT_SUBJECT);
        assert_eq!(config.storage_key, "ubudChatHistory");
        assert_eq!(config.timezone, chrono_tz::Asia::Makassar);
        assert_eq!(config.reply_delay, Duration::from_millis(800));
        assert_eq!(config.typing_delay, Duration::from_millis(1200));
        assert_eq!(config.popup_delay, Duration::from_millis(500));
        assert_eq!(config.database_path(), PathBuf::from("./chat.db"));
    }

    #[test]
    fn test_full_config() {
        let file = write_config(r#"{
            "access_key": "abc",
            "relay_endpoint": "http://localhost:9000/submit",
            "subject": "Booking",
            "page_url": "https://ubud.example/tours",
            "storage_key": "chat",
            "timezone": "Europe/Oslo",
            "typing_delay_ms": 10,
            "data_dir": "/tmp/ubud"
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.timezone, chrono_tz::Europe::Oslo);
        let settings = config.controller_settings();
        assert_eq!(settings.typing_delay, Duration::from_millis(10));
        assert_eq!(settings.storage_key, "chat");
        assert_eq!(settings.relay.subject, "Booking");
        assert_eq!(settings.relay.redirect.as_deref(), Some("https://ubud.example/tours"));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/ubud/chat.db"));
    }

    #[test]
    fn test_missing_access_key() {
        let file = write_config(r#"{ "access_key": "  " }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("access_key"));
    }

    #[test]
    fn test_placeholder_access_key() {
        let file = write_config(r#"{ "access_key": "YOUR_WEB3FORMS_ACCESS_KEY" }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn test_invalid_timezone() {
        let file = write_config(r#"{ "access_key": "k", "timezone": "Bali/Ubud" }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::InvalidTimezone(ref tz) if tz == "Bali/Ubud"));
    }

    #[test]
    fn test_invalid_endpoint() {
        let file = write_config(r#"{ "access_key": "k", "relay_endpoint": "not a url" }"#);
        assert!(matches!(assert_err(Config::load(file.path())), ConfigError::InvalidEndpoint(_)));

        let file = write_config(r#"{ "access_key": "k", "relay_endpoint": "ftp://example.com/x" }"#);
        assert!(matches!(assert_err(Config::load(file.path())), ConfigError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/ubudchat.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
