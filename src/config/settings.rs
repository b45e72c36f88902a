use serde::Deserialize;

use crate::utils::constants::DEFAULT_API_URL;

/// ================================
/// CLI settings (~/.deployaja/config.yaml)
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct CliSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// timeout for non-streaming requests
    pub request_timeout_seconds: Option<u64>,
    /// refresh tokens this long before they expire
    pub refresh_buffer_seconds: Option<u64>,
    pub logging: Option<LoggingConfig>,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_seconds: None,
            refresh_buffer_seconds: None,
            logging: None,
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    #[serde(default = "LogFormat::from_env")]
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new (level: String, format: LogFormat) -> Self {
        Self { level: level, format: format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "compact".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}
