use std::{fs, path::Path};
use crate::config::settings::{CliSettings, LogFormat, LoggingConfig};
use crate::utils::constants::API_URL_ENV;
use anyhow::{anyhow, Result};
use regex::Regex;
use tracing::{debug, error};

/// Load settings from a YAML file. A missing file yields defaults.
pub async fn file_to_settings(path: &Path) -> Result<CliSettings> {
    let settings = match fs::read_to_string(path) {
        Ok(content) => parse_settings(&expand_env_vars(&content))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("no settings file at {}, using defaults", path.display());
            with_defaults(CliSettings::default())
        }
        Err(err) => return Err(anyhow!("could not read {}: {}", path.display(), err)),
    };
    Ok(apply_env_overrides(settings))
}

pub fn parse_settings(content: &str) -> Result<CliSettings> {
    if content.trim().is_empty() {
        return Ok(with_defaults(CliSettings::default()));
    }
    let settings: CliSettings = serde_yaml::from_str(content)
        .inspect_err(|e| {
            error!("parse settings error: {}", e);
        })?;

    validate(&settings)?;
    Ok(with_defaults(settings))
}

fn with_defaults(mut settings: CliSettings) -> CliSettings {
    if settings.logging.is_none() {
        settings.logging = Some(LoggingConfig::new("warn".to_owned(), LogFormat::Compact));
    }
    settings
}

fn validate(settings: &CliSettings) -> Result<()> {
    if !(settings.api_url.starts_with("http://") || settings.api_url.starts_with("https://")) {
        return Err(anyhow!("api_url must start with http:// or https://, got '{}'", settings.api_url));
    }
    if settings.request_timeout_seconds == Some(0) {
        return Err(anyhow!("request_timeout_seconds must be greater than zero"));
    }
    Ok(())
}

/// `DEPLOYAJA_API_URL` wins over the file.
fn apply_env_overrides(mut settings: CliSettings) -> CliSettings {
    if let Ok(api_url) = std::env::var(API_URL_ENV) {
        if !api_url.trim().is_empty() {
            settings.api_url = api_url.trim().to_owned();
        }
    }
    settings
}

fn expand_env_vars(input: &str) -> String {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("static regex");
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}
