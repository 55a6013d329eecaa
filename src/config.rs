//! Startup configuration, read once from the process environment.

use std::time::Duration;
use thiserror::Error;

pub const WEBHOOK_URL_VAR: &str = "DISCORD_WEBHOOK_URL";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_EVENT_LOG_DIR: &str = "logs";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DISCORD_WEBHOOK_URL is not set")]
    MissingWebhookUrl,

    #[error("DISCORD_WEBHOOK_URL is not a valid http(s) URL: {0}")]
    InvalidWebhookUrl(String),

    #[error("{var}={value:?} is not a positive whole number of seconds")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub webhook_url:   String,
    pub api_base:      String,
    pub poll_interval: Duration,
    pub http_timeout:  Duration,
    pub event_log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `lookup` stands in for the environment so tests don't mutate process state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let webhook_url = lookup(WEBHOOK_URL_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingWebhookUrl)?;

        match reqwest::Url::parse(&webhook_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => return Err(ConfigError::InvalidWebhookUrl(format!("unsupported scheme {}", url.scheme()))),
            Err(e)  => return Err(ConfigError::InvalidWebhookUrl(e.to_string())),
        }

        let api_base = lookup("MLB_API_BASE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| mlb_monitor::DEFAULT_API_BASE.to_string());

        let event_log_dir = lookup("EVENT_LOG_DIR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_LOG_DIR.to_string());

        Ok(Self {
            webhook_url,
            api_base,
            poll_interval: secs_var(&lookup, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            http_timeout:  secs_var(&lookup, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            event_log_dir,
        })
    }
}

fn secs_var(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidNumber { var, value: raw }),
    }
}
