use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// What to do when any call comes back 401.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnauthorizedPolicy {
    #[default]
    Redirect,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    pub poll_interval_ms: u64,
    pub max_poll_duration_secs: Option<u64>,
    pub request_timeout_secs: u64,
    pub save_notice_ttl_secs: u64,
    pub max_image_bytes: usize,
    pub unauthorized_policy: UnauthorizedPolicy,
    pub scan_origin: String,
    pub history_page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval_ms: 500,
            max_poll_duration_secs: None,
            request_timeout_secs: 30,
            save_notice_ttl_secs: 5,
            max_image_bytes: 50 * 1024 * 1024,
            unauthorized_policy: UnauthorizedPolicy::Redirect,
            scan_origin: "/scan".to_string(),
            history_page_size: 10,
        }
    }
}

/// Timing knobs handed to the scan tracker and its poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_duration: Option<Duration>,
    pub save_notice_ttl: Duration,
    pub max_image_bytes: usize,
    pub origin: String,
}

impl Default for PollSettings {
    fn default() -> Self {
        ClientConfig::default().poll_settings()
    }
}

impl ClientConfig {
    /// Defaults, then the YAML file (explicit path or `EATWISELY_CONFIG`), then
    /// `EATWISELY_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var("EATWISELY_CONFIG").ok();
        let file = path.map(Path::to_path_buf).or_else(|| env_path.map(Into::into));

        let mut config = match file {
            Some(file) => {
                log::info!("Loading client configuration from {}", file.display());
                Self::from_yaml_str(&std::fs::read_to_string(&file)?)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        log::debug!("Client configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("EATWISELY_API_URL") {
            self.api_url = url;
        }
        if let Some(raw) = lookup("EATWISELY_POLL_INTERVAL_MS") {
            self.poll_interval_ms = parse_value("EATWISELY_POLL_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = lookup("EATWISELY_MAX_POLL_SECS") {
            self.max_poll_duration_secs = match raw.trim() {
                "" | "none" | "0" => None,
                value => Some(parse_value("EATWISELY_MAX_POLL_SECS", value)?),
            };
        }
        if let Some(raw) = lookup("EATWISELY_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_value("EATWISELY_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("EATWISELY_UNAUTHORIZED_POLICY") {
            self.unauthorized_policy = match raw.trim().to_ascii_lowercase().as_str() {
                "redirect" => UnauthorizedPolicy::Redirect,
                "ignore" => UnauthorizedPolicy::Ignore,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "EATWISELY_UNAUTHORIZED_POLICY".into(),
                        value: raw,
                    });
                }
            };
        }
        Ok(())
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            max_duration: self.max_poll_duration_secs.map(Duration::from_secs),
            save_notice_ttl: Duration::from_secs(self.save_notice_ttl_secs),
            max_image_bytes: self.max_image_bytes,
            origin: self.scan_origin.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
