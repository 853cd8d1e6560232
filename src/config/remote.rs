//! Remote endpoint configuration.

use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

use super::{ConfigError, duration};

/// Remote orders endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Scheme and host, e.g. "https://assessments.stage.copper.co".
    pub base_url: String,
    /// Path of the orders resource.
    #[serde(default = "default_path")]
    pub path: String,
    /// Request timeout. Zero falls back to the client default.
    #[serde(default, with = "duration")]
    pub timeout: Duration,
}

impl RemoteConfig {
    /// Joins base URL and path into the endpoint URL.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let raw = format!("{}{}", self.base_url.trim_end_matches('/'), self.path);
        let url = Url::parse(&raw)
            .map_err(|e| ConfigError::Validation(format!("remote endpoint {}: {}", raw, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Validation(format!(
                "remote endpoint {}: unsupported scheme {}",
                raw, scheme
            ))),
        }
    }
}

fn default_path() -> String {
    "/ios/orders".to_string()
}
