//! Configuration loading and validation for the orders cache.
//!
//! Uses serde_yaml to load YAML configuration files with support for
//! an environment variable override of the remote base URL.

mod app;
mod duration;
mod error;
mod remote;
mod storage;

pub use app::AppConfig;
pub use error::ConfigError;
pub use remote::RemoteConfig;
pub use storage::StorageConfig;

use serde::Deserialize;
use std::{env, fs};

/// Environment variable overriding `remote.base_url`.
pub const BASE_URL_ENV: &str = "ORDERS_BASE_URL";

/// Root configuration structure.
///
/// Required sections: app, remote.
/// Optional sections: storage.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Application-level settings like name and environment.
    pub app: AppConfig,
    /// Where orders are fetched from.
    pub remote: RemoteConfig,
    /// Where orders are cached (defaults apply when omitted).
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Loads `.env` first (if present), then the YAML file, then applies
    /// `ORDERS_BASE_URL` over `remote.base_url` when set.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_string(),
            source,
        })?;
        let mut config: Config = serde_yaml::from_str(&content)?;

        config.apply_overrides(|name| env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Applies overrides from a variable lookup.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.remote.base_url = base_url;
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.is_empty() {
            return Err(ConfigError::Validation("app.name is required".into()));
        }

        if self.remote.base_url.is_empty() {
            return Err(ConfigError::Validation("remote.base_url is required".into()));
        }

        if !self.remote.path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "remote.path must start with '/': {}",
                self.remote.path
            )));
        }

        self.remote.endpoint()?;

        if self.storage.path.trim().is_empty() {
            return Err(ConfigError::Validation("storage.path is required".into()));
        }

        if self.storage.path.contains(":memory:") {
            return Err(ConfigError::Validation(
                "storage.path must be a file; in-memory databases are not shared between connections".into(),
            ));
        }

        if self.storage.max_read_connections == 0 {
            return Err(ConfigError::Validation(
                "storage.max_read_connections must be positive".into(),
            ));
        }

        Ok(())
    }
}
