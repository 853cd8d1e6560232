//! Storage configuration.

use serde::Deserialize;

/// Default location of the orders database.
pub const DEFAULT_STORAGE_PATH: &str = "orders.db";

/// Default size of the read connection pool.
pub const DEFAULT_MAX_READ_CONNECTIONS: u32 = 4;

/// Order cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_path")]
    pub path: String,
    /// Maximum number of connections serving reads.
    #[serde(default = "default_max_read_connections")]
    pub max_read_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            max_read_connections: default_max_read_connections(),
        }
    }
}

fn default_path() -> String {
    DEFAULT_STORAGE_PATH.to_string()
}

fn default_max_read_connections() -> u32 {
    DEFAULT_MAX_READ_CONNECTIONS
}
