//! Application settings, read from `settings.toml` with `AUTOHUB__*`
//! environment overrides (e.g. `AUTOHUB__SERVER__PORT=8080`).

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    /// tracing level for the autohub crates.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: Database,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Whole KES credited to each new customer.
    pub customer_opening_balance: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_upload_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_session_ttl_hours() -> i64 {
    12
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(
                    Environment::with_prefix("AUTOHUB")
                        .separator("__")
                        .try_parsing(true),
                )
                .build()?,
        )
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        config.try_deserialize()
    }
}
