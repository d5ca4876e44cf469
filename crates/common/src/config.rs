//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// File storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Upload policy configuration.
    #[serde(default)]
    pub uploads: UploadConfig,
    /// Outgoing mail configuration.
    #[serde(default)]
    pub mail: MailConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Base path for stored files.
    #[serde(default = "default_storage_path")]
    pub base_path: String,
    /// Base URL for serving files.
    #[serde(default = "default_storage_url")]
    pub base_url: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            base_path: default_storage_path(),
            base_url: default_storage_url(),
        }
    }
}

/// Upload policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum photo size in bytes.
    #[serde(default = "default_max_photo_size")]
    pub max_photo_size: u64,
    /// Maximum avatar size in bytes.
    #[serde(default = "default_max_avatar_size")]
    pub max_avatar_size: u64,
    /// Photos a user may upload without `can_upload_unlimited`.
    #[serde(default = "default_quota")]
    pub quota: u64,
    /// Words rejected in comment text (case-insensitive).
    #[serde(default)]
    pub comment_denylist: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_photo_size: default_max_photo_size(),
            max_avatar_size: default_max_avatar_size(),
            quota: default_quota(),
            comment_denylist: Vec::new(),
        }
    }
}

/// Outgoing mail configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MailConfig {
    /// SMTP relay host. Mail is disabled when unset.
    #[serde(default)]
    pub smtp_host: Option<String>,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// From address for outgoing mail.
    #[serde(default = "default_mail_from")]
    pub from: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_storage_path() -> String {
    "./files".to_string()
}

fn default_storage_url() -> String {
    "/files".to_string()
}

const fn default_max_photo_size() -> u64 {
    10 * 1024 * 1024
}

const fn default_max_avatar_size() -> u64 {
    5 * 1024 * 1024
}

const fn default_quota() -> u64 {
    100
}

const fn default_smtp_port() -> u16 {
    587
}

fn default_mail_from() -> String {
    "noreply@photoboard.local".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `PHOTOBOARD_ENV`)
    /// 3. Environment variables with `PHOTOBOARD_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("PHOTOBOARD_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PHOTOBOARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("PHOTOBOARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let uploads = UploadConfig::default();
        assert_eq!(uploads.max_photo_size, 10 * 1024 * 1024);
        assert_eq!(uploads.quota, 100);
        assert!(uploads.comment_denylist.is_empty());

        let storage = StorageSettings::default();
        assert_eq!(storage.base_url, "/files");
    }
}
