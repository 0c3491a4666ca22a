//! TOML configuration file loading
//!
//! Reads `~/.config/wabridge/config.toml` (or the path in `WABRIDGE_CONFIG`).
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "WABRIDGE_CONFIG";

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct BridgeConfigFile {
    /// Storage paths
    #[serde(default)]
    pub paths: PathsFileConfig,

    /// Webhook forwarding
    #[serde(default)]
    pub webhook: WebhookFileConfig,

    /// Messaging client behaviour
    #[serde(default)]
    pub whatsapp: WhatsAppFileConfig,
}

/// Storage paths
#[derive(Debug, Default, Deserialize)]
pub struct PathsFileConfig {
    /// Directory for downloaded media
    pub media: Option<String>,

    /// Directory for history sync dumps
    pub storages: Option<String>,
}

/// Webhook forwarding configuration
#[derive(Debug, Default, Deserialize)]
pub struct WebhookFileConfig {
    /// Destination URLs
    pub urls: Option<Vec<String>>,

    /// Shared secret sent with every delivery
    pub secret: Option<String>,
}

/// Messaging client configuration
#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppFileConfig {
    /// Text sent back to every direct message
    pub auto_reply: Option<String>,

    /// Log level for the client (ERROR, WARN, INFO, DEBUG)
    pub log_level: Option<String>,

    /// Check recipients are registered before sending
    pub account_validation: Option<bool>,

    /// Largest media download accepted, in bytes
    pub max_download_size: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `BridgeConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> BridgeConfigFile {
    let path = std::env::var(CONFIG_PATH_ENV)
        .ok()
        .map(PathBuf::from)
        .or_else(config_file_path);

    match path {
        Some(path) => load_from(&path),
        None => BridgeConfigFile::default(),
    }
}

/// Load a config file from an explicit path
pub fn load_from(path: &Path) -> BridgeConfigFile {
    if !path.exists() {
        return BridgeConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                BridgeConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            BridgeConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/wabridge/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("wabridge").join("config.toml"))
}
