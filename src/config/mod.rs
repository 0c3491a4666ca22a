//! Configuration management for the bridge
//!
//! Environment variables take precedence over the TOML file, which takes
//! precedence over built-in defaults.

pub mod file;

use std::path::PathBuf;

use file::BridgeConfigFile;

use crate::media::DEFAULT_MAX_DOWNLOAD_SIZE;
use crate::{Error, Result};

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for downloaded media
    pub media_dir: PathBuf,

    /// Directory for history sync dumps
    pub storage_dir: PathBuf,

    /// Webhook destinations; empty disables forwarding
    pub webhooks: Vec<String>,

    /// Shared secret sent with every delivery
    pub webhook_secret: Option<String>,

    /// Text sent back to direct messages; empty disables auto-reply
    pub auto_reply: String,

    /// Log level (ERROR, WARN, INFO, DEBUG)
    pub log_level: String,

    /// Check recipients are registered before sending
    pub account_validation: bool,

    /// Largest media download accepted, in bytes
    pub max_download_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("statics/media"),
            storage_dir: PathBuf::from("storages"),
            webhooks: Vec::new(),
            webhook_secret: Some("secret".to_string()),
            auto_reply: String::new(),
            log_level: "ERROR".to_string(),
            account_validation: true,
            max_download_size: DEFAULT_MAX_DOWNLOAD_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment
    ///
    /// # Errors
    ///
    /// Returns error if a webhook URL is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a webhook URL is invalid
    pub fn from_sources(
        fc: BridgeConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let defaults = Self::default();

        let media_dir = env("APP_MEDIA_DIR")
            .or(fc.paths.media)
            .map_or(defaults.media_dir, PathBuf::from);

        let storage_dir = env("APP_STORAGE_DIR")
            .or(fc.paths.storages)
            .map_or(defaults.storage_dir, PathBuf::from);

        let webhooks = env("WHATSAPP_WEBHOOK")
            .map(|raw| split_list(&raw))
            .or(fc.webhook.urls)
            .unwrap_or_default();

        let webhook_secret = env("WHATSAPP_WEBHOOK_SECRET")
            .or(fc.webhook.secret)
            .or(defaults.webhook_secret);

        let auto_reply = env("WHATSAPP_AUTO_REPLY")
            .or(fc.whatsapp.auto_reply)
            .unwrap_or_default();

        let log_level = env("WHATSAPP_LOG_LEVEL")
            .or(fc.whatsapp.log_level)
            .unwrap_or(defaults.log_level);

        let account_validation = env("WHATSAPP_ACCOUNT_VALIDATION")
            .map(|v| parse_bool(&v))
            .or(fc.whatsapp.account_validation)
            .unwrap_or(defaults.account_validation);

        let max_download_size = env("WHATSAPP_MAX_DOWNLOAD_SIZE")
            .and_then(|v| v.parse().ok())
            .or(fc.whatsapp.max_download_size)
            .unwrap_or(defaults.max_download_size);

        let config = Self {
            media_dir,
            storage_dir,
            webhooks,
            webhook_secret,
            auto_reply,
            log_level,
            account_validation,
            max_download_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every webhook is an absolute http(s) URL
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid URL
    pub fn validate(&self) -> Result<()> {
        for raw in &self.webhooks {
            let url = url::Url::parse(raw)
                .map_err(|e| Error::Config(format!("invalid webhook url {raw}: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "webhook url {raw} must use http or https"
                )));
            }
        }
        Ok(())
    }

    /// Tracing filter directive for the configured log level
    #[must_use]
    pub fn log_filter(&self) -> String {
        let level = match self.log_level.to_ascii_uppercase().as_str() {
            "DEBUG" => "debug",
            "INFO" => "info",
            "WARN" => "warn",
            "TRACE" => "trace",
            _ => "error",
        };
        format!("{level},wabridge={level}")
    }
}

/// Split a comma-separated list, dropping blanks
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
