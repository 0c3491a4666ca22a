//! Error types for the bridge

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while bridging client events
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Messaging client command failed
    #[error("client error: {0}")]
    Client(String),

    /// Client is not initialized
    #[error("client is not initialized")]
    NotInitialized,

    /// Client is not connected
    #[error("client is not connected")]
    NotConnected,

    /// Client is connected but has no logged-in account
    #[error("client is not logged in")]
    NotLoggedIn,

    /// Address could not be parsed or is not registered
    #[error("invalid jid: {0}")]
    InvalidJid(String),

    /// Media download error
    #[error("download error: {0}")]
    Download(String),

    /// Media processing error
    #[error("media error: {0}")]
    Media(String),

    /// Webhook delivery error
    #[error("webhook error: {0}")]
    Webhook(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
