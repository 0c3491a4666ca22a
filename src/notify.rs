//! Login-state notifications for the UI push channel
//!
//! Sent best-effort over a `tokio::sync::broadcast` channel; a send with no
//! subscribers is silently dropped.

use serde::Serialize;

/// Record pushed to UI subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastMessage {
    pub code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub result: Option<serde_json::Value>,
}

impl BroadcastMessage {
    /// Pairing succeeded for the given device
    #[must_use]
    pub fn login_success(device_id: &str) -> Self {
        Self {
            code: "LOGIN_SUCCESS".to_string(),
            message: format!("Successfully pair with {device_id}"),
            result: None,
        }
    }

    /// Device list changed (sent on logout)
    #[must_use]
    pub fn devices_changed() -> Self {
        Self {
            code: "LIST_DEVICES".to_string(),
            message: String::new(),
            result: None,
        }
    }
}
