//! Client used when replaying recorded events
//!
//! Commands are logged instead of sent. Media handles are fetched over HTTP
//! when they look like URLs and read from disk otherwise.

use async_trait::async_trait;
use reqwest::Client;

use super::MessagingClient;
use crate::events::MediaReference;
use crate::{Error, Result};

/// Offline stand-in for the protocol client
pub struct ReplayClient {
    own_id: Option<String>,
    push_name: Option<String>,
    client: Client,
}

impl ReplayClient {
    /// Create a replay client acting as the given account
    #[must_use]
    pub fn new(own_id: Option<String>, push_name: Option<String>) -> Self {
        Self {
            own_id,
            push_name,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl MessagingClient for ReplayClient {
    fn own_id(&self) -> Option<String> {
        self.own_id.clone()
    }

    fn push_name(&self) -> Option<String> {
        self.push_name.clone()
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn is_logged_in(&self) -> bool {
        self.own_id.is_some()
    }

    async fn send_presence_available(&self) -> Result<()> {
        tracing::info!("replay: presence available");
        Ok(())
    }

    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        tracing::info!(to, len = text.len(), "replay: text message");
        Ok(())
    }

    async fn download(&self, media: &MediaReference) -> Result<Vec<u8>> {
        let handle = media.handle.as_str();
        if handle.starts_with("http://") || handle.starts_with("https://") {
            let response = self
                .client
                .get(handle)
                .send()
                .await
                .map_err(|e| Error::Download(format!("{handle}: {e}")))?;

            if !response.status().is_success() {
                return Err(Error::Download(format!(
                    "{handle}: {}",
                    response.status()
                )));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::Download(format!("{handle}: read failed: {e}")))?;
            return Ok(bytes.to_vec());
        }

        tokio::fs::read(handle)
            .await
            .map_err(|e| Error::Download(format!("{handle}: {e}")))
    }
}
