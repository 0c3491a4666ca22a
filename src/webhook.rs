//! Webhook delivery
//!
//! Each payload gets exactly one POST per configured endpoint. Endpoints are
//! attempted concurrently and independently; nothing is retried or queued.

use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::{Error, Result};

/// Timeout for a single webhook request
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Header carrying the configured shared secret
pub const SECRET_HEADER: &str = "X-Webhook-Secret";

/// HTTP client for the configured webhook endpoints
#[derive(Debug, Clone)]
pub struct WebhookClient {
    endpoints: Vec<String>,
    secret: Option<String>,
    client: Client,
}

impl WebhookClient {
    /// Create a client for the given endpoints
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(endpoints: Vec<String>, secret: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| Error::Webhook(format!("failed to build http client: {e}")))?;

        Ok(Self {
            endpoints,
            secret: secret.filter(|s| !s.is_empty()),
            client,
        })
    }

    /// Whether any endpoint is configured
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.endpoints.is_empty()
    }

    /// Configured endpoints
    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Deliver a payload to every endpoint
    ///
    /// All endpoints are attempted even if some fail. With no endpoints this
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the first failure after every endpoint was attempted
    pub async fn deliver<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
        if self.endpoints.is_empty() {
            return Ok(());
        }

        let body = serde_json::to_vec(payload)
            .map_err(|e| Error::Webhook(format!("failed to serialize body: {e}")))?;

        let results = join_all(
            self.endpoints
                .iter()
                .map(|url| self.post(url, body.clone())),
        )
        .await;

        let mut first_error = None;
        for (url, result) in self.endpoints.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(url = %url, error = %e, "webhook delivery failed");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// POST a JSON body to one endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the endpoint answers with a
    /// non-success status
    pub async fn post(&self, url: &str, body: Vec<u8>) -> Result<()> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(secret) = &self.secret {
            request = request.header(SECRET_HEADER, secret);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Webhook(format!("error when submitting webhook to {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Webhook(format!("{url} responded {status}: {body}")));
        }

        tracing::debug!(url, %status, "webhook delivered");
        Ok(())
    }
}
