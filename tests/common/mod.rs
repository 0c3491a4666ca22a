//! Shared test utilities

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post};
use tokio::sync::broadcast;

use wabridge::events::{MessageContent, MessageEvent, MessageInfo, MessageSource};
use wabridge::{BroadcastMessage, Config, Dispatcher, Error, MediaReference, MessagingClient};

/// Address of the account the mock client is logged in as
pub const OWN_ID: &str = "6280000000001:4@s.whatsapp.net";

/// Mock messaging client recording every command
#[derive(Default)]
pub struct MockClient {
    pub own_id: Option<String>,
    pub push_name: Option<String>,
    /// Download handle -> bytes; unknown handles fail
    pub media: HashMap<String, Vec<u8>>,
    pub fail_presence: bool,
    pub sent: Mutex<Vec<(String, String)>>,
    pub presence_calls: AtomicUsize,
    pub downloads: AtomicUsize,
}

impl MockClient {
    /// Client logged in as [`OWN_ID`] with a known push name
    pub fn logged_in() -> Self {
        Self {
            own_id: Some(OWN_ID.to_string()),
            push_name: Some("Bridge".to_string()),
            ..Default::default()
        }
    }

    pub fn with_media(mut self, handle: &str, bytes: &[u8]) -> Self {
        self.media.insert(handle.to_string(), bytes.to_vec());
        self
    }

    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn presence_count(&self) -> usize {
        self.presence_calls.load(Ordering::SeqCst)
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagingClient for MockClient {
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

    async fn send_presence_available(&self) -> wabridge::Result<()> {
        self.presence_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_presence {
            return Err(Error::Client("presence rejected".to_string()));
        }
        Ok(())
    }

    async fn send_text(&self, to: &str, text: &str) -> wabridge::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), text.to_string()));
        Ok(())
    }

    async fn download(&self, media: &MediaReference) -> wabridge::Result<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.media
            .get(&media.handle)
            .cloned()
            .ok_or_else(|| Error::Download(format!("media {} expired", media.handle)))
    }
}

/// A request received by the capture server
#[derive(Debug, Clone)]
pub struct Captured {
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

/// Local webhook endpoint recording every POST
pub struct CaptureServer {
    pub url: String,
    received: Arc<tokio::sync::Mutex<Vec<Captured>>>,
}

impl CaptureServer {
    /// Start a server answering every POST with `status`
    pub async fn spawn(status: StatusCode) -> Self {
        let received = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let state = Arc::clone(&received);

        let app = Router::new().route(
            "/hook",
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let state = Arc::clone(&state);
                async move {
                    state.lock().await.push(Captured { headers, body });
                    status
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind capture server");
        let addr = listener.local_addr().expect("no local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("capture server failed");
        });

        Self {
            url: format!("http://{addr}/hook"),
            received,
        }
    }

    pub async fn received(&self) -> Vec<Captured> {
        self.received.lock().await.clone()
    }
}

/// URL of a port nobody listens on
pub async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("no local addr");
    drop(listener);
    format!("http://{addr}/hook")
}

/// Configuration writing under `root` and posting to `webhooks`
pub fn test_config(root: &Path, webhooks: Vec<String>) -> Config {
    Config {
        media_dir: root.join("media"),
        storage_dir: root.join("storages"),
        webhooks,
        webhook_secret: Some("s3cret".to_string()),
        ..Config::default()
    }
}

/// Dispatcher plus a subscribed notification receiver
pub fn dispatcher(
    config: &Config,
    client: Arc<MockClient>,
) -> (Dispatcher, broadcast::Receiver<BroadcastMessage>) {
    let (tx, rx) = broadcast::channel(16);
    let dispatcher = Dispatcher::new(config, client, tx).expect("failed to build dispatcher");
    (dispatcher, rx)
}

/// Direct message from `sender`
pub fn direct_message(id: &str, sender: &str, content: MessageContent) -> MessageEvent {
    message_in(id, sender, sender, content)
}

/// Message from `sender` in `chat`
pub fn message_in(id: &str, sender: &str, chat: &str, content: MessageContent) -> MessageEvent {
    MessageEvent {
        info: MessageInfo {
            id: id.to_string(),
            source: MessageSource {
                chat: chat.to_string(),
                sender: sender.to_string(),
                is_from_me: false,
                is_group: chat.ends_with("@g.us"),
            },
            push_name: "Budi".to_string(),
            ..Default::default()
        },
        message: content,
        is_view_once: false,
    }
}

/// Plain text body
pub fn text(body: &str) -> MessageContent {
    MessageContent {
        conversation: Some(body.to_string()),
        ..Default::default()
    }
}

/// Number of files directly under `dir` (0 if it does not exist)
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map_or(0, |entries| entries.count())
}
