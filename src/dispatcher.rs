//! Event dispatcher
//!
//! Routes each client event to its handling path. A failure while handling
//! one event is logged and swallowed so the next event is always processed;
//! only [`Event::StreamReplaced`] stops the loop.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::client::MessagingClient;
use crate::config::Config;
use crate::events::{
    AppStateSyncCompleteEvent, Event, HistorySyncEvent, MediaKind, MessageEvent, PresenceEvent,
    ReceiptEvent, ReceiptType,
};
use crate::history::HistoryWriter;
use crate::identity::{is_broadcast, is_group, is_self};
use crate::media::MediaExtractor;
use crate::notify::BroadcastMessage;
use crate::payload::{normalize_message, normalize_receipt};
use crate::webhook::WebhookClient;
use crate::{Error, Result};

/// What the event loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep processing events
    Continue,
    /// Another session took over; stop immediately
    Terminate,
}

/// Per-process pipeline context shared by every event handler
pub struct Dispatcher {
    client: Arc<dyn MessagingClient>,
    webhook: WebhookClient,
    media: MediaExtractor,
    history: HistoryWriter,
    notifier: broadcast::Sender<BroadcastMessage>,
    auto_reply: String,
}

impl Dispatcher {
    /// Create a dispatcher from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the webhook HTTP client cannot be built
    pub fn new(
        config: &Config,
        client: Arc<dyn MessagingClient>,
        notifier: broadcast::Sender<BroadcastMessage>,
    ) -> Result<Self> {
        let webhook = WebhookClient::new(config.webhooks.clone(), config.webhook_secret.clone())?;
        let media = MediaExtractor::new(&config.media_dir).with_max_bytes(config.max_download_size);
        let history = HistoryWriter::new(&config.storage_dir);

        tracing::info!(
            webhooks = webhook.endpoints().len(),
            auto_reply = !config.auto_reply.is_empty(),
            media_dir = %config.media_dir.display(),
            storage_dir = %config.storage_dir.display(),
            "dispatcher initialized"
        );

        Ok(Self {
            client,
            webhook,
            media,
            history,
            notifier,
            auto_reply: config.auto_reply.clone(),
        })
    }

    /// Replace the media extractor
    #[must_use]
    pub fn with_media(mut self, media: MediaExtractor) -> Self {
        self.media = media;
        self
    }

    /// Replace the history writer
    #[must_use]
    pub fn with_history(mut self, history: HistoryWriter) -> Self {
        self.history = history;
        self
    }

    /// Consume events until the stream closes or a session takeover
    pub async fn run(&self, mut events: mpsc::Receiver<Event>) -> Flow {
        while let Some(event) = events.recv().await {
            if self.handle(&event).await == Flow::Terminate {
                return Flow::Terminate;
            }
        }
        tracing::info!("event stream closed");
        Flow::Continue
    }

    /// Handle a single event
    pub async fn handle(&self, event: &Event) -> Flow {
        match event {
            Event::Connected | Event::PushNameChanged => self.announce_presence().await,
            Event::AppStateSyncComplete(evt) => self.handle_app_state_sync(evt).await,
            Event::PairSuccess(evt) => {
                tracing::info!(id = %evt.id, platform = %evt.platform, "paired");
                self.notify(BroadcastMessage::login_success(&evt.id));
            }
            Event::LoggedOut(evt) => {
                tracing::warn!(on_connect = evt.on_connect, reason = ?evt.reason, "logged out");
                self.notify(BroadcastMessage::devices_changed());
            }
            Event::StreamReplaced => {
                tracing::warn!("stream replaced by another session, terminating");
                return Flow::Terminate;
            }
            Event::Message(evt) => self.handle_message(evt).await,
            Event::Receipt(evt) => self.handle_receipt(evt).await,
            Event::Presence(evt) => log_presence(evt),
            Event::HistorySync(evt) => self.handle_history_sync(evt).await,
            Event::AppState(evt) => {
                tracing::debug!(index = ?evt.index, action = %evt.action, "app state event");
            }
            Event::DeleteForMe(evt) => {
                tracing::info!(
                    id = %evt.message_id,
                    sender = %evt.sender,
                    chat = %evt.chat,
                    "message deleted for me"
                );
            }
        }
        Flow::Continue
    }

    /// Whether an auto-reply would be sent for this message
    #[must_use]
    pub fn should_auto_reply(&self, evt: &MessageEvent) -> bool {
        let source = &evt.info.source;
        !self.auto_reply.is_empty()
            && !is_group(&source.chat)
            && !is_broadcast(&source.source_string())
            && !source.is_from_me
            && !is_self(&source.sender, self.client.own_id().as_deref())
    }

    async fn announce_presence(&self) {
        if self.client.push_name().is_none_or(|name| name.is_empty()) {
            tracing::debug!("push name unknown, not announcing presence");
            return;
        }

        match self.client.send_presence_available().await {
            Ok(()) => tracing::info!("marked self as available"),
            Err(e) => tracing::warn!(error = %e, "failed to send available presence"),
        }
    }

    async fn handle_app_state_sync(&self, evt: &AppStateSyncCompleteEvent) {
        if evt.is_critical_block() {
            self.announce_presence().await;
        } else {
            tracing::debug!(name = %evt.name, "app state sync complete");
        }
    }

    fn notify(&self, message: BroadcastMessage) {
        if self.notifier.send(message).is_err() {
            tracing::debug!("no broadcast subscribers");
        }
    }

    async fn handle_message(&self, evt: &MessageEvent) {
        let info = &evt.info;
        let source = info.source.source_string();
        tracing::info!(
            id = %info.id,
            from = %source,
            pushname = %info.push_name,
            timestamp = %info.timestamp,
            kind = %info.kind,
            category = %info.category,
            view_once = evt.is_view_once,
            "received message"
        );

        if self.should_auto_reply(evt) {
            if let Err(e) = self.client.send_text(&info.source.sender, &self.auto_reply).await {
                tracing::warn!(to = %info.source.sender, error = %e, "failed to send auto-reply");
            }
        }

        if !self.webhook.is_configured() {
            return;
        }
        if is_broadcast(&source) {
            tracing::debug!(id = %info.id, "broadcast message, not forwarding");
            return;
        }
        if is_self(&source, self.client.own_id().as_deref()) {
            tracing::debug!(id = %info.id, "own message, not forwarding");
            return;
        }

        if let Err(e) = self.forward_message(evt).await {
            tracing::error!(id = %info.id, from = %source, error = %e, "failed to forward message to webhook");
        }
    }

    async fn forward_message(&self, evt: &MessageEvent) -> Result<()> {
        let mut payload = normalize_message(evt);
        let mut stored = Vec::new();

        for kind in MediaKind::ALL {
            let Some(media) = evt.message.media(kind) else {
                continue;
            };
            let extracted = match self
                .media
                .extract(self.client.as_ref(), kind, Some(media))
                .await
            {
                Ok(extracted) => extracted,
                Err(e) => {
                    // Nothing will reference the earlier files
                    discard_media(&stored).await;
                    return Err(Error::Webhook(format!("failed to download {kind}: {e}")));
                }
            };
            if !extracted.is_empty() {
                stored.push(extracted.media_path.clone());
            }
            payload.attach_media(kind, &extracted);
        }

        tracing::info!(id = %evt.info.id, endpoints = self.webhook.endpoints().len(), "forwarding message to webhook");
        self.webhook.deliver(&payload).await
    }

    async fn handle_receipt(&self, evt: &ReceiptEvent) {
        let source = evt.source.source_string();
        if !evt.receipt_type.is_forwarded() {
            tracing::debug!(receipt_type = %evt.receipt_type, by = %source, "ignoring receipt");
            return;
        }
        if evt.receipt_type == ReceiptType::Delivered {
            tracing::info!(ids = ?evt.message_ids, to = %source, at = %evt.timestamp, "messages delivered");
        } else {
            tracing::info!(ids = ?evt.message_ids, by = %source, at = %evt.timestamp, "messages read");
        }

        if !self.webhook.is_configured() {
            return;
        }
        if is_self(&source, self.client.own_id().as_deref()) {
            tracing::debug!(ids = ?evt.message_ids, "own receipt, not forwarding");
            return;
        }

        tracing::info!(ids = ?evt.message_ids, "forwarding receipt to webhook");
        if let Err(e) = self.webhook.deliver(&normalize_receipt(evt)).await {
            tracing::error!(ids = ?evt.message_ids, from = %source, error = %e, "failed to forward receipt to webhook");
        }
    }

    async fn handle_history_sync(&self, evt: &HistorySyncEvent) {
        let account = self.client.own_id().unwrap_or_else(|| "unknown".to_string());
        if let Err(e) = self.history.write(&account, evt).await {
            tracing::error!(sync_type = %evt.sync_type, error = %e, "failed to write history sync");
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("webhooks", &self.webhook.endpoints())
            .field("media_root", &self.media.root())
            .field("history_root", &self.history.root())
            .finish_non_exhaustive()
    }
}

async fn discard_media(paths: &[String]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path, error = %e, "failed to remove media file");
        }
    }
}

fn log_presence(evt: &PresenceEvent) {
    if !evt.unavailable {
        tracing::info!(from = %evt.from, "contact online");
        return;
    }
    match evt.last_seen {
        Some(last_seen) => tracing::info!(from = %evt.from, %last_seen, "contact offline"),
        None => tracing::info!(from = %evt.from, "contact offline"),
    }
}

/// Exit the process after a session takeover
///
/// In-flight work is abandoned.
pub fn terminate() -> ! {
    tracing::warn!("exiting: session replaced");
    std::process::exit(0)
}
