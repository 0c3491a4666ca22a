//! Events emitted by the messaging client
//!
//! The client delivers one [`Event`] per callback. Every variant carries its
//! own payload shape; most protocol fields are optional and default to empty.
//!
//! Events deserialize from JSON tagged by `"type"`, which is how the replay
//! binary feeds recorded events into the dispatcher.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// Name of the app state patch that carries contacts and push names
pub const CRITICAL_BLOCK_PATCH: &str = "critical_block";

/// An event received from the messaging client
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Incoming (or echoed outgoing) message
    Message(MessageEvent),
    /// Delivery / read receipt
    Receipt(ReceiptEvent),
    /// Contact presence change
    Presence(PresenceEvent),
    /// Device pairing completed
    PairSuccess(PairSuccessEvent),
    /// Session was logged out
    LoggedOut(LoggedOutEvent),
    /// Client connected to the server
    Connected,
    /// Own display name changed
    PushNameChanged,
    /// Another session replaced this one
    StreamReplaced,
    /// Bulk history backlog chunk
    HistorySync(HistorySyncEvent),
    /// App state patch finished syncing
    AppStateSyncComplete(AppStateSyncCompleteEvent),
    /// Single app state mutation
    AppState(AppStateEvent),
    /// Message deleted for the local account only
    DeleteForMe(DeleteForMeEvent),
}

impl Event {
    /// Short variant name for logging
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Receipt(_) => "receipt",
            Self::Presence(_) => "presence",
            Self::PairSuccess(_) => "pair_success",
            Self::LoggedOut(_) => "logged_out",
            Self::Connected => "connected",
            Self::PushNameChanged => "push_name_changed",
            Self::StreamReplaced => "stream_replaced",
            Self::HistorySync(_) => "history_sync",
            Self::AppStateSyncComplete(_) => "app_state_sync_complete",
            Self::AppState(_) => "app_state",
            Self::DeleteForMe(_) => "delete_for_me",
        }
    }
}

/// Where a message or receipt came from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageSource {
    /// Chat address (user, group, or broadcast list)
    pub chat: String,
    /// Sender address
    pub sender: String,
    /// Sent by the logged-in account
    #[serde(default)]
    pub is_from_me: bool,
    /// Chat is a group
    #[serde(default)]
    pub is_group: bool,
}

impl MessageSource {
    /// Human-readable origin: the chat, or `sender in chat` when they differ
    #[must_use]
    pub fn source_string(&self) -> String {
        if self.sender == self.chat {
            self.chat.clone()
        } else {
            format!("{} in {}", self.sender, self.chat)
        }
    }
}

/// Metadata about a received message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageInfo {
    /// Message identifier
    pub id: String,
    /// Origin of the message
    #[serde(flatten)]
    pub source: MessageSource,
    /// Sender display name
    #[serde(default)]
    pub push_name: String,
    /// Server timestamp
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
    /// Message type (`text`, `media`, ...)
    #[serde(default, rename = "message_type")]
    pub kind: String,
    /// Message category
    #[serde(default)]
    pub category: String,
}

/// A received message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEvent {
    /// Message metadata
    pub info: MessageInfo,
    /// Message body
    #[serde(default)]
    pub message: MessageContent,
    /// Whether the message was sent as view-once
    #[serde(default)]
    pub is_view_once: bool,
}

/// Protocol message body; every part is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageContent {
    /// Plain text body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<String>,
    /// Rich text body, possibly replying to another message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_text: Option<ExtendedText>,
    /// Emoji reaction to another message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction: Option<Reaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<MediaReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker: Option<MediaReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<MediaReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_location: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_once: Option<serde_json::Value>,
}

impl MessageContent {
    /// Attached media reference of the given kind
    #[must_use]
    pub const fn media(&self, kind: MediaKind) -> Option<&MediaReference> {
        match kind {
            MediaKind::Image => self.image.as_ref(),
            MediaKind::Audio => self.audio.as_ref(),
            MediaKind::Video => self.video.as_ref(),
            MediaKind::Sticker => self.sticker.as_ref(),
            MediaKind::Document => self.document.as_ref(),
        }
    }

    /// Text of the extended body, if any
    #[must_use]
    pub fn extended_text(&self) -> Option<&str> {
        self.extended_text.as_ref()?.text.as_deref()
    }

    /// Reply context attached to the extended body
    #[must_use]
    pub fn context_info(&self) -> Option<&ContextInfo> {
        self.extended_text.as_ref()?.context_info.as_ref()
    }
}

/// Extended text message body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedText {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub context_info: Option<ContextInfo>,
}

/// Reply / forward context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextInfo {
    /// Id of the message being replied to
    #[serde(default)]
    pub stanza_id: Option<String>,
    /// Author of the quoted message
    #[serde(default)]
    pub participant: Option<String>,
    /// Body of the quoted message
    #[serde(default)]
    pub quoted_message: Option<Box<MessageContent>>,
    #[serde(default)]
    pub is_forwarded: bool,
}

/// Emoji reaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reaction {
    /// Key of the message reacted to
    #[serde(default)]
    pub key: Option<MessageKey>,
    /// Reaction emoji; empty removes a reaction
    #[serde(default)]
    pub text: Option<String>,
}

/// Reference to a message within a chat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageKey {
    pub id: String,
    #[serde(default)]
    pub remote_jid: Option<String>,
    #[serde(default)]
    pub from_me: bool,
}

/// Kind of attachment a message can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Sticker,
    Document,
}

impl MediaKind {
    /// Every kind, in the order attachments are processed
    pub const ALL: [Self; 5] = [
        Self::Image,
        Self::Sticker,
        Self::Video,
        Self::Audio,
        Self::Document,
    ];

    /// Payload field name for this kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Sticker => "sticker",
            Self::Document => "document",
        }
    }

    /// Whether attachments of this kind carry a caption
    #[must_use]
    pub const fn has_caption(self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Document)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Undownloaded attachment
///
/// `handle` is opaque to the pipeline and only meaningful to the client's
/// download capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaReference {
    /// Download handle (direct path or URL)
    pub handle: String,
    /// MIME type hint, possibly with parameters
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Receipt type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReceiptType {
    /// Delivered to the recipient's device
    #[default]
    Delivered,
    /// Read by the recipient
    Read,
    /// Read by the local account on another device
    ReadSelf,
    /// Voice note or view-once media played
    Played,
    Sender,
    Retry,
    ServerError,
    Inactive,
    #[serde(other)]
    Other,
}

impl ReceiptType {
    /// Wire name of the receipt type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::ReadSelf => "read-self",
            Self::Played => "played",
            Self::Sender => "sender",
            Self::Retry => "retry",
            Self::ServerError => "server-error",
            Self::Inactive => "inactive",
            Self::Other => "other",
        }
    }

    /// Whether receipts of this type are forwarded to webhooks
    #[must_use]
    pub const fn is_forwarded(self) -> bool {
        matches!(self, Self::Delivered | Self::Read | Self::ReadSelf)
    }
}

impl fmt::Display for ReceiptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery or read receipt for one or more messages
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceiptEvent {
    #[serde(flatten)]
    pub source: MessageSource,
    #[serde(default)]
    pub message_ids: Vec<String>,
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub receipt_type: ReceiptType,
}

/// Contact presence change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresenceEvent {
    pub from: String,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Pairing completed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PairSuccessEvent {
    /// Newly paired device address
    pub id: String,
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub platform: String,
}

/// Session logged out
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggedOutEvent {
    /// Logout happened during connect
    #[serde(default)]
    pub on_connect: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// History sync type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistorySyncType {
    #[default]
    InitialBootstrap,
    InitialStatusV3,
    Full,
    Recent,
    PushName,
    NonBlockingData,
    OnDemand,
}

impl HistorySyncType {
    /// Protocol name, as used in history file names
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InitialBootstrap => "INITIAL_BOOTSTRAP",
            Self::InitialStatusV3 => "INITIAL_STATUS_V3",
            Self::Full => "FULL",
            Self::Recent => "RECENT",
            Self::PushName => "PUSH_NAME",
            Self::NonBlockingData => "NON_BLOCKING_DATA",
            Self::OnDemand => "ON_DEMAND",
        }
    }
}

impl fmt::Display for HistorySyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bulk history backlog chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistorySyncEvent {
    #[serde(default)]
    pub sync_type: HistorySyncType,
    /// Raw history payload, persisted as-is
    #[serde(default)]
    pub data: serde_json::Value,
}

/// App state patch finished syncing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppStateSyncCompleteEvent {
    /// Patch name
    pub name: String,
}

impl AppStateSyncCompleteEvent {
    /// Whether this is the patch that carries the local push name
    #[must_use]
    pub fn is_critical_block(&self) -> bool {
        self.name == CRITICAL_BLOCK_PATCH
    }
}

/// Single app state mutation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppStateEvent {
    #[serde(default)]
    pub index: Vec<String>,
    #[serde(default)]
    pub action: serde_json::Value,
}

/// Message deleted for the local account
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteForMeEvent {
    pub chat: String,
    pub sender: String,
    pub message_id: String,
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
}

/// Decode newline-delimited JSON events from `reader` into `tx`
///
/// Blank lines are ignored. A line that does not decode (bad JSON or an
/// unknown `type`) is logged and skipped. Returns the number of events sent;
/// stops early if the receiver is dropped.
pub async fn decode_stream<R>(reader: R, tx: mpsc::Sender<Event>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0_usize;
    let mut sent = 0_usize;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "failed to read events");
                break;
            }
        };
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Event>(&line) {
            Ok(event) => {
                tracing::trace!(line = line_no, kind = event.kind(), "decoded event");
                if tx.send(event).await.is_err() {
                    break;
                }
                sent += 1;
            }
            Err(e) => tracing::warn!(line = line_no, error = %e, "skipping malformed event"),
        }
    }

    sent
}
