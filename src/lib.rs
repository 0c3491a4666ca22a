//! wabridge - forwards messaging client events to webhooks
//!
//! The protocol client (connection, pairing, encryption) is external. This
//! crate consumes its event stream and:
//! - forwards messages and receipts to webhook endpoints as normalized JSON
//! - stores attached media and history sync dumps on disk
//! - announces presence, sends auto-replies, and notifies UI subscribers of
//!   login state changes
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │   Messaging client   │◄──── presence / text / download
//! └──────────┬───────────┘
//!            │ Event
//! ┌──────────▼───────────┐      ┌───────────────────┐
//! │      Dispatcher      ├─────►│  UI broadcast     │
//! └──┬────────┬───────┬──┘      └───────────────────┘
//!    │        │       │
//! ┌──▼───┐ ┌──▼────┐ ┌▼────────┐
//! │Media │ │Payload│ │ History │
//! └──┬───┘ └──┬────┘ └─────────┘
//!    └───┬────┘
//! ┌──────▼───────┐
//! │   Webhooks   │
//! └──────────────┘
//! ```

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod history;
pub mod identity;
pub mod media;
pub mod notify;
pub mod payload;
pub mod session;
pub mod storage;
pub mod webhook;

pub use client::{MessagingClient, ReplayClient};
pub use config::Config;
pub use dispatcher::{Dispatcher, Flow};
pub use error::{Error, Result};
pub use events::{Event, MediaKind, MediaReference};
pub use history::HistoryWriter;
pub use media::{ExtractedMedia, MediaExtractor, extension_for_mime};
pub use notify::BroadcastMessage;
pub use payload::{MessagePayload, ReceiptPayload, normalize_message, normalize_receipt};
pub use webhook::WebhookClient;
