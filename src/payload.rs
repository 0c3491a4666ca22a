//! Webhook payload shapes
//!
//! Every delivered message has the same set of top-level keys; absent parts
//! serialize as `null` (or empty strings for the `message` and `reaction`
//! objects) so consumers never have to probe for keys.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::events::{MediaKind, MediaReference, MessageEvent, ReceiptEvent, ReceiptType};
use crate::media::ExtractedMedia;

/// Text part of a message payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageText {
    pub id: String,
    pub text: String,
    /// Id of the message this one replies to; empty if none
    pub replied_id: String,
}

/// Reaction part of a message payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReactionPayload {
    /// Id of the message reacted to
    pub id: String,
    /// Reaction emoji
    pub message: String,
}

/// Attachment field: the raw reference until the file is stored
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MediaField {
    Raw(MediaReference),
    Path(String),
}

impl MediaField {
    /// Stored file path, if the attachment was extracted
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Path(path) => Some(path),
            Self::Raw(_) => None,
        }
    }
}

/// Payload delivered for a received message
#[derive(Debug, Clone, Serialize)]
pub struct MessagePayload {
    pub audio: Option<MediaField>,
    pub contact: Option<serde_json::Value>,
    pub document: Option<MediaField>,
    pub forwarded: bool,
    /// Source string of the message
    pub from: String,
    pub image: Option<MediaField>,
    pub list: Option<serde_json::Value>,
    pub live_location: Option<serde_json::Value>,
    pub location: Option<serde_json::Value>,
    pub message: MessageText,
    pub order: Option<serde_json::Value>,
    pub pushname: String,
    pub quoted_message: Option<String>,
    pub reaction: ReactionPayload,
    pub sticker: Option<MediaField>,
    pub video: Option<MediaField>,
    pub view_once: Option<serde_json::Value>,
}

impl MessagePayload {
    /// Attachment field for the given kind
    #[must_use]
    pub const fn media(&self, kind: MediaKind) -> Option<&MediaField> {
        match kind {
            MediaKind::Image => self.image.as_ref(),
            MediaKind::Audio => self.audio.as_ref(),
            MediaKind::Video => self.video.as_ref(),
            MediaKind::Sticker => self.sticker.as_ref(),
            MediaKind::Document => self.document.as_ref(),
        }
    }

    fn media_mut(&mut self, kind: MediaKind) -> &mut Option<MediaField> {
        match kind {
            MediaKind::Image => &mut self.image,
            MediaKind::Audio => &mut self.audio,
            MediaKind::Video => &mut self.video,
            MediaKind::Sticker => &mut self.sticker,
            MediaKind::Document => &mut self.document,
        }
    }

    /// Replace the raw reference of `kind` with the stored file path
    pub fn attach_media(&mut self, kind: MediaKind, extracted: &ExtractedMedia) {
        if extracted.is_empty() {
            return;
        }
        *self.media_mut(kind) = Some(MediaField::Path(extracted.media_path.clone()));
    }
}

/// Build the payload for a received message
///
/// Attachments are left as raw references; see [`MessagePayload::attach_media`].
#[must_use]
pub fn normalize_message(evt: &MessageEvent) -> MessagePayload {
    let content = &evt.message;
    let context = content.context_info();

    let mut message = MessageText {
        id: evt.info.id.clone(),
        text: content.conversation.clone().unwrap_or_default(),
        replied_id: String::new(),
    };
    if let Some(text) = content.extended_text().filter(|t| !t.is_empty()) {
        message.text = text.to_string();
        message.replied_id = context
            .and_then(|c| c.stanza_id.clone())
            .unwrap_or_default();
    }

    let quoted_message = context
        .and_then(|c| c.quoted_message.as_ref())
        .and_then(|q| q.conversation.clone())
        .filter(|q| !q.is_empty());

    let reaction = content
        .reaction
        .as_ref()
        .map(|r| ReactionPayload {
            id: r.key.as_ref().map(|k| k.id.clone()).unwrap_or_default(),
            message: r.text.clone().unwrap_or_default(),
        })
        .unwrap_or_default();

    let raw = |kind: MediaKind| content.media(kind).cloned().map(MediaField::Raw);

    MessagePayload {
        audio: raw(MediaKind::Audio),
        contact: content.contact.clone(),
        document: raw(MediaKind::Document),
        forwarded: context.is_some_and(|c| c.is_forwarded),
        from: evt.info.source.source_string(),
        image: raw(MediaKind::Image),
        list: content.list.clone(),
        live_location: content.live_location.clone(),
        location: content.location.clone(),
        message,
        order: content.order.clone(),
        pushname: evt.info.push_name.clone(),
        quoted_message,
        reaction,
        sticker: raw(MediaKind::Sticker),
        video: raw(MediaKind::Video),
        view_once: content.view_once.clone(),
    }
}

/// Payload delivered for a receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptPayload {
    pub source: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub receipt_type: ReceiptType,
    pub ids: Vec<String>,
}

/// Build the payload for a receipt
#[must_use]
pub fn normalize_receipt(evt: &ReceiptEvent) -> ReceiptPayload {
    ReceiptPayload {
        source: evt.source.source_string(),
        timestamp: evt.timestamp,
        receipt_type: evt.receipt_type,
        ids: evt.message_ids.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::events::{
        ContextInfo, ExtendedText, MessageContent, MessageInfo, MessageKey, MessageSource,
        Reaction,
    };

    fn message_event(content: MessageContent) -> MessageEvent {
        MessageEvent {
            info: MessageInfo {
                id: "EVT1".to_string(),
                source: MessageSource {
                    chat: "628111@s.whatsapp.net".to_string(),
                    sender: "628111@s.whatsapp.net".to_string(),
                    ..Default::default()
                },
                push_name: "Budi".to_string(),
                ..Default::default()
            },
            message: content,
            is_view_once: false,
        }
    }

    #[test]
    fn test_plain_conversation() {
        let payload = normalize_message(&message_event(MessageContent {
            conversation: Some("hello".to_string()),
            ..Default::default()
        }));

        assert_eq!(payload.message.text, "hello");
        assert_eq!(payload.message.replied_id, "");
        assert!(!payload.forwarded);
        assert!(payload.quoted_message.is_none());
        assert_eq!(payload.reaction, ReactionPayload::default());
        assert_eq!(payload.from, "628111@s.whatsapp.net");
        assert_eq!(payload.pushname, "Budi");
    }

    #[test]
    fn test_extended_text_reply() {
        let payload = normalize_message(&message_event(MessageContent {
            conversation: Some("ignored".to_string()),
            extended_text: Some(ExtendedText {
                text: Some("hi".to_string()),
                context_info: Some(ContextInfo {
                    stanza_id: Some("XYZ".to_string()),
                    quoted_message: Some(Box::new(MessageContent {
                        conversation: Some("original".to_string()),
                        ..Default::default()
                    })),
                    is_forwarded: true,
                    ..Default::default()
                }),
            }),
            ..Default::default()
        }));

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value["message"],
            json!({ "id": "EVT1", "text": "hi", "replied_id": "XYZ" })
        );
        assert_eq!(value["quoted_message"], "original");
        assert_eq!(value["forwarded"], true);
    }

    #[test]
    fn test_empty_extended_text_keeps_conversation() {
        let payload = normalize_message(&message_event(MessageContent {
            conversation: Some("plain".to_string()),
            extended_text: Some(ExtendedText {
                text: Some(String::new()),
                context_info: Some(ContextInfo {
                    stanza_id: Some("XYZ".to_string()),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        }));

        assert_eq!(payload.message.text, "plain");
        assert_eq!(payload.message.replied_id, "");
    }

    #[test]
    fn test_reaction() {
        let payload = normalize_message(&message_event(MessageContent {
            reaction: Some(Reaction {
                key: Some(MessageKey {
                    id: "TARGET".to_string(),
                    ..Default::default()
                }),
                text: Some("👍".to_string()),
            }),
            ..Default::default()
        }));

        assert_eq!(payload.reaction.id, "TARGET");
        assert_eq!(payload.reaction.message, "👍");
    }

    #[test]
    fn test_media_defaults_to_raw_reference() {
        let mut payload = normalize_message(&message_event(MessageContent {
            image: Some(MediaReference {
                handle: "/enc/abc".to_string(),
                mime_type: "image/png".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }));

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["image"]["handle"], "/enc/abc");
        assert!(value["video"].is_null());

        payload.attach_media(
            MediaKind::Image,
            &ExtractedMedia {
                media_path: "statics/media/1-abc.png".to_string(),
                mime_type: "image/png".to_string(),
                caption: String::new(),
            },
        );
        assert_eq!(
            payload.media(MediaKind::Image).and_then(MediaField::path),
            Some("statics/media/1-abc.png")
        );
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["image"], "statics/media/1-abc.png");
    }

    #[test]
    fn test_attach_empty_media_is_ignored() {
        let mut payload = normalize_message(&message_event(MessageContent::default()));
        payload.attach_media(MediaKind::Audio, &ExtractedMedia::default());
        assert!(payload.audio.is_none());
    }

    #[test]
    fn test_receipt_shape() {
        let evt = ReceiptEvent {
            source: MessageSource {
                chat: "628222@s.whatsapp.net".to_string(),
                sender: "628222@s.whatsapp.net".to_string(),
                ..Default::default()
            },
            message_ids: vec!["ABC".to_string()],
            timestamp: "2024-05-01T10:00:00Z".parse().unwrap(),
            receipt_type: ReceiptType::Delivered,
        };

        let value = serde_json::to_value(normalize_receipt(&evt)).unwrap();
        assert_eq!(
            value,
            json!({
                "source": "628222@s.whatsapp.net",
                "timestamp": "2024-05-01T10:00:00Z",
                "type": "delivered",
                "ids": ["ABC"],
            })
        );
    }
}
