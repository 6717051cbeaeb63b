//! Archive record schema
//!
//! One record per fetched message, decoupled from the client library's
//! message representation by an explicit mapping step.

use std::path::Path;

use chrono::{DateTime, Utc};
use grammers_client::types::peer::Peer;
use grammers_client::types::{Media, Message};
use serde::{Deserialize, Serialize};

/// One archived message. Constructed once per fetched message,
/// immutable afterwards, serialized exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Message id, unique within its channel
    pub id: i32,
    pub date: DateTime<Utc>,
    pub text: Option<String>,
    pub sender_id: Option<i64>,
    /// Always serialized, `null` when the message had no downloaded media
    pub media: Option<MediaRef>,
}

/// Descriptor of a downloaded attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub file_path: String,
}

impl MessageRecord {
    /// Map a client message into an archive record (without media).
    pub fn from_message(msg: &Message) -> Self {
        let text = msg.text();
        Self {
            id: msg.id(),
            date: msg.date(),
            text: (!text.is_empty()).then(|| text.to_string()),
            sender_id: sender_id(msg.sender()),
            media: None,
        }
    }

    /// Attach a downloaded media descriptor.
    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media = Some(media);
        self
    }
}

/// Extract the sender ID from a peer, if the message has one.
fn sender_id(sender: Option<&Peer>) -> Option<i64> {
    sender.map(|s| match s {
        Peer::User(u) => u.raw.id(),
        Peer::Group(g) => match &g.raw {
            grammers_tl_types::enums::Chat::Empty(c) => c.id,
            grammers_tl_types::enums::Chat::Chat(c) => c.id,
            grammers_tl_types::enums::Chat::Forbidden(c) => c.id,
            grammers_tl_types::enums::Chat::Channel(c) => c.id,
            grammers_tl_types::enums::Chat::ChannelForbidden(c) => c.id,
        },
        Peer::Channel(c) => c.raw.id,
    })
}

/// Tag recorded as the media kind in the archive.
pub fn media_kind(media: &Media) -> &'static str {
    match media {
        Media::Photo(_) => "photo",
        Media::Document(_) => "document",
        Media::Sticker(_) => "sticker",
        Media::Contact(_) => "contact",
        _ => "other",
    }
}

/// Whether the attachment counts as an image.
pub fn is_image(media: &Media) -> bool {
    matches!(media, Media::Photo(_))
}

/// File extension for the downloaded copy of an attachment.
pub fn media_extension(media: &Media) -> String {
    match media {
        Media::Photo(_) => ".jpg".to_string(),
        Media::Sticker(_) => ".webp".to_string(),
        Media::Document(document) => {
            let name = document.name();
            match Path::new(name).extension().and_then(|e| e.to_str()) {
                Some(ext) if !ext.is_empty() => format!(".{}", ext),
                _ => extension_from_mime(document.mime_type()),
            }
        }
        _ => ".bin".to_string(),
    }
}

fn extension_from_mime(mime: Option<&str>) -> String {
    match mime {
        Some("image/jpeg") => ".jpg",
        Some("image/png") => ".png",
        Some("image/webp") => ".webp",
        Some("image/gif") => ".gif",
        Some("video/mp4") => ".mp4",
        Some("audio/ogg") => ".ogg",
        _ => ".bin",
    }
    .to_string()
}
