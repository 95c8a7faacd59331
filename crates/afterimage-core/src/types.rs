// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the gateway, the storage layer, and the mirror engine.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Telegram user identifier (owners and counterparts alike).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UserId(pub i64);

/// Identifier of the counterpart conversation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChatId(pub i64);

/// Platform-assigned message sequence id, unique within (owner, chat).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MessageId(pub i64);

/// Opaque Business connection identifier issued by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub String);

/// Platform file handle used to download media bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef(pub String);

macro_rules! display_inner {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        })*
    };
}

display_inner!(UserId, ChatId, MessageId, ConnectionId, FileRef);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Gateway,
    Storage,
}

/// Media classification of a stored message.
///
/// The `*Reply` variants mark content recovered through a reply to a
/// view-once message rather than observed directly.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    #[default]
    None,
    Photo,
    Video,
    Document,
    Sticker,
    Voice,
    VideoNote,
    Animation,
    PhotoReply,
    VideoReply,
}

impl MediaKind {
    /// Whether this content was recovered via the reply trick.
    pub fn is_recovered(self) -> bool {
        matches!(self, MediaKind::PhotoReply | MediaKind::VideoReply)
    }

    /// Photos, directly observed or recovered.
    pub fn is_photo(self) -> bool {
        matches!(self, MediaKind::Photo | MediaKind::PhotoReply)
    }

    /// Human-readable placeholder label.
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::None => "📎 Media",
            MediaKind::Photo | MediaKind::PhotoReply => "📷 Photo",
            MediaKind::Video | MediaKind::VideoReply => "🎥 Video",
            MediaKind::Document => "📄 Document",
            MediaKind::Sticker => "🎭 Sticker",
            MediaKind::Voice => "🎤 Voice message",
            MediaKind::VideoNote => "🎬 Video message",
            MediaKind::Animation => "🎬 GIF",
        }
    }
}

/// Encoding of a sticker file, which decides the stored extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickerFormat {
    Static,
    Animated,
    Video,
}

/// The attachment carried by an inbound message, resolved once by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Attachment {
    #[default]
    None,
    Photo {
        file: FileRef,
        view_once: bool,
    },
    Video {
        file: FileRef,
        view_once: bool,
    },
    Document {
        file: FileRef,
        file_name: Option<String>,
    },
    Sticker {
        file: FileRef,
        format: StickerFormat,
    },
    Voice {
        file: FileRef,
    },
    VideoNote {
        file: FileRef,
    },
    Animation {
        file: FileRef,
    },
}

impl Attachment {
    /// Media kind as observed directly.
    pub fn media_kind(&self) -> MediaKind {
        match self {
            Attachment::None => MediaKind::None,
            Attachment::Photo { .. } => MediaKind::Photo,
            Attachment::Video { .. } => MediaKind::Video,
            Attachment::Document { .. } => MediaKind::Document,
            Attachment::Sticker { .. } => MediaKind::Sticker,
            Attachment::Voice { .. } => MediaKind::Voice,
            Attachment::VideoNote { .. } => MediaKind::VideoNote,
            Attachment::Animation { .. } => MediaKind::Animation,
        }
    }

    /// Downloadable file handle, if any.
    pub fn file(&self) -> Option<&FileRef> {
        match self {
            Attachment::None => None,
            Attachment::Photo { file, .. }
            | Attachment::Video { file, .. }
            | Attachment::Document { file, .. }
            | Attachment::Sticker { file, .. }
            | Attachment::Voice { file }
            | Attachment::VideoNote { file }
            | Attachment::Animation { file } => Some(file),
        }
    }

    /// Whether the platform flagged this photo/video as view-once.
    pub fn is_view_once(&self) -> bool {
        matches!(
            self,
            Attachment::Photo {
                view_once: true,
                ..
            } | Attachment::Video {
                view_once: true,
                ..
            }
        )
    }

    /// File extension used when the media is persisted locally.
    pub fn file_extension(&self) -> String {
        match self {
            Attachment::None => "bin".to_string(),
            Attachment::Photo { .. } => "jpg".to_string(),
            Attachment::Video { .. } | Attachment::VideoNote { .. } | Attachment::Animation { .. } => {
                "mp4".to_string()
            }
            Attachment::Document { file_name, .. } => file_name
                .as_deref()
                .and_then(|name| name.rsplit_once('.'))
                .map(|(_, ext)| ext)
                .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
                .map(|ext| ext.to_ascii_lowercase())
                .unwrap_or_else(|| "file".to_string()),
            Attachment::Sticker { format, .. } => match format {
                StickerFormat::Static => "webp".to_string(),
                StickerFormat::Animated => "tgs".to_string(),
                StickerFormat::Video => "webm".to_string(),
            },
            Attachment::Voice { .. } => "ogg".to_string(),
        }
    }
}

/// The author of an inbound message or the owner of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub first_name: String,
    pub username: Option<String>,
}

impl Sender {
    /// `First (@username)`, or just the first name.
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(username) => format!("{} (@{username})", self.first_name),
            None => self.first_name.clone(),
        }
    }
}

/// The counterpart conversation an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInfo {
    pub id: ChatId,
    pub display_name: String,
    pub username: Option<String>,
}

impl ChatInfo {
    /// `Name (@username)`, or just the name.
    pub fn label(&self) -> String {
        match &self.username {
            Some(username) => format!("{} (@{username})", self.display_name),
            None => self.display_name.clone(),
        }
    }
}

/// The message an inbound message replies to, as exposed by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepliedMessage {
    pub message_id: MessageId,
    pub sender: Option<Sender>,
    pub caption: Option<String>,
    pub attachment: Attachment,
}

/// A new or edited message observed through a Business connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub connection_id: ConnectionId,
    pub chat: ChatInfo,
    pub message_id: MessageId,
    pub sender: Option<Sender>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub attachment: Attachment,
    pub links: Vec<String>,
    pub reply_to: Option<RepliedMessage>,
}

impl InboundMessage {
    /// Sender id, when the platform disclosed one.
    pub fn sender_id(&self) -> Option<UserId> {
        self.sender.as_ref().map(|s| s.id)
    }

    /// Text if present, otherwise the caption, otherwise empty.
    pub fn body(&self) -> &str {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .unwrap_or_default()
    }
}

/// A batch of messages deleted at once in one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionBatch {
    pub connection_id: ConnectionId,
    pub chat: ChatInfo,
    pub message_ids: Vec<MessageId>,
}

/// A Business connection being enabled or disabled by its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessConnection {
    pub connection_id: ConnectionId,
    pub owner: Sender,
    pub is_enabled: bool,
}

/// Commands an owner can send to the bot in its own private chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OwnerCommand {
    Start,
    Help,
    Stats,
}

/// A command addressed to the bot directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub chat: ChatId,
    pub user: Sender,
    pub command: OwnerCommand,
}

/// Every platform event the mirror consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusinessEvent {
    Connected(BusinessConnection),
    Message(InboundMessage),
    Edited(InboundMessage),
    Deleted(DeletionBatch),
    Command(CommandRequest),
}

impl BusinessEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BusinessEvent::Connected(_) => "connected",
            BusinessEvent::Message(_) => "message",
            BusinessEvent::Edited(_) => "edited",
            BusinessEvent::Deleted(_) => "deleted",
            BusinessEvent::Command(_) => "command",
        }
    }
}

/// One row of the message shadow-store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub owner_id: UserId,
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub sender_id: Option<UserId>,
    pub text: String,
    pub caption: Option<String>,
    pub media_kind: MediaKind,
    /// Local path of the downloaded bytes.
    pub media_ref: Option<String>,
    /// Extracted URLs joined with `", "`.
    pub links: Option<String>,
    /// First observation, RFC 3339. Left empty on write to let storage stamp it.
    pub observed_at: String,
    pub updated_at: String,
    pub delivery_attempts: u32,
}

impl StoredMessage {
    /// Non-empty text, else non-empty caption.
    pub fn body(&self) -> Option<&str> {
        if !self.text.trim().is_empty() {
            return Some(&self.text);
        }
        self.caption.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Whether `user` wrote this version of the message.
    pub fn is_authored_by(&self, user: UserId) -> bool {
        self.sender_id == Some(user)
    }
}

/// Per-owner counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum StatKind {
    Messages,
    Edits,
    Deletes,
}

/// Aggregated counters for one owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerStats {
    pub messages: u64,
    pub edits: u64,
    pub deletes: u64,
}

/// Registered owner of a Business connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRecord {
    pub owner_id: UserId,
    pub connection_id: ConnectionId,
    pub first_name: String,
    pub username: Option<String>,
    pub is_enabled: bool,
}

/// Subscription plan.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionKind {
    Trial,
    Paid,
}

/// An owner's subscription record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub owner_id: UserId,
    pub kind: SubscriptionKind,
    pub expires_at: DateTime<Utc>,
}

impl Subscription {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Whole days left, zero once expired.
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_days().max(0)
    }
}

/// File types the gateway can deliver from a local path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum OutboundMedia {
    Photo,
    Video,
    Document,
    Voice,
    Animation,
    VideoNote,
}

impl OutboundMedia {
    /// Delivery method for a stored media kind.
    pub fn for_kind(kind: MediaKind) -> Option<Self> {
        match kind {
            MediaKind::None => None,
            MediaKind::Photo | MediaKind::PhotoReply => Some(OutboundMedia::Photo),
            MediaKind::Video | MediaKind::VideoReply => Some(OutboundMedia::Video),
            MediaKind::Document | MediaKind::Sticker => Some(OutboundMedia::Document),
            MediaKind::Voice => Some(OutboundMedia::Voice),
            MediaKind::Animation => Some(OutboundMedia::Animation),
            MediaKind::VideoNote => Some(OutboundMedia::VideoNote),
        }
    }
}

/// Payload of an outbound message. Text and captions use Telegram HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundBody {
    Text(String),
    File {
        media: OutboundMedia,
        path: PathBuf,
        caption: Option<String>,
    },
    Document {
        file_name: String,
        bytes: Vec<u8>,
        caption: Option<String>,
    },
}

/// A message the mirror asks the gateway to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat: ChatId,
    pub body: OutboundBody,
}

impl OutboundMessage {
    pub fn text(chat: ChatId, html: impl Into<String>) -> Self {
        Self {
            chat,
            body: OutboundBody::Text(html.into()),
        }
    }

    pub fn file(
        chat: ChatId,
        media: OutboundMedia,
        path: impl Into<PathBuf>,
        caption: Option<String>,
    ) -> Self {
        Self {
            chat,
            body: OutboundBody::File {
                media,
                path: path.into(),
                caption,
            },
        }
    }

    pub fn document(
        chat: ChatId,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        caption: Option<String>,
    ) -> Self {
        Self {
            chat,
            body: OutboundBody::Document {
                file_name: file_name.into(),
                bytes,
                caption,
            },
        }
    }

    /// The text or caption carried by this message.
    pub fn caption_or_text(&self) -> Option<&str> {
        match &self.body {
            OutboundBody::Text(text) => Some(text),
            OutboundBody::File { caption, .. } | OutboundBody::Document { caption, .. } => {
                caption.as_deref()
            }
        }
    }
}

/// Acknowledgement of a delivered outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: MessageId,
}
