// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update conversion and dispatch endpoints.
//!
//! Translates Telegram Business updates into [`BusinessEvent`]s and pushes
//! them onto the gateway's queue. Attachments are resolved once here so the
//! engine never inspects Telegram types.

use std::str::FromStr;

use afterimage_core::types::{
    Attachment, BusinessConnection, BusinessEvent, ChatId, ChatInfo, CommandRequest,
    ConnectionId, DeletionBatch, FileRef, InboundMessage, MessageId, OwnerCommand,
    RepliedMessage, Sender, StickerFormat, UserId,
};
use teloxide::prelude::*;
use teloxide::types::{
    BusinessMessagesDeleted, Chat, ChatKind, FileMeta, MediaKind as TgMediaKind, MessageCommon,
    MessageEntityKind, MessageKind, User,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Checks whether the message is from a private (DM) chat.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

pub fn to_sender(user: &User) -> Sender {
    Sender {
        id: UserId(user.id.0 as i64),
        first_name: user.first_name.clone(),
        username: user.username.clone(),
    }
}

/// Chat label: the counterpart's full name, or the chat title.
pub fn to_chat_info(chat: &Chat) -> ChatInfo {
    let display_name = match (chat.first_name(), chat.last_name()) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(first), None) => first.to_string(),
        _ => chat.title().unwrap_or("Unknown").to_string(),
    };
    ChatInfo {
        id: ChatId(chat.id.0),
        display_name,
        username: chat.username().map(str::to_string),
    }
}

fn file_ref(meta: &FileMeta) -> FileRef {
    FileRef(meta.id.0.clone())
}

/// Whether Telegram flagged the photo/video as hidden behind a spoiler,
/// which is how view-once media reaches Business bots.
pub fn has_media_spoiler(msg: &Message) -> bool {
    match &msg.kind {
        MessageKind::Common(MessageCommon { media_kind, .. }) => match media_kind {
            TgMediaKind::Photo(photo) => photo.has_media_spoiler,
            TgMediaKind::Video(video) => video.has_media_spoiler,
            _ => false,
        },
        _ => false,
    }
}

/// Resolves the single attachment a message carries.
pub fn attachment(msg: &Message) -> Attachment {
    if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
        return Attachment::Photo {
            file: file_ref(&largest.file),
            view_once: has_media_spoiler(msg),
        };
    }
    if let Some(video) = msg.video() {
        return Attachment::Video {
            file: file_ref(&video.file),
            view_once: has_media_spoiler(msg),
        };
    }
    if let Some(animation) = msg.animation() {
        return Attachment::Animation {
            file: file_ref(&animation.file),
        };
    }
    if let Some(doc) = msg.document() {
        return Attachment::Document {
            file: file_ref(&doc.file),
            file_name: doc.file_name.clone(),
        };
    }
    if let Some(sticker) = msg.sticker() {
        let format = if sticker.is_animated() {
            StickerFormat::Animated
        } else if sticker.is_video() {
            StickerFormat::Video
        } else {
            StickerFormat::Static
        };
        return Attachment::Sticker {
            file: file_ref(&sticker.file),
            format,
        };
    }
    if let Some(voice) = msg.voice() {
        return Attachment::Voice {
            file: file_ref(&voice.file),
        };
    }
    if let Some(note) = msg.video_note() {
        return Attachment::VideoNote {
            file: file_ref(&note.file),
        };
    }
    Attachment::None
}

/// URLs from `url` and `text_link` entities of the text or caption.
pub fn links(msg: &Message) -> Vec<String> {
    msg.parse_entities()
        .or_else(|| msg.parse_caption_entities())
        .unwrap_or_default()
        .iter()
        .filter_map(|entity| match entity.kind() {
            MessageEntityKind::Url => Some(entity.text().to_string()),
            MessageEntityKind::TextLink { url } => Some(url.to_string()),
            _ => None,
        })
        .collect()
}

fn to_replied(msg: &Message) -> RepliedMessage {
    RepliedMessage {
        message_id: MessageId(i64::from(msg.id.0)),
        sender: msg.from.as_ref().map(to_sender),
        caption: msg.caption().map(str::to_string),
        attachment: attachment(msg),
    }
}

/// Converts a Business message. Returns `None` for messages that did not
/// arrive through a Business connection.
pub fn to_inbound(msg: &Message) -> Option<InboundMessage> {
    let MessageKind::Common(common) = &msg.kind else {
        return None;
    };
    let connection = common.business_connection_id.as_ref()?;
    Some(InboundMessage {
        connection_id: ConnectionId(connection.0.clone()),
        chat: to_chat_info(&msg.chat),
        message_id: MessageId(i64::from(msg.id.0)),
        sender: msg.from.as_ref().map(to_sender),
        text: msg.text().map(str::to_string),
        caption: msg.caption().map(str::to_string),
        attachment: attachment(msg),
        links: links(msg),
        reply_to: msg.reply_to_message().map(to_replied),
    })
}

pub fn to_deletion(deleted: &BusinessMessagesDeleted) -> DeletionBatch {
    DeletionBatch {
        connection_id: ConnectionId(deleted.business_connection_id.0.clone()),
        chat: to_chat_info(&deleted.chat),
        message_ids: deleted
            .message_ids
            .iter()
            .map(|id| MessageId(i64::from(id.0)))
            .collect(),
    }
}

pub fn to_connection(conn: &teloxide::types::BusinessConnection) -> BusinessConnection {
    BusinessConnection {
        connection_id: ConnectionId(conn.id.0.clone()),
        owner: to_sender(&conn.user),
        is_enabled: conn.is_enabled,
    }
}

/// Parses `/start`, `/help`, `/stats`, with or without a `@botname` suffix.
pub fn parse_command(text: &str) -> Option<OwnerCommand> {
    let word = text.split_whitespace().next()?.strip_prefix('/')?;
    let name = word.split('@').next()?;
    OwnerCommand::from_str(&name.to_ascii_lowercase()).ok()
}

async fn forward(tx: &mpsc::Sender<BusinessEvent>, event: BusinessEvent) {
    metrics::counter!("afterimage_updates_total", "kind" => event.kind()).increment(1);
    if tx.send(event).await.is_err() {
        warn!("event queue closed, dropping update");
    }
}

pub async fn on_business_connection(
    conn: teloxide::types::BusinessConnection,
    tx: mpsc::Sender<BusinessEvent>,
) -> ResponseResult<()> {
    forward(&tx, BusinessEvent::Connected(to_connection(&conn))).await;
    respond(())
}

pub async fn on_business_message(
    msg: Message,
    tx: mpsc::Sender<BusinessEvent>,
) -> ResponseResult<()> {
    match to_inbound(&msg) {
        Some(inbound) => forward(&tx, BusinessEvent::Message(inbound)).await,
        None => debug!(msg_id = msg.id.0, "business message without connection id"),
    }
    respond(())
}

pub async fn on_edited_business_message(
    msg: Message,
    tx: mpsc::Sender<BusinessEvent>,
) -> ResponseResult<()> {
    match to_inbound(&msg) {
        Some(inbound) => forward(&tx, BusinessEvent::Edited(inbound)).await,
        None => debug!(msg_id = msg.id.0, "edited business message without connection id"),
    }
    respond(())
}

pub async fn on_deleted_business_messages(
    deleted: BusinessMessagesDeleted,
    tx: mpsc::Sender<BusinessEvent>,
) -> ResponseResult<()> {
    forward(&tx, BusinessEvent::Deleted(to_deletion(&deleted))).await;
    respond(())
}

/// Commands sent to the bot in its own private chat.
pub async fn on_direct_message(
    msg: Message,
    tx: mpsc::Sender<BusinessEvent>,
) -> ResponseResult<()> {
    if !is_dm(&msg) {
        debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
        return respond(());
    }
    let (Some(user), Some(command)) = (msg.from.as_ref(), msg.text().and_then(parse_command))
    else {
        return respond(());
    };
    let request = CommandRequest {
        chat: ChatId(msg.chat.id.0),
        user: to_sender(user),
        command,
    };
    forward(&tx, BusinessEvent::Command(request)).await;
    respond(())
}
