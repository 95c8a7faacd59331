// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event builders for a single owner talking to a single counterpart.

use afterimage_core::types::{
    Attachment, BusinessConnection, BusinessEvent, ChatId, ChatInfo, CommandRequest, ConnectionId,
    DeletionBatch, FileRef, InboundMessage, MessageId, OwnerCommand, RepliedMessage, Sender,
    UserId,
};

pub const OWNER: UserId = UserId(1000);
pub const COUNTERPART: UserId = UserId(2000);
/// Private chats share the counterpart's id.
pub const CHAT: ChatId = ChatId(2000);
pub const CONNECTION: &str = "biz-conn-1";

pub fn connection_id() -> ConnectionId {
    ConnectionId(CONNECTION.to_string())
}

pub fn owner() -> Sender {
    Sender {
        id: OWNER,
        first_name: "Olivia".to_string(),
        username: Some("olivia".to_string()),
    }
}

pub fn counterpart() -> Sender {
    Sender {
        id: COUNTERPART,
        first_name: "Carl".to_string(),
        username: Some("carl".to_string()),
    }
}

pub fn chat() -> ChatInfo {
    ChatInfo {
        id: CHAT,
        display_name: "Carl".to_string(),
        username: Some("carl".to_string()),
    }
}

pub fn connected(is_enabled: bool) -> BusinessEvent {
    BusinessEvent::Connected(BusinessConnection {
        connection_id: connection_id(),
        owner: owner(),
        is_enabled,
    })
}

/// A plain inbound message from the counterpart.
pub fn inbound(id: i64, text: &str) -> InboundMessage {
    InboundMessage {
        connection_id: connection_id(),
        chat: chat(),
        message_id: MessageId(id),
        sender: Some(counterpart()),
        text: Some(text.to_string()),
        caption: None,
        attachment: Attachment::None,
        links: Vec::new(),
        reply_to: None,
    }
}

/// The same message written by the owner.
pub fn inbound_from_owner(id: i64, text: &str) -> InboundMessage {
    InboundMessage {
        sender: Some(owner()),
        ..inbound(id, text)
    }
}

pub fn text_message(id: i64, text: &str) -> BusinessEvent {
    BusinessEvent::Message(inbound(id, text))
}

pub fn owner_message(id: i64, text: &str) -> BusinessEvent {
    BusinessEvent::Message(inbound_from_owner(id, text))
}

pub fn photo_message(id: i64, file_id: &str, caption: Option<&str>) -> BusinessEvent {
    BusinessEvent::Message(InboundMessage {
        text: None,
        caption: caption.map(str::to_string),
        attachment: Attachment::Photo {
            file: FileRef(file_id.to_string()),
            view_once: false,
        },
        ..inbound(id, "")
    })
}

pub fn edited(id: i64, text: &str) -> BusinessEvent {
    BusinessEvent::Edited(inbound(id, text))
}

pub fn owner_edited(id: i64, text: &str) -> BusinessEvent {
    BusinessEvent::Edited(inbound_from_owner(id, text))
}

pub fn deleted(ids: &[i64]) -> BusinessEvent {
    BusinessEvent::Deleted(DeletionBatch {
        connection_id: connection_id(),
        chat: chat(),
        message_ids: ids.iter().copied().map(MessageId).collect(),
    })
}

/// The owner replying to a view-once photo the counterpart sent as `original_id`.
pub fn reply_to_view_once_photo(id: i64, original_id: i64, file_id: &str) -> BusinessEvent {
    BusinessEvent::Message(InboundMessage {
        reply_to: Some(RepliedMessage {
            message_id: MessageId(original_id),
            sender: Some(counterpart()),
            caption: None,
            attachment: Attachment::Photo {
                file: FileRef(file_id.to_string()),
                view_once: true,
            },
        }),
        ..inbound_from_owner(id, "saving this")
    })
}

pub fn command(user: Sender, command: OwnerCommand) -> BusinessEvent {
    BusinessEvent::Command(CommandRequest {
        chat: ChatId(user.id.0),
        user,
        command,
    })
}
