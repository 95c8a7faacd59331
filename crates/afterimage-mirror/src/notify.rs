// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery of notifications to an owner's private chat with the bot.

use std::sync::Arc;

use afterimage_core::types::{
    ChatId, DeliveryReceipt, OutboundMedia, OutboundMessage, StoredMessage, UserId,
};
use afterimage_core::{AfterimageError, MessagingGateway};
use tracing::warn;

use crate::vault::MediaVault;

/// The private chat between the bot and an owner shares the owner's id.
pub fn owner_chat(owner: UserId) -> ChatId {
    ChatId(owner.0)
}

/// Sends owner notifications through the gateway.
#[derive(Clone)]
pub struct Notifier {
    gateway: Arc<dyn MessagingGateway + Send + Sync>,
}

impl Notifier {
    pub fn new(gateway: Arc<dyn MessagingGateway + Send + Sync>) -> Self {
        Self { gateway }
    }

    pub async fn text(
        &self,
        owner: UserId,
        html: impl Into<String>,
    ) -> Result<DeliveryReceipt, AfterimageError> {
        self.reply(owner_chat(owner), html).await
    }

    /// Sends text to an arbitrary chat, e.g. to answer a command.
    pub async fn reply(
        &self,
        chat: ChatId,
        html: impl Into<String>,
    ) -> Result<DeliveryReceipt, AfterimageError> {
        self.gateway.send(OutboundMessage::text(chat, html)).await
    }

    pub async fn document(
        &self,
        owner: UserId,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        caption: Option<String>,
    ) -> Result<DeliveryReceipt, AfterimageError> {
        self.gateway
            .send(OutboundMessage::document(
                owner_chat(owner),
                file_name,
                bytes,
                caption,
            ))
            .await
    }

    /// Delivers a stored row: its media file with `caption` when the file is
    /// still on disk, else `caption` as text. A failed media send falls back
    /// to text before the error is reported.
    pub async fn stored(
        &self,
        owner: UserId,
        stored: &StoredMessage,
        caption: String,
    ) -> Result<DeliveryReceipt, AfterimageError> {
        if let (Some(media_ref), Some(media)) = (
            stored.media_ref.as_deref(),
            OutboundMedia::for_kind(stored.media_kind),
        ) && MediaVault::exists(media_ref).await
        {
            let msg = OutboundMessage::file(
                owner_chat(owner),
                media,
                media_ref,
                Some(caption.clone()),
            );
            match self.gateway.send(msg).await {
                Ok(receipt) => return Ok(receipt),
                Err(e) => {
                    warn!(
                        owner = %owner,
                        chat = %stored.chat_id,
                        message_id = %stored.message_id,
                        error = %e,
                        "media delivery failed, falling back to text"
                    );
                }
            }
        }
        self.text(owner, caption).await
    }
}
