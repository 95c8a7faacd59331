// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shadow-store writes for ordinary inbound messages.

use std::sync::Arc;

use afterimage_core::types::{InboundMessage, StatKind, StoredMessage, UserId};
use afterimage_core::{AfterimageError, MessagingGateway, StorageAdapter};
use tracing::{debug, warn};

use crate::metrics;
use crate::vault::MediaVault;

/// Builds the row for an inbound message.
///
/// `observed_at` is left empty so storage stamps it on first write and
/// keeps it on later ones.
pub fn stored_row(owner: UserId, msg: &InboundMessage, media_ref: Option<String>) -> StoredMessage {
    StoredMessage {
        owner_id: owner,
        chat_id: msg.chat.id,
        message_id: msg.message_id,
        sender_id: msg.sender_id(),
        text: msg.text.clone().unwrap_or_default(),
        caption: msg.caption.clone(),
        media_kind: msg.attachment.media_kind(),
        media_ref,
        links: join_links(&msg.links),
        observed_at: String::new(),
        updated_at: String::new(),
        delivery_attempts: 0,
    }
}

/// Extracted URLs joined with `", "`, or `None` when there are none.
pub fn join_links(links: &[String]) -> Option<String> {
    if links.is_empty() {
        None
    } else {
        Some(links.join(", "))
    }
}

/// Persists ordinary inbound messages and their media.
#[derive(Clone)]
pub struct MessageCapture {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    gateway: Arc<dyn MessagingGateway + Send + Sync>,
    vault: MediaVault,
}

impl MessageCapture {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        gateway: Arc<dyn MessagingGateway + Send + Sync>,
        vault: MediaVault,
    ) -> Self {
        Self {
            storage,
            gateway,
            vault,
        }
    }

    /// Downloads the attachment (if any) into the vault and returns its path.
    ///
    /// Download or write failures are logged and yield `None`.
    pub async fn download_attachment(&self, msg: &InboundMessage) -> Option<String> {
        let file = msg.attachment.file()?;
        let path = self
            .vault
            .path_for_attachment(msg.chat.id, msg.message_id, &msg.attachment);

        let result = async {
            let bytes = self.gateway.download(file).await?;
            self.vault.store(&path, &bytes).await
        }
        .await;

        match result {
            Ok(()) => Some(path.to_string_lossy().into_owned()),
            Err(e) => {
                warn!(
                    chat = %msg.chat.id,
                    message_id = %msg.message_id,
                    error = %e,
                    "media download failed, storing message without it"
                );
                None
            }
        }
    }

    /// Stores a newly observed message and counts it.
    pub async fn capture(
        &self,
        owner: UserId,
        msg: &InboundMessage,
    ) -> Result<StoredMessage, AfterimageError> {
        let media_ref = self.download_attachment(msg).await;
        let row = stored_row(owner, msg, media_ref);
        self.storage.upsert_message(&row).await?;
        self.storage.increment_stat(owner, StatKind::Messages).await?;
        metrics::record_message_stored(row.media_kind);
        debug!(
            owner = %owner,
            chat = %row.chat_id,
            message_id = %row.message_id,
            media_kind = %row.media_kind,
            "message stored"
        );
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afterimage_core::types::{
        Attachment, ChatId, ChatInfo, ConnectionId, FileRef, MediaKind, MessageId, Sender,
    };

    fn inbound() -> InboundMessage {
        InboundMessage {
            connection_id: ConnectionId("c".into()),
            chat: ChatInfo {
                id: ChatId(5),
                display_name: "Bob".into(),
                username: None,
            },
            message_id: MessageId(11),
            sender: Some(Sender {
                id: UserId(5),
                first_name: "Bob".into(),
                username: None,
            }),
            text: None,
            caption: Some("look".into()),
            attachment: Attachment::Photo {
                file: FileRef("f".into()),
                view_once: false,
            },
            links: vec!["https://a.example".into(), "https://b.example".into()],
            reply_to: None,
        }
    }

    #[test]
    fn stored_row_copies_message_fields() {
        let row = stored_row(UserId(1), &inbound(), Some("saved_media/5_11_photo.jpg".into()));
        assert_eq!(row.owner_id, UserId(1));
        assert_eq!(row.chat_id, ChatId(5));
        assert_eq!(row.message_id, MessageId(11));
        assert_eq!(row.sender_id, Some(UserId(5)));
        assert_eq!(row.text, "");
        assert_eq!(row.caption.as_deref(), Some("look"));
        assert_eq!(row.media_kind, MediaKind::Photo);
        assert_eq!(row.links.as_deref(), Some("https://a.example, https://b.example"));
        assert!(row.observed_at.is_empty());
        assert_eq!(row.delivery_attempts, 0);
    }

    #[test]
    fn no_links_is_none() {
        assert_eq!(join_links(&[]), None);
    }
}
