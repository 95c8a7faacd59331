// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! View-once media recovery.
//!
//! Telegram exposes the media of a view-once photo or video to the bot when
//! the owner replies to it. The replied-to media is downloaded right away,
//! stored under the original message id, and forwarded to the owner.

use std::path::PathBuf;
use std::sync::Arc;

use afterimage_core::types::{
    Attachment, ChatInfo, InboundMessage, MediaKind, MessageId, RepliedMessage, StoredMessage,
    UserId,
};
use afterimage_core::{AfterimageError, MessagingGateway, StorageAdapter};
use tracing::{info, warn};

use crate::metrics;
use crate::notify::Notifier;
use crate::render;
use crate::vault::MediaVault;

/// Outcome of one recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Id of the view-once message the media belongs to.
    pub message_id: MessageId,
    pub media_kind: MediaKind,
    pub path: PathBuf,
    pub forwarded: bool,
}

/// Returns the replied-to message when it carries view-once media sent by
/// someone other than the owner.
pub fn recovery_candidate(owner: UserId, msg: &InboundMessage) -> Option<&RepliedMessage> {
    let replied = msg.reply_to.as_ref()?;
    if !replied.attachment.is_view_once() {
        return None;
    }
    if replied.sender.as_ref().map(|s| s.id) == Some(owner) {
        return None;
    }
    Some(replied)
}

fn recovered_kind(attachment: &Attachment) -> Option<(MediaKind, &'static str, &'static str)> {
    match attachment {
        Attachment::Photo { .. } => Some((MediaKind::PhotoReply, "photo_reply", "jpg")),
        Attachment::Video { .. } => Some((MediaKind::VideoReply, "video_reply", "mp4")),
        _ => None,
    }
}

#[derive(Clone)]
pub struct EphemeralRecovery {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    gateway: Arc<dyn MessagingGateway + Send + Sync>,
    vault: MediaVault,
    notifier: Notifier,
}

impl EphemeralRecovery {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        gateway: Arc<dyn MessagingGateway + Send + Sync>,
        vault: MediaVault,
        notifier: Notifier,
    ) -> Self {
        Self {
            storage,
            gateway,
            vault,
            notifier,
        }
    }

    /// Recovers the view-once media `msg` replies to, if any.
    ///
    /// Returns `Ok(None)` when `msg` is not a recovery trigger.
    pub async fn recover(
        &self,
        owner: UserId,
        msg: &InboundMessage,
    ) -> Result<Option<RecoveryReport>, AfterimageError> {
        let Some(replied) = recovery_candidate(owner, msg) else {
            return Ok(None);
        };
        let (Some(file), Some((kind, tag, ext))) =
            (replied.attachment.file(), recovered_kind(&replied.attachment))
        else {
            return Ok(None);
        };

        let bytes = self.gateway.download(file).await?;
        let path = self.vault.root().join(MediaVault::file_name(
            msg.chat.id,
            replied.message_id,
            tag,
            ext,
        ));
        self.vault.store(&path, &bytes).await?;

        let row = self.recovered_row(owner, &msg.chat, replied, kind, &path).await?;
        self.storage.upsert_message(&row).await?;
        metrics::record_recovery(kind);
        info!(
            owner = %owner,
            chat = %msg.chat.id,
            message_id = %replied.message_id,
            media_kind = %kind,
            "view-once media recovered"
        );

        let header = render::recovery_header(replied.sender.as_ref(), &msg.chat, kind);
        let forwarded = match self.notifier.stored(owner, &row, header).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    owner = %owner,
                    chat = %msg.chat.id,
                    message_id = %replied.message_id,
                    error = %e,
                    "recovered media could not be forwarded"
                );
                false
            }
        };

        Ok(Some(RecoveryReport {
            message_id: replied.message_id,
            media_kind: kind,
            path,
            forwarded,
        }))
    }

    /// Row for the original message, keeping text and links already stored for it.
    async fn recovered_row(
        &self,
        owner: UserId,
        chat: &ChatInfo,
        replied: &RepliedMessage,
        kind: MediaKind,
        path: &std::path::Path,
    ) -> Result<StoredMessage, AfterimageError> {
        let existing = self
            .storage
            .get_message(owner, chat.id, replied.message_id)
            .await?
            .unwrap_or_default();
        Ok(StoredMessage {
            owner_id: owner,
            chat_id: chat.id,
            message_id: replied.message_id,
            sender_id: replied.sender.as_ref().map(|s| s.id).or(existing.sender_id),
            text: existing.text,
            caption: replied.caption.clone().or(existing.caption),
            media_kind: kind,
            media_ref: Some(path.to_string_lossy().into_owned()),
            links: existing.links,
            observed_at: String::new(),
            updated_at: String::new(),
            delivery_attempts: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afterimage_core::types::{ChatId, ConnectionId, FileRef, Sender};

    fn reply_to(sender: UserId, attachment: Attachment) -> InboundMessage {
        InboundMessage {
            connection_id: ConnectionId("c".into()),
            chat: ChatInfo {
                id: ChatId(5),
                display_name: "Bob".into(),
                username: None,
            },
            message_id: MessageId(20),
            sender: Some(Sender {
                id: UserId(1),
                first_name: "Owner".into(),
                username: None,
            }),
            text: Some("nice".into()),
            caption: None,
            attachment: Attachment::None,
            links: vec![],
            reply_to: Some(RepliedMessage {
                message_id: MessageId(19),
                sender: Some(Sender {
                    id: sender,
                    first_name: "Bob".into(),
                    username: None,
                }),
                caption: None,
                attachment,
            }),
        }
    }

    fn view_once_photo() -> Attachment {
        Attachment::Photo {
            file: FileRef("p".into()),
            view_once: true,
        }
    }

    #[test]
    fn reply_to_counterpart_view_once_is_a_candidate() {
        let msg = reply_to(UserId(5), view_once_photo());
        let candidate = recovery_candidate(UserId(1), &msg).unwrap();
        assert_eq!(candidate.message_id, MessageId(19));
    }

    #[test]
    fn owners_own_view_once_is_ignored() {
        let msg = reply_to(UserId(1), view_once_photo());
        assert!(recovery_candidate(UserId(1), &msg).is_none());
    }

    #[test]
    fn ordinary_media_is_ignored() {
        let msg = reply_to(
            UserId(5),
            Attachment::Photo {
                file: FileRef("p".into()),
                view_once: false,
            },
        );
        assert!(recovery_candidate(UserId(1), &msg).is_none());

        let mut plain = reply_to(UserId(5), view_once_photo());
        plain.reply_to = None;
        assert!(recovery_candidate(UserId(1), &plain).is_none());
    }

    #[test]
    fn recovered_kinds_use_reply_file_tags() {
        assert_eq!(
            recovered_kind(&view_once_photo()),
            Some((MediaKind::PhotoReply, "photo_reply", "jpg"))
        );
        assert_eq!(
            recovered_kind(&Attachment::Video {
                file: FileRef("v".into()),
                view_once: true
            }),
            Some((MediaKind::VideoReply, "video_reply", "mp4"))
        );
    }
}
