// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local media directory holding downloaded attachments.
//!
//! Files are named `{chat}_{message}_{tag}.{ext}` so a row's media can be
//! located again from its composite key alone.

use std::path::{Path, PathBuf};

use afterimage_core::types::{Attachment, ChatId, MessageId};
use afterimage_core::AfterimageError;
use tracing::debug;

/// Directory of persisted media files.
#[derive(Debug, Clone)]
pub struct MediaVault {
    root: PathBuf,
}

impl MediaVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic file name for a message's media.
    pub fn file_name(chat: ChatId, message_id: MessageId, tag: &str, ext: &str) -> String {
        format!("{chat}_{message_id}_{tag}.{ext}")
    }

    /// Full path for an attachment observed directly on a message.
    pub fn path_for_attachment(
        &self,
        chat: ChatId,
        message_id: MessageId,
        attachment: &Attachment,
    ) -> PathBuf {
        self.root.join(Self::file_name(
            chat,
            message_id,
            attachment_tag(attachment),
            &attachment.file_extension(),
        ))
    }

    /// Writes `bytes` under `path`, creating the vault directory on first use.
    pub async fn store(&self, path: &Path, bytes: &[u8]) -> Result<(), AfterimageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| media_error(format!("cannot create {}", parent.display()), e))?;
        }
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| media_error(format!("cannot write {}", path.display()), e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "media stored");
        Ok(())
    }

    /// Whether a stored media reference still points at a file.
    pub async fn exists(media_ref: &str) -> bool {
        tokio::fs::try_exists(media_ref).await.unwrap_or(false)
    }

    /// Reads a stored file if it is no larger than `max_bytes`.
    ///
    /// Returns `Ok(None)` for oversized files.
    pub async fn read_bounded(
        media_ref: &str,
        max_bytes: u64,
    ) -> Result<Option<Vec<u8>>, AfterimageError> {
        let meta = tokio::fs::metadata(media_ref)
            .await
            .map_err(|e| media_error(format!("cannot stat {media_ref}"), e))?;
        if meta.len() > max_bytes {
            return Ok(None);
        }
        tokio::fs::read(media_ref)
            .await
            .map(Some)
            .map_err(|e| media_error(format!("cannot read {media_ref}"), e))
    }
}

/// File-name tag per attachment kind.
pub fn attachment_tag(attachment: &Attachment) -> &'static str {
    match attachment {
        Attachment::None => "media",
        Attachment::Photo { .. } => "photo",
        Attachment::Video { .. } => "video",
        Attachment::Document { .. } => "doc",
        Attachment::Sticker { .. } => "sticker",
        Attachment::Voice { .. } => "voice",
        Attachment::VideoNote { .. } => "videonote",
        Attachment::Animation { .. } => "animation",
    }
}

fn media_error(message: String, source: std::io::Error) -> AfterimageError {
    AfterimageError::Media {
        message,
        source: Some(source),
    }
}
