// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File transfer with Telegram servers.

use std::path::PathBuf;

use afterimage_core::error::AfterimageError;
use afterimage_core::types::{FileRef, OutboundMedia};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatId, FileId, InputFile, ParseMode};
use tracing::debug;

pub(crate) fn gateway_error(
    context: &str,
    e: impl std::error::Error + Send + Sync + 'static,
) -> AfterimageError {
    AfterimageError::Gateway {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Downloads a file from Telegram servers by its file id.
///
/// Uses the Bot API's `getFile` to resolve the file path, then downloads
/// the file content as bytes.
pub async fn download_file(bot: &Bot, file: &FileRef) -> Result<Vec<u8>, AfterimageError> {
    let info = bot
        .get_file(FileId(file.0.clone()))
        .await
        .map_err(|e| gateway_error("failed to get file info", e))?;

    let mut buf = Vec::new();
    bot.download_file(&info.path, &mut buf)
        .await
        .map_err(|e| gateway_error("failed to download file", e))?;

    debug!(file_id = %file, size = buf.len(), "downloaded file from Telegram");
    Ok(buf)
}

/// Uploads a local file with an HTML caption.
///
/// Video notes cannot carry a caption, so the caption follows as a
/// separate message and its id is returned.
pub async fn send_file(
    bot: &Bot,
    chat: ChatId,
    media: OutboundMedia,
    path: PathBuf,
    caption: Option<String>,
) -> Result<Message, AfterimageError> {
    let input = InputFile::file(path);
    let caption = caption.unwrap_or_default();
    let sent = match media {
        OutboundMedia::Photo => {
            bot.send_photo(chat, input)
                .caption(caption)
                .parse_mode(ParseMode::Html)
                .await
        }
        OutboundMedia::Video => {
            bot.send_video(chat, input)
                .caption(caption)
                .parse_mode(ParseMode::Html)
                .await
        }
        OutboundMedia::Document => {
            bot.send_document(chat, input)
                .caption(caption)
                .parse_mode(ParseMode::Html)
                .await
        }
        OutboundMedia::Voice => {
            bot.send_voice(chat, input)
                .caption(caption)
                .parse_mode(ParseMode::Html)
                .await
        }
        OutboundMedia::Animation => {
            bot.send_animation(chat, input)
                .caption(caption)
                .parse_mode(ParseMode::Html)
                .await
        }
        OutboundMedia::VideoNote => {
            let note = bot
                .send_video_note(chat, input)
                .await
                .map_err(|e| gateway_error("failed to send video note", e))?;
            if caption.is_empty() {
                return Ok(note);
            }
            bot.send_message(chat, caption).parse_mode(ParseMode::Html).await
        }
    };
    sent.map_err(|e| gateway_error(&format!("failed to send {media}"), e))
}

/// Uploads in-memory bytes as a named document.
pub async fn send_document_bytes(
    bot: &Bot,
    chat: ChatId,
    file_name: String,
    bytes: Vec<u8>,
    caption: Option<String>,
) -> Result<Message, AfterimageError> {
    let input = InputFile::memory(bytes).file_name(file_name);
    let mut request = bot.send_document(chat, input).parse_mode(ParseMode::Html);
    if let Some(caption) = caption {
        request = request.caption(caption);
    }
    request
        .await
        .map_err(|e| gateway_error("failed to send document", e))
}
