// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Self-contained HTML export of a chat's stored history.

use std::fmt::Write as _;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use afterimage_core::types::{ChatId, MediaKind, StoredMessage, UserId};
use afterimage_core::{AfterimageError, StorageAdapter};

use crate::render::escape_html;
use crate::vault::MediaVault;

/// A rendered archive ready to be delivered or written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatArchive {
    pub file_name: String,
    pub html: String,
    pub message_count: usize,
}

impl ChatArchive {
    pub fn into_bytes(self) -> Vec<u8> {
        self.html.into_bytes()
    }
}

/// `chat_backup_{chat}_{YYYYmmdd_HHMMSS}.html`
pub fn archive_file_name(chat: ChatId, at: DateTime<Utc>) -> String {
    format!("chat_backup_{chat}_{}.html", at.format("%Y%m%d_%H%M%S"))
}

const STYLE: &str = r#"
body { margin: 0; background: #0e1621; color: #e4ecf2; font-family: -apple-system, "Segoe UI", Roboto, sans-serif; }
.header { position: sticky; top: 0; display: flex; align-items: center; gap: 12px; padding: 12px 16px; background: #17212b; border-bottom: 1px solid #0b1118; }
.avatar { width: 42px; height: 42px; border-radius: 50%; background: #5288c1; display: flex; align-items: center; justify-content: center; font-weight: bold; font-size: 18px; }
.title { font-weight: bold; }
.subtitle { color: #7f91a4; font-size: 13px; }
.messages { max-width: 720px; margin: 0 auto; padding: 16px; display: flex; flex-direction: column; gap: 6px; }
.date { align-self: center; margin: 12px 0; padding: 4px 12px; border-radius: 12px; background: #1e2c3a; color: #a3b3c2; font-size: 13px; }
.msg { max-width: 75%; padding: 8px 12px; border-radius: 12px; white-space: pre-wrap; word-wrap: break-word; }
.in { align-self: flex-start; background: #182533; }
.out { align-self: flex-end; background: #2b5278; }
.msg img { max-width: 100%; border-radius: 8px; display: block; margin-bottom: 4px; }
.placeholder { color: #7f91a4; font-style: italic; }
.time { color: #7f91a4; font-size: 11px; text-align: right; margin-top: 2px; }
.footer { text-align: center; color: #7f91a4; font-size: 12px; padding: 16px; }
"#;

/// Renders stored rows into archives.
#[derive(Clone)]
pub struct ChatArchiver {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    max_embed_bytes: u64,
    service_name: String,
}

impl ChatArchiver {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        max_embed_bytes: u64,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            max_embed_bytes,
            service_name: service_name.into(),
        }
    }

    /// Renders the stored history of one chat, or `None` if nothing is stored.
    pub async fn render(
        &self,
        owner: UserId,
        chat: ChatId,
        chat_name: &str,
        limit: Option<u32>,
    ) -> Result<Option<ChatArchive>, AfterimageError> {
        self.render_at(owner, chat, chat_name, limit, Utc::now())
            .await
    }

    pub async fn render_at(
        &self,
        owner: UserId,
        chat: ChatId,
        chat_name: &str,
        limit: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Option<ChatArchive>, AfterimageError> {
        let rows = self.storage.list_for_chat(owner, chat, limit).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut html = String::with_capacity(rows.len() * 256);
        self.write_head(&mut html, chat_name, now);

        let mut current_day: Option<NaiveDate> = None;
        for row in &rows {
            let observed = parse_observed(&row.observed_at);
            if let Some(at) = observed {
                let day = at.date_naive();
                if current_day != Some(day) {
                    let _ = writeln!(
                        html,
                        r#"<div class="date">{}</div>"#,
                        day.format("%d.%m.%Y")
                    );
                    current_day = Some(day);
                }
            }
            self.write_bubble(&mut html, owner, row, observed).await;
        }

        let _ = write!(
            html,
            "</div>\n<div class=\"footer\">{} messages · exported by {}</div>\n</body>\n</html>\n",
            rows.len(),
            escape_html(&self.service_name)
        );

        debug!(owner = %owner, chat = %chat, rows = rows.len(), "archive rendered");
        Ok(Some(ChatArchive {
            file_name: archive_file_name(chat, now),
            html,
            message_count: rows.len(),
        }))
    }

    fn write_head(&self, html: &mut String, chat_name: &str, now: DateTime<Utc>) {
        let initial = chat_name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect::<String>())
            .unwrap_or_else(|| "?".to_string());
        let name = escape_html(chat_name);
        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{name}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
             <div class=\"header\"><div class=\"avatar\">{}</div><div><div class=\"title\">{name}</div>\
             <div class=\"subtitle\">Exported {}</div></div></div>\n<div class=\"messages\">\n",
            escape_html(&initial),
            now.format("%d.%m.%Y %H:%M UTC"),
        );
    }

    async fn write_bubble(
        &self,
        html: &mut String,
        owner: UserId,
        row: &StoredMessage,
        observed: Option<DateTime<Utc>>,
    ) {
        let side = if row.is_authored_by(owner) { "out" } else { "in" };
        let _ = write!(html, r#"<div class="msg {side}">"#);

        if row.media_kind != MediaKind::None {
            html.push_str(&self.media_block(row).await);
        }
        if let Some(body) = row.body() {
            html.push_str(&escape_html(body));
        }

        let time = observed
            .map(|at| at.format("%H:%M").to_string())
            .unwrap_or_default();
        let _ = writeln!(html, r#"<div class="time">{time}</div></div>"#);
    }

    /// Inline image for photos that fit the embed limit, a labeled
    /// placeholder for everything else.
    async fn media_block(&self, row: &StoredMessage) -> String {
        let placeholder = format!(
            r#"<div class="placeholder">[{}]</div>"#,
            row.media_kind.label()
        );
        if !row.media_kind.is_photo() {
            return placeholder;
        }
        let Some(media_ref) = row.media_ref.as_deref() else {
            return placeholder;
        };
        match MediaVault::read_bounded(media_ref, self.max_embed_bytes).await {
            Ok(Some(bytes)) => format!(
                r#"<img src="data:image/jpeg;base64,{}" alt="photo">"#,
                STANDARD.encode(bytes)
            ),
            Ok(None) => placeholder,
            Err(e) => {
                warn!(
                    chat = %row.chat_id,
                    message_id = %row.message_id,
                    error = %e,
                    "archive photo unavailable"
                );
                placeholder
            }
        }
    }
}

fn parse_observed(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}
