// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owner-facing notification texts in Telegram HTML.
//!
//! Every value that originates from a chat (names, message bodies, links)
//! passes through [`escape_html`] before it is interpolated.

use chrono::{DateTime, Utc};

use afterimage_core::types::{
    ChatInfo, MediaKind, OwnerStats, Sender, StoredMessage, Subscription, SubscriptionKind,
};

/// Shown in place of the old text when the edited message was never stored.
pub const NOT_IN_CACHE: &str = "not found in cache";

/// Escapes the three characters Telegram HTML treats as markup, plus quotes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn sender_label(sender: Option<&Sender>, fallback: &ChatInfo) -> String {
    sender
        .map(Sender::display_name)
        .unwrap_or_else(|| fallback.label())
}

/// Edit notice with the old and new text side by side.
pub fn edit_notice(
    chat: &ChatInfo,
    sender: Option<&Sender>,
    old_text: Option<&str>,
    new_text: &str,
) -> String {
    let who = escape_html(&sender_label(sender, chat));
    let old = match old_text {
        Some(text) if text.trim().is_empty() => "<i>empty</i>".to_string(),
        Some(text) => format!("<code>{}</code>", escape_html(text)),
        None => format!("<i>{NOT_IN_CACHE}</i>"),
    };
    let new = if new_text.trim().is_empty() {
        "<i>empty</i>".to_string()
    } else {
        format!("<code>{}</code>", escape_html(new_text))
    };
    format!("✏️ <b>{who}</b> edited a message:\n\n<b>Old:</b>\n{old}\n\n<b>New:</b>\n{new}")
}

/// Full deletion notice carrying the stored content.
pub fn deletion_notice(chat: &ChatInfo, stored: &StoredMessage) -> String {
    let mut out = String::new();
    match stored.media_kind {
        MediaKind::PhotoReply => out.push_str("💬 Photo (saved via reply)\n"),
        MediaKind::VideoReply => out.push_str("💬 Video (saved via reply)\n"),
        _ => {}
    }
    out.push_str(&format!(
        "🗑 <b>{}</b> deleted a message:\n",
        escape_html(&chat.label())
    ));

    let mut parts = Vec::new();
    if !stored.text.trim().is_empty() {
        parts.push(format!("📝 Text: {}", escape_html(&stored.text)));
    } else if let Some(caption) = stored.caption.as_deref().filter(|c| !c.trim().is_empty()) {
        parts.push(format!("📝 Caption: {}", escape_html(caption)));
    }
    if let Some(links) = stored.links.as_deref().filter(|l| !l.is_empty()) {
        parts.push(format!("🔗 Links: {}", escape_html(links)));
    }
    if parts.is_empty() && stored.media_kind != MediaKind::None {
        parts.push(stored.media_kind.label().to_string());
    }
    if !parts.is_empty() {
        out.push('\n');
        out.push_str(&parts.join("\n"));
    }
    out
}

/// Deletion notice for owners without an active subscription.
pub fn redacted_deletion_notice(chat: &ChatInfo) -> String {
    format!(
        "🗑 <b>{}</b> deleted a message.\n\n🔒 <tg-spoiler>Content hidden</tg-spoiler>\nTap /start to renew your subscription and see deleted messages.",
        escape_html(&chat.label())
    )
}

/// Caption of the archive document sent after a chat clear.
pub fn chat_clear_caption(chat: &ChatInfo, deleted: usize, archived_rows: usize) -> String {
    format!(
        "🗑 <b>The whole chat was cleared!</b>\n\n👤 Chat: {}\n📊 Messages deleted: {deleted}\n📄 Archive of {archived_rows} stored messages attached",
        escape_html(&chat.label())
    )
}

/// Header forwarded with recovered view-once media.
pub fn recovery_header(sender: Option<&Sender>, chat: &ChatInfo, kind: MediaKind) -> String {
    let noun = if kind.is_photo() { "photo" } else { "video" };
    format!(
        "🔒 <b>View-once {noun} saved!</b>\n\n{} sent a disappearing {noun}",
        escape_html(&sender_label(sender, chat))
    )
}

fn subscription_line(subscription: Option<&Subscription>, now: DateTime<Utc>) -> String {
    match subscription {
        Some(sub) if sub.is_active(now) => {
            let plan = match sub.kind {
                SubscriptionKind::Trial => "Trial",
                SubscriptionKind::Paid => "Subscription",
            };
            format!("✅ {plan} active, {} days left", sub.days_left(now))
        }
        Some(_) => "⚠️ Subscription expired: deleted messages arrive redacted".to_string(),
        None => "⚠️ No subscription: deleted messages arrive redacted".to_string(),
    }
}

/// Sent to the owner when a Business connection is enabled.
pub fn welcome(
    service_name: &str,
    subscription: Option<&Subscription>,
    now: DateTime<Utc>,
) -> String {
    format!(
        "✅ <b>{} is connected!</b>\n\nYour business chats are now mirrored. Deleted and edited messages will be reported here.\n\n💡 <b>View-once media:</b> reply to it to save a copy.\n\n{}",
        escape_html(service_name),
        subscription_line(subscription, now)
    )
}

pub fn start_text(
    service_name: &str,
    subscription: Option<&Subscription>,
    stats: &OwnerStats,
    now: DateTime<Utc>,
) -> String {
    format!(
        "👋 <b>{}</b>\n\n{}\n\n{}",
        escape_html(service_name),
        subscription_line(subscription, now),
        stats_text(stats)
    )
}

pub fn stats_text(stats: &OwnerStats) -> String {
    format!(
        "📊 <b>Statistics</b>\n\n💬 Messages saved: {}\n✏️ Edits caught: {}\n🗑 Deletions caught: {}",
        stats.messages, stats.edits, stats.deletes
    )
}

pub fn help_text() -> &'static str {
    "ℹ️ <b>How it works</b>\n\n\
     1. Open Telegram Settings → Telegram Business → Chatbots and add this bot.\n\
     2. Every message in your business chats is saved as it arrives.\n\
     3. When someone edits a message you get the old and new text.\n\
     4. When someone deletes messages you get the saved copy; clearing the whole chat sends an HTML archive.\n\
     5. Reply to a view-once photo or video to keep it.\n\n\
     Commands: /start /stats /help"
}

/// Reply for users who have not connected the bot to a Business account.
pub fn not_connected_text() -> &'static str {
    "🔌 This bot works through Telegram Business.\n\nOpen Settings → Telegram Business → Chatbots and add it, then send /start again."
}
