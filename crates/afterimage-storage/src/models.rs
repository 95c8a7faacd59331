// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the core domain types.
//!
//! The canonical types live in `afterimage-core::types`; this module only
//! knows how they are laid out in columns.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

pub use afterimage_core::types::{
    MediaKind, OwnerStats, StoredMessage, Subscription, SubscriptionKind,
};
use afterimage_core::types::{ChatId, MessageId, UserId};

/// Column list matching [`message_from_row`].
pub(crate) const MESSAGE_COLUMNS: &str = "owner_id, chat_id, message_id, sender_id, text, caption, \
     media_kind, media_ref, links, observed_at, updated_at, delivery_attempts";

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<StoredMessage> {
    let media_kind: String = row.get(6)?;
    let media_kind = MediaKind::from_str(&media_kind)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    Ok(StoredMessage {
        owner_id: UserId(row.get(0)?),
        chat_id: ChatId(row.get(1)?),
        message_id: MessageId(row.get(2)?),
        sender_id: row.get::<_, Option<i64>>(3)?.map(UserId),
        text: row.get(4)?,
        caption: row.get(5)?,
        media_kind,
        media_ref: row.get(7)?,
        links: row.get(8)?,
        observed_at: row.get(9)?,
        updated_at: row.get(10)?,
        delivery_attempts: row.get(11)?,
    })
}

pub(crate) fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    let kind: String = row.get(1)?;
    let kind = SubscriptionKind::from_str(&kind)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let expires_at: String = row.get(2)?;
    Ok(Subscription {
        owner_id: UserId(row.get(0)?),
        kind,
        expires_at: parse_timestamp(2, &expires_at)?,
    })
}

pub(crate) fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

/// Reads an INTEGER counter column.
pub(crate) fn counter(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
