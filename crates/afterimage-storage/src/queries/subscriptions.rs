// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owner subscription records.

use afterimage_core::types::{Subscription, SubscriptionKind, UserId};
use afterimage_core::AfterimageError;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::subscription_from_row;

pub async fn get(db: &Database, owner: UserId) -> Result<Option<Subscription>, AfterimageError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT owner_id, kind, expires_at FROM subscriptions WHERE owner_id = ?1",
                params![owner.0],
                subscription_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Extends a subscription by `days` from the later of `now` and the current expiry.
pub async fn extend(
    db: &Database,
    owner: UserId,
    kind: SubscriptionKind,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Subscription, AfterimageError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current = tx
                .query_row(
                    "SELECT owner_id, kind, expires_at FROM subscriptions WHERE owner_id = ?1",
                    params![owner.0],
                    subscription_from_row,
                )
                .optional()?;

            let base = current
                .map(|s| s.expires_at)
                .filter(|expiry| *expiry > now)
                .unwrap_or(now);
            let expires_at = base + Duration::days(i64::from(days));

            tx.execute(
                "INSERT INTO subscriptions (owner_id, kind, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (owner_id) DO UPDATE SET
                     kind = excluded.kind,
                     expires_at = excluded.expires_at",
                params![
                    owner.0,
                    kind.to_string(),
                    expires_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                ],
            )?;
            tx.commit()?;

            Ok(Subscription {
                owner_id: owner,
                kind,
                expires_at,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}
