// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-owner activity counters.

use afterimage_core::types::{OwnerStats, StatKind, UserId};
use afterimage_core::AfterimageError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::counter;

fn increment_sql(kind: StatKind) -> &'static str {
    match kind {
        StatKind::Messages => {
            "INSERT INTO stats (owner_id, messages) VALUES (?1, 1)
             ON CONFLICT (owner_id) DO UPDATE SET messages = messages + 1"
        }
        StatKind::Edits => {
            "INSERT INTO stats (owner_id, edits) VALUES (?1, 1)
             ON CONFLICT (owner_id) DO UPDATE SET edits = edits + 1"
        }
        StatKind::Deletes => {
            "INSERT INTO stats (owner_id, deletes) VALUES (?1, 1)
             ON CONFLICT (owner_id) DO UPDATE SET deletes = deletes + 1"
        }
    }
}

/// Adds one to the given counter, creating the owner's row on first use.
pub async fn increment(db: &Database, owner: UserId, kind: StatKind) -> Result<(), AfterimageError> {
    let sql = increment_sql(kind);
    db.connection()
        .call(move |conn| {
            conn.execute(sql, params![owner.0])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Reads an owner's counters, all zero if nothing was recorded.
pub async fn get(db: &Database, owner: UserId) -> Result<OwnerStats, AfterimageError> {
    let row: Option<(i64, i64, i64)> = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT messages, edits, deletes FROM stats WHERE owner_id = ?1",
                params![owner.0],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    Ok(row
        .map(|(messages, edits, deletes)| OwnerStats {
            messages: counter(messages),
            edits: counter(edits),
            deletes: counter(deletes),
        })
        .unwrap_or_default())
}
