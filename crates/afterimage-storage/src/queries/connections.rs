// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Business connection registry.

use afterimage_core::types::{ConnectionId, OwnerRecord, UserId};
use afterimage_core::AfterimageError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;

/// Inserts or refreshes a connection. Returns `true` when the owner had no
/// connection recorded before this call.
pub async fn register(db: &Database, record: &OwnerRecord) -> Result<bool, AfterimageError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let known: bool = tx.query_row(
                "SELECT EXISTS (SELECT 1 FROM business_connections WHERE owner_id = ?1)",
                params![record.owner_id.0],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO business_connections (connection_id, owner_id, first_name, username, is_enabled)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (connection_id) DO UPDATE SET
                     owner_id   = excluded.owner_id,
                     first_name = excluded.first_name,
                     username   = excluded.username,
                     is_enabled = excluded.is_enabled,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    record.connection_id.0,
                    record.owner_id.0,
                    record.first_name,
                    record.username,
                    record.is_enabled,
                ],
            )?;
            tx.commit()?;
            Ok(!known)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Owner of an enabled connection.
pub async fn owner_for(
    db: &Database,
    connection: &ConnectionId,
) -> Result<Option<UserId>, AfterimageError> {
    let connection = connection.0.clone();
    let owner: Option<i64> = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT owner_id FROM business_connections
                 WHERE connection_id = ?1 AND is_enabled = 1",
                params![connection],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(owner.map(UserId))
}

pub async fn is_owner(db: &Database, user: UserId) -> Result<bool, AfterimageError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM business_connections WHERE owner_id = ?1)",
                params![user.0],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}
