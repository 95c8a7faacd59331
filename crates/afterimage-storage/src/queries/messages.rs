// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message shadow-store operations.

use afterimage_core::types::{ChatId, MessageId, UserId};
use afterimage_core::AfterimageError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{message_from_row, StoredMessage, MESSAGE_COLUMNS};

/// Inserts a message or replaces the live version of an existing one.
///
/// `observed_at` is kept from the first write. An empty `observed_at` on a
/// new row is stamped with the current time.
pub async fn upsert_message(db: &Database, msg: &StoredMessage) -> Result<(), AfterimageError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (owner_id, chat_id, message_id, sender_id, text, caption,
                                       media_kind, media_ref, links, observed_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                         COALESCE(NULLIF(?10, ''), strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                         strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT (owner_id, chat_id, message_id) DO UPDATE SET
                     sender_id  = excluded.sender_id,
                     text       = excluded.text,
                     caption    = excluded.caption,
                     media_kind = excluded.media_kind,
                     media_ref  = excluded.media_ref,
                     links      = excluded.links,
                     updated_at = excluded.updated_at",
                params![
                    msg.owner_id.0,
                    msg.chat_id.0,
                    msg.message_id.0,
                    msg.sender_id.map(|s| s.0),
                    msg.text,
                    msg.caption,
                    msg.media_kind.to_string(),
                    msg.media_ref,
                    msg.links,
                    msg.observed_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetches one message by its composite key.
pub async fn get_message(
    db: &Database,
    owner: UserId,
    chat: ChatId,
    message_id: MessageId,
) -> Result<Option<StoredMessage>, AfterimageError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE owner_id = ?1 AND chat_id = ?2 AND message_id = ?3"
                ),
                params![owner.0, chat.0, message_id.0],
                message_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Removes a message row. Missing rows are ignored.
pub async fn delete_message(
    db: &Database,
    owner: UserId,
    chat: ChatId,
    message_id: MessageId,
) -> Result<(), AfterimageError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM messages WHERE owner_id = ?1 AND chat_id = ?2 AND message_id = ?3",
                params![owner.0, chat.0, message_id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of rows stored for one chat.
pub async fn count_for_chat(
    db: &Database,
    owner: UserId,
    chat: ChatId,
) -> Result<u64, AfterimageError> {
    let count: i64 = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE owner_id = ?1 AND chat_id = ?2",
                params![owner.0, chat.0],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(crate::models::counter(count))
}

/// Rows for one chat ordered by first observation, then message id.
///
/// With a limit, the newest `limit` rows are returned, still oldest first.
pub async fn list_for_chat(
    db: &Database,
    owner: UserId,
    chat: ChatId,
    limit: Option<u32>,
) -> Result<Vec<StoredMessage>, AfterimageError> {
    db.connection()
        .call(move |conn| {
            let messages = match limit {
                Some(lim) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM (
                             SELECT * FROM messages
                             WHERE owner_id = ?1 AND chat_id = ?2
                             ORDER BY observed_at DESC, message_id DESC
                             LIMIT ?3
                         )
                         ORDER BY observed_at ASC, message_id ASC"
                    ))?;
                    stmt.query_map(params![owner.0, chat.0, lim], message_from_row)?
                        .collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages
                         WHERE owner_id = ?1 AND chat_id = ?2
                         ORDER BY observed_at ASC, message_id ASC"
                    ))?;
                    stmt.query_map(params![owner.0, chat.0], message_from_row)?
                        .collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Bumps the failed-delivery counter of a row and returns the new value.
///
/// Returns 0 when the row no longer exists.
pub async fn record_delivery_failure(
    db: &Database,
    owner: UserId,
    chat: ChatId,
    message_id: MessageId,
) -> Result<u32, AfterimageError> {
    let attempts: Option<u32> = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "UPDATE messages SET delivery_attempts = delivery_attempts + 1
                 WHERE owner_id = ?1 AND chat_id = ?2 AND message_id = ?3
                 RETURNING delivery_attempts",
                params![owner.0, chat.0, message_id.0],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(attempts.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use afterimage_core::types::MediaKind;
    use tempfile::tempdir;

    const OWNER: UserId = UserId(100);
    const CHAT: ChatId = ChatId(200);

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_msg(id: i64, text: &str, observed_at: &str) -> StoredMessage {
        StoredMessage {
            owner_id: OWNER,
            chat_id: CHAT,
            message_id: MessageId(id),
            sender_id: Some(UserId(300)),
            text: text.to_string(),
            observed_at: observed_at.to_string(),
            ..StoredMessage::default()
        }
    }

    #[tokio::test]
    async fn upsert_and_get_round_trip() {
        let (db, _dir) = setup_db().await;
        let mut msg = make_msg(1, "hello", "2026-01-01T00:00:01.000Z");
        msg.media_kind = MediaKind::Photo;
        msg.media_ref = Some("saved_media/200_1.jpg".to_string());
        msg.links = Some("https://a.example, https://b.example".to_string());
        upsert_message(&db, &msg).await.unwrap();

        let stored = get_message(&db, OWNER, CHAT, MessageId(1))
            .await
            .unwrap()
            .expect("row should exist");
        assert_eq!(stored.text, "hello");
        assert_eq!(stored.media_kind, MediaKind::Photo);
        assert_eq!(stored.media_ref.as_deref(), Some("saved_media/200_1.jpg"));
        assert_eq!(stored.sender_id, Some(UserId(300)));
        assert_eq!(stored.observed_at, "2026-01-01T00:00:01.000Z");
        assert!(!stored.updated_at.is_empty());
        assert_eq!(stored.delivery_attempts, 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_keeps_first_observation_and_replaces_content() {
        let (db, _dir) = setup_db().await;
        upsert_message(&db, &make_msg(1, "v1", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        upsert_message(&db, &make_msg(1, "v2", "2026-01-02T00:00:00.000Z"))
            .await
            .unwrap();

        let stored = get_message(&db, OWNER, CHAT, MessageId(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.text, "v2");
        assert_eq!(stored.observed_at, "2026-01-01T00:00:01.000Z");
        assert_eq!(count_for_chat(&db, OWNER, CHAT).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let (db, _dir) = setup_db().await;
        let msg = make_msg(7, "same", "2026-01-01T00:00:01.000Z");
        upsert_message(&db, &msg).await.unwrap();
        upsert_message(&db, &msg).await.unwrap();

        let rows = list_for_chat(&db, OWNER, CHAT, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text, "same");
    }

    #[tokio::test]
    async fn empty_observed_at_is_stamped() {
        let (db, _dir) = setup_db().await;
        upsert_message(&db, &make_msg(1, "now", "")).await.unwrap();
        let stored = get_message(&db, OWNER, CHAT, MessageId(1))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.observed_at.starts_with("20"), "got {}", stored.observed_at);
    }

    #[tokio::test]
    async fn rows_are_scoped_per_owner() {
        let (db, _dir) = setup_db().await;
        upsert_message(&db, &make_msg(1, "mine", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        let mut other = make_msg(1, "theirs", "2026-01-01T00:00:01.000Z");
        other.owner_id = UserId(999);
        upsert_message(&db, &other).await.unwrap();

        let mine = get_message(&db, OWNER, CHAT, MessageId(1)).await.unwrap().unwrap();
        assert_eq!(mine.text, "mine");
        assert_eq!(count_for_chat(&db, UserId(999), CHAT).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_orders_by_observation_then_id() {
        let (db, _dir) = setup_db().await;
        upsert_message(&db, &make_msg(3, "c", "2026-01-01T00:00:02.000Z"))
            .await
            .unwrap();
        upsert_message(&db, &make_msg(2, "b", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        upsert_message(&db, &make_msg(1, "a", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();

        let rows = list_for_chat(&db, OWNER, CHAT, None).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|m| m.message_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn list_with_limit_returns_latest_ascending() {
        let (db, _dir) = setup_db().await;
        for i in 0..5 {
            let msg = make_msg(i, &format!("msg {i}"), &format!("2026-01-01T00:00:0{i}.000Z"));
            upsert_message(&db, &msg).await.unwrap();
        }

        let rows = list_for_chat(&db, OWNER, CHAT, Some(3)).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|m| m.message_id.0).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn delete_missing_row_is_not_an_error() {
        let (db, _dir) = setup_db().await;
        delete_message(&db, OWNER, CHAT, MessageId(42)).await.unwrap();

        upsert_message(&db, &make_msg(42, "bye", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        delete_message(&db, OWNER, CHAT, MessageId(42)).await.unwrap();
        assert!(get_message(&db, OWNER, CHAT, MessageId(42))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn delivery_failures_accumulate() {
        let (db, _dir) = setup_db().await;
        upsert_message(&db, &make_msg(5, "retry", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        assert_eq!(
            record_delivery_failure(&db, OWNER, CHAT, MessageId(5)).await.unwrap(),
            1
        );
        assert_eq!(
            record_delivery_failure(&db, OWNER, CHAT, MessageId(5)).await.unwrap(),
            2
        );
        assert_eq!(
            record_delivery_failure(&db, OWNER, CHAT, MessageId(99)).await.unwrap(),
            0
        );
    }
}
