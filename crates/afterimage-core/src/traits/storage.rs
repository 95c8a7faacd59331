// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the message shadow-store.

use async_trait::async_trait;

use crate::error::AfterimageError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatId, MessageId, OwnerStats, StatKind, StoredMessage, UserId};

/// Durable keyed storage of every observed message plus per-owner counters.
///
/// Rows are keyed by `(owner, chat, message)`. Writes are last-write-wins;
/// the mirror consumes platform events serially, so no conflict detection
/// is performed.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), AfterimageError>;

    /// Flushes pending writes and releases the backend.
    async fn close(&self) -> Result<(), AfterimageError>;

    /// Inserts or replaces the row for the message's composite key.
    ///
    /// The first observation timestamp of an existing row is preserved.
    async fn upsert_message(&self, message: &StoredMessage) -> Result<(), AfterimageError>;

    /// Returns the live version of a message, if stored.
    async fn get_message(
        &self,
        owner: UserId,
        chat: ChatId,
        message_id: MessageId,
    ) -> Result<Option<StoredMessage>, AfterimageError>;

    /// Removes a message row. Removing a missing row is not an error.
    async fn delete_message(
        &self,
        owner: UserId,
        chat: ChatId,
        message_id: MessageId,
    ) -> Result<(), AfterimageError>;

    /// Number of stored rows for one chat.
    async fn count_for_chat(&self, owner: UserId, chat: ChatId) -> Result<u64, AfterimageError>;

    /// Stored rows for one chat in observation order.
    ///
    /// With `limit`, returns the most recent `limit` rows, still ascending.
    async fn list_for_chat(
        &self,
        owner: UserId,
        chat: ChatId,
        limit: Option<u32>,
    ) -> Result<Vec<StoredMessage>, AfterimageError>;

    /// Counts a failed notification delivery for a row and returns the attempts so far.
    async fn record_delivery_failure(
        &self,
        owner: UserId,
        chat: ChatId,
        message_id: MessageId,
    ) -> Result<u32, AfterimageError>;

    /// Increments one of the owner's counters.
    async fn increment_stat(&self, owner: UserId, kind: StatKind) -> Result<(), AfterimageError>;

    /// Reads the owner's counters (zeros when nothing was recorded yet).
    async fn stats(&self, owner: UserId) -> Result<OwnerStats, AfterimageError>;
}
