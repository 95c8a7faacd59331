// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage and owner-directory traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use afterimage_config::model::StorageConfig;
use afterimage_core::types::{
    ConnectionId, OwnerRecord, OwnerStats, StatKind, StoredMessage, Subscription,
    SubscriptionKind,
};
use afterimage_core::{
    AdapterType, AfterimageError, ChatId, HealthStatus, MessageId, OwnerDirectory, PluginAdapter,
    StorageAdapter, UserId,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, AfterimageError> {
        self.db.get().ok_or_else(|| AfterimageError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, AfterimageError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AfterimageError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("storage shutdown complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), AfterimageError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| AfterimageError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), AfterimageError> {
        self.db()?.close().await
    }

    async fn upsert_message(&self, message: &StoredMessage) -> Result<(), AfterimageError> {
        queries::messages::upsert_message(self.db()?, message).await
    }

    async fn get_message(
        &self,
        owner: UserId,
        chat: ChatId,
        message_id: MessageId,
    ) -> Result<Option<StoredMessage>, AfterimageError> {
        queries::messages::get_message(self.db()?, owner, chat, message_id).await
    }

    async fn delete_message(
        &self,
        owner: UserId,
        chat: ChatId,
        message_id: MessageId,
    ) -> Result<(), AfterimageError> {
        queries::messages::delete_message(self.db()?, owner, chat, message_id).await
    }

    async fn count_for_chat(&self, owner: UserId, chat: ChatId) -> Result<u64, AfterimageError> {
        queries::messages::count_for_chat(self.db()?, owner, chat).await
    }

    async fn list_for_chat(
        &self,
        owner: UserId,
        chat: ChatId,
        limit: Option<u32>,
    ) -> Result<Vec<StoredMessage>, AfterimageError> {
        queries::messages::list_for_chat(self.db()?, owner, chat, limit).await
    }

    async fn record_delivery_failure(
        &self,
        owner: UserId,
        chat: ChatId,
        message_id: MessageId,
    ) -> Result<u32, AfterimageError> {
        queries::messages::record_delivery_failure(self.db()?, owner, chat, message_id).await
    }

    async fn increment_stat(&self, owner: UserId, kind: StatKind) -> Result<(), AfterimageError> {
        queries::stats::increment(self.db()?, owner, kind).await
    }

    async fn stats(&self, owner: UserId) -> Result<OwnerStats, AfterimageError> {
        queries::stats::get(self.db()?, owner).await
    }
}

#[async_trait]
impl OwnerDirectory for SqliteStorage {
    async fn register_connection(&self, record: &OwnerRecord) -> Result<bool, AfterimageError> {
        queries::connections::register(self.db()?, record).await
    }

    async fn owner_for_connection(
        &self,
        connection: &ConnectionId,
    ) -> Result<Option<UserId>, AfterimageError> {
        queries::connections::owner_for(self.db()?, connection).await
    }

    async fn is_registered_owner(&self, user: UserId) -> Result<bool, AfterimageError> {
        queries::connections::is_owner(self.db()?, user).await
    }

    async fn subscription(&self, owner: UserId) -> Result<Option<Subscription>, AfterimageError> {
        queries::subscriptions::get(self.db()?, owner).await
    }

    async fn extend_subscription(
        &self,
        owner: UserId,
        kind: SubscriptionKind,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Subscription, AfterimageError> {
        queries::subscriptions::extend(self.db()?, owner, kind, days, now).await
    }
}
