// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deletion handling: classify the batch, archive on a chat clear, then
//! notify per message and remove rows.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use afterimage_core::types::{DeletionBatch, MessageId, StatKind, StoredMessage, UserId};
use afterimage_core::{AfterimageError, OwnerDirectory, StorageAdapter};

use crate::archive::ChatArchiver;
use crate::metrics;
use crate::notify::Notifier;
use crate::render;
use crate::window::{BurstClassifier, Classification, ClearReason};

/// Outcome of one deletion batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionReport {
    pub classification: Classification,
    pub reason: Option<ClearReason>,
    /// Rows stored for the chat before the batch was applied.
    pub total_before: u64,
    pub recent_total: usize,
    /// Notifications delivered (rows removed).
    pub notified: usize,
    /// Owner-authored rows removed without a notification.
    pub silent: usize,
    /// Ids with no stored row.
    pub skipped: usize,
    /// Notices that failed; their rows stay stored for redelivery.
    pub failed: usize,
    /// Rows dropped after exhausting the delivery budget.
    pub dropped: usize,
    /// Whether an archive was delivered for a chat clear.
    pub archived: bool,
}

enum Outcome {
    Notified,
    Silent,
    Skipped,
    Failed,
    Dropped,
}

pub struct DeletionHandler {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    directory: Arc<dyn OwnerDirectory>,
    notifier: Notifier,
    archiver: ChatArchiver,
    classifier: BurstClassifier,
    max_delivery_attempts: u32,
}

impl DeletionHandler {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        directory: Arc<dyn OwnerDirectory>,
        notifier: Notifier,
        archiver: ChatArchiver,
        classifier: BurstClassifier,
        max_delivery_attempts: u32,
    ) -> Self {
        Self {
            storage,
            directory,
            notifier,
            archiver,
            classifier,
            max_delivery_attempts: max_delivery_attempts.max(1),
        }
    }

    pub fn classifier(&self) -> &BurstClassifier {
        &self.classifier
    }

    pub async fn handle(
        &mut self,
        owner: UserId,
        batch: &DeletionBatch,
        now: Instant,
    ) -> Result<DeletionReport, AfterimageError> {
        let chat = batch.chat.id;
        let total_before = self.storage.count_for_chat(owner, chat).await?;

        let mut report = DeletionReport {
            classification: Classification::Ordinary,
            reason: None,
            total_before,
            recent_total: 0,
            notified: 0,
            silent: 0,
            skipped: 0,
            failed: 0,
            dropped: 0,
            archived: false,
        };
        if batch.message_ids.is_empty() {
            return Ok(report);
        }

        let verdict = self
            .classifier
            .classify(chat, batch.message_ids.len(), total_before, now);
        report.classification = verdict.classification;
        report.reason = verdict.reason;
        report.recent_total = verdict.recent_total;

        if verdict.is_chat_clear() {
            metrics::record_chat_clear();
            info!(
                owner = %owner,
                chat = %chat,
                batch = batch.message_ids.len(),
                total_before,
                recent_total = verdict.recent_total,
                reason = ?verdict.reason,
                "chat clear detected"
            );
            report.archived = self.deliver_archive(owner, batch).await;
        }

        let full_content = self.subscription_active(owner).await;
        for &message_id in &batch.message_ids {
            let outcome = match self
                .process_one(owner, batch, message_id, full_content)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(
                        owner = %owner,
                        chat = %chat,
                        message_id = %message_id,
                        error = %e,
                        "deleted message could not be processed"
                    );
                    Outcome::Failed
                }
            };
            match outcome {
                Outcome::Notified => {
                    report.notified += 1;
                    metrics::record_deletion("notified");
                }
                Outcome::Silent => {
                    report.silent += 1;
                    metrics::record_deletion("silent");
                }
                Outcome::Skipped => {
                    report.skipped += 1;
                    metrics::record_deletion("skipped");
                }
                Outcome::Failed => {
                    report.failed += 1;
                    metrics::record_deletion("failed");
                }
                Outcome::Dropped => {
                    report.dropped += 1;
                    metrics::record_deletion("dropped");
                }
            }
        }

        debug!(owner = %owner, chat = %chat, report = ?report, "deletion batch processed");
        Ok(report)
    }

    /// Renders the chat archive from rows still present and sends it as a
    /// document. Failures are logged.
    async fn deliver_archive(&self, owner: UserId, batch: &DeletionBatch) -> bool {
        let chat = batch.chat.id;
        let archive = match self
            .archiver
            .render(owner, chat, &batch.chat.display_name, None)
            .await
        {
            Ok(Some(archive)) => archive,
            Ok(None) => {
                debug!(owner = %owner, chat = %chat, "nothing stored to archive");
                return false;
            }
            Err(e) => {
                warn!(owner = %owner, chat = %chat, error = %e, "chat archive failed");
                return false;
            }
        };

        let caption = render::chat_clear_caption(
            &batch.chat,
            batch.message_ids.len(),
            archive.message_count,
        );
        let file_name = archive.file_name.clone();
        match self
            .notifier
            .document(owner, file_name, archive.into_bytes(), Some(caption))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(owner = %owner, chat = %chat, error = %e, "chat archive delivery failed");
                false
            }
        }
    }

    async fn subscription_active(&self, owner: UserId) -> bool {
        match self.directory.subscription(owner).await {
            Ok(sub) => sub.is_some_and(|s| s.is_active(Utc::now())),
            Err(e) => {
                warn!(owner = %owner, error = %e, "subscription lookup failed, redacting");
                false
            }
        }
    }

    async fn process_one(
        &self,
        owner: UserId,
        batch: &DeletionBatch,
        message_id: MessageId,
        full_content: bool,
    ) -> Result<Outcome, AfterimageError> {
        let chat = batch.chat.id;
        let Some(stored) = self.storage.get_message(owner, chat, message_id).await? else {
            debug!(owner = %owner, chat = %chat, message_id = %message_id, "deleted message not in store");
            return Ok(Outcome::Skipped);
        };

        if stored.is_authored_by(owner) {
            self.storage.delete_message(owner, chat, message_id).await?;
            return Ok(Outcome::Silent);
        }

        // A row with recorded attempts is a redelivery of a deletion already counted.
        if stored.delivery_attempts == 0 {
            self.storage.increment_stat(owner, StatKind::Deletes).await?;
        }

        let error = match self.deliver(owner, batch, &stored, full_content).await {
            Ok(()) => {
                self.storage.delete_message(owner, chat, message_id).await?;
                return Ok(Outcome::Notified);
            }
            Err(e) => e,
        };

        let attempts = self
            .storage
            .record_delivery_failure(owner, chat, message_id)
            .await?;
        // Zero means the row vanished underneath us.
        if attempts == 0 || attempts >= self.max_delivery_attempts {
            warn!(
                owner = %owner,
                chat = %chat,
                message_id = %message_id,
                attempts,
                error = %error,
                "deletion notice undeliverable, dropping row"
            );
            self.storage.delete_message(owner, chat, message_id).await?;
            return Ok(Outcome::Dropped);
        }
        warn!(
            owner = %owner,
            chat = %chat,
            message_id = %message_id,
            attempts,
            max_attempts = self.max_delivery_attempts,
            error = %error,
            "deletion notice failed, keeping row for redelivery"
        );
        Ok(Outcome::Failed)
    }

    async fn deliver(
        &self,
        owner: UserId,
        batch: &DeletionBatch,
        stored: &StoredMessage,
        full_content: bool,
    ) -> Result<(), AfterimageError> {
        if !full_content {
            self.notifier
                .text(owner, render::redacted_deletion_notice(&batch.chat))
                .await?;
            return Ok(());
        }
        let notice = render::deletion_notice(&batch.chat, stored);
        self.notifier.stored(owner, stored, notice).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afterimage_config::model::StorageConfig;
    use afterimage_core::types::{ChatId, ChatInfo, ConnectionId, SubscriptionKind};
    use afterimage_storage::SqliteStorage;
    use afterimage_test_utils::MockGateway;
    use tracing_test::traced_test;

    use crate::window::DeletionPolicy;

    const OWNER: UserId = UserId(1);
    const CHAT: ChatId = ChatId(7);

    struct Fixture {
        handler: DeletionHandler,
        storage: Arc<SqliteStorage>,
        gateway: Arc<MockGateway>,
        _dir: tempfile::TempDir,
    }

    async fn fixture(max_attempts: u32) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("t.db").to_string_lossy().into_owned(),
            wal_mode: true,
            media_dir: dir.path().join("media").to_string_lossy().into_owned(),
        }));
        storage.initialize().await.unwrap();
        storage
            .extend_subscription(OWNER, SubscriptionKind::Paid, 30, Utc::now())
            .await
            .unwrap();
        let gateway = Arc::new(MockGateway::new());
        let notifier = Notifier::new(gateway.clone());
        let archiver = ChatArchiver::new(storage.clone(), 1024, "afterimage");
        let handler = DeletionHandler::new(
            storage.clone(),
            storage.clone(),
            notifier,
            archiver,
            BurstClassifier::new(DeletionPolicy::default()),
            max_attempts,
        );
        Fixture {
            handler,
            storage,
            gateway,
            _dir: dir,
        }
    }

    fn batch(ids: &[i64]) -> DeletionBatch {
        DeletionBatch {
            connection_id: ConnectionId("c".into()),
            chat: ChatInfo {
                id: CHAT,
                display_name: "Dana".into(),
                username: None,
            },
            message_ids: ids.iter().copied().map(MessageId).collect(),
        }
    }

    async fn store(storage: &SqliteStorage, id: i64, sender: UserId) {
        storage
            .upsert_message(&StoredMessage {
                owner_id: OWNER,
                chat_id: CHAT,
                message_id: MessageId(id),
                sender_id: Some(sender),
                text: format!("text {id}"),
                ..StoredMessage::default()
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_batch_is_not_classified() {
        let mut f = fixture(3).await;
        let report = f.handler.handle(OWNER, &batch(&[]), Instant::now()).await.unwrap();
        assert_eq!(report.classification, Classification::Ordinary);
        assert_eq!(report.recent_total, 0);
        assert_eq!(f.handler.classifier().window().tracked_chats(), 0);
        assert_eq!(f.gateway.send_attempts(), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_notice_keeps_row_for_redelivery() {
        let mut f = fixture(3).await;
        for id in 1..=10 {
            store(&f.storage, id, UserId(2)).await;
        }
        f.gateway.fail_all_sends(true);

        let report = f.handler.handle(OWNER, &batch(&[5]), Instant::now()).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.dropped, 0);
        assert_eq!(f.gateway.send_attempts(), 1);

        let row = f.storage.get_message(OWNER, CHAT, MessageId(5)).await.unwrap().unwrap();
        assert_eq!(row.delivery_attempts, 1);
        assert!(logs_contain("deletion notice failed, keeping row for redelivery"));
    }

    #[tokio::test]
    #[traced_test]
    async fn exhausted_budget_drops_row_with_warning() {
        let mut f = fixture(2).await;
        for id in 1..=10 {
            store(&f.storage, id, UserId(2)).await;
        }
        f.gateway.fail_all_sends(true);

        let first = f.handler.handle(OWNER, &batch(&[3]), Instant::now()).await.unwrap();
        assert_eq!((first.failed, first.dropped), (1, 0));

        let second = f.handler.handle(OWNER, &batch(&[3]), Instant::now()).await.unwrap();
        assert_eq!((second.failed, second.dropped), (0, 1));
        assert_eq!(f.gateway.send_attempts(), 2);
        assert!(f.storage.get_message(OWNER, CHAT, MessageId(3)).await.unwrap().is_none());
        assert!(logs_contain("deletion notice undeliverable, dropping row"));
        // Counted once across both deliveries.
        assert_eq!(f.storage.stats(OWNER).await.unwrap().deletes, 1);
    }

    #[tokio::test]
    async fn ratio_rule_archives_small_chat() {
        let mut f = fixture(3).await;
        store(&f.storage, 1, UserId(2)).await;
        store(&f.storage, 2, OWNER).await;

        let report = f.handler.handle(OWNER, &batch(&[1]), Instant::now()).await.unwrap();
        assert_eq!(report.reason, Some(ClearReason::Ratio));
        assert!(report.archived);
        assert_eq!(report.notified, 1);
        // The owner's row survives; only the deleted id is removed.
        assert_eq!(f.storage.count_for_chat(OWNER, CHAT).await.unwrap(), 1);
    }
}
