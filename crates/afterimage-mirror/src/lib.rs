// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation engine for the Afterimage business mirror.
//!
//! The [`Mirror`] is the single consumer of platform events. It:
//! - Stores every Business message in the shadow-store
//! - Reports edits with the previously stored text
//! - Classifies deletion batches and archives cleared chats
//! - Recovers view-once media the owner replies to
//! - Answers owner commands

pub mod archive;
pub mod capture;
pub mod deletion;
pub mod edit;
pub mod metrics;
pub mod notify;
pub mod owners;
pub mod recovery;
pub mod render;
pub mod shutdown;
pub mod vault;
pub mod window;

use std::sync::Arc;
use std::time::{Duration, Instant};

use afterimage_config::model::AfterimageConfig;
use afterimage_core::types::{
    BusinessEvent, ChatId, ConnectionId, InboundMessage, MessageId, OwnerStats, StoredMessage,
    UserId,
};
use afterimage_core::{AfterimageError, MessagingGateway, OwnerDirectory, StorageAdapter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use crate::archive::{ChatArchive, ChatArchiver};
pub use crate::deletion::{DeletionHandler, DeletionReport};
pub use crate::edit::{EditReconciler, EditReport};
pub use crate::owners::{ConnectionReport, OwnerDesk};
pub use crate::recovery::{EphemeralRecovery, RecoveryReport};
pub use crate::window::{BurstClassifier, Classification, ClearReason, DeletionPolicy};

use crate::capture::MessageCapture;
use crate::notify::Notifier;
use crate::vault::MediaVault;

/// What handling one event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Connected(ConnectionReport),
    Stored {
        message: StoredMessage,
        recovered: Option<RecoveryReport>,
    },
    Edited(EditReport),
    Deleted(DeletionReport),
    Answered,
    /// The event belonged to no known enabled connection.
    Skipped,
}

/// The event consumer tying gateway, storage, and owner directory together.
pub struct Mirror {
    gateway: Arc<dyn MessagingGateway + Send + Sync>,
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    directory: Arc<dyn OwnerDirectory>,
    capture: MessageCapture,
    edits: EditReconciler,
    recovery: EphemeralRecovery,
    deletions: DeletionHandler,
    owners: OwnerDesk,
    archiver: ChatArchiver,
    event_timeout: Duration,
}

impl Mirror {
    pub fn new(
        gateway: Arc<dyn MessagingGateway + Send + Sync>,
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        directory: Arc<dyn OwnerDirectory>,
        config: &AfterimageConfig,
    ) -> Self {
        let vault = MediaVault::new(&config.storage.media_dir);
        let notifier = Notifier::new(gateway.clone());
        let archiver = ChatArchiver::new(
            storage.clone(),
            config.mirror.archive_max_embed_bytes,
            config.service.name.clone(),
        );

        let capture = MessageCapture::new(storage.clone(), gateway.clone(), vault.clone());
        let edits = EditReconciler::new(storage.clone(), notifier.clone());
        let recovery =
            EphemeralRecovery::new(storage.clone(), gateway.clone(), vault, notifier.clone());
        let deletions = DeletionHandler::new(
            storage.clone(),
            directory.clone(),
            notifier.clone(),
            archiver.clone(),
            BurstClassifier::new(DeletionPolicy::from(&config.deletion)),
            config.mirror.max_delivery_attempts,
        );
        let owners = OwnerDesk::new(
            storage.clone(),
            directory.clone(),
            notifier,
            config.service.name.clone(),
            config.mirror.trial_days,
            config.mirror.welcome_on_connect,
        );

        info!(
            service = config.service.name.as_str(),
            media_dir = config.storage.media_dir.as_str(),
            "mirror initialized"
        );

        Self {
            gateway,
            storage,
            directory,
            capture,
            edits,
            recovery,
            deletions,
            owners,
            archiver,
            event_timeout: config.mirror.event_timeout(),
        }
    }

    /// Consumes events until cancelled or until the gateway stream closes,
    /// then closes storage.
    ///
    /// Cancellation is observed between events; an event in progress runs
    /// to completion or to its timeout.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), AfterimageError> {
        info!("mirror running");

        loop {
            tokio::select! {
                event = self.gateway.receive() => {
                    match event {
                        Ok(event) => self.dispatch(event).await,
                        Err(e) => {
                            if e.is_stream_closed() {
                                info!("gateway stream closed, stopping mirror");
                                break;
                            }
                            error!(error = %e, "gateway receive error");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping mirror");
                    break;
                }
            }
        }

        self.storage.close().await?;
        info!("mirror stopped");
        Ok(())
    }

    /// Handles one event under the configured timeout, logging failures.
    async fn dispatch(&mut self, event: BusinessEvent) {
        let kind = event.kind();
        let timeout = self.event_timeout;
        match tokio::time::timeout(timeout, self.handle_event(event)).await {
            Ok(Ok(outcome)) => debug!(event = kind, outcome = ?outcome, "event handled"),
            Ok(Err(e)) => error!(event = kind, error = %e, "failed to handle event"),
            Err(_) => {
                let e = AfterimageError::Timeout { duration: timeout };
                error!(event = kind, error = %e, "event handling timed out");
            }
        }
    }

    /// Routes one platform event to its handler.
    pub async fn handle_event(
        &mut self,
        event: BusinessEvent,
    ) -> Result<EventOutcome, AfterimageError> {
        match event {
            BusinessEvent::Connected(conn) => {
                let report = self.owners.on_connection(&conn).await?;
                Ok(EventOutcome::Connected(report))
            }
            BusinessEvent::Message(msg) => {
                let Some(owner) = self.resolve_owner(&msg.connection_id).await? else {
                    return Ok(EventOutcome::Skipped);
                };
                self.on_message(owner, &msg).await
            }
            BusinessEvent::Edited(msg) => {
                let Some(owner) = self.resolve_owner(&msg.connection_id).await? else {
                    return Ok(EventOutcome::Skipped);
                };
                let report = self.edits.reconcile(owner, &msg).await?;
                Ok(EventOutcome::Edited(report))
            }
            BusinessEvent::Deleted(batch) => {
                let Some(owner) = self.resolve_owner(&batch.connection_id).await? else {
                    return Ok(EventOutcome::Skipped);
                };
                let report = self.deletions.handle(owner, &batch, Instant::now()).await?;
                Ok(EventOutcome::Deleted(report))
            }
            BusinessEvent::Command(request) => {
                self.owners.on_command(&request).await?;
                Ok(EventOutcome::Answered)
            }
        }
    }

    async fn on_message(
        &self,
        owner: UserId,
        msg: &InboundMessage,
    ) -> Result<EventOutcome, AfterimageError> {
        let recovered = match self.recovery.recover(owner, msg).await {
            Ok(report) => report,
            Err(e) => {
                warn!(
                    owner = %owner,
                    chat = %msg.chat.id,
                    message_id = %msg.message_id,
                    error = %e,
                    "view-once recovery failed"
                );
                None
            }
        };
        let message = self.capture.capture(owner, msg).await?;
        Ok(EventOutcome::Stored { message, recovered })
    }

    /// Owner of an enabled connection, or `None` (logged) for unknown ones.
    async fn resolve_owner(
        &self,
        connection: &ConnectionId,
    ) -> Result<Option<UserId>, AfterimageError> {
        let owner = self.directory.owner_for_connection(connection).await?;
        if owner.is_none() {
            warn!(connection = %connection, "event for unknown or disabled connection, skipping");
        }
        Ok(owner)
    }

    pub async fn get_message(
        &self,
        owner: UserId,
        chat: ChatId,
        message_id: MessageId,
    ) -> Result<Option<StoredMessage>, AfterimageError> {
        self.storage.get_message(owner, chat, message_id).await
    }

    pub async fn list_messages(
        &self,
        owner: UserId,
        chat: ChatId,
        limit: Option<u32>,
    ) -> Result<Vec<StoredMessage>, AfterimageError> {
        self.storage.list_for_chat(owner, chat, limit).await
    }

    pub async fn render_archive(
        &self,
        owner: UserId,
        chat: ChatId,
        chat_name: &str,
        limit: Option<u32>,
    ) -> Result<Option<ChatArchive>, AfterimageError> {
        self.archiver.render(owner, chat, chat_name, limit).await
    }

    pub async fn stats(&self, owner: UserId) -> Result<OwnerStats, AfterimageError> {
        self.storage.stats(owner).await
    }

    /// Deletion classifier state, for inspection.
    pub fn classifier(&self) -> &BurstClassifier {
        self.deletions.classifier()
    }
}
