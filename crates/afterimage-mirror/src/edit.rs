// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Edit reconciliation: diff an edited message against its stored copy.

use std::sync::Arc;

use afterimage_core::types::{InboundMessage, StatKind, UserId};
use afterimage_core::{AfterimageError, StorageAdapter};
use tracing::{debug, info, warn};

use crate::capture::stored_row;
use crate::metrics;
use crate::notify::Notifier;
use crate::render;

/// Outcome of one edit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditReport {
    /// Body of the stored copy, `None` when the message was never stored.
    pub old_text: Option<String>,
    pub new_text: String,
    pub notified: bool,
}

#[derive(Clone)]
pub struct EditReconciler {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    notifier: Notifier,
}

impl EditReconciler {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>, notifier: Notifier) -> Self {
        Self { storage, notifier }
    }

    /// Replaces the stored copy with the edited version and reports the
    /// change to the owner unless the owner made it.
    pub async fn reconcile(
        &self,
        owner: UserId,
        msg: &InboundMessage,
    ) -> Result<EditReport, AfterimageError> {
        let existing = self
            .storage
            .get_message(owner, msg.chat.id, msg.message_id)
            .await?;
        // A stored row without text or caption still counts as found.
        let old_text = existing
            .as_ref()
            .map(|row| row.body().unwrap_or_default().to_string());

        let kind = msg.attachment.media_kind();
        let media_ref = existing
            .as_ref()
            .filter(|row| row.media_kind == kind)
            .and_then(|row| row.media_ref.clone());
        let row = stored_row(owner, msg, media_ref);
        self.storage.upsert_message(&row).await?;

        let new_text = msg.body().to_string();
        let mut report = EditReport {
            old_text,
            new_text,
            notified: false,
        };

        if msg.sender_id() == Some(owner) {
            debug!(
                owner = %owner,
                chat = %msg.chat.id,
                message_id = %msg.message_id,
                "owner edit stored without notification"
            );
            return Ok(report);
        }

        self.storage.increment_stat(owner, StatKind::Edits).await?;
        metrics::record_edit();

        let notice = render::edit_notice(
            &msg.chat,
            msg.sender.as_ref(),
            report.old_text.as_deref(),
            &report.new_text,
        );
        match self.notifier.text(owner, notice).await {
            Ok(_) => {
                report.notified = true;
                info!(
                    owner = %owner,
                    chat = %msg.chat.id,
                    message_id = %msg.message_id,
                    cached = report.old_text.is_some(),
                    "edit reported"
                );
            }
            Err(e) => {
                warn!(
                    owner = %owner,
                    chat = %msg.chat.id,
                    message_id = %msg.message_id,
                    error = %e,
                    "edit notification failed"
                );
            }
        }
        Ok(report)
    }
}
