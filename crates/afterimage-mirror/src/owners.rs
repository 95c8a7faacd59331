// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owner-facing flows: Business connection changes and bot commands.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use afterimage_core::types::{
    BusinessConnection, CommandRequest, OwnerCommand, OwnerRecord, Subscription,
    SubscriptionKind, UserId,
};
use afterimage_core::{AfterimageError, OwnerDirectory, StorageAdapter};

use crate::notify::Notifier;
use crate::render;

/// Outcome of a connection update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionReport {
    /// The owner had no registered connection before.
    pub new_owner: bool,
    pub trial_granted: bool,
    pub welcomed: bool,
}

#[derive(Clone)]
pub struct OwnerDesk {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    directory: Arc<dyn OwnerDirectory>,
    notifier: Notifier,
    service_name: String,
    trial_days: u32,
    welcome_on_connect: bool,
}

impl OwnerDesk {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        directory: Arc<dyn OwnerDirectory>,
        notifier: Notifier,
        service_name: impl Into<String>,
        trial_days: u32,
        welcome_on_connect: bool,
    ) -> Self {
        Self {
            storage,
            directory,
            notifier,
            service_name: service_name.into(),
            trial_days,
            welcome_on_connect,
        }
    }

    /// Registers or disables a connection. On enable, grants the trial to
    /// owners without a subscription and sends the welcome message.
    pub async fn on_connection(
        &self,
        conn: &BusinessConnection,
    ) -> Result<ConnectionReport, AfterimageError> {
        let owner = conn.owner.id;
        let record = OwnerRecord {
            owner_id: owner,
            connection_id: conn.connection_id.clone(),
            first_name: conn.owner.first_name.clone(),
            username: conn.owner.username.clone(),
            is_enabled: conn.is_enabled,
        };
        let new_owner = self.directory.register_connection(&record).await?;
        let mut report = ConnectionReport {
            new_owner,
            ..ConnectionReport::default()
        };

        if !conn.is_enabled {
            info!(owner = %owner, connection = %conn.connection_id, "business connection disabled");
            return Ok(report);
        }
        info!(
            owner = %owner,
            connection = %conn.connection_id,
            new_owner,
            "business connection enabled"
        );

        let now = Utc::now();
        let mut subscription = self.directory.subscription(owner).await?;
        if subscription.is_none() && self.trial_days > 0 {
            let granted = self
                .directory
                .extend_subscription(owner, SubscriptionKind::Trial, self.trial_days, now)
                .await?;
            info!(owner = %owner, expires_at = %granted.expires_at, "trial granted");
            subscription = Some(granted);
            report.trial_granted = true;
        }

        if self.welcome_on_connect {
            let text = render::welcome(&self.service_name, subscription.as_ref(), now);
            match self.notifier.text(owner, text).await {
                Ok(_) => report.welcomed = true,
                Err(e) => warn!(owner = %owner, error = %e, "welcome message failed"),
            }
        }
        Ok(report)
    }

    /// Answers `/start`, `/help`, and `/stats`. Users without a registered
    /// connection get connection instructions instead.
    pub async fn on_command(&self, request: &CommandRequest) -> Result<(), AfterimageError> {
        let user = request.user.id;
        if !self.directory.is_registered_owner(user).await? {
            self.notifier
                .reply(request.chat, render::not_connected_text())
                .await?;
            return Ok(());
        }

        let reply = match request.command {
            OwnerCommand::Help => render::help_text().to_string(),
            OwnerCommand::Stats => render::stats_text(&self.storage.stats(user).await?),
            OwnerCommand::Start => {
                let stats = self.storage.stats(user).await?;
                let subscription = self.subscription_or_none(user).await;
                render::start_text(&self.service_name, subscription.as_ref(), &stats, Utc::now())
            }
        };
        self.notifier.reply(request.chat, reply).await?;
        Ok(())
    }

    async fn subscription_or_none(&self, owner: UserId) -> Option<Subscription> {
        match self.directory.subscription(owner).await {
            Ok(sub) => sub,
            Err(e) => {
                warn!(owner = %owner, error = %e, "subscription lookup failed");
                None
            }
        }
    }
}
