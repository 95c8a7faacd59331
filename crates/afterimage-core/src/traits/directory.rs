// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owner directory: Business connection registry and subscription lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AfterimageError;
use crate::types::{ConnectionId, OwnerRecord, Subscription, SubscriptionKind, UserId};

/// Resolves which owner a Business connection belongs to.
///
/// Passed explicitly into the mirror engine so handlers never consult a
/// global mapping.
#[async_trait]
pub trait OwnerDirectory: Send + Sync + 'static {
    /// Records (or refreshes) a connection. Returns `true` if the owner was not known before.
    async fn register_connection(&self, record: &OwnerRecord) -> Result<bool, AfterimageError>;

    /// Owner of an enabled connection.
    async fn owner_for_connection(
        &self,
        connection: &ConnectionId,
    ) -> Result<Option<UserId>, AfterimageError>;

    /// Whether `user` owns at least one registered connection.
    async fn is_registered_owner(&self, user: UserId) -> Result<bool, AfterimageError>;

    /// Current subscription record, if any.
    async fn subscription(&self, owner: UserId) -> Result<Option<Subscription>, AfterimageError>;

    /// Creates or extends a subscription so that it lasts `days` more days
    /// from the later of now and its current expiry.
    async fn extend_subscription(
        &self,
        owner: UserId,
        kind: SubscriptionKind,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Subscription, AfterimageError>;
}
