// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging gateway trait for the bot platform transport.

use async_trait::async_trait;

use crate::error::AfterimageError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{BusinessEvent, DeliveryReceipt, FileRef, OutboundMessage};

/// Bidirectional bridge to the bot platform.
///
/// Ingests Business events and delivers notifications to owners.
#[async_trait]
pub trait MessagingGateway: PluginAdapter {
    /// Starts receiving platform updates.
    async fn connect(&mut self) -> Result<(), AfterimageError>;

    /// Next platform event, in delivery order.
    async fn receive(&self) -> Result<BusinessEvent, AfterimageError>;

    /// Delivers a message.
    async fn send(&self, msg: OutboundMessage) -> Result<DeliveryReceipt, AfterimageError>;

    /// Downloads the bytes behind a platform file handle.
    async fn download(&self, file: &FileRef) -> Result<Vec<u8>, AfterimageError>;
}
