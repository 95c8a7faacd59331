// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram Business gateway for Afterimage.
//!
//! Implements [`MessagingGateway`] for the Telegram Bot API via teloxide:
//! long polling for Business updates, HTML delivery, and file downloads.

pub mod handler;
pub mod media;

use afterimage_config::model::TelegramConfig;
use afterimage_core::error::AfterimageError;
use afterimage_core::traits::{MessagingGateway, PluginAdapter};
use afterimage_core::types::{
    AdapterType, BusinessEvent, DeliveryReceipt, FileRef, HealthStatus, MessageId, OutboundBody,
    OutboundMessage,
};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Capacity of the queue between the dispatcher and the mirror.
const EVENT_QUEUE_CAPACITY: usize = 100;

/// Telegram gateway implementing [`MessagingGateway`].
///
/// `connect` spawns a teloxide dispatcher that converts Business updates
/// into [`BusinessEvent`]s; `receive` drains them in arrival order.
pub struct TelegramGateway {
    bot: Bot,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<BusinessEvent>>,
    inbound_tx: mpsc::Sender<BusinessEvent>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramGateway {
    /// Creates a new Telegram gateway.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: TelegramConfig) -> Result<Self, AfterimageError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            AfterimageError::Config("telegram.bot_token is required to serve".into())
        })?;

        if token.is_empty() {
            return Err(AfterimageError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        Ok(Self {
            bot,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

#[async_trait]
impl PluginAdapter for TelegramGateway {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, AfterimageError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), AfterimageError> {
        debug!("Telegram gateway shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn connect(&mut self) -> Result<(), AfterimageError> {
        if self.polling_handle.is_some() {
            return Ok(()); // Already connected
        }

        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let updates = dptree::entry()
                .branch(Update::filter_business_connection().endpoint(handler::on_business_connection))
                .branch(Update::filter_business_message().endpoint(handler::on_business_message))
                .branch(
                    Update::filter_edited_business_message()
                        .endpoint(handler::on_edited_business_message),
                )
                .branch(
                    Update::filter_deleted_business_messages()
                        .endpoint(handler::on_deleted_business_messages),
                )
                .branch(Update::filter_message().endpoint(handler::on_direct_message));

            Dispatcher::builder(bot, updates)
                .dependencies(dptree::deps![tx])
                .default_handler(|_| async {}) // Silently ignore other updates
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn receive(&self) -> Result<BusinessEvent, AfterimageError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| AfterimageError::gateway("Telegram update channel closed"))
    }

    async fn send(&self, msg: OutboundMessage) -> Result<DeliveryReceipt, AfterimageError> {
        let chat = ChatId(msg.chat.0);
        let sent = match msg.body {
            OutboundBody::Text(html) => self
                .bot
                .send_message(chat, html)
                .parse_mode(ParseMode::Html)
                .await
                .map_err(|e| media::gateway_error("failed to send message", e))?,
            OutboundBody::File {
                media: kind,
                path,
                caption,
            } => media::send_file(&self.bot, chat, kind, path, caption).await?,
            OutboundBody::Document {
                file_name,
                bytes,
                caption,
            } => media::send_document_bytes(&self.bot, chat, file_name, bytes, caption).await?,
        };

        Ok(DeliveryReceipt {
            message_id: MessageId(i64::from(sent.id.0)),
        })
    }

    async fn download(&self, file: &FileRef) -> Result<Vec<u8>, AfterimageError> {
        media::download_file(&self.bot, file).await
    }
}
