// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline operator commands: `export`, `stats`, `grant`.
//!
//! These open the store directly and never talk to Telegram.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use afterimage_config::model::AfterimageConfig;
use afterimage_core::error::AfterimageError;
use afterimage_core::types::{ChatId, Subscription, SubscriptionKind, UserId};
use afterimage_core::{OwnerDirectory, StorageAdapter};
use afterimage_mirror::ChatArchiver;
use afterimage_storage::SqliteStorage;
use chrono::Utc;

async fn open_storage(config: &AfterimageConfig) -> Result<Arc<SqliteStorage>, AfterimageError> {
    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    Ok(storage)
}

/// Renders a chat archive and writes it to `out`, or to the generated
/// file name in the current directory. Returns the written path, or
/// `None` when nothing is stored for the chat.
pub async fn export_chat(
    config: &AfterimageConfig,
    owner: UserId,
    chat: ChatId,
    name: &str,
    limit: Option<u32>,
    out: Option<PathBuf>,
) -> Result<Option<PathBuf>, AfterimageError> {
    let storage = open_storage(config).await?;
    let archiver = ChatArchiver::new(
        storage.clone(),
        config.mirror.archive_max_embed_bytes,
        config.service.name.clone(),
    );
    let archive = archiver.render(owner, chat, name, limit).await?;
    storage.close().await?;

    let Some(archive) = archive else {
        return Ok(None);
    };
    let path = out.unwrap_or_else(|| PathBuf::from(&archive.file_name));
    write_file(&path, archive.into_bytes()).await?;
    Ok(Some(path))
}

async fn write_file(path: &Path, bytes: Vec<u8>) -> Result<(), AfterimageError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| AfterimageError::Media {
            message: format!("failed to write {}", path.display()),
            source: Some(e),
        })
}

pub async fn run_export(
    config: &AfterimageConfig,
    owner: i64,
    chat: i64,
    name: &str,
    limit: Option<u32>,
    out: Option<PathBuf>,
) -> Result<(), AfterimageError> {
    match export_chat(config, UserId(owner), ChatId(chat), name, limit, out).await? {
        Some(path) => println!("archive written to {}", path.display()),
        None => println!("no stored messages for chat {chat}"),
    }
    Ok(())
}

/// Plain-text summary of an owner's counters and subscription.
pub async fn owner_summary(
    config: &AfterimageConfig,
    owner: UserId,
) -> Result<String, AfterimageError> {
    let storage = open_storage(config).await?;
    let stats = storage.stats(owner).await?;
    let subscription = storage.subscription(owner).await?;
    storage.close().await?;

    Ok(format!(
        "owner {owner}\n  messages: {}\n  edits:    {}\n  deletes:  {}\n  subscription: {}",
        stats.messages,
        stats.edits,
        stats.deletes,
        describe_subscription(subscription.as_ref()),
    ))
}

fn describe_subscription(subscription: Option<&Subscription>) -> String {
    let now = Utc::now();
    match subscription {
        None => "none".to_string(),
        Some(sub) if sub.is_active(now) => format!(
            "{} until {} ({} days left)",
            sub.kind,
            sub.expires_at.format("%Y-%m-%d %H:%M UTC"),
            sub.days_left(now)
        ),
        Some(sub) => format!(
            "{} expired {}",
            sub.kind,
            sub.expires_at.format("%Y-%m-%d %H:%M UTC")
        ),
    }
}

pub async fn run_stats(config: &AfterimageConfig, owner: i64) -> Result<(), AfterimageError> {
    println!("{}", owner_summary(config, UserId(owner)).await?);
    Ok(())
}

/// Extends an owner's paid subscription by `days`.
pub async fn grant(
    config: &AfterimageConfig,
    owner: UserId,
    days: u32,
) -> Result<Subscription, AfterimageError> {
    let storage = open_storage(config).await?;
    let subscription = storage
        .extend_subscription(owner, SubscriptionKind::Paid, days, Utc::now())
        .await?;
    storage.close().await?;
    Ok(subscription)
}

pub async fn run_grant(config: &AfterimageConfig, owner: i64, days: u32) -> Result<(), AfterimageError> {
    let subscription = grant(config, UserId(owner), days).await?;
    println!(
        "owner {owner}: {}",
        describe_subscription(Some(&subscription))
    );
    Ok(())
}
