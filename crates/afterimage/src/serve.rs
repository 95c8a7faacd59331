// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `afterimage serve` command implementation.
//!
//! Opens the SQLite store, connects the Telegram gateway, and runs the
//! mirror until SIGINT/SIGTERM.

use std::sync::Arc;

use afterimage_config::model::AfterimageConfig;
use afterimage_core::error::AfterimageError;
use afterimage_core::{MessagingGateway, OwnerDirectory, PluginAdapter, StorageAdapter};
use afterimage_mirror::{Mirror, metrics, shutdown};
use afterimage_storage::SqliteStorage;
use afterimage_telegram::TelegramGateway;
use tracing::{error, info, warn};

/// Runs the `afterimage serve` command.
pub async fn run_serve(config: AfterimageConfig) -> Result<(), AfterimageError> {
    init_tracing(&config.service.log_level);
    metrics::register_metrics();

    info!(service = config.service.name.as_str(), "starting afterimage serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    let mut gateway = TelegramGateway::new(config.telegram.clone()).map_err(|e| {
        error!(error = %e, "failed to initialize Telegram gateway");
        eprintln!(
            "error: Telegram bot token required. Set via config or AFTERIMAGE_TELEGRAM_BOT_TOKEN"
        );
        e
    })?;

    match gateway.health_check().await? {
        afterimage_core::HealthStatus::Healthy => info!("Telegram bot reachable"),
        status => warn!(status = ?status, "Telegram bot health check failed, continuing"),
    }

    gateway.connect().await?;
    let gateway = Arc::new(gateway);

    let mut mirror = Mirror::new(
        gateway.clone() as Arc<dyn MessagingGateway + Send + Sync>,
        storage.clone() as Arc<dyn StorageAdapter + Send + Sync>,
        storage.clone() as Arc<dyn OwnerDirectory>,
        &config,
    );

    let cancel = shutdown::install_signal_handler();
    let result = mirror.run(cancel).await;

    if let Err(e) = gateway.shutdown().await {
        warn!(error = %e, "gateway shutdown failed");
    }

    info!("afterimage serve stopped");
    result
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("afterimage={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
