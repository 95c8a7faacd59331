// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Afterimage business mirror.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Afterimage configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AfterimageConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend and media directory.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Chat-clear classification policy.
    #[serde(default)]
    pub deletion: DeletionConfig,

    /// Event consumer behavior.
    #[serde(default)]
    pub mirror: MirrorConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in notifications and archive footers.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "afterimage".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables `serve`.
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Directory receiving downloaded media files.
    #[serde(default = "default_media_dir")]
    pub media_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            media_dir: default_media_dir(),
        }
    }
}

fn default_database_path() -> String {
    "afterimage.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

fn default_media_dir() -> String {
    "saved_media".to_string()
}

/// Thresholds deciding when a deletion burst counts as a chat clear.
///
/// A batch is a chat clear if any one rule fires.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeletionConfig {
    /// Sliding window horizon for recent deletion events.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Batch size that alone marks a chat clear.
    #[serde(default = "default_min_batch")]
    pub min_batch: usize,

    /// Fraction of the chat's stored rows that, when exceeded, marks a chat clear.
    #[serde(default = "default_clear_ratio")]
    pub clear_ratio: f64,

    /// Deleted-message total inside the window that marks a chat clear.
    #[serde(default = "default_burst_threshold")]
    pub burst_threshold: usize,
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            min_batch: default_min_batch(),
            clear_ratio: default_clear_ratio(),
            burst_threshold: default_burst_threshold(),
        }
    }
}

impl DeletionConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

fn default_window_secs() -> u64 {
    10
}

fn default_min_batch() -> usize {
    2
}

fn default_clear_ratio() -> f64 {
    0.20
}

fn default_burst_threshold() -> usize {
    3
}

/// Event consumer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorConfig {
    /// Upper bound for handling a single platform event.
    #[serde(default = "default_event_timeout_secs")]
    pub event_timeout_secs: u64,

    /// Failed deletion notifications tolerated before a row is dropped.
    #[serde(default = "default_max_delivery_attempts")]
    pub max_delivery_attempts: u32,

    /// Trial length granted when an owner connects for the first time.
    #[serde(default = "default_trial_days")]
    pub trial_days: u32,

    /// Photos larger than this are shown as placeholders in archives.
    #[serde(default = "default_archive_max_embed_bytes")]
    pub archive_max_embed_bytes: u64,

    /// Send a welcome message when a connection is enabled.
    #[serde(default = "default_welcome_on_connect")]
    pub welcome_on_connect: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            event_timeout_secs: default_event_timeout_secs(),
            max_delivery_attempts: default_max_delivery_attempts(),
            trial_days: default_trial_days(),
            archive_max_embed_bytes: default_archive_max_embed_bytes(),
            welcome_on_connect: default_welcome_on_connect(),
        }
    }
}

impl MirrorConfig {
    pub fn event_timeout(&self) -> Duration {
        Duration::from_secs(self.event_timeout_secs)
    }
}

fn default_event_timeout_secs() -> u64 {
    120
}

fn default_max_delivery_attempts() -> u32 {
    3
}

fn default_trial_days() -> u32 {
    7
}

fn default_archive_max_embed_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_welcome_on_connect() -> bool {
    true
}
