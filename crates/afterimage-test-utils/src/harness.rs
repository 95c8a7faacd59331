// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete mirror with a mock gateway, a temp
//! SQLite database, and a temp media directory. `handle()` drives one
//! event through the full pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use afterimage_config::model::{AfterimageConfig, DeletionConfig, MirrorConfig, StorageConfig};
use afterimage_core::types::BusinessEvent;
use afterimage_core::{AfterimageError, MessagingGateway, OwnerDirectory, StorageAdapter};
use afterimage_mirror::{EventOutcome, Mirror};
use afterimage_storage::SqliteStorage;

use crate::fixtures;
use crate::mock_gateway::MockGateway;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    deletion: DeletionConfig,
    mirror: MirrorConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            deletion: DeletionConfig::default(),
            mirror: MirrorConfig {
                welcome_on_connect: false,
                ..MirrorConfig::default()
            },
        }
    }

    /// Override the chat-clear policy.
    pub fn with_deletion(mut self, deletion: DeletionConfig) -> Self {
        self.deletion = deletion;
        self
    }

    /// Set how many failed deliveries a deleted row survives.
    pub fn with_max_delivery_attempts(mut self, attempts: u32) -> Self {
        self.mirror.max_delivery_attempts = attempts;
        self
    }

    /// Send the welcome message on connection (off by default).
    pub fn with_welcome(mut self) -> Self {
        self.mirror.welcome_on_connect = true;
        self
    }

    /// Trial length granted on first connection.
    pub fn with_trial_days(mut self, days: u32) -> Self {
        self.mirror.trial_days = days;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, AfterimageError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| AfterimageError::Storage { source: e.into() })?;
        let storage_config = StorageConfig {
            database_path: temp_dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
            media_dir: temp_dir.path().join("media").to_string_lossy().into_owned(),
        };

        let storage = Arc::new(SqliteStorage::new(storage_config.clone()));
        storage.initialize().await?;

        let config = AfterimageConfig {
            storage: storage_config,
            deletion: self.deletion,
            mirror: self.mirror,
            ..AfterimageConfig::default()
        };

        let gateway = Arc::new(MockGateway::new());
        let mirror = Mirror::new(
            gateway.clone() as Arc<dyn MessagingGateway + Send + Sync>,
            storage.clone() as Arc<dyn StorageAdapter + Send + Sync>,
            storage.clone() as Arc<dyn OwnerDirectory>,
            &config,
        );

        Ok(TestHarness {
            gateway,
            storage,
            mirror,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock gateway and temp storage.
pub struct TestHarness {
    /// The mock bot gateway.
    pub gateway: Arc<MockGateway>,
    /// SQLite storage and owner directory (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// The engine under test.
    pub mirror: Mirror,
    pub config: AfterimageConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings.
    pub async fn new() -> Result<Self, AfterimageError> {
        Self::builder().build().await
    }

    /// Harness whose fixture owner has already connected the bot.
    ///
    /// Messages sent while connecting are cleared.
    pub async fn connected() -> Result<Self, AfterimageError> {
        Self::builder().build().await?.with_owner_connected().await
    }

    /// Registers the fixture owner's connection and clears sent messages.
    pub async fn with_owner_connected(mut self) -> Result<Self, AfterimageError> {
        self.handle(fixtures::connected(true)).await?;
        self.gateway.clear_sent().await;
        Ok(self)
    }

    /// Drives one event through the mirror.
    pub async fn handle(&mut self, event: BusinessEvent) -> Result<EventOutcome, AfterimageError> {
        self.mirror.handle_event(event).await
    }

    pub fn media_dir(&self) -> &Path {
        Path::new(&self.config.storage.media_dir)
    }

    /// Files currently in the media directory, sorted by name.
    pub fn media_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.media_dir())
            .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default();
        files.sort();
        files
    }
}
