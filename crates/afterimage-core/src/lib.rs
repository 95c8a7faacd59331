// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Afterimage business mirror.
//!
//! This crate provides the trait definitions, error type, and domain types
//! shared by the gateway, the storage backend, and the mirror engine.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::AfterimageError;
pub use types::{AdapterType, ChatId, HealthStatus, MessageId, UserId};

pub use traits::{MessagingGateway, OwnerDirectory, PluginAdapter, StorageAdapter};
