// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod directory;
pub mod gateway;
pub mod storage;

pub use adapter::PluginAdapter;
pub use directory::OwnerDirectory;
pub use gateway::MessagingGateway;
pub use storage::StorageAdapter;
