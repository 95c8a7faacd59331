// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Afterimage integration tests.
//!
//! Provides a mock gateway, event fixtures, and test harness infrastructure
//! for fast, deterministic tests without a live bot.
//!
//! # Components
//!
//! - [`MockGateway`] - Mock bot gateway with event injection and send capture
//! - [`TestHarness`] - Mirror over a temp SQLite database and media directory
//! - [`fixtures`] - Event builders for one owner and one counterpart

pub mod fixtures;
pub mod harness;
pub mod mock_gateway;

pub use harness::TestHarness;
pub use mock_gateway::MockGateway;
