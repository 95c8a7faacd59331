// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules for the shadow-store tables.

pub mod connections;
pub mod messages;
pub mod stats;
pub mod subscriptions;
