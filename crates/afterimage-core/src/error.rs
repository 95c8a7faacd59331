// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Afterimage business mirror.

use thiserror::Error;

/// The primary error type used across all Afterimage adapter traits and engine operations.
#[derive(Debug, Error)]
pub enum AfterimageError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migrations).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging gateway errors (send failure, download failure, closed update stream).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Local media vault errors (writing or reading downloaded media).
    #[error("media error: {message}")]
    Media {
        message: String,
        source: Option<std::io::Error>,
    },

    /// A referenced entity does not exist (unknown connection, missing row).
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AfterimageError {
    /// Builds a gateway error without an underlying source.
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Gateway {
            message: message.into(),
            source: None,
        }
    }

    /// Returns `true` when the gateway reported that its update stream is gone.
    ///
    /// The event consumer stops on this condition instead of spinning.
    pub fn is_stream_closed(&self) -> bool {
        matches!(self, Self::Gateway { message, .. } if message.contains("closed"))
    }
}
