// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Afterimage business mirror.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and diagnostic
//! error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use afterimage_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Media dir: {}", config.storage.media_dir);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    AfterimageConfig, DeletionConfig, MirrorConfig, ServiceConfig, StorageConfig, TelegramConfig,
};

/// Load configuration from the XDG hierarchy and validate it.
///
/// On failure the TOML sources are re-read so diagnostics can point at the
/// offending line.
pub fn load_and_validate() -> Result<AfterimageConfig, Vec<ConfigError>> {
    let config = loader::load_config()
        .map_err(|err| diagnostic::figment_to_config_errors(err, &collect_toml_sources()))?;
    validate_located(config, collect_toml_sources)
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<AfterimageConfig, Vec<ConfigError>> {
    let sources = || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    };
    let config = loader::load_config_from_path(path)
        .map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validate_located(config, sources)
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<AfterimageConfig, Vec<ConfigError>> {
    let sources = || vec![(INLINE_SOURCE.to_string(), toml_content.to_string())];
    let config = loader::load_config_from_str(toml_content)
        .map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validate_located(config, sources)
}

/// Name shown for configuration passed as a string.
pub const INLINE_SOURCE: &str = "<inline>";

fn validate_located(
    config: AfterimageConfig,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<AfterimageConfig, Vec<ConfigError>> {
    match validation::validate_config(&config) {
        Ok(()) => Ok(config),
        Err(mut errors) => {
            diagnostic::locate_rejected_values(&mut errors, &sources());
            Err(errors)
        }
    }
}

/// TOML files in the order the loader merges them.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    if let Ok(content) = std::fs::read_to_string(loader::SYSTEM_CONFIG) {
        sources.push((loader::SYSTEM_CONFIG.to_string(), content));
    }

    if let Some(path) = loader::user_config_path()
        && let Ok(content) = std::fs::read_to_string(&path)
    {
        sources.push((path.display().to_string(), content));
    }

    if let Ok(content) = std::fs::read_to_string(loader::LOCAL_CONFIG) {
        let path = std::env::current_dir()
            .map(|d| d.join(loader::LOCAL_CONFIG).display().to_string())
            .unwrap_or_else(|_| loader::LOCAL_CONFIG.to_string());
        sources.push((path, content));
    }

    sources
}
