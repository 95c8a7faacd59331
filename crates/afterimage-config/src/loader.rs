// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./afterimage.toml` > `~/.config/afterimage/afterimage.toml`
//! > `/etc/afterimage/afterimage.toml` with environment variable overrides via
//! the `AFTERIMAGE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::AfterimageConfig;

pub(crate) const LOCAL_CONFIG: &str = "afterimage.toml";
pub(crate) const SYSTEM_CONFIG: &str = "/etc/afterimage/afterimage.toml";

/// Top-level sections recognized in `AFTERIMAGE_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &["service", "telegram", "storage", "deletion", "mirror"];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("afterimage").join(LOCAL_CONFIG))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/afterimage/afterimage.toml`
/// 3. `~/.config/afterimage/afterimage.toml`
/// 4. `./afterimage.toml`
/// 5. `AFTERIMAGE_*` environment variables
pub fn load_config() -> Result<AfterimageConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<AfterimageConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AfterimageConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AfterimageConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AfterimageConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment without extracting it.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(AfterimageConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Environment provider mapping `AFTERIMAGE_SECTION_KEY` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")`: `AFTERIMAGE_STORAGE_MEDIA_DIR`
/// must become `storage.media_dir`, not `storage.media.dir`.
fn env_provider() -> Env {
    Env::prefixed("AFTERIMAGE_").map(|key| {
        // Figment passes the key with its original (uppercase) casing.
        let key_str = key.as_str().to_ascii_lowercase();
        for section in ENV_SECTIONS {
            if let Some(rest) = key_str
                .strip_prefix(section)
                .and_then(|r| r.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.into()
    })
}
