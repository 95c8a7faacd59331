// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, positive thresholds, and a bounded clear ratio.

use crate::diagnostic::ConfigError;
use crate::model::AfterimageConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &AfterimageConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut reject = |key: &str, problem: String, hint: &str| {
        errors.push(ConfigError::invalid_value(key, problem, hint));
    };

    if !LOG_LEVELS.contains(&config.service.log_level.trim().to_ascii_lowercase().as_str()) {
        reject(
            "service.log_level",
            format!("`{}` is not a log level", config.service.log_level),
            "use one of trace, debug, info, warn, error",
        );
    }

    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        reject(
            "telegram.bot_token",
            "must not be empty when set".to_string(),
            "remove the key or set AFTERIMAGE_TELEGRAM_BOT_TOKEN",
        );
    }

    if config.storage.database_path.trim().is_empty() {
        reject(
            "storage.database_path",
            "must not be empty".to_string(),
            "point it at the SQLite file holding the shadow store",
        );
    }

    if config.storage.media_dir.trim().is_empty() {
        reject(
            "storage.media_dir",
            "must not be empty".to_string(),
            "point it at the directory for downloaded attachments",
        );
    }

    let deletion = &config.deletion;
    if deletion.window_secs == 0 {
        reject(
            "deletion.window_secs",
            "must be greater than 0".to_string(),
            "seconds over which deletions in one chat are grouped, 10 by default",
        );
    }
    if deletion.min_batch == 0 {
        reject(
            "deletion.min_batch",
            "must be at least 1".to_string(),
            "smallest deletion batch that can count as a chat clear, 2 by default",
        );
    }
    if !(deletion.clear_ratio > 0.0 && deletion.clear_ratio <= 1.0) {
        reject(
            "deletion.clear_ratio",
            format!("must be in (0, 1], got {}", deletion.clear_ratio),
            "share of a chat's stored messages a batch must exceed to count as a clear, 0.2 by default",
        );
    }
    if deletion.burst_threshold == 0 {
        reject(
            "deletion.burst_threshold",
            "must be at least 1".to_string(),
            "deletions within the window that count as a clear, 3 by default",
        );
    }

    let mirror = &config.mirror;
    if mirror.event_timeout_secs == 0 {
        reject(
            "mirror.event_timeout_secs",
            "must be greater than 0".to_string(),
            "upper bound in seconds for handling one update",
        );
    }
    if mirror.max_delivery_attempts == 0 {
        reject(
            "mirror.max_delivery_attempts",
            "must be at least 1".to_string(),
            "how often a deletion notice is tried before its row is dropped",
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| e.key().is_some_and(|key| key.ends_with(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = AfterimageConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = AfterimageConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn clear_ratio_out_of_range_fails_validation() {
        let mut config = AfterimageConfig::default();
        config.deletion.clear_ratio = 0.0;
        assert!(has_message(&validate_config(&config).unwrap_err(), "clear_ratio"));

        config.deletion.clear_ratio = 1.5;
        assert!(has_message(&validate_config(&config).unwrap_err(), "clear_ratio"));

        config.deletion.clear_ratio = f64::NAN;
        assert!(has_message(&validate_config(&config).unwrap_err(), "clear_ratio"));

        config.deletion.clear_ratio = 1.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_thresholds_are_all_reported() {
        let mut config = AfterimageConfig::default();
        config.deletion.window_secs = 0;
        config.deletion.min_batch = 0;
        config.deletion.burst_threshold = 0;
        config.mirror.max_delivery_attempts = 0;
        config.mirror.event_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(has_message(&errors, "window_secs"));
        assert!(has_message(&errors, "min_batch"));
        assert!(has_message(&errors, "burst_threshold"));
        assert!(has_message(&errors, "max_delivery_attempts"));
        assert!(has_message(&errors, "event_timeout_secs"));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = AfterimageConfig::default();
        config.service.log_level = "verbose".to_string();
        assert!(has_message(&validate_config(&config).unwrap_err(), "log_level"));

        config.service.log_level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn blank_bot_token_fails_validation() {
        let mut config = AfterimageConfig::default();
        config.telegram.bot_token = Some("   ".to_string());
        assert!(has_message(&validate_config(&config).unwrap_err(), "bot_token"));
    }

    #[test]
    fn deletion_section_deny_unknown_fields() {
        let toml_str = r#"
[deletion]
window_secs = 5
max_ratio = 0.5
"#;
        let result = toml::from_str::<AfterimageConfig>(toml_str);
        assert!(result.is_err());
    }
}
