// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics rendered through miette.
//!
//! Figment parse failures and values rejected by validation both end up as
//! [`ConfigError`]s that point at the `afterimage.toml` line which set the
//! key and name the table it lives in.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Keys accepted in each table of `afterimage.toml`.
pub const SECTION_KEYS: &[(&str, &[&str])] = &[
    ("service", &["name", "log_level"]),
    ("telegram", &["bot_token"]),
    ("storage", &["database_path", "wal_mode", "media_dir"]),
    (
        "deletion",
        &["window_secs", "min_batch", "clear_ratio", "burst_threshold"],
    ),
    (
        "mirror",
        &[
            "event_timeout_secs",
            "max_delivery_attempts",
            "trial_days",
            "archive_max_embed_bytes",
            "welcome_on_connect",
        ],
    ),
];

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key the table does not define.
    #[error("unknown key `{key}` in {}", section_label(.section.as_deref()))]
    #[diagnostic(
        code(afterimage::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), belongs_in.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Table holding the key; `None` at the top level.
        section: Option<String>,
        /// Close match among the table's keys.
        suggestion: Option<String>,
        /// Another table that does define this key.
        belongs_in: Option<String>,
        valid_keys: String,
        #[label("not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong type.
    #[error("invalid type for `{key}`: {detail}")]
    #[diagnostic(code(afterimage::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(afterimage::config::missing_key),
        help("add `{key} = <value>` to afterimage.toml")
    )]
    MissingKey { key: String },

    /// A value that parsed but that the mirror cannot run with.
    #[error("`{key}` {problem}")]
    #[diagnostic(code(afterimage::config::invalid_value), help("{hint}"))]
    InvalidValue {
        /// Dotted key, e.g. `deletion.clear_ratio`.
        key: String,
        problem: String,
        hint: String,
        #[label("rejected value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("configuration error: {0}")]
    #[diagnostic(code(afterimage::config::other))]
    Other(String),
}

impl ConfigError {
    /// A rejected value, not yet located in any source file.
    pub fn invalid_value(key: &str, problem: impl Into<String>, hint: &str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            problem: problem.into(),
            hint: hint.to_string(),
            span: None,
            src: None,
        }
    }

    /// Dotted key the error is about, if it names one.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::UnknownKey { key, .. }
            | Self::InvalidType { key, .. }
            | Self::MissingKey { key }
            | Self::InvalidValue { key, .. } => Some(key.as_str()),
            Self::Other(_) => None,
        }
    }
}

fn section_label(section: Option<&str>) -> String {
    match section {
        Some(section) => format!("[{section}]"),
        None => "the top level".to_string(),
    }
}

fn unknown_key_help(
    suggestion: Option<&str>,
    belongs_in: Option<&str>,
    valid_keys: &str,
) -> String {
    match (suggestion, belongs_in) {
        (Some(s), _) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        (None, Some(section)) => format!("this key belongs in [{section}]"),
        (None, None) => format!("valid keys: {valid_keys}"),
    }
}

/// Finds the table, other than `section`, that defines `key`.
pub fn home_section(key: &str, section: Option<&str>) -> Option<&'static str> {
    SECTION_KEYS
        .iter()
        .find(|(name, keys)| Some(*name) != section && keys.contains(&key))
        .map(|(name, _)| *name)
}

/// Convert a `figment::Error` into a list of `ConfigError` diagnostics.
///
/// `toml_sources` holds `(path, content)` pairs in merge order.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    let mut errors = Vec::new();

    for error in err {
        let path: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
        let origin = error_origin(&error);

        let config_error = match &error.kind {
            Kind::UnknownField(field, expected) => {
                let section = path.first().filter(|s| *s != field).cloned();
                let valid_keys: Vec<&str> = expected.to_vec();
                let suggestion = suggest_key(field, &valid_keys);
                let belongs_in = home_section(field, section.as_deref()).map(str::to_string);
                let (span, src) =
                    find_in_sources(section.as_deref(), field, origin.as_deref(), toml_sources)
                        .map_or((None, None), |found| found.labelled(field.len()));

                ConfigError::UnknownKey {
                    key: field.clone(),
                    section,
                    suggestion,
                    belongs_in,
                    valid_keys: valid_keys.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.clone().into_owned(),
            },
            Kind::InvalidType(actual, expected) => {
                let key = path.join(".");
                let (section, field) = split_key(&key);
                let (span, src) =
                    find_in_sources(section, field, origin.as_deref(), toml_sources)
                        .map_or((None, None), |found| found.labelled(found.assignment_len()));
                ConfigError::InvalidType {
                    key,
                    detail: format!("found {actual}, expected {expected}"),
                    expected: expected.to_string(),
                    span,
                    src,
                }
            }
            _ => ConfigError::Other(format!("{error}")),
        };

        errors.push(config_error);
    }

    errors
}

/// Points each rejected value at the line that set it.
pub fn locate_rejected_values(errors: &mut [ConfigError], toml_sources: &[(String, String)]) {
    for error in errors.iter_mut() {
        if let ConfigError::InvalidValue { key, span, src, .. } = error
            && span.is_none()
        {
            let (section, field) = split_key(key);
            if let Some(found) = find_in_sources(section, field, None, toml_sources) {
                (*span, *src) = found.labelled(found.assignment_len());
            }
        }
    }
}

/// A key found in one of the TOML sources.
struct Found<'a> {
    path: &'a str,
    content: &'a str,
    offset: usize,
}

impl Found<'_> {
    fn labelled(&self, len: usize) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        (
            Some(SourceSpan::new(self.offset.into(), len)),
            Some(NamedSource::new(self.path, self.content.to_string())),
        )
    }

    /// Length of `key = value` up to a trailing comment.
    fn assignment_len(&self) -> usize {
        let line = self.content[self.offset..].lines().next().unwrap_or_default();
        let code = line.split_once(" #").map_or(line, |(code, _)| code);
        code.trim_end().len()
    }
}

fn error_origin(error: &figment::Error) -> Option<String> {
    error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        })
}

fn split_key(key: &str) -> (Option<&str>, &str) {
    match key.split_once('.') {
        Some((section, field)) => (Some(section), field),
        None => (None, key),
    }
}

/// Searches the sources for `field`, latest first since it wins the merge.
fn find_in_sources<'a>(
    section: Option<&str>,
    field: &str,
    origin: Option<&str>,
    toml_sources: &'a [(String, String)],
) -> Option<Found<'a>> {
    toml_sources
        .iter()
        .rev()
        .filter(|(path, _)| origin.is_none_or(|o| o == path.as_str()))
        .find_map(|(path, content)| {
            Some(Found {
                path,
                content,
                offset: find_key_offset(content, section, field)?,
            })
        })
}

/// Byte offset of `field` inside `[section]` (or the top level), stopping
/// at the next table header.
///
/// A top-level `field` also matches a `[field]` header, pointing inside the
/// brackets.
pub fn find_key_offset(content: &str, section: Option<&str>, field: &str) -> Option<usize> {
    let start = match section {
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        if let Some(header) = trimmed.strip_prefix('[') {
            if section.is_none() && header.strip_prefix(field).is_some_and(|r| r.starts_with(']')) {
                return Some(offset + indent + 1);
            }
            if section.is_some() {
                return None;
            }
        } else if let Some(after) = trimmed.strip_prefix(field)
            && after.trim_start().starts_with('=')
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }

    None
}

/// Suggest a similar key name using Jaro-Winkler string similarity.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    let mut best_score = SUGGESTION_THRESHOLD;
    let mut best_match = None;

    for &key in valid_keys {
        let score = strsim::jaro_winkler(unknown, key);
        if score > best_score {
            best_score = score;
            best_match = Some(key.to_string());
        }
    }

    best_match
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
