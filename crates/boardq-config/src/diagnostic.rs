// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment failures into miette diagnostics pointing at the offending
//! TOML key, with "did you mean?" hints for misspelled keys and enum values.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// One problem found while loading boardq configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that no section declares, e.g. `[queue] history_limt`.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(code(boardq::config::unknown_key), help("{help}"))]
    UnknownKey {
        /// Dotted path including the section, e.g. `queue.history_limt`.
        key: String,
        suggestion: Option<String>,
        help: String,
        #[label("not a boardq setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A string setting whose value is not one of the accepted names,
    /// e.g. `storage.backend = "postgres"`.
    #[error("unsupported value `{value}` for `{key}`")]
    #[diagnostic(code(boardq::config::unknown_variant), help("{help}"))]
    UnknownVariant {
        key: String,
        value: String,
        help: String,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(boardq::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    /// A value that parsed but is out of range or inconsistent.
    #[error("validation error: {message}")]
    #[diagnostic(code(boardq::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(boardq::config::other))]
    Other(String),
}

/// `section.field`, or just `field` at the top level.
fn dotted(error: &figment::error::Error, field: Option<&str>) -> String {
    let mut parts: Vec<&str> = error.path.iter().map(String::as_str).collect();
    if let Some(field) = field
        && parts.last() != Some(&field)
    {
        parts.push(field);
    }
    parts.join(".")
}

fn choice_help(suggestion: Option<&str>, choices: &[&str]) -> String {
    let choices = choices.join(", ");
    match suggestion {
        Some(s) => format!("did you mean `{s}`? accepted: {choices}"),
        None => format!("accepted: {choices}"),
    }
}

/// Converts a `figment::Error` (which may hold several errors) into diagnostics.
///
/// `toml_sources` pairs each file path with its content so unknown keys can
/// be underlined in place.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let suggestion = suggest_key(field, expected);
                let (span, src) = locate_key(&error, field, toml_sources);
                ConfigError::UnknownKey {
                    key: dotted(&error, Some(field)),
                    help: choice_help(suggestion.as_deref(), expected),
                    suggestion,
                    span,
                    src,
                }
            }
            Kind::UnknownVariant(value, expected) => ConfigError::UnknownVariant {
                key: dotted(&error, None),
                help: choice_help(suggest_key(value, expected).as_deref(), expected),
                value: value.clone(),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: dotted(&error, None),
                detail: format!("found {actual}"),
                expected: expected.to_string(),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// The file and byte span of an unknown key, when it came from a loaded TOML file.
fn locate_key(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let from_file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    let source = match from_file {
        Some(path) => toml_sources.iter().find(|(name, _)| *name == path),
        // Inline strings carry no file metadata.
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };
    let Some((name, content)) = source else {
        return (None, None);
    };

    let section = error.path.first().map(String::as_str);
    match find_key_offset(content, section, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` inside the `[section]` table of `content`, or among
/// the top-level keys when `section` is `None`.
pub fn find_key_offset(content: &str, section: Option<&str>, field: &str) -> Option<usize> {
    let start = match section {
        None => 0,
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            return None;
        }
        if let Some(after) = trimmed.strip_prefix(field)
            && matches!(after.chars().next(), Some(' ' | '\t' | '='))
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// The accepted name closest to `unknown`, if any is close enough.
pub fn suggest_key(unknown: &str, accepted: &[&str]) -> Option<String> {
    accepted
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Prints every error to stderr with miette's graphical handler, followed by
/// a one-line count.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        if handler.render_report(&mut buf, error as &dyn Diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("error: {error}");
        }
    }
    if errors.len() > 1 {
        eprintln!("boardq: {} configuration errors", errors.len());
    }
}
