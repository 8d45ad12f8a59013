// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment and validation failures into miette diagnostics.
//!
//! Unknown keys get a "did you mean" hint and, when the offending file is
//! known, a label pointing at the key inside its `[section]`.

#![allow(unused_assignments)] // miette's Diagnostic derive trips this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a known key must beat to be offered as a hint.
const HINT_MIN_SCORE: f64 = 0.75;

/// A TOML document the loader read, kept so errors can point into it.
pub type SourceFile = (String, String);

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("`{section}{key}` is not a Duet setting")]
    #[diagnostic(code(duet::config::unknown_key))]
    UnknownKey {
        key: String,
        /// `"backend."` style prefix, empty for top-level keys.
        section: String,
        suggestion: Option<String>,
        #[help]
        hint: Option<String>,
        #[label("unrecognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` should be {expected}, found {found}")]
    #[diagnostic(code(duet::config::invalid_type))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
    },

    #[error("`{key}` is required")]
    #[diagnostic(code(duet::config::missing_key), help("set `{key}` in duet.toml"))]
    MissingKey { key: String },

    /// Parsed fine but breaks a rule between values.
    #[error("{message}")]
    #[diagnostic(code(duet::config::validation))]
    Validation { message: String },

    #[error("{0}")]
    #[diagnostic(code(duet::config::other))]
    Other(String),
}

/// Maps every error figment collected into a [`ConfigError`].
pub fn figment_to_config_errors(err: figment::Error, sources: &[SourceFile]) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match error.kind {
                Kind::UnknownField(ref key, known) => {
                    unknown_key(&error, key, known, &path, sources)
                }
                Kind::MissingField(ref key) => ConfigError::MissingKey {
                    key: dotted(&path, key),
                },
                Kind::InvalidType(ref found, ref expected) => ConfigError::InvalidType {
                    key: path.join("."),
                    found: found.to_string(),
                    expected: expected.clone(),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn unknown_key(
    error: &figment::Error,
    key: &str,
    known: &[&str],
    path: &[String],
    sources: &[SourceFile],
) -> ConfigError {
    let suggestion = closest_key(key, known);
    let hint = Some(match &suggestion {
        Some(close) => format!("did you mean `{close}`?"),
        None => format!("known keys here: {}", known.join(", ")),
    });

    let file = origin_file(error)
        .and_then(|origin| sources.iter().find(|(name, _)| *name == origin));
    let located = file.and_then(|(name, content)| {
        key_span(content, path.first().map(String::as_str), key)
            .map(|span| (span, NamedSource::new(name, content.clone())))
    });
    let (span, src) = located.unzip();

    ConfigError::UnknownKey {
        key: key.to_string(),
        section: path.iter().map(|p| format!("{p}.")).collect(),
        suggestion,
        hint,
        span,
        src,
    }
}

/// File the failing value came from. String-provided config reports as
/// `<inline>`.
fn origin_file(error: &figment::Error) -> Option<String> {
    match error.metadata.as_ref()?.source.as_ref() {
        Some(figment::Source::File(path)) => Some(path.display().to_string()),
        _ => Some("<inline>".to_string()),
    }
}

fn dotted(path: &[String], key: &str) -> String {
    path.iter()
        .map(String::as_str)
        .chain(std::iter::once(key))
        .collect::<Vec<_>>()
        .join(".")
}

/// Span of `key = ...` inside `[section]` (or before any header when
/// `section` is `None`).
pub fn key_span(content: &str, section: Option<&str>, key: &str) -> Option<SourceSpan> {
    let mut current: Option<&str> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            current = Some(header.trim());
        } else if current == section
            && let Some((lhs, _)) = trimmed.split_once('=')
            && lhs.trim() == key
        {
            let indent = line.len() - line.trim_start().len();
            return Some(SourceSpan::new((offset + indent).into(), key.len()));
        }
        offset += line.len();
    }

    None
}

/// Best-scoring known key above [`HINT_MIN_SCORE`].
pub fn closest_key(unknown: &str, known: &[&str]) -> Option<String> {
    let (score, key) = known
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .max_by(|a, b| a.0.total_cmp(&b.0))?;
    (score > HINT_MIN_SCORE).then(|| key.to_string())
}

/// Prints each error as a miette report on stderr.
pub fn render_errors(errors: Vec<ConfigError>) {
    for error in errors {
        eprintln!("{:?}", miette::Report::new(error));
    }
}
