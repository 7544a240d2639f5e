//! Error types for archive loading and result rollups.
//!
//! Orchestration code in `main` works with `anyhow`; these enums are the
//! typed failures raised by the pipeline stages themselves.

use thiserror::Error;

/// Failures while turning a classified archive into actor trees.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("unexpected {found} at '{path}': expected a record list or a nested mapping")]
    UnexpectedLeaf { path: String, found: &'static str },

    #[error("record {index} at '{path}' is missing field '{field}'")]
    MissingField {
        path: String,
        index: usize,
        field: &'static str,
    },

    #[error("record {index} at '{path}' has an invalid '{field}': {reason}")]
    InvalidField {
        path: String,
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("unknown category '{0}' (expected posts, comments or messages)")]
    UnknownCategory(String),

    #[error("{category} archive has an unexpected shape at '{path}': {reason}")]
    Shape {
        category: String,
        path: String,
        reason: String,
    },
}

/// Contract violations inside the rollup engine.
#[derive(Debug, Error)]
pub enum RollupError {
    #[error("cannot merge a {found} leaf into a {expected} leaf at '{path}'")]
    KindMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot merge a {found} node into a {expected} node at '{path}'")]
    ShapeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("unknown map kind '{0}'")]
    UnknownMapKind(String),

    #[error("map kind '{kind}' cannot reduce a {leaf} leaf")]
    Irreducible { kind: String, leaf: &'static str },
}
