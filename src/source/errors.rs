use crate::tree::ScalarKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("line {line}, column {column}: duplicate key '{key}'")]
    DuplicateKey {
        key: String,
        line: usize,
        column: usize,
    },

    #[error("line {line}, column {column}: invalid literal: {source}")]
    Literal {
        line: usize,
        column: usize,
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{path}: '{value}' cannot be written as {kind:?}")]
    UnrepresentableScalar {
        path: String,
        kind: ScalarKind,
        value: String,
    },

    #[error("rendered text no longer parses: {0}")]
    Reparse(#[source] SourceError),
}
