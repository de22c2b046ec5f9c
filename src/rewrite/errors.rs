use crate::editor::EditError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("the document root cannot be deleted")]
    RootDeletion,

    #[error("traversal lost track of {path}")]
    Detached { path: String },

    #[error("structural edit failed at {path}: {source}")]
    Edit {
        path: String,
        #[source]
        source: EditError,
    },

    #[error("rule '{rule}' failed: {message}")]
    Rule { rule: String, message: String },
}

impl RewriteError {
    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        RewriteError::Rule {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// A step failed on one document. The document is left as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{document}: step '{step}' failed: {source}")]
pub struct PipelineError {
    pub document: String,
    pub step: String,
    #[source]
    pub source: RewriteError,
}
