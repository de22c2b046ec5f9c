use crate::path::PathError;
use thiserror::Error;

/// A rule could not be built from its options.
#[derive(Error, Debug, Clone)]
pub enum RuleError {
    #[error("rule '{rule}': {source}")]
    Query {
        rule: String,
        #[source]
        source: PathError,
    },

    #[error("rule '{rule}': invalid pattern: {source}")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{rule}': {message}")]
    InvalidOption { rule: String, message: String },
}

impl RuleError {
    pub(crate) fn query(rule: &str) -> impl FnOnce(PathError) -> Self + '_ {
        move |source| RuleError::Query {
            rule: rule.to_string(),
            source,
        }
    }

    pub(crate) fn invalid(rule: &str, message: impl Into<String>) -> Self {
        RuleError::InvalidOption {
            rule: rule.to_string(),
            message: message.into(),
        }
    }
}
