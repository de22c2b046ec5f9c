use crate::tree::NodeKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("duplicate key '{key}' in mapping")]
    DuplicateKey { key: String },

    #[error("child not found: {locator}")]
    ChildNotFound { locator: String },

    #[error("cannot address {locator} inside a {kind}")]
    LocatorMismatch { locator: String, kind: NodeKind },

    #[error("a {kind} has no children to edit")]
    NotAContainer { kind: NodeKind },

    #[error("cannot place {child} into a {kind}")]
    ChildKindMismatch { child: &'static str, kind: NodeKind },

    #[error("the document root cannot be deleted")]
    RootDeletion,

    #[error("path does not resolve: {path}")]
    PathNotFound { path: String },
}
