//! Flowpatch: rule-based, structure-aware rewriting of CI workflow and
//! dependency-manager documents.
//!
//! A document is parsed into a [`Node`] tree. Rules select nodes with a
//! JSONPath-like [`PathQuery`], decide per node whether to keep, replace or
//! delete it, and a [`Pipeline`] runs them in order over every document.
//! Rewritten documents are written back over their original text, so only
//! what a rule changed moves.
//!
//! # Architecture
//!
//! - [`tree`]: ordered mappings, sequences and scalars with layout metadata
//! - [`source`]: span-aware parsing and layout-preserving rendering
//! - [`path`]: query parsing and ancestor-chain matching
//! - [`visit`]: depth-first walk with a cursor and a scoped message store
//! - [`editor`]: structural insert, delete and replace with auto-format
//! - [`rewrite`]: steps, collect-then-mutate analyses and the pipeline
//! - [`rules`]: the built-in rule catalogue
//! - [`config`]: TOML rule sets and applying them to files
//!
//! # Example
//!
//! ```
//! use flowpatch::{rules, Document, Node, Pipeline};
//! use serde_json::json;
//!
//! let pipeline = Pipeline::new()
//!     .with_step(rules::change_action_version("checkout", "actions/checkout", "v4").unwrap());
//! let root = Node::from_json(&json!({
//!     "jobs": {"build": {"steps": [{"uses": "actions/checkout@v2"}]}}
//! }));
//!
//! let output = pipeline.run(&Document::new("ci.json", root)).unwrap();
//! assert_eq!(output.changed_by, ["checkout"]);
//! ```

pub mod config;
pub mod editor;
pub mod output;
pub mod path;
pub mod rewrite;
pub mod rules;
pub mod source;
pub mod tree;
pub mod visit;

// Re-exports
pub use config::{
    apply_rules, build_pipeline, load_from_path, load_from_str, ApplicationError, ConfigError,
    DocumentResult, RuleSet, RuleSetConfig,
};
pub use editor::EditError;
pub use path::{find_all, has_match, PathError, PathQuery};
pub use rewrite::{Pipeline, PipelineError, PipelineOutput, RewriteError, RewriteStep, Step};
pub use rules::RuleError;
pub use source::{RenderError, SourceDocument};
pub use tree::{Document, Mapping, Node, Scalar, Segment, Sequence};
pub use visit::{walk, Cursor, Rewrite, Visitor};
