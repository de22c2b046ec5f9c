pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{apply_rules, discover_documents, ApplicationError, DocumentResult};
pub use loader::{
    build_pipeline, build_step, load_from_path, load_from_str, ConfigError, Origin, RuleSet,
};
pub use schema::{
    Metadata, RuleDefinition, RuleSetConfig, RuleSpec, ValidationError, ValidationIssue,
};
