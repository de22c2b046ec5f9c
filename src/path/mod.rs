//! Path matcher: a JSONPath-like selection language evaluated against a
//! node's full ancestor chain.
//!
//! ```text
//! $.on.workflow_dispatch.inputs                       anchored keys
//! $.jobs.*.steps[:1].uses                             wildcard and slice
//! ..steps[?(@.uses =~ 'actions/setup-java@v.*')].with filter on a child value
//! ```

pub mod errors;
pub mod matcher;
pub mod query;

pub use errors::PathError;
pub use matcher::{find_all, has_match};
pub use query::{Condition, PathQuery, Step, Test};
