//! Structural editor: insert, delete and replace children of a container
//! while keeping mapping keys unique and sequence order intact.
//!
//! Nodes that arrive without layout (built in memory or parsed from a
//! fragment) are auto-formatted against their new siblings on the way in.

pub mod errors;
pub mod ops;

pub use errors::EditError;
pub use ops::{
    append, delete, delete_path, insert_after, insert_before, prepend, replace, replace_path,
    NewChild,
};
