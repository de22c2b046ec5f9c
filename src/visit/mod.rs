//! Depth-first traversal with an ancestor-chain cursor.
//!
//! Children are always visited before their parent's `leave` hook runs, so a
//! descendant can leave a note on an ancestor through the cursor and the
//! ancestor can act on it on the way back up.

pub mod cursor;
pub mod walk;

pub use cursor::{Cursor, MessageStore};
pub use walk::{walk, walk_ref, Rewrite, Visitor, WalkStats};
