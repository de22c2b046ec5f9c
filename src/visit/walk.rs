use crate::editor;
use crate::rewrite::RewriteError;
use crate::tree::{display_path, Node, Segment};
use crate::visit::cursor::{Cursor, MessageStore};
use std::ops::AddAssign;
use tracing::trace;

/// What a visit decided to do with the node it was shown.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a Rewrite does nothing unless returned to the traversal"]
pub enum Rewrite {
    Unchanged,
    Replace(Node),
    /// Remove the node from its parent mapping or sequence.
    Delete,
}

/// Hooks run by [`walk`]. `enter` runs before the children are visited,
/// `leave` after all of them, which is where notes left by descendants are read.
pub trait Visitor {
    fn enter(&mut self, _node: &Node, _cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        Ok(Rewrite::Unchanged)
    }

    fn leave(&mut self, _node: &Node, _cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        Ok(Rewrite::Unchanged)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub visited: usize,
    pub replaced: usize,
    pub deleted: usize,
}

impl WalkStats {
    pub fn changed(&self) -> bool {
        self.replaced + self.deleted > 0
    }
}

impl AddAssign for WalkStats {
    fn add_assign(&mut self, other: Self) {
        self.visited += other.visited;
        self.replaced += other.replaced;
        self.deleted += other.deleted;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Kept,
    Deleted,
}

/// Depth-first traversal in physical order with write access through
/// [`Rewrite`] results.
///
/// A replacement returned from `enter` is walked in place of the original
/// node; later siblings are visited against the already-edited tree.
pub fn walk<V: Visitor + ?Sized>(
    root: &mut Node,
    visitor: &mut V,
) -> Result<WalkStats, RewriteError> {
    let mut messages = MessageStore::new();
    let mut path = Vec::new();
    let mut stats = WalkStats::default();
    walk_node(root, &mut path, visitor, &mut messages, &mut stats)?;
    Ok(stats)
}

/// Read-only traversal, used by collection passes.
pub fn walk_ref<'t, F>(root: &'t Node, mut visit: F)
where
    F: FnMut(&'t Node, &Cursor<'_>),
{
    let mut messages = MessageStore::new();
    let mut path = Vec::new();
    visit_ref(root, root, &mut path, &mut messages, &mut visit);
}

fn walk_node<V: Visitor + ?Sized>(
    root: &mut Node,
    path: &mut Vec<Segment>,
    visitor: &mut V,
    messages: &mut MessageStore,
    stats: &mut WalkStats,
) -> Result<Outcome, RewriteError> {
    stats.visited += 1;

    let rewrite = {
        let tree: &Node = root;
        let node = tree.get_path(path).ok_or_else(|| detached(path))?;
        let mut cursor = Cursor::new(tree, path, messages);
        visitor.enter(node, &mut cursor)?
    };
    if apply(root, path, rewrite, messages, stats)? == Outcome::Deleted {
        return Ok(Outcome::Deleted);
    }

    let mut position = 0;
    loop {
        let node = root.get_path(path).ok_or_else(|| detached(path))?;
        let Some(segment) = node.child_segment(position) else {
            break;
        };
        path.push(segment);
        let outcome = walk_node(root, path, visitor, messages, stats);
        path.pop();
        if outcome? == Outcome::Kept {
            position += 1;
        }
    }

    let rewrite = {
        let tree: &Node = root;
        let node = tree.get_path(path).ok_or_else(|| detached(path))?;
        let mut cursor = Cursor::new(tree, path, messages);
        visitor.leave(node, &mut cursor)?
    };
    let outcome = apply(root, path, rewrite, messages, stats)?;
    messages.clear_scope(path);
    Ok(outcome)
}

fn apply(
    root: &mut Node,
    path: &[Segment],
    rewrite: Rewrite,
    messages: &mut MessageStore,
    stats: &mut WalkStats,
) -> Result<Outcome, RewriteError> {
    match rewrite {
        Rewrite::Unchanged => Ok(Outcome::Kept),
        Rewrite::Replace(new) => {
            let previous =
                editor::replace_path(root, path, new).map_err(|source| edit_error(path, source))?;
            let current = root.get_path(path).ok_or_else(|| detached(path))?;
            if previous != *current {
                stats.replaced += 1;
                trace!(path = %display_path(path), "replaced node");
            }
            Ok(Outcome::Kept)
        }
        Rewrite::Delete => {
            if path.is_empty() {
                return Err(RewriteError::RootDeletion);
            }
            editor::delete_path(root, path).map_err(|source| edit_error(path, source))?;
            messages.clear_scope(path);
            stats.deleted += 1;
            trace!(path = %display_path(path), "deleted node");
            Ok(Outcome::Deleted)
        }
    }
}

fn visit_ref<'t, F>(
    root: &'t Node,
    node: &'t Node,
    path: &mut Vec<Segment>,
    messages: &mut MessageStore,
    visit: &mut F,
) where
    F: FnMut(&'t Node, &Cursor<'_>),
{
    {
        let cursor = Cursor::new(root, path, messages);
        visit(node, &cursor);
    }
    for position in 0..node.len() {
        let Some(segment) = node.child_segment(position) else {
            break;
        };
        let Some(child) = node.child(&segment) else {
            continue;
        };
        path.push(segment);
        visit_ref(root, child, path, messages, visit);
        path.pop();
    }
}

fn detached(path: &[Segment]) -> RewriteError {
    RewriteError::Detached {
        path: display_path(path),
    }
}

fn edit_error(path: &[Segment], source: editor::EditError) -> RewriteError {
    RewriteError::Edit {
        path: display_path(path),
        source,
    }
}
