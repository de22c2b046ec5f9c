use crate::editor::errors::EditError;
use crate::tree::{auto_format, display_path, FormatContext, Node, Segment};

/// A child about to be inserted: mappings take entries, sequences take items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewChild {
    Entry { key: String, value: Node },
    Item(Node),
}

impl NewChild {
    pub fn entry(key: impl Into<String>, value: Node) -> Self {
        NewChild::Entry {
            key: key.into(),
            value,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            NewChild::Entry { .. } => "a mapping entry",
            NewChild::Item(_) => "a sequence item",
        }
    }
}

/// Replace the child at `at`, returning the detached previous child.
///
/// An unplaced replacement takes over the layout of the node it replaces,
/// along with its comments when it brings none of its own.
pub fn replace(parent: &mut Node, at: &Segment, mut new: Node) -> Result<Node, EditError> {
    let current = locate(parent, at)?;
    if !new.format().is_placed() {
        let context = FormatContext::in_place_of(current, Some(parent));
        auto_format(&mut new, context);
        if new.format().comments.is_empty() {
            new.format_mut().comments = current.format().comments.clone();
        }
    }
    let slot = parent
        .child_mut(at)
        .ok_or_else(|| EditError::ChildNotFound {
            locator: at.to_string(),
        })?;
    Ok(std::mem::replace(slot, new))
}

/// Detach the child at `at`. Remaining siblings keep their relative order.
pub fn delete(parent: &mut Node, at: &Segment) -> Result<Node, EditError> {
    locate(parent, at)?;
    let removed = match (parent, at) {
        (Node::Mapping(mapping), Segment::Key(key)) => mapping.remove(key),
        (Node::Sequence(sequence), Segment::Index(index)) => sequence.remove(*index),
        _ => None,
    };
    removed.ok_or_else(|| EditError::ChildNotFound {
        locator: at.to_string(),
    })
}

pub fn insert_before(parent: &mut Node, at: &Segment, child: NewChild) -> Result<(), EditError> {
    let position = position_of(parent, at)?;
    insert_at(parent, position, child)
}

pub fn insert_after(parent: &mut Node, at: &Segment, child: NewChild) -> Result<(), EditError> {
    let position = position_of(parent, at)?;
    insert_at(parent, position + 1, child)
}

pub fn prepend(parent: &mut Node, child: NewChild) -> Result<(), EditError> {
    insert_at(parent, 0, child)
}

pub fn append(parent: &mut Node, child: NewChild) -> Result<(), EditError> {
    let len = parent.len();
    insert_at(parent, len, child)
}

/// Delete the node at `path` from the tree rooted at `root`.
pub fn delete_path(root: &mut Node, path: &[Segment]) -> Result<Node, EditError> {
    let (last, parent_path) = path.split_last().ok_or(EditError::RootDeletion)?;
    let parent = resolve_mut(root, parent_path)?;
    delete(parent, last)
}

/// Replace the node at `path`; an empty path replaces the whole tree.
pub fn replace_path(root: &mut Node, path: &[Segment], new: Node) -> Result<Node, EditError> {
    match path.split_last() {
        Some((last, parent_path)) => {
            let parent = resolve_mut(root, parent_path)?;
            replace(parent, last, new)
        }
        None => {
            let mut new = new;
            if !new.format().is_placed() {
                auto_format(&mut new, FormatContext::in_place_of(root, None));
            }
            Ok(std::mem::replace(root, new))
        }
    }
}

fn insert_at(parent: &mut Node, position: usize, child: NewChild) -> Result<(), EditError> {
    let context = FormatContext::for_child_of(parent);
    let kind = parent.kind();
    let describe = child.describe();
    match (parent, child) {
        (Node::Mapping(mapping), NewChild::Entry { key, mut value }) => {
            if mapping.contains_key(&key) {
                return Err(EditError::DuplicateKey { key });
            }
            if !value.format().is_placed() {
                auto_format(&mut value, context);
            }
            mapping.insert_at(position, key, value)
        }
        (Node::Sequence(sequence), NewChild::Item(mut item)) => {
            if !item.format().is_placed() {
                auto_format(&mut item, context);
            }
            sequence.insert(position, item);
            Ok(())
        }
        (Node::Scalar(_), _) => Err(EditError::NotAContainer { kind }),
        _ => Err(EditError::ChildKindMismatch {
            child: describe,
            kind,
        }),
    }
}

fn locate<'a>(parent: &'a Node, at: &Segment) -> Result<&'a Node, EditError> {
    let kind = parent.kind();
    match (parent, at) {
        (Node::Scalar(_), _) => Err(EditError::NotAContainer { kind }),
        (Node::Mapping(_), Segment::Index(_)) | (Node::Sequence(_), Segment::Key(_)) => {
            Err(EditError::LocatorMismatch {
                locator: at.to_string(),
                kind,
            })
        }
        _ => parent.child(at).ok_or_else(|| EditError::ChildNotFound {
            locator: at.to_string(),
        }),
    }
}

fn position_of(parent: &Node, at: &Segment) -> Result<usize, EditError> {
    locate(parent, at)?;
    match (parent, at) {
        (Node::Mapping(mapping), Segment::Key(key)) => {
            mapping.position(key).ok_or_else(|| EditError::ChildNotFound {
                locator: at.to_string(),
            })
        }
        (_, Segment::Index(index)) => Ok(*index),
        _ => Err(EditError::ChildNotFound {
            locator: at.to_string(),
        }),
    }
}

fn resolve_mut<'a>(root: &'a mut Node, path: &[Segment]) -> Result<&'a mut Node, EditError> {
    root.get_path_mut(path)
        .ok_or_else(|| EditError::PathNotFound {
            path: display_path(path),
        })
}
