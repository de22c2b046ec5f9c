use crate::tree::{Node, NodeKind, Segment};
use std::any::Any;
use std::collections::HashMap;

/// Notes left on nodes during one traversal, keyed by the node's path.
///
/// A note on a node is dropped once that node has been left, so nothing
/// outlives the subtree it was written for.
#[derive(Default)]
pub struct MessageStore {
    messages: HashMap<(Vec<Segment>, &'static str), Box<dyn Any>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn put<T: Any>(&mut self, path: &[Segment], key: &'static str, value: T) {
        self.messages.insert((path.to_vec(), key), Box::new(value));
    }

    fn get<T: Any>(&self, path: &[Segment], key: &'static str) -> Option<&T> {
        self.messages
            .get(&(path.to_vec(), key))
            .and_then(|value| value.downcast_ref::<T>())
    }

    fn take<T: Any>(&mut self, path: &[Segment], key: &'static str) -> Option<T> {
        let boxed = self.messages.remove(&(path.to_vec(), key))?;
        boxed.downcast::<T>().ok().map(|value| *value)
    }

    /// Drop every note on `path` and below it.
    pub(crate) fn clear_scope(&mut self, path: &[Segment]) {
        if self.messages.is_empty() {
            return;
        }
        self.messages
            .retain(|(owner, _), _| !owner.starts_with(path));
    }
}

impl std::fmt::Debug for MessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStore")
            .field("len", &self.messages.len())
            .finish()
    }
}

/// View of the node being visited and its ancestors.
///
/// Cursors are rebuilt for every callback, so ancestors are always read from
/// the tree as it currently stands.
pub struct Cursor<'a> {
    root: &'a Node,
    path: &'a [Segment],
    messages: &'a mut MessageStore,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(root: &'a Node, path: &'a [Segment], messages: &'a mut MessageStore) -> Self {
        Self {
            root,
            path,
            messages,
        }
    }

    pub fn root(&self) -> &'a Node {
        self.root
    }

    pub fn path(&self) -> &'a [Segment] {
        self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// The segment leading from the parent to this node.
    pub fn segment(&self) -> Option<&'a Segment> {
        self.path.last()
    }

    /// The mapping key under which this node sits, if its parent is a mapping.
    pub fn key(&self) -> Option<&'a str> {
        self.segment().and_then(Segment::key)
    }

    pub fn node(&self) -> Option<&'a Node> {
        self.root.get_path(self.path)
    }

    pub fn parent(&self) -> Option<&'a Node> {
        self.ancestor(1)
    }

    /// The ancestor `levels` steps up; `ancestor(0)` is the node itself.
    pub fn ancestor(&self, levels: usize) -> Option<&'a Node> {
        let depth = self.path.len().checked_sub(levels)?;
        self.root.get_path(&self.path[..depth])
    }

    /// Ancestors from nearest to the root, each with its own path.
    pub fn ancestors(&self) -> impl Iterator<Item = (&'a [Segment], &'a Node)> + '_ {
        let root = self.root;
        let path = self.path;
        (0..path.len()).rev().filter_map(move |depth| {
            let ancestor = &path[..depth];
            root.get_path(ancestor).map(|node| (ancestor, node))
        })
    }

    /// Path of the nearest ancestor (excluding this node) accepted by `predicate`.
    pub fn nearest_ancestor(&self, predicate: impl Fn(&Node) -> bool) -> Option<&'a [Segment]> {
        self.ancestors()
            .find(|(_, node)| predicate(node))
            .map(|(path, _)| path)
    }

    pub fn nearest_ancestor_of_kind(&self, kind: NodeKind) -> Option<&'a [Segment]> {
        self.nearest_ancestor(|node| node.kind() == kind)
    }

    /// Leave a note on the current node.
    pub fn put_message<T: Any>(&mut self, key: &'static str, value: T) {
        self.messages.put(self.path, key, value);
    }

    /// Leave a note on the nearest ancestor accepted by `predicate`, to be
    /// read back when that ancestor is left. Returns `false` if none exists.
    pub fn put_message_on_nearest<T: Any>(
        &mut self,
        predicate: impl Fn(&Node) -> bool,
        key: &'static str,
        value: T,
    ) -> bool {
        match self.nearest_ancestor(predicate) {
            Some(path) => {
                self.messages.put(path, key, value);
                true
            }
            None => false,
        }
    }

    /// A note left on the current node.
    pub fn message<T: Any>(&self, key: &'static str) -> Option<&T> {
        self.messages.get(self.path, key)
    }

    /// A note on the current node or, failing that, the nearest ancestor carrying one.
    pub fn nearest_message<T: Any>(&self, key: &'static str) -> Option<&T> {
        (0..=self.path.len())
            .rev()
            .find_map(|depth| self.messages.get(&self.path[..depth], key))
    }

    /// Remove and return a note left on the current node.
    pub fn take_message<T: Any>(&mut self, key: &'static str) -> Option<T> {
        self.messages.take(self.path, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(name: &str) -> Segment {
        Segment::Key(name.to_string())
    }

    #[test]
    fn ancestors_are_nearest_first() {
        let root = Node::from_json(&json!({"jobs": {"build": {"steps": [{"uses": "x"}]}}}));
        let path = vec![key("jobs"), key("build"), key("steps"), Segment::Index(0), key("uses")];
        let mut store = MessageStore::new();
        let cursor = Cursor::new(&root, &path, &mut store);

        let kinds: Vec<NodeKind> = cursor.ancestors().map(|(_, node)| node.kind()).collect();
        assert_eq!(
            kinds,
            [
                NodeKind::Mapping,
                NodeKind::Sequence,
                NodeKind::Mapping,
                NodeKind::Mapping,
                NodeKind::Mapping
            ]
        );
        assert_eq!(cursor.key(), Some("uses"));
        assert_eq!(cursor.node().and_then(Node::as_str), Some("x"));
        assert_eq!(
            cursor.nearest_ancestor_of_kind(NodeKind::Sequence),
            Some(&path[..3])
        );
    }

    #[test]
    fn messages_flow_to_ancestors_and_clear_by_scope() {
        let root = Node::from_json(&json!({"a": {"b": {"c": 1}}}));
        let leaf = vec![key("a"), key("b"), key("c")];
        let mut store = MessageStore::new();

        let mut cursor = Cursor::new(&root, &leaf, &mut store);
        let holds_c = |node: &Node| node.as_mapping().is_some_and(|m| m.contains_key("c"));
        assert!(cursor.put_message_on_nearest(holds_c, "MARK", true));
        assert_eq!(cursor.nearest_message::<bool>("MARK"), Some(&true));
        assert_eq!(cursor.message::<bool>("MARK"), None);

        let parent = vec![key("a"), key("b")];
        let mut cursor = Cursor::new(&root, &parent, &mut store);
        assert_eq!(cursor.message::<bool>("MARK"), Some(&true));
        assert_eq!(cursor.message::<String>("MARK"), None);
        assert_eq!(cursor.take_message::<bool>("MARK"), Some(true));
        assert!(store.is_empty());

        let mut cursor = Cursor::new(&root, &leaf, &mut store);
        cursor.put_message("DEEP", 1u8);
        store.clear_scope(&parent);
        assert!(store.is_empty());
    }
}
