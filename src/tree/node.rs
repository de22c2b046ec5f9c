use crate::editor::EditError;
use crate::tree::format::Format;
use std::fmt;

/// One step from a node to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    pub fn key(&self) -> Option<&str> {
        match self {
            Segment::Key(key) => Some(key),
            Segment::Index(_) => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Segment::Key(_) => None,
            Segment::Index(index) => Some(*index),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, ".{key}"),
            Segment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Render a path the way queries are written, e.g. `$.jobs.build.steps[0]`.
pub fn display_path(path: &[Segment]) -> String {
    let mut out = String::from("$");
    for segment in path {
        out.push_str(&segment.to_string());
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Mapping,
    Sequence,
    Scalar,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Mapping => write!(f, "mapping"),
            NodeKind::Sequence => write!(f, "sequence"),
            NodeKind::Scalar => write!(f, "scalar"),
        }
    }
}

/// A node of a parsed document. Children are owned exclusively by their parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Mapping(Mapping),
    Sequence(Sequence),
    Scalar(Scalar),
}

impl Node {
    /// A plain string scalar with no formatting decided yet.
    pub fn string(value: impl Into<String>) -> Self {
        Node::Scalar(Scalar::new(value))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Mapping(_) => NodeKind::Mapping,
            Node::Sequence(_) => NodeKind::Sequence,
            Node::Scalar(_) => NodeKind::Scalar,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Node::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self {
            Node::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Text of a scalar node; `None` for containers.
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().map(Scalar::value)
    }

    pub fn format(&self) -> &Format {
        match self {
            Node::Mapping(mapping) => &mapping.format,
            Node::Sequence(sequence) => &sequence.format,
            Node::Scalar(scalar) => &scalar.format,
        }
    }

    pub fn format_mut(&mut self) -> &mut Format {
        match self {
            Node::Mapping(mapping) => &mut mapping.format,
            Node::Sequence(sequence) => &mut sequence.format,
            Node::Scalar(scalar) => &mut scalar.format,
        }
    }

    /// Number of direct children (always 0 for scalars).
    pub fn len(&self) -> usize {
        match self {
            Node::Mapping(mapping) => mapping.len(),
            Node::Sequence(sequence) => sequence.len(),
            Node::Scalar(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn child(&self, segment: &Segment) -> Option<&Node> {
        match (self, segment) {
            (Node::Mapping(mapping), Segment::Key(key)) => mapping.get(key),
            (Node::Sequence(sequence), Segment::Index(index)) => sequence.get(*index),
            _ => None,
        }
    }

    pub fn child_mut(&mut self, segment: &Segment) -> Option<&mut Node> {
        match (self, segment) {
            (Node::Mapping(mapping), Segment::Key(key)) => mapping.get_mut(key),
            (Node::Sequence(sequence), Segment::Index(index)) => sequence.get_mut(*index),
            _ => None,
        }
    }

    /// The segment addressing the child at physical position `position`.
    pub fn child_segment(&self, position: usize) -> Option<Segment> {
        match self {
            Node::Mapping(mapping) => mapping
                .entries
                .get(position)
                .map(|entry| Segment::Key(entry.key.clone())),
            Node::Sequence(sequence) => {
                (position < sequence.len()).then_some(Segment::Index(position))
            }
            Node::Scalar(_) => None,
        }
    }

    pub fn get_path(&self, path: &[Segment]) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub fn get_path_mut(&mut self, path: &[Segment]) -> Option<&mut Node> {
        let mut node = self;
        for segment in path {
            node = node.child_mut(segment)?;
        }
        Some(node)
    }

    /// Look up a dotted chain of mapping keys, e.g. `["with", "distribution"]`.
    pub fn get_keys<S: AsRef<str>>(&self, keys: &[S]) -> Option<&Node> {
        keys.iter().try_fold(self, |node, key| {
            node.as_mapping().and_then(|mapping| mapping.get(key.as_ref()))
        })
    }
}

/// Ordered key/value container. Keys are unique among siblings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    entries: Vec<Entry>,
    pub format: Format,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    key: String,
    pub value: Node,
}

impl Entry {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical empty mapping (`{}`).
    pub fn empty_flow() -> Self {
        Self {
            entries: Vec::new(),
            format: Format {
                flow: true,
                ..Format::default()
            },
        }
    }

    /// Build a mapping from key/value pairs, rejecting repeated keys.
    pub fn from_entries<K, I>(entries: I) -> Result<Self, EditError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        let mut mapping = Self::new();
        for (key, value) in entries {
            mapping.push(key, value)?;
        }
        Ok(mapping)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.entries.iter_mut().map(|entry| &mut entry.value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|entry| entry.key == key)
            .map(|entry| &mut entry.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key == key)
    }

    pub fn insert_at(
        &mut self,
        position: usize,
        key: impl Into<String>,
        value: Node,
    ) -> Result<(), EditError> {
        let key = key.into();
        if self.contains_key(&key) {
            return Err(EditError::DuplicateKey { key });
        }
        let position = position.min(self.entries.len());
        self.entries.insert(position, Entry { key, value });
        Ok(())
    }

    pub fn push(&mut self, key: impl Into<String>, value: Node) -> Result<(), EditError> {
        let len = self.entries.len();
        self.insert_at(len, key, value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let position = self.position(key)?;
        Some(self.entries.remove(position).value)
    }

    /// Rename a key in place, keeping its position.
    pub fn rename(&mut self, from: &str, to: impl Into<String>) -> Result<(), EditError> {
        let to = to.into();
        if from == to {
            return Ok(());
        }
        if self.contains_key(&to) {
            return Err(EditError::DuplicateKey { key: to });
        }
        let position = self.position(from).ok_or_else(|| EditError::ChildNotFound {
            locator: Segment::Key(from.to_string()).to_string(),
        })?;
        self.entries[position].key = to;
        Ok(())
    }
}

/// Positionally ordered list of nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    items: Vec<Node>,
    pub format: Format,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = Node>) -> Self {
        Self {
            items: items.into_iter().collect(),
            format: Format::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Node] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [Node] {
        &mut self.items
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.items.get_mut(index)
    }

    pub fn insert(&mut self, index: usize, node: Node) {
        let index = index.min(self.items.len());
        self.items.insert(index, node);
    }

    pub fn push(&mut self, node: Node) {
        self.items.push(node);
    }

    pub fn remove(&mut self, index: usize) -> Option<Node> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    Null,
}

impl ScalarKind {
    /// Whether `text` reads as a value of this kind.
    pub fn accepts(self, text: &str) -> bool {
        match self {
            ScalarKind::String => true,
            ScalarKind::Integer => text.parse::<i64>().is_ok() || text.parse::<u64>().is_ok(),
            ScalarKind::Float => text.parse::<f64>().is_ok_and(f64::is_finite),
            ScalarKind::Boolean => matches!(text, "true" | "false"),
            ScalarKind::Null => matches!(text, "null" | ""),
        }
    }
}

/// How the scalar was written in the source document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScalarStyle {
    #[default]
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scalar {
    value: String,
    pub kind: ScalarKind,
    pub style: ScalarStyle,
    pub format: Format,
}

impl Scalar {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn typed(value: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            value: value.into(),
            kind,
            ..Self::default()
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Same scalar carrying a new value, keeping style and formatting.
    ///
    /// The kind survives when the new text still reads as that kind;
    /// otherwise the scalar becomes a quoted string.
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        let value = value.into();
        let (kind, style) = if self.kind.accepts(&value) {
            (self.kind, self.style)
        } else {
            (ScalarKind::String, ScalarStyle::DoubleQuoted)
        };
        Self {
            value,
            kind,
            style,
            format: self.format.clone(),
        }
    }
}
