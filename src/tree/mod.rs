pub mod format;
pub mod json;
pub mod node;

pub use format::{auto_format, Format, FormatContext};
pub use node::{
    display_path, Entry, Mapping, Node, NodeKind, Scalar, ScalarKind, ScalarStyle, Segment,
    Sequence,
};

/// One parsed input document and the identity used to report on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub root: Node,
}

impl Document {
    pub fn new(id: impl Into<String>, root: Node) -> Self {
        Self {
            id: id.into(),
            root,
        }
    }
}
