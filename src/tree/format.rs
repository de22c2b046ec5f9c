//! Formatting metadata carried by every node, and auto-format for new nodes.
//!
//! The engine never interprets this metadata; it only copies it around and
//! derives it for nodes that were built in memory or parsed from a detached
//! fragment, so a printer can lay them out like their hand-written siblings.

use crate::tree::node::Node;

const DEFAULT_INDENT_STEP: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Format {
    /// Column of the node's first character; `None` until the node is placed.
    pub indent: Option<usize>,
    /// Flow style (`{a: 1}` / `[1, 2]`) rather than block style.
    pub flow: bool,
    /// Comment lines printed directly above the node.
    pub comments: Vec<String>,
}

impl Format {
    pub fn block(indent: usize) -> Self {
        Self {
            indent: Some(indent),
            ..Self::default()
        }
    }

    pub fn is_placed(&self) -> bool {
        self.indent.is_some()
    }
}

/// Layout decided for a node about to be inserted under a given parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatContext {
    pub indent: usize,
    pub step: usize,
    pub flow: bool,
}

impl FormatContext {
    /// Derive the layout of a new child of `parent` from the children it
    /// already has, falling back to the parent's own indentation.
    pub fn for_child_of(parent: &Node) -> Self {
        let parent_format = parent.format();
        let parent_indent = parent_format.indent.unwrap_or(0);
        let sibling_indent = children(parent).find_map(|child| child.format().indent);
        let step = indent_step(parent).unwrap_or(DEFAULT_INDENT_STEP);

        Self {
            indent: sibling_indent.unwrap_or(parent_indent + step),
            step,
            flow: parent_format.flow,
        }
    }

    /// Layout that puts a replacement exactly where `previous` was.
    pub fn in_place_of(previous: &Node, parent: Option<&Node>) -> Self {
        let from_parent = parent.map(Self::for_child_of);
        Self {
            indent: previous
                .format()
                .indent
                .or(from_parent.map(|ctx| ctx.indent))
                .unwrap_or(0),
            step: indent_step(previous)
                .or(from_parent.map(|ctx| ctx.step))
                .unwrap_or(DEFAULT_INDENT_STEP),
            flow: from_parent.is_some_and(|ctx| ctx.flow),
        }
    }

    fn nested(self) -> Self {
        Self {
            indent: self.indent + self.step,
            ..self
        }
    }
}

/// Re-lay out `node` and all of its descendants for the given context.
///
/// Comments and flow style chosen by the fragment's author are kept; a node
/// placed inside a flow collection is forced into flow style.
pub fn auto_format(node: &mut Node, context: FormatContext) {
    let format = node.format_mut();
    format.indent = Some(context.indent);
    if context.flow {
        format.flow = true;
    }
    let nested = FormatContext {
        flow: format.flow,
        ..context.nested()
    };

    match node {
        Node::Mapping(mapping) => {
            for value in mapping.values_mut() {
                auto_format(value, nested);
            }
        }
        Node::Sequence(sequence) => {
            for item in sequence.items_mut() {
                auto_format(item, nested);
            }
        }
        Node::Scalar(_) => {}
    }
}

fn children(node: &Node) -> Box<dyn Iterator<Item = &Node> + '_> {
    match node {
        Node::Mapping(mapping) => Box::new(mapping.entries().iter().map(|entry| &entry.value)),
        Node::Sequence(sequence) => Box::new(sequence.items().iter()),
        Node::Scalar(_) => Box::new(std::iter::empty()),
    }
}

/// Indentation step observed between `node` and its first placed child.
fn indent_step(node: &Node) -> Option<usize> {
    let own = node.format().indent?;
    children(node)
        .filter_map(|child| child.format().indent)
        .find(|indent| *indent > own)
        .map(|indent| indent - own)
}
