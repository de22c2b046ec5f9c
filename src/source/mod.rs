//! Documents as text: parsing with byte spans, and rendering a rewritten
//! tree back into the text it came from.
//!
//! Rendering compiles the difference between the parsed tree and the
//! rewritten one down to byte-span replacements, so text no rule touched
//! survives unchanged, and checks that the result still parses.

pub mod errors;
pub mod parser;
pub mod printer;

pub use errors::{RenderError, SourceError};
pub use parser::{SpanTree, Style};

use crate::tree::Node;
use printer::{apply_edits, Printer};

/// A parsed document that remembers where every value was written.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    text: String,
    root: Node,
    spans: SpanTree,
    style: Style,
}

impl SourceDocument {
    pub fn parse(text: impl Into<String>) -> Result<Self, SourceError> {
        let text = text.into();
        let parsed = parser::parse(&text)?;
        Ok(Self {
            text,
            root: parsed.root,
            spans: parsed.spans,
            style: parsed.style,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn style(&self) -> Style {
        self.style
    }

    /// Text of this document with its tree replaced by `edited`.
    pub fn render(&self, edited: &Node) -> Result<String, RenderError> {
        let mut edits = Vec::new();
        Printer::new(&self.text, self.style).diff(
            &self.root,
            &self.spans,
            edited,
            &mut Vec::new(),
            &mut edits,
        )?;
        let text = apply_edits(&self.text, edits);
        parser::parse(&text).map_err(RenderError::Reparse)?;
        Ok(text)
    }
}

/// Print a tree with no source behind it, laid out by its own formatting.
pub fn print(root: &Node, style: Style) -> Result<String, RenderError> {
    printer::print(root, style)
}
