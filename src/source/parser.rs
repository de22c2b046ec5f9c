//! Span-recording JSON parser.
//!
//! Every value is built into a [`Node`] whose indent is the column it was
//! written at (a mapping value takes its key's column), together with a
//! parallel [`SpanTree`] of byte ranges, so a printer can copy untouched
//! values straight from the input.

use crate::source::errors::SourceError;
use crate::tree::json::scalar;
use crate::tree::{Format, Mapping, Node, ScalarKind, Sequence};
use std::ops::Range;

const MAX_DEPTH: usize = 128;

/// Byte range of one value and, in document order, of each of its children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanTree {
    pub span: Range<usize>,
    /// The quoted key, for values held by a mapping.
    pub key: Option<Range<usize>>,
    pub children: Vec<SpanTree>,
}

/// Separators and layout observed in a document, reused for new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    /// Written between a key and its value.
    pub colon: &'static str,
    /// Written between the children of a flow collection.
    pub comma: &'static str,
    /// Indent added per nesting level for nodes that were never placed.
    pub step: usize,
    pub trailing_newline: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            colon: ": ",
            comma: ", ",
            step: 2,
            trailing_newline: true,
        }
    }
}

pub(crate) struct Parsed {
    pub root: Node,
    pub spans: SpanTree,
    pub style: Style,
}

pub(crate) fn parse(text: &str) -> Result<Parsed, SourceError> {
    let mut parser = Parser {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        depth: 0,
        colon: None,
        comma: None,
    };
    parser.skip_whitespace();
    let (root, spans) = parser.value(0)?;
    parser.skip_whitespace();
    if parser.pos < parser.bytes.len() {
        return Err(parser.syntax("trailing characters after the document"));
    }

    let defaults = Style::default();
    let style = Style {
        colon: match parser.colon {
            Some(false) => ":",
            _ => defaults.colon,
        },
        comma: match parser.comma {
            Some(false) => ",",
            _ => defaults.comma,
        },
        step: first_step(&root).unwrap_or(defaults.step),
        trailing_newline: text.ends_with('\n'),
    };
    Ok(Parsed { root, spans, style })
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    /// Whether a space followed the first `:` seen.
    colon: Option<bool>,
    /// Whether a space followed the first `,` that did not end a line.
    comma: Option<bool>,
}

impl<'a> Parser<'a> {
    fn value(&mut self, indent: usize) -> Result<(Node, SpanTree), SourceError> {
        match self.peek() {
            Some(b'{') => self.nested(|parser| parser.mapping(indent)),
            Some(b'[') => self.nested(|parser| parser.sequence(indent)),
            Some(b'"') => {
                let start = self.pos;
                let text = self.string()?;
                Ok(self.leaf(scalar(text, ScalarKind::String, indent), start))
            }
            Some(b'-' | b'0'..=b'9') => self.number(indent),
            Some(b't') => self.keyword("true", ScalarKind::Boolean, indent),
            Some(b'f') => self.keyword("false", ScalarKind::Boolean, indent),
            Some(b'n') => self.keyword("null", ScalarKind::Null, indent),
            Some(_) => Err(self.syntax("expected a value")),
            None => Err(self.syntax("unexpected end of input")),
        }
    }

    fn nested<F>(&mut self, parse: F) -> Result<(Node, SpanTree), SourceError>
    where
        F: FnOnce(&mut Self) -> Result<(Node, SpanTree), SourceError>,
    {
        if self.depth == MAX_DEPTH {
            return Err(self.syntax("nesting too deep"));
        }
        self.depth += 1;
        let parsed = parse(self);
        self.depth -= 1;
        parsed
    }

    fn mapping(&mut self, indent: usize) -> Result<(Node, SpanTree), SourceError> {
        let start = self.pos;
        self.pos += 1;
        let mut mapping = Mapping::new();
        let mut children = Vec::new();

        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
        } else {
            loop {
                self.skip_whitespace();
                if self.peek() != Some(b'"') {
                    return Err(self.syntax("expected a quoted key"));
                }
                let key_start = self.pos;
                let key_column = self.column(key_start);
                let key = self.string()?;
                let key_span = key_start..self.pos;
                self.skip_whitespace();
                self.expect(b':')?;
                if self.colon.is_none() {
                    self.colon = Some(self.spaced());
                }
                self.skip_whitespace();
                let (value, mut span) = self.value(key_column)?;
                span.key = Some(key_span);
                if mapping.contains_key(&key) {
                    let (line, column) = self.line_column(key_start);
                    return Err(SourceError::DuplicateKey { key, line, column });
                }
                mapping.push(key, value).map_err(|e| self.syntax(&e.to_string()))?;
                children.push(span);
                if self.separator(b'}')? {
                    break;
                }
            }
        }

        mapping.format = self.container_format(indent, start, children.is_empty());
        let spans = SpanTree {
            span: start..self.pos,
            key: None,
            children,
        };
        Ok((Node::Mapping(mapping), spans))
    }

    fn sequence(&mut self, indent: usize) -> Result<(Node, SpanTree), SourceError> {
        let start = self.pos;
        self.pos += 1;
        let mut items = Vec::new();
        let mut children = Vec::new();

        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
        } else {
            loop {
                self.skip_whitespace();
                let column = self.column(self.pos);
                let (item, span) = self.value(column)?;
                items.push(item);
                children.push(span);
                if self.separator(b']')? {
                    break;
                }
            }
        }

        let mut sequence = Sequence::from_items(items);
        sequence.format = self.container_format(indent, start, children.is_empty());
        let spans = SpanTree {
            span: start..self.pos,
            key: None,
            children,
        };
        Ok((Node::Sequence(sequence), spans))
    }

    /// Consume `,` or the closing bracket; true once the collection is closed.
    fn separator(&mut self, close: u8) -> Result<bool, SourceError> {
        self.skip_whitespace();
        match self.peek() {
            Some(b',') => {
                self.pos += 1;
                if self.comma.is_none() && !matches!(self.peek(), Some(b'\n' | b'\r')) {
                    self.comma = Some(self.spaced());
                }
                Ok(false)
            }
            Some(byte) if byte == close => {
                self.pos += 1;
                Ok(true)
            }
            _ => Err(self.syntax(&format!("expected ',' or '{}'", close as char))),
        }
    }

    fn container_format(&self, indent: usize, start: usize, empty: bool) -> Format {
        Format {
            indent: Some(indent),
            flow: empty || !self.text[start..self.pos].contains('\n'),
            comments: Vec::new(),
        }
    }

    /// Scan a quoted string and decode it; the escapes are serde_json's.
    fn string(&mut self) -> Result<String, SourceError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek() {
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => self.pos += 2,
                Some(_) => self.pos += 1,
                None => return Err(self.syntax("unterminated string")),
            }
        }
        let literal = self
            .text
            .get(start..self.pos)
            .ok_or_else(|| self.syntax("unterminated string"))?;
        serde_json::from_str::<String>(literal).map_err(|source| self.literal(start, source))
    }

    fn number(&mut self, indent: usize) -> Result<(Node, SpanTree), SourceError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E')) {
            self.pos += 1;
        }
        let number = serde_json::from_str::<serde_json::Number>(&self.text[start..self.pos])
            .map_err(|source| self.literal(start, source))?;
        let kind = if number.is_f64() {
            ScalarKind::Float
        } else {
            ScalarKind::Integer
        };
        Ok(self.leaf(scalar(number.to_string(), kind, indent), start))
    }

    fn keyword(
        &mut self,
        word: &'static str,
        kind: ScalarKind,
        indent: usize,
    ) -> Result<(Node, SpanTree), SourceError> {
        if !self.text[self.pos..].starts_with(word) {
            return Err(self.syntax("expected a value"));
        }
        let start = self.pos;
        self.pos += word.len();
        Ok(self.leaf(scalar(word.to_string(), kind, indent), start))
    }

    fn leaf(&self, node: Node, start: usize) -> (Node, SpanTree) {
        let spans = SpanTree {
            span: start..self.pos,
            ..SpanTree::default()
        };
        (node, spans)
    }

    fn expect(&mut self, byte: u8) -> Result<(), SourceError> {
        if self.peek() != Some(byte) {
            return Err(self.syntax(&format!("expected '{}'", byte as char)));
        }
        self.pos += 1;
        Ok(())
    }

    fn spaced(&self) -> bool {
        matches!(self.peek(), Some(b' ' | b'\t'))
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn column(&self, pos: usize) -> usize {
        self.line_column(pos).1 - 1
    }

    /// One-based line and column of a byte offset.
    fn line_column(&self, pos: usize) -> (usize, usize) {
        let mut end = pos.min(self.text.len());
        while !self.text.is_char_boundary(end) {
            end -= 1;
        }
        let before = &self.text[..end];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |newline| newline + 1);
        (line, before[line_start..].chars().count() + 1)
    }

    fn syntax(&self, message: &str) -> SourceError {
        let (line, column) = self.line_column(self.pos);
        SourceError::Syntax {
            line,
            column,
            message: message.to_string(),
        }
    }

    fn literal(&self, start: usize, source: serde_json::Error) -> SourceError {
        let (line, column) = self.line_column(start);
        SourceError::Literal { line, column, source }
    }
}

fn first_step(root: &Node) -> Option<usize> {
    let own = root.format().indent?;
    let child = root.child(&root.child_segment(0)?)?;
    let indent = child.format().indent?;
    (!root.format().flow && indent > own).then(|| indent - own)
}
