//! Layout-aware printing of trees, and the span edits that carry a rewrite
//! back into the text it was parsed from.
//!
//! A node that did not change keeps its source text byte for byte. A
//! container whose shape survived is patched child by child. Anything else
//! is printed from its [`Format`](crate::tree::Format): block children on
//! their own lines at their indent, flow children inline, and old children
//! that are still present copied from the source.

use crate::source::errors::RenderError;
use crate::source::parser::{SpanTree, Style};
use crate::tree::json::literal;
use crate::tree::{display_path, Mapping, Node, Scalar, Segment, Sequence};
use serde_json::Value;

/// Replace `text[start..end]` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SpanEdit {
    pub start: usize,
    pub end: usize,
    pub new_text: String,
}

/// Apply non-overlapping edits, last span first so earlier offsets hold.
pub(crate) fn apply_edits(text: &str, mut edits: Vec<SpanEdit>) -> String {
    edits.sort_by(|a, b| b.start.cmp(&a.start));
    let mut out = text.to_string();
    for edit in edits {
        out.replace_range(edit.start..edit.end, &edit.new_text);
    }
    out
}

pub(crate) struct Printer<'s> {
    source: &'s str,
    style: Style,
}

impl<'s> Printer<'s> {
    pub fn new(source: &'s str, style: Style) -> Self {
        Self { source, style }
    }

    /// Collect the edits that turn the text of `old` into text for `new`.
    pub fn diff(
        &self,
        old: &Node,
        spans: &SpanTree,
        new: &Node,
        path: &mut Vec<Segment>,
        edits: &mut Vec<SpanEdit>,
    ) -> Result<(), RenderError> {
        if old == new {
            return Ok(());
        }
        if old.format() == new.format() {
            match (old, new) {
                (Node::Mapping(before), Node::Mapping(after)) if same_slots(before, after) => {
                    for ((entry, span), updated) in
                        before.entries().iter().zip(&spans.children).zip(after.entries())
                    {
                        if let (Some(key), true) = (&span.key, entry.key() != updated.key()) {
                            edits.push(SpanEdit {
                                start: key.start,
                                end: key.end,
                                new_text: quote(updated.key()),
                            });
                        }
                        path.push(Segment::Key(updated.key().to_string()));
                        self.diff(&entry.value, span, &updated.value, path, edits)?;
                        path.pop();
                    }
                    return Ok(());
                }
                (Node::Sequence(before), Node::Sequence(after)) if before.len() == after.len() => {
                    for (index, ((item, span), updated)) in
                        before.items().iter().zip(&spans.children).zip(after.items()).enumerate()
                    {
                        path.push(Segment::Index(index));
                        self.diff(item, span, updated, path, edits)?;
                        path.pop();
                    }
                    return Ok(());
                }
                _ => {}
            }
        }

        let mut new_text = String::new();
        let indent = old.format().indent.unwrap_or(0);
        self.write(&mut new_text, Some((old, spans)), new, path, indent)?;
        edits.push(SpanEdit {
            start: spans.span.start,
            end: spans.span.end,
            new_text,
        });
        Ok(())
    }

    /// Print `node`, copying `previous` verbatim wherever it is unchanged.
    /// `fallback` is the indent used when the node was never placed.
    pub fn write(
        &self,
        out: &mut String,
        previous: Option<(&Node, &SpanTree)>,
        node: &Node,
        path: &mut Vec<Segment>,
        fallback: usize,
    ) -> Result<(), RenderError> {
        if let Some((old, spans)) = previous {
            if old == node {
                out.push_str(&self.source[spans.span.clone()]);
                return Ok(());
            }
        }
        match node {
            Node::Scalar(scalar) => self.write_scalar(out, scalar, path),
            Node::Mapping(mapping) => self.write_mapping(out, previous, mapping, path, fallback),
            Node::Sequence(sequence) => {
                self.write_sequence(out, previous, sequence, path, fallback)
            }
        }
    }

    fn write_scalar(
        &self,
        out: &mut String,
        scalar: &Scalar,
        path: &[Segment],
    ) -> Result<(), RenderError> {
        let text = literal(scalar).ok_or_else(|| RenderError::UnrepresentableScalar {
            path: display_path(path),
            kind: scalar.kind,
            value: scalar.value().to_string(),
        })?;
        out.push_str(&text);
        Ok(())
    }

    fn write_mapping(
        &self,
        out: &mut String,
        previous: Option<(&Node, &SpanTree)>,
        mapping: &Mapping,
        path: &mut Vec<Segment>,
        fallback: usize,
    ) -> Result<(), RenderError> {
        if mapping.is_empty() {
            out.push_str("{}");
            return Ok(());
        }
        let indent = mapping.format.indent.unwrap_or(fallback);
        let flow = mapping.format.flow;
        let old = previous.and_then(|(node, spans)| Some((node.as_mapping()?, spans)));

        out.push('{');
        for (position, entry) in mapping.entries().iter().enumerate() {
            self.separate(out, position, flow, entry.value.format().indent, indent);
            out.push_str(&quote(entry.key()));
            out.push_str(self.style.colon);
            let before = old.and_then(|(old, spans)| previous_entry(old, spans, mapping, position));
            path.push(Segment::Key(entry.key().to_string()));
            let written = self.write(out, before, &entry.value, path, indent + self.style.step);
            path.pop();
            written?;
        }
        self.close(out, flow, indent);
        out.push('}');
        Ok(())
    }

    fn write_sequence(
        &self,
        out: &mut String,
        previous: Option<(&Node, &SpanTree)>,
        sequence: &Sequence,
        path: &mut Vec<Segment>,
        fallback: usize,
    ) -> Result<(), RenderError> {
        if sequence.is_empty() {
            out.push_str("[]");
            return Ok(());
        }
        let indent = sequence.format.indent.unwrap_or(fallback);
        let flow = sequence.format.flow;
        let pairs = previous
            .and_then(|(node, spans)| Some((node.as_sequence()?, spans)))
            .map(|(old, spans)| pair_items(old, spans, sequence))
            .unwrap_or_else(|| vec![None; sequence.len()]);

        out.push('[');
        for (index, (item, before)) in sequence.items().iter().zip(pairs).enumerate() {
            self.separate(out, index, flow, item.format().indent, indent);
            path.push(Segment::Index(index));
            let written = self.write(out, before, item, path, indent + self.style.step);
            path.pop();
            written?;
        }
        self.close(out, flow, indent);
        out.push(']');
        Ok(())
    }

    /// Separator and line break before the child at `position`.
    fn separate(
        &self,
        out: &mut String,
        position: usize,
        flow: bool,
        child: Option<usize>,
        indent: usize,
    ) {
        if flow {
            if position > 0 {
                out.push_str(self.style.comma);
            }
            return;
        }
        if position > 0 {
            out.push(',');
        }
        out.push('\n');
        push_indent(out, child.unwrap_or(indent + self.style.step));
    }

    fn close(&self, out: &mut String, flow: bool, indent: usize) {
        if !flow {
            out.push('\n');
            push_indent(out, indent);
        }
    }
}

fn quote(key: &str) -> String {
    Value::String(key.to_string()).to_string()
}

/// Same number of entries, each kept or renamed in place.
fn same_slots(before: &Mapping, after: &Mapping) -> bool {
    before.len() == after.len()
        && before.entries().iter().zip(after.entries()).all(|(old, new)| {
            old.key() == new.key()
                || (!after.contains_key(old.key()) && !before.contains_key(new.key()))
        })
}

fn push_indent(out: &mut String, width: usize) {
    out.extend(std::iter::repeat(' ').take(width));
}

/// The old value for the entry at `position`: same key, or the entry that
/// sat at the same place under a key the new mapping no longer has.
fn previous_entry<'t>(
    old: &'t Mapping,
    spans: &'t SpanTree,
    new: &Mapping,
    position: usize,
) -> Option<(&'t Node, &'t SpanTree)> {
    let key = new.entries().get(position)?.key();
    let index = old.position(key).or_else(|| {
        let renamed = old.entries().get(position)?;
        (!new.contains_key(renamed.key())).then_some(position)
    })?;
    Some((&old.entries().get(index)?.value, spans.children.get(index)?))
}

/// Match every new item to an old one: identical items first, then the
/// leftovers in order.
fn pair_items<'t>(
    old: &'t Sequence,
    spans: &'t SpanTree,
    new: &Sequence,
) -> Vec<Option<(&'t Node, &'t SpanTree)>> {
    let mut taken = vec![false; old.len()];
    let mut pairs: Vec<Option<usize>> = new
        .items()
        .iter()
        .map(|item| {
            let found = (0..old.len()).find(|&i| !taken[i] && old.items()[i] == *item)?;
            taken[found] = true;
            Some(found)
        })
        .collect();

    let mut leftovers = (0..old.len()).filter(|&i| !taken[i]);
    for (slot, item) in pairs.iter_mut().zip(new.items()) {
        if slot.is_none() {
            *slot = leftovers
                .next()
                .filter(|&i| old.items()[i].kind() == item.kind());
        }
    }

    pairs
        .into_iter()
        .map(|slot| {
            let index = slot?;
            Some((old.items().get(index)?, spans.children.get(index)?))
        })
        .collect()
}

/// Print a tree that has no source text behind it.
pub(crate) fn print(node: &Node, style: Style) -> Result<String, RenderError> {
    let printer = Printer::new("", style);
    let mut out = String::new();
    printer.write(&mut out, None, node, &mut Vec::new(), 0)?;
    if style.trailing_newline {
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ScalarKind;
    use serde_json::json;

    #[test]
    fn fresh_print_matches_pretty_json() {
        let value = json!({
            "name": "ci",
            "on": {"push": {}},
            "jobs": {"build": {"steps": [{"uses": "actions/checkout@v4"}, {"run": "make"}]}},
            "n": [1, 2.5, true, null]
        });
        let printed = print(&Node::from_json(&value), Style::default()).unwrap();
        assert_eq!(printed, serde_json::to_string_pretty(&value).unwrap() + "\n");
    }

    #[test]
    fn flow_containers_print_inline_with_style_separators() {
        let mut node = Node::from_json(&json!({"runs-on": ["self-hosted", "linux"]}));
        node.format_mut().flow = true;
        if let Some(runners) = node.as_mapping_mut().and_then(|m| m.get_mut("runs-on")) {
            runners.format_mut().flow = true;
        }
        let compact = Style {
            colon: ":",
            comma: ",",
            ..Style::default()
        };
        assert_eq!(
            print(&node, compact).unwrap(),
            "{\"runs-on\":[\"self-hosted\",\"linux\"]}\n"
        );
    }

    #[test]
    fn mistyped_scalars_are_reported_with_their_path() {
        let mut node = Node::from_json(&json!({"jobs": {"retries": 3}}));
        let path = [Segment::Key("jobs".into()), Segment::Key("retries".into())];
        if let Some(retries) = node.get_path_mut(&path) {
            *retries = Node::Scalar(Scalar::typed("three", ScalarKind::Integer));
        }
        let err = print(&node, Style::default()).unwrap_err();
        assert!(matches!(
            err,
            RenderError::UnrepresentableScalar { ref path, .. } if path == "$.jobs.retries"
        ));
    }

    #[test]
    fn edits_apply_back_to_front() {
        let edits = vec![
            SpanEdit { start: 0, end: 1, new_text: "xy".to_string() },
            SpanEdit { start: 4, end: 5, new_text: "z".to_string() },
        ];
        assert_eq!(apply_edits("abcdef", edits), "xybcdzf");
    }
}
