//! Substring rewriting inside a single scalar's text.
//!
//! These are plain string functions; the tree only sees the result as an
//! ordinary scalar replacement.

use crate::tree::Node;
use crate::visit::Rewrite;
use regex::{NoExpand, Regex};
use std::borrow::Cow;

/// Replace every match of `pattern` in `text` with `replacement`, taken
/// literally (`$` is not a capture reference).
pub fn replace_all<'t>(text: &'t str, pattern: &Regex, replacement: &str) -> Cow<'t, str> {
    pattern.replace_all(text, NoExpand(replacement))
}

#[derive(Debug, Clone)]
pub struct TextRewrite {
    pattern: Regex,
    replacement: String,
}

impl TextRewrite {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self::from_regex(Regex::new(pattern)?, replacement))
    }

    pub fn from_regex(pattern: Regex, replacement: impl Into<String>) -> Self {
        Self {
            pattern,
            replacement: replacement.into(),
        }
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        replace_all(text, &self.pattern, &self.replacement)
    }

    /// `Replace` with the rewritten scalar, or `Unchanged` when the text does
    /// not change or the node is not a scalar.
    pub fn rewrite_scalar(&self, node: &Node) -> Rewrite {
        let Some(scalar) = node.as_scalar() else {
            return Rewrite::Unchanged;
        };
        match self.apply(scalar.value()) {
            Cow::Owned(text) if text != scalar.value() => {
                Rewrite::Replace(Node::Scalar(scalar.with_value(text)))
            }
            _ => Rewrite::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replacement_is_literal() {
        let pattern = Regex::new(r"\$\{\{\s*secrets\.OLD\s*}}").unwrap();
        let text = "token: ${{secrets.OLD }} and ${{ secrets.OLDER }}";
        let out = replace_all(text, &pattern, "${{ secrets.NEW }}");
        assert_eq!(out, "token: ${{ secrets.NEW }} and ${{ secrets.OLDER }}");
    }

    #[test]
    fn untouched_text_borrows() {
        let pattern = Regex::new("x").unwrap();
        assert!(matches!(replace_all("abc", &pattern, "y"), Cow::Borrowed("abc")));
    }

    #[test]
    fn rewrite_scalar_keeps_style() {
        let rewrite = TextRewrite::new("adopt", "temurin").unwrap();
        let node = Node::from_json(&json!("adopt"));
        match rewrite.rewrite_scalar(&node) {
            Rewrite::Replace(Node::Scalar(scalar)) => {
                assert_eq!(scalar.value(), "temurin");
                assert_eq!(Some(scalar.style), node.as_scalar().map(|s| s.style));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(rewrite.rewrite_scalar(&Node::from_json(&json!({"a": 1}))), Rewrite::Unchanged);
        assert_eq!(rewrite.rewrite_scalar(&Node::from_json(&json!("zulu"))), Rewrite::Unchanged);
    }
}
