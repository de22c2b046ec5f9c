//! JSON adapter: builds trees from `serde_json` values and turns them back.
//!
//! Whole documents get block indentation by depth so inserted nodes have
//! surrounding context to be auto-formatted against. Fragments stay
//! unplaced until the editor lays them out where they land. Key order
//! survives the round trip because `serde_json` is built with
//! `preserve_order`.

use crate::tree::format::Format;
use crate::tree::node::{Mapping, Node, Scalar, ScalarKind, ScalarStyle, Sequence};
use serde_json::{Map, Number, Value};

const INDENT_STEP: usize = 2;

impl Node {
    pub fn from_json(value: &Value) -> Self {
        from_value(value, 0)
    }

    pub fn from_json_str(input: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(input)?;
        Ok(Self::from_json(&value))
    }

    /// A detached snippet meant for insertion. No node in it is placed, so
    /// the editor auto-formats it against its new siblings.
    pub fn fragment(value: &Value) -> Self {
        let mut node = Self::from_json(value);
        unplace(&mut node);
        node
    }

    pub fn fragment_str(input: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(input)?;
        Ok(Self::fragment(&value))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Node::Mapping(mapping) => {
                let mut map = Map::with_capacity(mapping.len());
                for entry in mapping.entries() {
                    map.insert(entry.key().to_string(), entry.value.to_json());
                }
                Value::Object(map)
            }
            Node::Sequence(sequence) => {
                Value::Array(sequence.items().iter().map(Node::to_json).collect())
            }
            Node::Scalar(scalar) => scalar_to_json(scalar),
        }
    }
}

fn from_value(value: &Value, depth: usize) -> Node {
    let indent = depth * INDENT_STEP;
    match value {
        Value::Object(map) => {
            let mut mapping = Mapping::new();
            mapping.format = container_format(indent, map.is_empty());
            for (key, child) in map {
                // serde_json maps cannot carry duplicate keys
                let _ = mapping.push(key.clone(), from_value(child, depth + 1));
            }
            Node::Mapping(mapping)
        }
        Value::Array(items) => {
            let mut sequence =
                Sequence::from_items(items.iter().map(|item| from_value(item, depth + 1)));
            sequence.format = container_format(indent, items.is_empty());
            Node::Sequence(sequence)
        }
        Value::String(text) => scalar(text.clone(), ScalarKind::String, indent),
        Value::Number(number) => {
            let kind = if number.is_f64() {
                ScalarKind::Float
            } else {
                ScalarKind::Integer
            };
            scalar(number.to_string(), kind, indent)
        }
        Value::Bool(flag) => scalar(flag.to_string(), ScalarKind::Boolean, indent),
        Value::Null => scalar("null".to_string(), ScalarKind::Null, indent),
    }
}

fn unplace(node: &mut Node) {
    node.format_mut().indent = None;
    match node {
        Node::Mapping(mapping) => mapping.values_mut().for_each(unplace),
        Node::Sequence(sequence) => sequence.items_mut().iter_mut().for_each(unplace),
        Node::Scalar(_) => {}
    }
}

fn container_format(indent: usize, empty: bool) -> Format {
    Format {
        indent: Some(indent),
        flow: empty,
        comments: Vec::new(),
    }
}

pub(crate) fn scalar(value: String, kind: ScalarKind, indent: usize) -> Node {
    let style = if kind == ScalarKind::String {
        ScalarStyle::DoubleQuoted
    } else {
        ScalarStyle::Plain
    };
    let mut scalar = Scalar::typed(value, kind);
    scalar.style = style;
    scalar.format = Format::block(indent);
    Node::Scalar(scalar)
}

/// JSON text for a scalar, or `None` when its text cannot be written as its kind.
pub(crate) fn literal(scalar: &Scalar) -> Option<String> {
    let text = scalar.value();
    match scalar.kind {
        ScalarKind::String => Some(Value::String(text.to_string()).to_string()),
        ScalarKind::Integer => text
            .parse::<i64>()
            .map(|n| n.to_string())
            .or_else(|_| text.parse::<u64>().map(|n| n.to_string()))
            .ok(),
        ScalarKind::Float => match serde_json::from_str::<Number>(text) {
            Ok(_) if text.trim() == text => Some(text.to_string()),
            _ => text
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(|n| n.to_string()),
        },
        ScalarKind::Boolean => matches!(text, "true" | "false").then(|| text.to_string()),
        ScalarKind::Null => (text == "null" || text.is_empty()).then(|| "null".to_string()),
    }
}

/// Typed scalars whose text no longer parses as their kind fall back to strings.
fn scalar_to_json(scalar: &Scalar) -> Value {
    let text = scalar.value();
    match scalar.kind {
        ScalarKind::String => Value::String(text.to_string()),
        ScalarKind::Integer => text
            .parse::<i64>()
            .map(Number::from)
            .or_else(|_| text.parse::<u64>().map(Number::from))
            .map(Value::Number)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        ScalarKind::Float => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string())),
        ScalarKind::Boolean => match text {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            other => Value::String(other.to_string()),
        },
        ScalarKind::Null if text == "null" || text.is_empty() => Value::Null,
        ScalarKind::Null => Value::String(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trip_preserves_key_order() {
        let value = json!({"zeta": 1, "alpha": [true, null, 1.5], "mid": {"k": "v"}});
        let node = Node::from_json(&value);
        let keys: Vec<_> = node.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
        assert_eq!(node.to_json(), value);
    }

    #[test]
    fn indentation_follows_depth() {
        let node = Node::from_json(&json!({"jobs": {"build": {"steps": []}}}));
        let steps = node.get_keys(&["jobs", "build", "steps"]).unwrap();
        assert_eq!(steps.format().indent, Some(6));
        assert!(steps.format().flow);
    }

    #[test]
    fn fragments_are_unplaced_throughout() {
        let node = Node::fragment_str(r#"{"with": {"cache": "gradle"}, "run": ["a"]}"#).unwrap();
        assert_eq!(node.format().indent, None);
        assert_eq!(node.get_keys(&["with", "cache"]).unwrap().format().indent, None);
        let run = node.get_keys(&["run"]).unwrap();
        assert_eq!(run.child(&crate::tree::Segment::Index(0)).unwrap().format().indent, None);
    }

    #[test]
    fn literal_refuses_mistyped_scalars() {
        assert_eq!(literal(&Scalar::typed("21", ScalarKind::Integer)).as_deref(), Some("21"));
        assert_eq!(literal(&Scalar::typed("1e3", ScalarKind::Float)).as_deref(), Some("1e3"));
        assert_eq!(literal(&Scalar::new("a\"b")).as_deref(), Some(r#""a\"b""#));
        assert_eq!(literal(&Scalar::typed("abc", ScalarKind::Integer)), None);
        assert_eq!(literal(&Scalar::typed("NaN", ScalarKind::Float)), None);
        assert_eq!(literal(&Scalar::typed("yes", ScalarKind::Boolean)), None);
    }

    #[test]
    fn retyped_integer_falls_back_to_string() {
        let node = Node::from_json(&json!(17));
        let updated = Node::Scalar(node.as_scalar().unwrap().with_value("21"));
        assert_eq!(updated.to_json(), json!(21));
        let text = Node::Scalar(node.as_scalar().unwrap().with_value("lts/*"));
        assert_eq!(text.to_json(), json!("lts/*"));
    }
}
