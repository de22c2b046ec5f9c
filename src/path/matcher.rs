use crate::path::query::{Condition, PathQuery, Step, Test};
use crate::tree::{Node, Segment};
use crate::visit::{walk_ref, Cursor};

impl PathQuery {
    /// Whether the cursor's node is selected by this query.
    ///
    /// Filters are evaluated against the tree as it is now, so edits made
    /// earlier in the same pass are visible to later matches.
    pub fn matches(&self, cursor: &Cursor<'_>) -> bool {
        self.matches_path(cursor.root(), cursor.path())
    }

    pub fn matches_path(&self, root: &Node, path: &[Segment]) -> bool {
        match_steps(self.steps(), root, path, 0)
    }
}

impl Condition {
    /// Evaluate against the filter candidate (`@`).
    pub fn holds(&self, candidate: &Node) -> bool {
        let target = candidate.get_keys(&self.keys);
        match &self.test {
            Test::Exists => target.is_some(),
            Test::Matches(regex) => target
                .and_then(Node::as_str)
                .is_some_and(|value| regex.is_match(value)),
            Test::Equals(expected) => target.and_then(Node::as_str) == Some(expected.as_str()),
            Test::NotEquals(expected) => target
                .and_then(Node::as_str)
                .is_some_and(|value| value != expected),
        }
    }
}

/// Paths of every node the query selects, in traversal order.
pub fn find_all(root: &Node, query: &PathQuery) -> Vec<Vec<Segment>> {
    let mut found = Vec::new();
    walk_ref(root, |_, cursor| {
        if query.matches(cursor) {
            found.push(cursor.path().to_vec());
        }
    });
    found
}

/// Whether anything in the tree is selected; stops at the first hit.
pub fn has_match(root: &Node, query: &PathQuery) -> bool {
    let mut path = Vec::new();
    any_match(root, root, &mut path, query)
}

fn any_match(root: &Node, node: &Node, path: &mut Vec<Segment>, query: &PathQuery) -> bool {
    if query.matches_path(root, path) {
        return true;
    }
    (0..node.len())
        .filter_map(|position| node.child_segment(position))
        .any(|segment| {
            let Some(child) = node.child(&segment) else {
                return false;
            };
            path.push(segment);
            let found = any_match(root, child, path, query);
            path.pop();
            found
        })
}

fn match_steps(steps: &[Step], root: &Node, path: &[Segment], depth: usize) -> bool {
    match steps.split_first() {
        None => depth == path.len(),
        Some((Step::Descendants, rest)) => {
            (depth..=path.len()).any(|skip_to| match_steps(rest, root, path, skip_to))
        }
        Some((step, rest)) => {
            depth < path.len()
                && step_matches(step, root, path, depth)
                && match_steps(rest, root, path, depth + 1)
        }
    }
}

fn step_matches(step: &Step, root: &Node, path: &[Segment], depth: usize) -> bool {
    let segment = &path[depth];
    match step {
        Step::Child(name) => segment.key() == Some(name.as_str()),
        Step::Wildcard => true,
        Step::Descendants => false,
        Step::Index(wanted) => match (segment, sequence_len(root, &path[..depth])) {
            (Segment::Index(index), Some(len)) => resolve_index(*wanted, len) == Some(*index),
            _ => false,
        },
        Step::Slice { start, end } => match (segment, sequence_len(root, &path[..depth])) {
            (Segment::Index(index), Some(len)) => {
                let start = start.map_or(0, |bound| resolve_bound(bound, len));
                let end = end.map_or(len, |bound| resolve_bound(bound, len));
                start <= *index && *index < end
            }
            _ => false,
        },
        Step::Filter(conditions) => root
            .get_path(&path[..=depth])
            .is_some_and(|candidate| conditions.iter().all(|cond| cond.holds(candidate))),
    }
}

fn sequence_len(root: &Node, path: &[Segment]) -> Option<usize> {
    root.get_path(path)
        .and_then(Node::as_sequence)
        .map(|sequence| sequence.len())
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        usize::try_from(index).ok()
    } else {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(back)
    }
}

fn resolve_bound(bound: i64, len: usize) -> usize {
    let magnitude = usize::try_from(bound.unsigned_abs()).unwrap_or(usize::MAX);
    if bound >= 0 {
        magnitude.min(len)
    } else {
        len.saturating_sub(magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(name: &str) -> Segment {
        Segment::Key(name.to_string())
    }

    fn workflow() -> Node {
        Node::from_json(&json!({
            "on": {"workflow_dispatch": {"inputs": {"x": {}, "y": {}}}},
            "jobs": {
                "build": {"steps": [
                    {"uses": "actions/checkout@v4"},
                    {"uses": "actions/setup-java@v3", "with": {"distribution": "adopt"}},
                    {"uses": "actions/setup-java@v4", "with": {"distribution": "adopt"}}
                ]}
            }
        }))
    }

    fn distribution_path(step: usize) -> Vec<Segment> {
        vec![
            key("jobs"),
            key("build"),
            key("steps"),
            Segment::Index(step),
            key("with"),
            key("distribution"),
        ]
    }

    #[test]
    fn anchored_query_requires_full_chain() {
        let root = workflow();
        let query = PathQuery::parse("$.on.workflow_dispatch.inputs").unwrap();
        let inputs = [key("on"), key("workflow_dispatch"), key("inputs")];
        assert!(query.matches_path(&root, &inputs));
        assert!(!query.matches_path(&root, &inputs[..2]));
        let input = [key("on"), key("workflow_dispatch"), key("inputs"), key("x")];
        assert!(!query.matches_path(&root, &input));
    }

    #[test]
    fn filter_selects_on_sibling_value() {
        let root = workflow();
        let query = PathQuery::parse(
            "..steps[?(@.uses =~ 'actions/setup-java@v[23].*')].with.distribution",
        )
        .unwrap();
        assert!(query.matches_path(&root, &distribution_path(1)));
        assert!(!query.matches_path(&root, &distribution_path(2)));
    }

    #[test]
    fn slice_and_negative_index() {
        let root = workflow();
        let first = PathQuery::parse("$.jobs.build.steps[:1].uses").unwrap();
        let last = PathQuery::parse("$.jobs.build.steps[-1].uses").unwrap();
        let uses = |i| {
            vec![key("jobs"), key("build"), key("steps"), Segment::Index(i), key("uses")]
        };
        assert!(first.matches_path(&root, &uses(0)));
        assert!(!first.matches_path(&root, &uses(1)));
        assert!(last.matches_path(&root, &uses(2)));
        assert!(!last.matches_path(&root, &uses(0)));
    }

    #[test]
    fn wildcard_and_descendants() {
        let root = workflow();
        let query = PathQuery::parse("$.jobs.*.steps").unwrap();
        assert!(query.matches_path(&root, &[key("jobs"), key("build"), key("steps")]));
        let query = PathQuery::parse("$..distribution").unwrap();
        assert_eq!(find_all(&root, &query).len(), 2);
    }

    #[test]
    fn has_match_agrees_with_find_all() {
        let root = workflow();
        for source in ["$.on.schedule", "..with", "$.jobs.build.steps[5]", "$"] {
            let query = PathQuery::parse(source).unwrap();
            assert_eq!(has_match(&root, &query), !find_all(&root, &query).is_empty(), "{source}");
        }
    }

    #[test]
    fn regex_on_container_does_not_match() {
        let root = workflow();
        let query = PathQuery::parse("$.jobs.build.steps[?(@.with =~ '.*')]").unwrap();
        assert!(find_all(&root, &query).is_empty());
    }
}
