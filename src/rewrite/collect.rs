//! Read-only collection passes and the collect-then-mutate step shape.

use crate::path::PathQuery;
use crate::rewrite::errors::RewriteError;
use crate::rewrite::step::Step;
use crate::tree::Node;
use crate::visit::{walk_ref, Cursor};
use std::collections::BTreeSet;
use tracing::debug;

/// Run `extract` on every node selected by `query`, keeping the `Some`s.
pub fn collect<T, F>(root: &Node, query: &PathQuery, mut extract: F) -> Vec<T>
where
    F: FnMut(&Node, &Cursor<'_>) -> Option<T>,
{
    let mut found = Vec::new();
    walk_ref(root, |node, cursor| {
        if query.matches(cursor) {
            found.extend(extract(node, cursor));
        }
    });
    found
}

/// Scalar values of the selected nodes. Containers are skipped.
pub fn values(root: &Node, query: &PathQuery) -> Vec<String> {
    collect(root, query, |node, _| node.as_str().map(str::to_string))
}

/// Keys of every selected mapping, in document order.
pub fn keys(root: &Node, query: &PathQuery) -> Vec<String> {
    collect(root, query, |node, _| {
        node.as_mapping()
            .map(|mapping| mapping.keys().map(str::to_string).collect::<Vec<_>>())
    })
    .into_iter()
    .flatten()
    .collect()
}

/// Every scalar value in the document, in traversal order.
pub fn scalars(root: &Node) -> Vec<&str> {
    let mut found = Vec::new();
    walk_ref(root, |node, _| {
        if let Some(text) = node.as_str() {
            found.push(text);
        }
    });
    found
}

/// Names declared somewhere in a document versus names referenced in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactSet {
    pub defined: BTreeSet<String>,
    pub used: BTreeSet<String>,
}

impl FactSet {
    /// Defined but never referenced.
    pub fn unused(&self) -> BTreeSet<String> {
        self.defined.difference(&self.used).cloned().collect()
    }

    pub fn is_unused(&self, name: &str) -> bool {
        self.defined.contains(name) && !self.used.contains(name)
    }
}

/// An analysis that decides what to edit from facts about the whole
/// document, gathered before any edit is made.
///
/// `collect` only gets a shared borrow, so eligibility can never depend on a
/// half-edited tree.
pub trait TwoPhase: Send + Sync {
    type Facts;

    fn name(&self) -> &str;

    fn precondition(&self) -> Option<&PathQuery> {
        None
    }

    fn collect(&self, root: &Node) -> Self::Facts;

    /// `false` when the facts show there is nothing to do.
    fn should_mutate(&self, _facts: &Self::Facts) -> bool {
        true
    }

    fn mutate(&self, root: &mut Node, facts: &Self::Facts) -> Result<(), RewriteError>;

    /// Runs after `mutate` to put emptied containers into their canonical form.
    fn cleanup(&self, _root: &mut Node, _facts: &Self::Facts) -> Result<(), RewriteError> {
        Ok(())
    }
}

/// Runs a [`TwoPhase`] analysis as a pipeline [`Step`].
#[derive(Debug, Clone)]
pub struct TwoPhaseStep<T>(pub T);

impl<T: TwoPhase> Step for TwoPhaseStep<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn precondition(&self) -> Option<&PathQuery> {
        self.0.precondition()
    }

    fn apply(&self, mut tree: Node) -> Result<Node, RewriteError> {
        let facts = self.0.collect(&tree);
        if !self.0.should_mutate(&facts) {
            debug!(step = self.0.name(), "facts leave nothing to change");
            return Ok(tree);
        }
        self.0.mutate(&mut tree, &facts)?;
        self.0.cleanup(&mut tree, &facts)?;
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visit::{walk, Rewrite, Visitor};
    use serde_json::json;

    fn doc() -> Node {
        Node::from_json(&json!({
            "env": {"A": "1", "B": "2", "C": "3"},
            "run": ["echo $A", "echo $C"],
            "note": "$A again"
        }))
    }

    #[test]
    fn keys_and_values() {
        let root = doc();
        let env = PathQuery::parse("$.env").unwrap();
        assert_eq!(keys(&root, &env), ["A", "B", "C"]);
        let run = PathQuery::parse("$.run[*]").unwrap();
        assert_eq!(values(&root, &run), ["echo $A", "echo $C"]);
        assert!(values(&root, &env).is_empty());
        assert_eq!(scalars(&root).len(), 6);
    }

    /// Drops env entries no scalar refers to as `$NAME`.
    struct PruneEnv {
        env: PathQuery,
    }

    struct DeleteUnused<'f> {
        facts: &'f FactSet,
        env: &'f PathQuery,
    }

    impl Visitor for DeleteUnused<'_> {
        fn enter(
            &mut self,
            _node: &Node,
            cursor: &mut Cursor<'_>,
        ) -> Result<Rewrite, RewriteError> {
            let in_env = cursor.depth() > 0
                && self
                    .env
                    .matches_path(cursor.root(), &cursor.path()[..cursor.depth() - 1]);
            match cursor.key() {
                Some(name) if in_env && self.facts.is_unused(name) => Ok(Rewrite::Delete),
                _ => Ok(Rewrite::Unchanged),
            }
        }
    }

    impl TwoPhase for PruneEnv {
        type Facts = FactSet;

        fn name(&self) -> &str {
            "prune-env"
        }

        fn collect(&self, root: &Node) -> FactSet {
            let defined: BTreeSet<String> = keys(root, &self.env).into_iter().collect();
            let used = defined
                .iter()
                .filter(|name| scalars(root).iter().any(|text| text.contains(&format!("${name}"))))
                .cloned()
                .collect();
            FactSet { defined, used }
        }

        fn should_mutate(&self, facts: &FactSet) -> bool {
            !facts.unused().is_empty()
        }

        fn mutate(&self, root: &mut Node, facts: &FactSet) -> Result<(), RewriteError> {
            walk(root, &mut DeleteUnused { facts, env: &self.env })?;
            Ok(())
        }
    }

    #[test]
    fn two_phase_deletes_only_unused_names() {
        let step = TwoPhaseStep(PruneEnv {
            env: PathQuery::parse("$.env").unwrap(),
        });
        let out = step.apply(doc()).unwrap();
        assert_eq!(out.get_keys(&["env"]).map(Node::to_json), Some(json!({"A": "1", "C": "3"})));

        let again = step.apply(out.clone()).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn fact_set_difference() {
        let facts = FactSet {
            defined: ["x", "y"].map(String::from).into(),
            used: ["x", "z"].map(String::from).into(),
        };
        assert_eq!(facts.unused(), BTreeSet::from(["y".to_string()]));
        assert!(facts.is_unused("y"));
        assert!(!facts.is_unused("z"));
    }
}
