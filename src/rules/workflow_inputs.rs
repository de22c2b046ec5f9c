//! Rules over workflow inputs: unused `workflow_dispatch` inputs and
//! arguments passed to reusable workflows.

use crate::editor;
use crate::path::{find_all, PathQuery};
use crate::rewrite::collect::{keys, scalars};
use crate::rewrite::{FactSet, RewriteError, TwoPhase, TwoPhaseStep, VisitorStep};
use crate::rules::RuleError;
use crate::tree::{display_path, Mapping, Node, NodeKind};
use crate::visit::{walk, Cursor, Rewrite, Visitor};
use regex::Regex;
use tracing::debug;

const INPUTS_QUERY: &str = "$.on.workflow_dispatch.inputs";
const DISPATCH_QUERY: &str = "$.on.workflow_dispatch";
const INPUT_USAGE: &str = concat!(
    r"(?:github *[.] *event *[.] *inputs *[.] *([A-Za-z_][A-Za-z0-9_-]*)",
    r"|inputs *[.] *([A-Za-z_][A-Za-z0-9_-]*))",
);

/// Collect-then-mutate analysis behind `remove-unused-workflow-dispatch-inputs`.
#[derive(Debug, Clone)]
pub struct UnusedDispatchInputs {
    name: String,
    inputs: PathQuery,
    dispatch: PathQuery,
    usage: Regex,
}

/// Remove `on.workflow_dispatch.inputs` entries that no value in the
/// workflow refers to as `inputs.NAME` or `github.event.inputs.NAME`.
///
/// When every input goes, `workflow_dispatch` collapses to `{}` instead of
/// keeping an empty `inputs` mapping.
pub fn remove_unused_workflow_dispatch_inputs(
    name: &str,
) -> Result<TwoPhaseStep<UnusedDispatchInputs>, RuleError> {
    Ok(TwoPhaseStep(UnusedDispatchInputs {
        name: name.to_string(),
        inputs: PathQuery::parse(INPUTS_QUERY).map_err(RuleError::query(name))?,
        dispatch: PathQuery::parse(DISPATCH_QUERY).map_err(RuleError::query(name))?,
        usage: Regex::new(INPUT_USAGE).map_err(|source| RuleError::Pattern {
            rule: name.to_string(),
            source,
        })?,
    }))
}

struct DeleteUnusedInputs<'a> {
    inputs: &'a PathQuery,
    facts: &'a FactSet,
}

impl Visitor for DeleteUnusedInputs<'_> {
    fn enter(&mut self, _node: &Node, cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        let Some(name) = cursor.key() else {
            return Ok(Rewrite::Unchanged);
        };
        let parent = &cursor.path()[..cursor.depth() - 1];
        if self.facts.is_unused(name) && self.inputs.matches_path(cursor.root(), parent) {
            debug!(input = name, "removing unused input");
            return Ok(Rewrite::Delete);
        }
        Ok(Rewrite::Unchanged)
    }
}

impl TwoPhase for UnusedDispatchInputs {
    type Facts = FactSet;

    fn name(&self) -> &str {
        &self.name
    }

    fn precondition(&self) -> Option<&PathQuery> {
        Some(&self.inputs)
    }

    fn collect(&self, root: &Node) -> FactSet {
        let defined = keys(root, &self.inputs).into_iter().collect();
        let used = scalars(root)
            .into_iter()
            .flat_map(|text| self.usage.captures_iter(text))
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|name| name.as_str().to_string())
            .collect();
        FactSet { defined, used }
    }

    fn should_mutate(&self, facts: &FactSet) -> bool {
        facts.defined.iter().any(|name| facts.is_unused(name))
    }

    fn mutate(&self, root: &mut Node, facts: &FactSet) -> Result<(), RewriteError> {
        walk(
            root,
            &mut DeleteUnusedInputs {
                inputs: &self.inputs,
                facts,
            },
        )?;
        Ok(())
    }

    fn cleanup(&self, root: &mut Node, _facts: &FactSet) -> Result<(), RewriteError> {
        for path in find_all(root, &self.dispatch) {
            let emptied = root
                .get_path(&path)
                .and_then(Node::as_mapping)
                .is_some_and(|dispatch| {
                    dispatch.len() == 1
                        && dispatch
                            .get("inputs")
                            .and_then(Node::as_mapping)
                            .is_some_and(Mapping::is_empty)
                });
            if emptied {
                let empty = Node::Mapping(Mapping::empty_flow());
                editor::replace_path(root, &path, empty).map_err(|source| RewriteError::Edit {
                    path: display_path(&path),
                    source,
                })?;
            }
        }
        Ok(())
    }
}

const REMOVE_INPUT: &str = "REMOVE_INPUT";

/// Finds `uses: <workflow>@<version>` and drops `input` from the sibling
/// `with:` mapping once the enclosing job or step has been walked.
#[derive(Debug, Clone)]
pub struct RemoveInputArgument {
    reference: String,
    input: String,
}

impl Visitor for RemoveInputArgument {
    fn enter(&mut self, node: &Node, cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        if cursor.key() == Some("uses") && node.as_str() == Some(self.reference.as_str()) {
            cursor.put_message_on_nearest(|n| n.kind() == NodeKind::Mapping, REMOVE_INPUT, ());
        }
        Ok(Rewrite::Unchanged)
    }

    fn leave(&mut self, node: &Node, cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        if cursor.take_message::<()>(REMOVE_INPUT).is_none() {
            return Ok(Rewrite::Unchanged);
        }
        let has_input = node
            .get_keys(&["with"])
            .and_then(Node::as_mapping)
            .is_some_and(|with| with.contains_key(&self.input));
        if !has_input {
            return Ok(Rewrite::Unchanged);
        }

        let mut call = node.clone();
        if let Some(with) = call
            .as_mapping_mut()
            .and_then(|call| call.get_mut("with"))
            .and_then(Node::as_mapping_mut)
        {
            with.remove(&self.input);
            if with.is_empty() {
                with.format.flow = true;
            }
        }
        Ok(Rewrite::Replace(call))
    }
}

/// Remove the `with.<input>` argument from every call to `workflow@version`.
pub fn remove_workflow_input_argument(
    name: &str,
    workflow: &str,
    version: &str,
    input: &str,
) -> Result<VisitorStep<impl Fn() -> RemoveInputArgument + Send + Sync>, RuleError> {
    if workflow.is_empty() || version.is_empty() || input.is_empty() {
        return Err(RuleError::invalid(name, "workflow, version and input must all be set"));
    }
    let visitor = RemoveInputArgument {
        reference: format!("{workflow}@{version}"),
        input: input.to_string(),
    };
    Ok(VisitorStep::new(name, move || visitor.clone()))
}
