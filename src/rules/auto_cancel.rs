use crate::editor::{self, NewChild};
use crate::path::PathQuery;
use crate::rewrite::{RewriteError, VisitorStep};
use crate::rules::RuleError;
use crate::tree::{display_path, Mapping, Node, NodeKind};
use crate::visit::{Cursor, Rewrite, Visitor};

pub const CANCEL_ACTION: &str = "styfle/cancel-workflow-action@0.9.1";

const FIRST_STEP_QUERY: &str = "$.jobs.build.steps[:1].uses";
const STEPS_QUERY: &str = "$.jobs.build.steps";
const ADD_STEP: &str = "ADD_STEP";

/// Prepends the cancel step to `jobs.build.steps` unless the first step
/// already is one.
#[derive(Debug, Clone)]
pub struct AutoCancel {
    first_step: PathQuery,
    steps: PathQuery,
    access_token: String,
}

impl AutoCancel {
    fn cancel_step(&self) -> Result<Node, RewriteError> {
        let token = Node::string(self.access_token.as_str());
        let with = Mapping::from_entries([("access_token", token)])
            .map_err(|source| edit_error(&[], source))?;
        let step = Mapping::from_entries([
            ("uses", Node::string(CANCEL_ACTION)),
            ("with", Node::Mapping(with)),
        ])
        .map_err(|source| edit_error(&[], source))?;
        Ok(Node::Mapping(step))
    }
}

fn edit_error(path: &[crate::tree::Segment], source: editor::EditError) -> RewriteError {
    RewriteError::Edit {
        path: display_path(path),
        source,
    }
}

impl Visitor for AutoCancel {
    fn enter(&mut self, node: &Node, cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        let already_cancels = node
            .as_str()
            .is_some_and(|uses| uses.contains("cancel-workflow-action"));
        if !already_cancels && self.first_step.matches(cursor) {
            cursor.put_message_on_nearest(|n| n.kind() == NodeKind::Sequence, ADD_STEP, ());
        }
        Ok(Rewrite::Unchanged)
    }

    fn leave(&mut self, node: &Node, cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        if !self.steps.matches(cursor) || cursor.take_message::<()>(ADD_STEP).is_none() {
            return Ok(Rewrite::Unchanged);
        }
        let mut steps = node.clone();
        editor::prepend(&mut steps, NewChild::Item(self.cancel_step()?))
            .map_err(|source| edit_error(cursor.path(), source))?;
        Ok(Rewrite::Replace(steps))
    }
}

/// Cancel an in-progress run of the workflow when it is triggered again.
///
/// `access_token` names a secret; without one the workflow's own
/// `github.token` is used.
pub fn auto_cancel_in_progress(
    name: &str,
    access_token: Option<&str>,
) -> Result<VisitorStep<impl Fn() -> AutoCancel + Send + Sync>, RuleError> {
    let access_token = match access_token.filter(|token| !token.is_empty()) {
        Some(secret) => format!("${{{{ secrets.{secret} }}}}"),
        None => "${{ github.token }}".to_string(),
    };
    let visitor = AutoCancel {
        first_step: PathQuery::parse(FIRST_STEP_QUERY).map_err(RuleError::query(name))?,
        steps: PathQuery::parse(STEPS_QUERY).map_err(RuleError::query(name))?,
        access_token,
    };
    VisitorStep::new(name, move || visitor.clone())
        .with_precondition(STEPS_QUERY)
        .map_err(RuleError::query(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::Step;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn build(steps: serde_json::Value) -> Node {
        Node::from_json(&json!({"jobs": {"build": {"runs-on": "ubuntu-latest", "steps": steps}}}))
    }

    #[test]
    fn prepends_cancel_step_with_secret() {
        let rule = auto_cancel_in_progress("cancel", Some("WORKFLOW_TOKEN")).unwrap();
        let out = rule.apply(build(json!([{"uses": "actions/checkout@v4"}]))).unwrap();
        assert_eq!(
            out.get_keys(&["jobs", "build", "steps"]).map(Node::to_json),
            Some(json!([
                {"uses": CANCEL_ACTION, "with": {"access_token": "${{ secrets.WORKFLOW_TOKEN }}"}},
                {"uses": "actions/checkout@v4"}
            ]))
        );
        assert_eq!(rule.apply(out.clone()).unwrap(), out);
    }

    #[test]
    fn inserted_step_is_laid_out_like_its_siblings() {
        let rule = auto_cancel_in_progress("cancel", None).unwrap();
        let out = rule.apply(build(json!([{"uses": "actions/checkout@v4"}]))).unwrap();
        let steps = out.get_keys(&["jobs", "build", "steps"]).and_then(Node::as_sequence).unwrap();
        let (inserted, original) = (&steps.items()[0], &steps.items()[1]);
        assert_eq!(inserted.format().indent, original.format().indent);
        assert_eq!(
            inserted.get_keys(&["with", "access_token"]).and_then(Node::as_str),
            Some("${{ github.token }}")
        );
        assert_eq!(
            inserted.get_keys(&["with", "access_token"]).and_then(|n| n.format().indent),
            original.format().indent.map(|indent| indent + 4)
        );
    }

    #[test]
    fn other_jobs_and_empty_steps_are_left_alone() {
        let rule = auto_cancel_in_progress("cancel", None).unwrap();
        let tree = Node::from_json(&json!({"jobs": {
            "build": {"steps": []},
            "test": {"steps": [{"uses": "actions/checkout@v4"}]}
        }}));
        assert_eq!(rule.apply(tree.clone()).unwrap(), tree);
    }
}
