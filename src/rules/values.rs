//! Generic value rules: set, delete, and list replacement at a query.

use crate::rewrite::RewriteStep;
use crate::rules::{quote, set_scalar, RuleError};
use crate::tree::{Node, Scalar, Sequence};
use crate::visit::Rewrite;

/// Set every node `query` selects to the scalar `value`.
pub fn change_value(name: &str, query: &str, value: &str) -> Result<RewriteStep, RuleError> {
    let value = value.to_string();
    RewriteStep::new(name, query, move |node, _| Ok(set_scalar(node, &value)))
        .and_then(|step| step.with_precondition(query))
        .map_err(RuleError::query(name))
}

/// Delete every entry or item `query` selects, e.g. `$.on.schedule`.
pub fn delete_key(name: &str, query: &str) -> Result<RewriteStep, RuleError> {
    RewriteStep::new(name, query, |_, _| Ok(Rewrite::Delete))
        .and_then(|step| step.with_precondition(query))
        .map_err(RuleError::query(name))
}

/// Set `$.jobs.<job>.runs-on` to a flow list of runners.
pub fn replace_runners(
    name: &str,
    job: &str,
    runners: &[String],
) -> Result<RewriteStep, RuleError> {
    if runners.is_empty() {
        return Err(RuleError::invalid(name, "at least one runner is required"));
    }
    let query = format!("$.jobs['{}'].runs-on", quote(job));
    let runners = runners.to_vec();
    RewriteStep::new(name, &query, move |node, _| {
        if holds_runners(node, &runners) {
            return Ok(Rewrite::Unchanged);
        }
        let items = runners.iter().map(|runner| Node::Scalar(Scalar::new(runner.as_str())));
        let mut list = Sequence::from_items(items);
        list.format.flow = true;
        Ok(Rewrite::Replace(Node::Sequence(list)))
    })
    .map_err(RuleError::query(name))
}

fn holds_runners(node: &Node, runners: &[String]) -> bool {
    node.as_sequence().is_some_and(|list| {
        list.len() == runners.len()
            && list
                .items()
                .iter()
                .zip(runners)
                .all(|(item, runner)| item.as_str() == Some(runner.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::Step;
    use serde_json::json;

    #[test]
    fn change_value_sets_and_then_holds() {
        let step = change_value("timeout", "$.jobs.*.timeout-minutes", "30").unwrap();
        let tree = Node::from_json(&json!({"jobs": {
            "a": {"timeout-minutes": 10},
            "b": {"runs-on": "x"}
        }}));
        let once = step.apply(tree).unwrap();
        assert_eq!(
            once.to_json(),
            json!({"jobs": {"a": {"timeout-minutes": 30}, "b": {"runs-on": "x"}}})
        );
        assert_eq!(step.apply(once.clone()).unwrap(), once);
    }

    #[test]
    fn delete_key_removes_cron_triggers() {
        let step = delete_key("no-cron", "$.on.schedule").unwrap();
        let tree = Node::from_json(&json!({"on": {
            "push": {},
            "schedule": [{"cron": "0 0 * * *"}],
            "pull_request": {}
        }}));
        let out = step.apply(tree).unwrap();
        assert_eq!(out.to_json(), json!({"on": {"push": {}, "pull_request": {}}}));
    }

    #[test]
    fn replace_runners_writes_flow_list_once() {
        let runners = ["ubuntu-latest".to_string(), "windows-latest".to_string()];
        let step = replace_runners("runners", "build", &runners).unwrap();
        let tree = Node::from_json(&json!({"jobs": {
            "build": {"runs-on": "ubuntu-20.04"},
            "test": {"runs-on": "x"}
        }}));
        let once = step.apply(tree).unwrap();
        assert_eq!(
            once.to_json(),
            json!({"jobs": {
                "build": {"runs-on": ["ubuntu-latest", "windows-latest"]},
                "test": {"runs-on": "x"}
            }})
        );
        let runs_on = once.get_keys(&["jobs", "build", "runs-on"]).unwrap();
        assert!(runs_on.format().flow);
        assert_eq!(runs_on.format().indent, Some(6));
        assert_eq!(step.apply(once.clone()).unwrap(), once);
    }

    #[test]
    fn replace_runners_needs_a_runner() {
        assert!(matches!(
            replace_runners("runners", "build", &[]),
            Err(RuleError::InvalidOption { .. })
        ));
    }
}
