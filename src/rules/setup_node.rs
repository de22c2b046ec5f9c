use crate::rewrite::RewriteStep;
use crate::rules::setup_java::raise_major_version;
use crate::rules::RuleError;

const NODE_VERSION_QUERY: &str =
    "..steps[?(@.uses =~ 'actions/setup-node@v*.*')].with.node-version";

pub const DEFAULT_MINIMUM_NODE_VERSION: u32 = 24;

/// Raise `with.node-version` of setup-node steps to `minimum` when its major
/// version is lower. Ranges like `20.x`, aliases like `lts/*` and
/// expressions are kept.
pub fn setup_node_upgrade_node_version(
    name: &str,
    minimum: u32,
) -> Result<RewriteStep, RuleError> {
    raise_major_version(name, NODE_VERSION_QUERY, minimum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::Step;
    use crate::tree::Node;
    use serde_json::json;

    #[test]
    fn raises_old_majors_and_keeps_the_rest() {
        let rule = setup_node_upgrade_node_version("node", DEFAULT_MINIMUM_NODE_VERSION).unwrap();
        let tree = Node::from_json(&json!({"jobs": {
            "web": {"steps": [
                {"uses": "actions/setup-node@v4", "with": {"node-version": "18.20.4"}},
                {"uses": "actions/setup-node@v4", "with": {"node-version": "20.x"}},
                {"uses": "actions/setup-node@v3", "with": {"node-version": 16}},
                {"uses": "actions/setup-node@v4", "with": {"node-version": "lts/*"}},
                {"uses": "actions/setup-node@v4", "with": {"node-version": "24.1.0"}},
                {"uses": "actions/setup-java@v4", "with": {"node-version": "12"}}
            ]}
        }}));
        let out = rule.apply(tree).unwrap();
        let versions: Vec<_> = out
            .get_keys(&["jobs", "web", "steps"])
            .and_then(Node::as_sequence)
            .unwrap()
            .items()
            .iter()
            .map(|step| step.get_keys(&["with", "node-version"]).map(Node::to_json))
            .collect();
        assert_eq!(
            versions,
            [
                Some(json!("24")),
                Some(json!("20.x")),
                Some(json!(24)),
                Some(json!("lts/*")),
                Some(json!("24.1.0")),
                Some(json!("12")),
            ]
        );
        assert_eq!(rule.apply(out.clone()).unwrap(), out);
    }

    #[test]
    fn custom_minimum_is_honoured() {
        let rule = setup_node_upgrade_node_version("node", 20).unwrap();
        let tree = Node::from_json(&json!({"jobs": {"a": {"steps": [
            {"uses": "actions/setup-node@v4", "with": {"node-version": "18"}},
            {"uses": "actions/setup-node@v4", "with": {"node-version": "22"}}
        ]}}}));
        let out = rule.apply(tree).unwrap();
        assert_eq!(
            out.get_keys(&["jobs", "a", "steps"]).map(Node::to_json),
            Some(json!([
                {"uses": "actions/setup-node@v4", "with": {"node-version": "20"}},
                {"uses": "actions/setup-node@v4", "with": {"node-version": "22"}}
            ]))
        );
    }
}
