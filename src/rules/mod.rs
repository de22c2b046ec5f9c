//! Built-in rules for CI workflow and dependabot documents.
//!
//! Each rule is a thin configuration of the engine: a query, a callback and
//! sometimes a collection pass. Every rule returns `Unchanged` once its
//! target state holds, and for nodes shaped differently than it expects.

pub mod actions;
pub mod auto_cancel;
pub mod cron;
pub mod dependabot;
pub mod errors;
pub mod secrets;
pub mod setup_java;
pub mod setup_node;
pub mod values;
pub mod workflow_inputs;

pub use actions::{change_action, change_action_version, replace_secrets};
pub use auto_cancel::auto_cancel_in_progress;
pub use cron::add_cron_trigger;
pub use dependabot::{
    add_dependabot_cooldown, change_dependabot_schedule_interval, Cooldown, SCHEDULE_INTERVALS,
};
pub use errors::RuleError;
pub use secrets::{prefer_secrets_inherit_workflow, replace_secret_keys};
pub use setup_java::{setup_java_caching, setup_java_distribution, setup_java_upgrade_java_version};
pub use setup_node::setup_node_upgrade_node_version;
pub use values::{change_value, delete_key, replace_runners};
pub use workflow_inputs::{
    remove_unused_workflow_dispatch_inputs, remove_workflow_input_argument,
};

use crate::tree::Node;
use crate::visit::Rewrite;

/// A built-in rule as listed by `flowpatch list-rules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleInfo {
    /// Value of `type` in a rule-set file.
    pub id: &'static str,
    pub summary: &'static str,
}

pub const CATALOGUE: &[RuleInfo] = &[
    RuleInfo {
        id: "change-value",
        summary: "Set the scalar at a query to a fixed value",
    },
    RuleInfo {
        id: "delete-key",
        summary: "Delete every entry a query selects",
    },
    RuleInfo {
        id: "change-action-version",
        summary: "Pin every step using an action to a version",
    },
    RuleInfo {
        id: "change-action",
        summary: "Swap one action for another at a given version",
    },
    RuleInfo {
        id: "setup-java-distribution",
        summary: "Replace actions/setup-java distributions (adopt to temurin by default)",
    },
    RuleInfo {
        id: "setup-java-upgrade-java-version",
        summary: "Raise actions/setup-java java-version below a minimum major version",
    },
    RuleInfo {
        id: "change-dependabot-schedule-interval",
        summary: "Set the update schedule interval for a dependabot package ecosystem",
    },
    RuleInfo {
        id: "replace-secrets",
        summary: "Rename ${{ secrets.NAME }} references in any value",
    },
    RuleInfo {
        id: "remove-unused-workflow-dispatch-inputs",
        summary: "Remove workflow_dispatch inputs that nothing in the workflow references",
    },
    RuleInfo {
        id: "remove-workflow-input-argument",
        summary: "Drop a with: argument from calls to a reusable workflow",
    },
    RuleInfo {
        id: "auto-cancel-in-progress",
        summary: "Prepend a cancel-workflow-action step to the build job",
    },
    RuleInfo {
        id: "replace-runners",
        summary: "Set runs-on of a job to a list of runners",
    },
    RuleInfo {
        id: "replace-secret-keys",
        summary: "Rename a key, such as a secret passed to a reusable workflow, everywhere",
    },
    RuleInfo {
        id: "add-cron-trigger",
        summary: "Add an on.schedule cron trigger to workflows without one",
    },
    RuleInfo {
        id: "add-dependabot-cooldown",
        summary: "Add a cooldown section to every dependabot update configuration",
    },
    RuleInfo {
        id: "setup-node-upgrade-node-version",
        summary: "Raise actions/setup-node node-version below a minimum major version",
    },
    RuleInfo {
        id: "setup-java-caching",
        summary: "Use setup-java's Gradle or Maven cache instead of actions/cache steps",
    },
    RuleInfo {
        id: "prefer-secrets-inherit-workflow",
        summary: "Replace pass-through secrets of reusable workflow calls with inherit",
    },
];

pub fn find(id: &str) -> Option<&'static RuleInfo> {
    CATALOGUE.iter().find(|info| info.id == id)
}

/// Escape `text` for use inside a single-quoted query literal.
pub(crate) fn quote(text: &str) -> String {
    text.replace('\'', "\\'")
}

/// `text` as an exact-match regex inside a single-quoted query literal.
pub(crate) fn quote_regex(text: &str) -> String {
    quote(&regex::escape(text))
}

/// Set a scalar's value, keeping its style. Mappings and sequences are not
/// scalars and stay as they are.
pub(crate) fn set_scalar(node: &Node, value: &str) -> Rewrite {
    match node {
        Node::Scalar(scalar) if scalar.value() == value => Rewrite::Unchanged,
        Node::Scalar(scalar) => Rewrite::Replace(Node::Scalar(scalar.with_value(value))),
        Node::Mapping(_) | Node::Sequence(_) => Rewrite::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathQuery;
    use serde_json::json;

    #[test]
    fn catalogue_ids_are_unique() {
        for (i, info) in CATALOGUE.iter().enumerate() {
            assert!(
                CATALOGUE[i + 1..].iter().all(|other| other.id != info.id),
                "duplicate rule id {}",
                info.id
            );
        }
        assert_eq!(find("replace-secrets").map(|info| info.id), Some("replace-secrets"));
        assert!(find("nope").is_none());
    }

    #[test]
    fn quoted_regex_survives_query_parsing() {
        let query = format!("$[?(@.uses =~ '{}')]", quote_regex("it's/a.b@v1"));
        let query = PathQuery::parse(&query).unwrap();
        let root = Node::from_json(&json!([{"uses": "it's/a.b@v1"}, {"uses": "it's/aXb@v1"}]));
        assert_eq!(crate::path::find_all(&root, &query).len(), 1);
    }

    #[test]
    fn set_scalar_is_idempotent() {
        let node = Node::from_json(&json!("x"));
        assert_eq!(set_scalar(&node, "x"), Rewrite::Unchanged);
        assert!(matches!(set_scalar(&node, "y"), Rewrite::Replace(_)));
    }

    #[test]
    fn set_scalar_leaves_containers_alone() {
        let mapping = Node::from_json(&json!({"unexpected": "shape"}));
        let sequence = Node::from_json(&json!(["a", "b"]));
        assert_eq!(set_scalar(&mapping, "weekly"), Rewrite::Unchanged);
        assert_eq!(set_scalar(&sequence, "weekly"), Rewrite::Unchanged);
    }

    #[test]
    fn catalogue_lists_every_rule_type() {
        assert_eq!(CATALOGUE.len(), 18);
        for id in ["replace-secret-keys", "add-cron-trigger", "setup-java-caching"] {
            assert!(find(id).is_some(), "{id} missing");
        }
    }
}
