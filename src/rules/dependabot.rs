//! Dependabot rules: schedule intervals and release cooldowns.

use crate::editor::{self, NewChild};
use crate::path::PathQuery;
use crate::rewrite::{RewriteError, RewriteStep, VisitorStep};
use crate::rules::{quote_regex, set_scalar, RuleError};
use crate::tree::{display_path, Node, NodeKind};
use crate::visit::{Cursor, Rewrite, Visitor};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Intervals dependabot accepts for `schedule.interval`.
pub const SCHEDULE_INTERVALS: &[&str] = &["daily", "weekly", "monthly"];

/// Set `schedule.interval` of the `updates` entries for `ecosystem`.
pub fn change_dependabot_schedule_interval(
    name: &str,
    ecosystem: &str,
    interval: &str,
) -> Result<RewriteStep, RuleError> {
    if !SCHEDULE_INTERVALS.contains(&interval) {
        return Err(RuleError::invalid(
            name,
            format!("interval '{interval}' is not one of {}", SCHEDULE_INTERVALS.join(", ")),
        ));
    }
    let query = format!(
        "$.updates[?(@.package-ecosystem =~ '{}')].schedule.interval",
        quote_regex(ecosystem)
    );
    let interval = interval.to_string();
    RewriteStep::new(name, &query, move |node, _| Ok(set_scalar(node, &interval)))
        .map_err(RuleError::query(name))
}

pub const COOLDOWN_DAYS: std::ops::RangeInclusive<u32> = 1..=90;
pub const MAX_COOLDOWN_PATTERNS: usize = 150;

/// Options of `add-dependabot-cooldown`, as written in a rule-set file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Cooldown {
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: u32,
    #[serde(default)]
    pub semver_major_days: Option<u32>,
    #[serde(default)]
    pub semver_minor_days: Option<u32>,
    #[serde(default)]
    pub semver_patch_days: Option<u32>,
    /// Dependency names or `*` patterns the cooldown is limited to.
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_cooldown_days() -> u32 {
    7
}

impl Default for Cooldown {
    fn default() -> Self {
        Self {
            cooldown_days: default_cooldown_days(),
            semver_major_days: None,
            semver_minor_days: None,
            semver_patch_days: None,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl Cooldown {
    /// Every problem with these options, in field order.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let days = [
            ("cooldown_days", Some(self.cooldown_days)),
            ("semver_major_days", self.semver_major_days),
            ("semver_minor_days", self.semver_minor_days),
            ("semver_patch_days", self.semver_patch_days),
        ];
        for (field, value) in days {
            if let Some(value) = value.filter(|value| !COOLDOWN_DAYS.contains(value)) {
                problems.push(format!("{field} must be between 1 and 90, got {value}"));
            }
        }
        for (field, patterns) in [("include", &self.include), ("exclude", &self.exclude)] {
            if patterns.len() > MAX_COOLDOWN_PATTERNS {
                problems.push(format!(
                    "{field} is limited to {MAX_COOLDOWN_PATTERNS} entries, got {}",
                    patterns.len()
                ));
            }
        }
        problems
    }

    /// The `cooldown` mapping dependabot reads.
    fn to_node(&self) -> Node {
        let mut cooldown = Map::new();
        cooldown.insert("default-days".into(), json!(self.cooldown_days));
        let semver = [
            ("semver-major-days", self.semver_major_days),
            ("semver-minor-days", self.semver_minor_days),
            ("semver-patch-days", self.semver_patch_days),
        ];
        for (key, days) in semver {
            if let Some(days) = days {
                cooldown.insert(key.into(), json!(days));
            }
        }
        for (key, patterns) in [("include", &self.include), ("exclude", &self.exclude)] {
            if !patterns.is_empty() {
                cooldown.insert(key.into(), json!(patterns));
            }
        }
        Node::fragment(&Value::Object(cooldown))
    }
}

const ECOSYSTEM_QUERY: &str = "$.updates[*].package-ecosystem";
const ADD_COOLDOWN: &str = "ADD_COOLDOWN";

/// Appends a `cooldown` entry to every update configuration without one.
#[derive(Debug, Clone)]
pub struct AddCooldown {
    ecosystem: PathQuery,
    cooldown: Node,
}

impl Visitor for AddCooldown {
    fn enter(&mut self, _node: &Node, cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        if self.ecosystem.matches(cursor) {
            cursor.put_message_on_nearest(|n| n.kind() == NodeKind::Mapping, ADD_COOLDOWN, ());
        }
        Ok(Rewrite::Unchanged)
    }

    fn leave(&mut self, node: &Node, cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        if cursor.take_message::<()>(ADD_COOLDOWN).is_none() {
            return Ok(Rewrite::Unchanged);
        }
        if node.as_mapping().map_or(true, |update| update.contains_key("cooldown")) {
            return Ok(Rewrite::Unchanged);
        }
        let mut update = node.clone();
        editor::append(&mut update, NewChild::entry("cooldown", self.cooldown.clone())).map_err(
            |source| RewriteError::Edit {
                path: display_path(cursor.path()),
                source,
            },
        )?;
        debug!(path = %display_path(cursor.path()), "added cooldown");
        Ok(Rewrite::Replace(update))
    }
}

/// Hold back version updates until a release has been public for a number
/// of days. Update configurations that already have a `cooldown` keep it.
pub fn add_dependabot_cooldown(
    name: &str,
    cooldown: Cooldown,
) -> Result<VisitorStep<impl Fn() -> AddCooldown + Send + Sync>, RuleError> {
    let problems = cooldown.problems();
    if !problems.is_empty() {
        return Err(RuleError::invalid(name, problems.join("; ")));
    }
    let visitor = AddCooldown {
        ecosystem: PathQuery::parse(ECOSYSTEM_QUERY).map_err(RuleError::query(name))?,
        cooldown: cooldown.to_node(),
    };
    VisitorStep::new(name, move || visitor.clone())
        .with_precondition(ECOSYSTEM_QUERY)
        .map_err(RuleError::query(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::Step;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn changes_only_the_named_ecosystem() {
        let rule =
            change_dependabot_schedule_interval("weekly-gradle", "gradle", "weekly").unwrap();
        let tree = Node::from_json(&json!({
            "version": 2,
            "updates": [
                {"package-ecosystem": "gradle", "schedule": {"interval": "daily"}},
                {"package-ecosystem": "github-actions", "schedule": {"interval": "daily"}}
            ]
        }));
        let out = rule.apply(tree).unwrap();
        assert_eq!(
            out.to_json(),
            json!({
                "version": 2,
                "updates": [
                    {"package-ecosystem": "gradle", "schedule": {"interval": "weekly"}},
                    {"package-ecosystem": "github-actions", "schedule": {"interval": "daily"}}
                ]
            })
        );
    }

    #[test]
    fn rejects_unknown_interval() {
        let err = change_dependabot_schedule_interval("x", "npm", "hourly").unwrap_err();
        assert!(err.to_string().contains("hourly"));
    }

    #[test]
    fn interval_of_unexpected_shape_is_left_alone() {
        let rule = change_dependabot_schedule_interval("weekly", "npm", "weekly").unwrap();
        let tree = Node::from_json(&json!({
            "updates": [{
                "package-ecosystem": "npm",
                "schedule": {"interval": {"unexpected": "shape"}}
            }]
        }));
        assert_eq!(rule.apply(tree.clone()).unwrap(), tree);
    }

    #[test]
    fn cooldown_is_added_once_per_update() {
        let rule = add_dependabot_cooldown("cooldown", Cooldown::default()).unwrap();
        let tree = Node::from_json(&json!({
            "version": 2,
            "updates": [
                {"package-ecosystem": "npm", "directory": "/"},
                {"package-ecosystem": "gradle", "cooldown": {"default-days": 3}}
            ]
        }));
        let out = rule.apply(tree).unwrap();
        assert_eq!(
            out.get_keys(&["updates"]).map(Node::to_json),
            Some(json!([
                {"package-ecosystem": "npm", "directory": "/", "cooldown": {"default-days": 7}},
                {"package-ecosystem": "gradle", "cooldown": {"default-days": 3}}
            ]))
        );
        let update = out
            .get_keys(&["updates"])
            .and_then(|updates| updates.child(&crate::tree::Segment::Index(0)));
        let update = update.and_then(Node::as_mapping).unwrap();
        assert_eq!(
            update.get("cooldown").unwrap().format().indent,
            update.get("directory").unwrap().format().indent
        );
        assert_eq!(rule.apply(out.clone()).unwrap(), out);
    }

    #[test]
    fn cooldown_carries_every_configured_option() {
        let cooldown = Cooldown {
            cooldown_days: 5,
            semver_major_days: Some(30),
            semver_patch_days: Some(2),
            include: vec!["react*".to_string()],
            ..Cooldown::default()
        };
        let rule = add_dependabot_cooldown("cooldown", cooldown).unwrap();
        let tree = Node::from_json(&json!({"updates": [{"package-ecosystem": "npm"}]}));
        let out = rule.apply(tree).unwrap();
        assert_eq!(
            out.get_keys(&["updates"]).map(Node::to_json),
            Some(json!([{"package-ecosystem": "npm", "cooldown": {
                "default-days": 5,
                "semver-major-days": 30,
                "semver-patch-days": 2,
                "include": ["react*"]
            }}]))
        );
    }

    #[test]
    fn out_of_range_days_are_rejected() {
        let cooldown = Cooldown {
            cooldown_days: 0,
            semver_minor_days: Some(91),
            exclude: vec!["x".to_string(); MAX_COOLDOWN_PATTERNS + 1],
            ..Cooldown::default()
        };
        assert_eq!(cooldown.problems().len(), 3);
        assert!(matches!(
            add_dependabot_cooldown("cooldown", cooldown),
            Err(RuleError::InvalidOption { .. })
        ));
    }
}
