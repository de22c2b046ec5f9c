use super::{apply, read, workspace};
use serde_json::json;

#[test]
fn schedule_changes_per_ecosystem() {
    let (_dir, files) = workspace(&[(
        "dependabot.json",
        json!({
            "version": 2,
            "updates": [
                {
                    "package-ecosystem": "gradle",
                    "directory": "/",
                    "schedule": {"interval": "daily", "time": "04:00"}
                },
                {
                    "package-ecosystem": "github-actions",
                    "directory": "/",
                    "schedule": {"interval": "daily"}
                },
                {
                    "package-ecosystem": "npm",
                    "directory": "/web",
                    "schedule": {"interval": "monthly"}
                }
            ]
        }),
    )]);
    let rules = r#"
[[rules]]
id = "gradle-weekly"
type = "change-dependabot-schedule-interval"
package_ecosystem = "gradle"
interval = "weekly"

[[rules]]
id = "actions-monthly"
type = "change-dependabot-schedule-interval"
package_ecosystem = "github-actions"
interval = "monthly"

[[rules]]
id = "npm-monthly"
type = "change-dependabot-schedule-interval"
package_ecosystem = "npm"
interval = "monthly"
"#;

    assert_eq!(apply(rules, &files), vec![vec!["gradle-weekly", "actions-monthly"]]);
    let updates = read(&files[0])["updates"].clone();
    assert_eq!(updates[0]["schedule"], json!({"interval": "weekly", "time": "04:00"}));
    assert_eq!(updates[1]["schedule"], json!({"interval": "monthly"}));
    assert_eq!(updates[2]["schedule"], json!({"interval": "monthly"}));
    assert_eq!(updates[0]["package-ecosystem"], json!("gradle"));
}

#[test]
fn ecosystem_names_match_literally() {
    let (_dir, files) = workspace(&[(
        "dependabot.json",
        json!({
            "version": 2,
            "updates": [
                {"package-ecosystem": "pip", "schedule": {"interval": "daily"}},
                {"package-ecosystem": "pipenv", "schedule": {"interval": "daily"}}
            ]
        }),
    )]);
    let rules = r#"
[[rules]]
id = "pip-weekly"
type = "change-dependabot-schedule-interval"
package_ecosystem = "pip"
interval = "weekly"
"#;

    assert_eq!(apply(rules, &files), vec![vec!["pip-weekly"]]);
    let updates = read(&files[0])["updates"].clone();
    assert_eq!(updates[0]["schedule"]["interval"], json!("weekly"));
    assert_eq!(updates[1]["schedule"]["interval"], json!("daily"));
}

#[test]
fn cooldown_joins_each_update_without_one() {
    let (_dir, files) = workspace(&[(
        "dependabot.json",
        json!({
            "version": 2,
            "updates": [
                {"package-ecosystem": "npm", "directory": "/", "schedule": {"interval": "daily"}},
                {
                    "package-ecosystem": "maven",
                    "directory": "/",
                    "cooldown": {"default-days": 2}
                }
            ]
        }),
    )]);
    let rules = r#"
[[rules]]
id = "cooldown"
type = "add-dependabot-cooldown"
cooldown_days = 10
semver_major_days = 30
include = ["lodash", "react*"]

[[rules]]
id = "npm-weekly"
type = "change-dependabot-schedule-interval"
package_ecosystem = "npm"
interval = "weekly"
"#;

    assert_eq!(apply(rules, &files), vec![vec!["cooldown", "npm-weekly"]]);
    let updates = read(&files[0])["updates"].clone();
    assert_eq!(
        updates[0]["cooldown"],
        json!({"default-days": 10, "semver-major-days": 30, "include": ["lodash", "react*"]})
    );
    assert_eq!(updates[0]["schedule"]["interval"], json!("weekly"));
    assert_eq!(updates[1]["cooldown"], json!({"default-days": 2}));

    let text = std::fs::read_to_string(&files[0]).unwrap();
    assert!(text.contains("\n      \"cooldown\": {\n        \"default-days\": 10,"));
}
