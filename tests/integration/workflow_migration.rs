use super::{apply, read, workspace};
use pretty_assertions::assert_eq;
use serde_json::json;

const MIGRATION: &str = r#"
[meta]
name = "workflow-migration"

[[rules]]
id = "checkout-v4"
type = "change-action-version"
action = "actions/checkout"
version = "v4"

[[rules]]
id = "gradle-action"
type = "change-action"
old_action = "eskatos/gradle-command-action"
new_action = "gradle/gradle-build-action"
new_version = "v2"

[[rules]]
id = "drop-schedule"
type = "delete-key"
query = "$.on.schedule"

[[rules]]
id = "rename-token"
type = "replace-secrets"
old_secret_name = "GH_TOKEN"
new_secret_name = "RELEASE_TOKEN"

[[rules]]
id = "unused-inputs"
type = "remove-unused-workflow-dispatch-inputs"

[[rules]]
id = "drop-legacy-arg"
type = "remove-workflow-input-argument"
workflow_reference = "acme/shared/.github/workflows/release.yml"
version = "v1"
input_argument_name = "legacy-mode"

[[rules]]
id = "runners"
type = "replace-runners"
job_name = "build"
runners = ["self-hosted", "linux", "x64"]
"#;

#[test]
fn migrates_build_and_release_workflows() {
    let (_dir, files) = workspace(&[
        (
            "workflows/build.json",
            json!({
                "name": "build",
                "on": {
                    "push": {"branches": ["main"]},
                    "schedule": [{"cron": "0 3 * * *"}],
                    "workflow_dispatch": {"inputs": {"verbose": {"type": "boolean"}}}
                },
                "jobs": {
                    "build": {
                        "runs-on": "ubuntu-latest",
                        "steps": [
                            {"uses": "actions/checkout@v2", "with": {"fetch-depth": 0}},
                            {
                                "uses": "eskatos/gradle-command-action@v1",
                                "with": {"arguments": "build"}
                            },
                            {"run": "./publish.sh", "env": {"TOKEN": "${{ secrets.GH_TOKEN }}"}}
                        ]
                    }
                }
            }),
        ),
        (
            "workflows/release.json",
            json!({
                "name": "release",
                "on": {"push": {"tags": ["v*"]}},
                "jobs": {
                    "release": {
                        "uses": "acme/shared/.github/workflows/release.yml@v1",
                        "with": {"legacy-mode": true, "channel": "stable"},
                        "secrets": {"token": "${{ secrets.GH_TOKEN }}"}
                    }
                }
            }),
        ),
    ]);

    let changed = apply(MIGRATION, &files);
    assert_eq!(
        changed,
        vec![
            vec![
                "checkout-v4",
                "gradle-action",
                "drop-schedule",
                "rename-token",
                "unused-inputs",
                "runners"
            ],
            vec!["rename-token", "drop-legacy-arg"],
        ]
    );

    assert_eq!(
        read(&files[0]),
        json!({
            "name": "build",
            "on": {
                "push": {"branches": ["main"]},
                "workflow_dispatch": {}
            },
            "jobs": {
                "build": {
                    "runs-on": ["self-hosted", "linux", "x64"],
                    "steps": [
                        {"uses": "actions/checkout@v4", "with": {"fetch-depth": 0}},
                        {"uses": "gradle/gradle-build-action@v2", "with": {"arguments": "build"}},
                        {"run": "./publish.sh", "env": {"TOKEN": "${{ secrets.RELEASE_TOKEN }}"}}
                    ]
                }
            }
        })
    );
    assert_eq!(
        read(&files[1])["jobs"]["release"],
        json!({
            "uses": "acme/shared/.github/workflows/release.yml@v1",
            "with": {"channel": "stable"},
            "secrets": {"token": "${{ secrets.RELEASE_TOKEN }}"}
        })
    );

    // the migrated tree is a fixed point
    assert_eq!(apply(MIGRATION, &files), vec![Vec::<String>::new(), Vec::new()]);
}

#[test]
fn auto_cancel_goes_first_in_build_steps() {
    let (_dir, files) = workspace(&[(
        "ci.json",
        json!({
            "jobs": {
                "build": {"steps": [{"uses": "actions/checkout@v4"}, {"run": "make"}]},
                "test": {"steps": [{"uses": "actions/checkout@v4"}]}
            }
        }),
    )]);
    let rules = r#"
[[rules]]
id = "cancel"
type = "auto-cancel-in-progress"
"#;

    assert_eq!(apply(rules, &files), vec![vec!["cancel"]]);
    let doc = read(&files[0]);
    assert_eq!(
        doc["jobs"]["build"]["steps"][0],
        json!({
            "uses": "styfle/cancel-workflow-action@0.9.1",
            "with": {"access_token": "${{ github.token }}"}
        })
    );
    assert_eq!(doc["jobs"]["build"]["steps"].as_array().map(Vec::len), Some(3));
    assert_eq!(doc["jobs"]["test"]["steps"].as_array().map(Vec::len), Some(1));

    assert_eq!(apply(rules, &files), vec![Vec::<String>::new()]);
}
