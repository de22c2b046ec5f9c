use crate::path::PathQuery;
use crate::rules::{self, Cooldown, SCHEDULE_INTERVALS};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RuleSetConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RuleSetConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
            } else if !seen.insert(rule.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    rule_id: rule.id.clone(),
                });
            }
            rule.spec.validate(&rule.id, &mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub spec: RuleSpec,
}

/// Options of one built-in rule, selected by `type`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RuleSpec {
    ChangeValue {
        query: String,
        value: String,
    },
    DeleteKey {
        query: String,
    },
    ChangeActionVersion {
        action: String,
        version: String,
    },
    ChangeAction {
        old_action: String,
        new_action: String,
        new_version: String,
    },
    SetupJavaDistribution {
        #[serde(default = "default_distributions")]
        from: Vec<String>,
        #[serde(default = "default_target_distribution")]
        to: String,
    },
    SetupJavaUpgradeJavaVersion {
        #[serde(default = "default_minimum_java_version")]
        minimum_java_major_version: u32,
    },
    ChangeDependabotScheduleInterval {
        package_ecosystem: String,
        interval: String,
    },
    ReplaceSecrets {
        old_secret_name: String,
        new_secret_name: String,
    },
    RemoveUnusedWorkflowDispatchInputs,
    RemoveWorkflowInputArgument {
        workflow_reference: String,
        version: String,
        input_argument_name: String,
    },
    AutoCancelInProgress {
        #[serde(default)]
        access_token: Option<String>,
    },
    ReplaceRunners {
        job_name: String,
        runners: Vec<String>,
    },
    ReplaceSecretKeys {
        old_key_name: String,
        new_key_name: String,
    },
    AddCronTrigger {
        cron: String,
        /// Text hashed to place macro schedules; the workflow name by default.
        #[serde(default)]
        seed: Option<String>,
    },
    AddDependabotCooldown(Cooldown),
    SetupNodeUpgradeNodeVersion {
        #[serde(default = "default_minimum_node_version")]
        minimum_node_major_version: u32,
    },
    SetupJavaCaching,
    PreferSecretsInheritWorkflow,
}

fn default_distributions() -> Vec<String> {
    rules::setup_java::DEFAULT_DISTRIBUTIONS
        .iter()
        .map(|name| name.to_string())
        .collect()
}

fn default_target_distribution() -> String {
    rules::setup_java::DEFAULT_TARGET_DISTRIBUTION.to_string()
}

fn default_minimum_java_version() -> u32 {
    rules::setup_java::DEFAULT_MINIMUM_JAVA_VERSION
}

fn default_minimum_node_version() -> u32 {
    rules::setup_node::DEFAULT_MINIMUM_NODE_VERSION
}

impl RuleSpec {
    /// The `type` key this rule was declared with.
    pub fn type_id(&self) -> &'static str {
        match self {
            RuleSpec::ChangeValue { .. } => "change-value",
            RuleSpec::DeleteKey { .. } => "delete-key",
            RuleSpec::ChangeActionVersion { .. } => "change-action-version",
            RuleSpec::ChangeAction { .. } => "change-action",
            RuleSpec::SetupJavaDistribution { .. } => "setup-java-distribution",
            RuleSpec::SetupJavaUpgradeJavaVersion { .. } => "setup-java-upgrade-java-version",
            RuleSpec::ChangeDependabotScheduleInterval { .. } => {
                "change-dependabot-schedule-interval"
            }
            RuleSpec::ReplaceSecrets { .. } => "replace-secrets",
            RuleSpec::RemoveUnusedWorkflowDispatchInputs => {
                "remove-unused-workflow-dispatch-inputs"
            }
            RuleSpec::RemoveWorkflowInputArgument { .. } => "remove-workflow-input-argument",
            RuleSpec::AutoCancelInProgress { .. } => "auto-cancel-in-progress",
            RuleSpec::ReplaceRunners { .. } => "replace-runners",
            RuleSpec::ReplaceSecretKeys { .. } => "replace-secret-keys",
            RuleSpec::AddCronTrigger { .. } => "add-cron-trigger",
            RuleSpec::AddDependabotCooldown(_) => "add-dependabot-cooldown",
            RuleSpec::SetupNodeUpgradeNodeVersion { .. } => "setup-node-upgrade-node-version",
            RuleSpec::SetupJavaCaching => "setup-java-caching",
            RuleSpec::PreferSecretsInheritWorkflow => "prefer-secrets-inherit-workflow",
        }
    }

    fn validate(&self, id: &str, issues: &mut Vec<ValidationIssue>) {
        let rule_id = (!id.trim().is_empty()).then(|| id.to_string());
        let mut require = |field: &'static str, value: &str| {
            if value.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: rule_id.clone(),
                    field,
                });
            }
        };

        match self {
            RuleSpec::ChangeValue { query, .. } | RuleSpec::DeleteKey { query } => {
                require("query", query);
                if !query.trim().is_empty() {
                    if let Err(err) = PathQuery::parse(query) {
                        issues.push(ValidationIssue::InvalidQuery {
                            rule_id: rule_id.clone(),
                            message: err.to_string(),
                        });
                    }
                }
            }
            RuleSpec::ChangeActionVersion { action, version } => {
                require("action", action);
                require("version", version);
            }
            RuleSpec::ChangeAction {
                old_action,
                new_action,
                new_version,
            } => {
                require("old_action", old_action);
                require("new_action", new_action);
                require("new_version", new_version);
            }
            RuleSpec::SetupJavaDistribution { from, to } => {
                require("to", to);
                if from.is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        rule_id: rule_id.clone(),
                        field: "from",
                    });
                }
            }
            RuleSpec::SetupJavaUpgradeJavaVersion {
                minimum_java_major_version: 0,
            } => issues.push(ValidationIssue::InvalidCombo {
                rule_id: rule_id.clone(),
                message: "minimum_java_major_version must be positive".to_string(),
            }),
            RuleSpec::SetupNodeUpgradeNodeVersion {
                minimum_node_major_version: 0,
            } => issues.push(ValidationIssue::InvalidCombo {
                rule_id: rule_id.clone(),
                message: "minimum_node_major_version must be positive".to_string(),
            }),
            RuleSpec::SetupJavaUpgradeJavaVersion { .. }
            | RuleSpec::SetupNodeUpgradeNodeVersion { .. } => {}
            RuleSpec::ChangeDependabotScheduleInterval {
                package_ecosystem,
                interval,
            } => {
                require("package_ecosystem", package_ecosystem);
                if !SCHEDULE_INTERVALS.contains(&interval.as_str()) {
                    issues.push(ValidationIssue::InvalidCombo {
                        rule_id: rule_id.clone(),
                        message: format!(
                            "interval '{interval}' is not one of {}",
                            SCHEDULE_INTERVALS.join(", ")
                        ),
                    });
                }
            }
            RuleSpec::ReplaceSecrets {
                old_secret_name,
                new_secret_name,
            } => {
                require("old_secret_name", old_secret_name);
                require("new_secret_name", new_secret_name);
            }
            RuleSpec::RemoveUnusedWorkflowDispatchInputs => {}
            RuleSpec::RemoveWorkflowInputArgument {
                workflow_reference,
                version,
                input_argument_name,
            } => {
                require("workflow_reference", workflow_reference);
                require("version", version);
                require("input_argument_name", input_argument_name);
            }
            RuleSpec::AutoCancelInProgress { .. } => {}
            RuleSpec::ReplaceRunners { job_name, runners } => {
                require("job_name", job_name);
                if runners.is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        rule_id: rule_id.clone(),
                        field: "runners",
                    });
                }
            }
            RuleSpec::ReplaceSecretKeys {
                old_key_name,
                new_key_name,
            } => {
                require("old_key_name", old_key_name);
                require("new_key_name", new_key_name);
            }
            RuleSpec::AddCronTrigger { cron, .. } => require("cron", cron),
            RuleSpec::AddDependabotCooldown(cooldown) => {
                issues.extend(cooldown.problems().into_iter().map(|message| {
                    ValidationIssue::InvalidCombo {
                        rule_id: rule_id.clone(),
                        message,
                    }
                }));
            }
            RuleSpec::SetupJavaCaching | RuleSpec::PreferSecretsInheritWorkflow => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        rule_id: String,
    },
    InvalidQuery {
        rule_id: Option<String>,
        message: String,
    },
    InvalidCombo {
        rule_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rule set contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { rule_id } => {
                write!(f, "rule id '{rule_id}' is used more than once")
            }
            ValidationIssue::InvalidQuery { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}' has an invalid query: {message}"),
                None => write!(f, "invalid query: {message}"),
            },
            ValidationIssue::InvalidCombo { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid rule configuration: {message}"),
            },
        }
    }
}
