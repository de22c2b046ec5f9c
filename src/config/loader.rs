//! Rule-set loading: TOML text in, a validated rule set compiled into a
//! [`Pipeline`] out.
//!
//! Every query and pattern is compiled while loading, so a rule set that
//! loads cleanly cannot fail on a malformed rule once documents are read.

use crate::config::schema::{RuleDefinition, RuleSetConfig, RuleSpec, ValidationError};
use crate::rewrite::{Pipeline, Step};
use crate::rules::{self, RuleError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Where a rule set was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Inline,
    File(PathBuf),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Inline => f.write_str("<inline rule set>"),
            Origin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read rule set {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{origin}: malformed rule set: {source}")]
    Toml {
        origin: Origin,
        /// One-based line the parser stopped at, when it reported one.
        line: Option<usize>,
        source: toml_edit::de::Error,
    },

    #[error("{origin}: invalid rule set: {source}")]
    Validation {
        origin: Origin,
        source: ValidationError,
    },

    #[error("{origin}: rule #{position} '{id}' ({rule_type}) does not compile: {source}")]
    Rule {
        origin: Origin,
        /// One-based position of the rule in the file.
        position: usize,
        id: String,
        rule_type: &'static str,
        source: RuleError,
    },
}

/// A loaded rule set: its definitions and the pipeline they compile to.
#[derive(Debug)]
pub struct RuleSet {
    pub origin: Origin,
    pub config: RuleSetConfig,
    pub pipeline: Pipeline,
}

impl RuleSet {
    pub fn name(&self) -> &str {
        &self.config.meta.name
    }
}

pub fn load_from_str(input: &str) -> Result<RuleSet, ConfigError> {
    load(input, Origin::Inline)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RuleSet, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load(&contents, Origin::File(path.to_path_buf()))
}

fn load(input: &str, origin: Origin) -> Result<RuleSet, ConfigError> {
    let config: RuleSetConfig =
        toml_edit::de::from_str(input).map_err(|source| ConfigError::Toml {
            line: source.span().map(|span| line_of(input, span.start)),
            origin: origin.clone(),
            source,
        })?;
    config.validate().map_err(|source| ConfigError::Validation {
        origin: origin.clone(),
        source,
    })?;
    let pipeline = compile(&config, &origin)?;
    debug!(%origin, rules = pipeline.len(), "loaded rule set");
    Ok(RuleSet {
        origin,
        config,
        pipeline,
    })
}

/// Compile rule definitions built in memory into a pipeline, in order.
pub fn build_pipeline(config: &RuleSetConfig) -> Result<Pipeline, ConfigError> {
    compile(config, &Origin::Inline)
}

fn compile(config: &RuleSetConfig, origin: &Origin) -> Result<Pipeline, ConfigError> {
    let mut pipeline = Pipeline::new();
    for (index, rule) in config.rules.iter().enumerate() {
        let step = build_step(rule).map_err(|source| ConfigError::Rule {
            origin: origin.clone(),
            position: index + 1,
            id: rule.id.clone(),
            rule_type: rule.spec.type_id(),
            source,
        })?;
        debug!(rule = %rule.id, kind = rule.spec.type_id(), "compiled rule");
        pipeline.push(step);
    }
    Ok(pipeline)
}

/// Build the engine step for one rule definition.
pub fn build_step(rule: &RuleDefinition) -> Result<Box<dyn Step>, RuleError> {
    let id = rule.id.as_str();
    let step: Box<dyn Step> = match &rule.spec {
        RuleSpec::ChangeValue { query, value } => {
            Box::new(rules::change_value(id, query, value)?)
        }
        RuleSpec::DeleteKey { query } => Box::new(rules::delete_key(id, query)?),
        RuleSpec::ChangeActionVersion { action, version } => {
            Box::new(rules::change_action_version(id, action, version)?)
        }
        RuleSpec::ChangeAction {
            old_action,
            new_action,
            new_version,
        } => Box::new(rules::change_action(id, old_action, new_action, new_version)?),
        RuleSpec::SetupJavaDistribution { from, to } => {
            Box::new(rules::setup_java_distribution(id, from, to)?)
        }
        RuleSpec::SetupJavaUpgradeJavaVersion {
            minimum_java_major_version,
        } => Box::new(rules::setup_java_upgrade_java_version(
            id,
            *minimum_java_major_version,
        )?),
        RuleSpec::ChangeDependabotScheduleInterval {
            package_ecosystem,
            interval,
        } => Box::new(rules::change_dependabot_schedule_interval(
            id,
            package_ecosystem,
            interval,
        )?),
        RuleSpec::ReplaceSecrets {
            old_secret_name,
            new_secret_name,
        } => Box::new(rules::replace_secrets(id, old_secret_name, new_secret_name)?),
        RuleSpec::RemoveUnusedWorkflowDispatchInputs => {
            Box::new(rules::remove_unused_workflow_dispatch_inputs(id)?)
        }
        RuleSpec::RemoveWorkflowInputArgument {
            workflow_reference,
            version,
            input_argument_name,
        } => Box::new(rules::remove_workflow_input_argument(
            id,
            workflow_reference,
            version,
            input_argument_name,
        )?),
        RuleSpec::AutoCancelInProgress { access_token } => {
            Box::new(rules::auto_cancel_in_progress(id, access_token.as_deref())?)
        }
        RuleSpec::ReplaceRunners { job_name, runners } => {
            Box::new(rules::replace_runners(id, job_name, runners)?)
        }
        RuleSpec::ReplaceSecretKeys {
            old_key_name,
            new_key_name,
        } => Box::new(rules::replace_secret_keys(id, old_key_name, new_key_name)?),
        RuleSpec::AddCronTrigger { cron, seed } => {
            Box::new(rules::add_cron_trigger(id, cron, seed.as_deref())?)
        }
        RuleSpec::AddDependabotCooldown(cooldown) => {
            Box::new(rules::add_dependabot_cooldown(id, cooldown.clone())?)
        }
        RuleSpec::SetupNodeUpgradeNodeVersion {
            minimum_node_major_version,
        } => Box::new(rules::setup_node_upgrade_node_version(
            id,
            *minimum_node_major_version,
        )?),
        RuleSpec::SetupJavaCaching => Box::new(rules::setup_java_caching(id)?),
        RuleSpec::PreferSecretsInheritWorkflow => {
            Box::new(rules::prefer_secrets_inherit_workflow(id)?)
        }
    };
    Ok(step)
}

fn line_of(input: &str, offset: usize) -> usize {
    let end = offset.min(input.len());
    input.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}
