//! `actions/setup-java` distribution, version and caching rules.

use crate::editor::{self, NewChild};
use crate::path::{find_all, PathQuery};
use crate::rewrite::{RewriteError, RewriteStep, TwoPhase, TwoPhaseStep};
use crate::rules::RuleError;
use crate::tree::{display_path, Node, Segment};
use crate::visit::Rewrite;
use regex::Regex;
use serde_json::json;
use tracing::debug;

const DISTRIBUTION_QUERY: &str =
    "..steps[?(@.uses =~ 'actions/setup-java@v[23].*')].with.distribution";
const JAVA_VERSION_QUERY: &str =
    "..steps[?(@.uses =~ 'actions/setup-java@v*.*')].with.java-version";
const GRADLE_RUN_QUERY: &str = "$.jobs.build.steps[?(@.run =~ '.*gradle.*')]";
const MAVEN_RUN_QUERY: &str = "$.jobs.build.steps[?(@.run =~ '.*mvn.*')]";
const SETUP_JAVA_QUERY: &str =
    "$.jobs.build.steps[?(@.uses =~ 'actions/setup-java(?:@v.+)?')]";
const CACHE_ACTION_QUERY: &str = "$.jobs.build.steps[?(@.uses =~ 'actions/cache(?:@v.+)?')]";
const VERSION_PATTERN: &str = r"^([0-9]+)(\.[0-9]+)*([-+].*)?$";

pub const DEFAULT_DISTRIBUTIONS: &[&str] = &["adopt", "adopt-hotspot"];
pub const DEFAULT_TARGET_DISTRIBUTION: &str = "temurin";
pub const DEFAULT_MINIMUM_JAVA_VERSION: u32 = 21;

/// Replace any of `from` with `to` in `with.distribution` of setup-java v2/v3 steps.
pub fn setup_java_distribution(
    name: &str,
    from: &[String],
    to: &str,
) -> Result<RewriteStep, RuleError> {
    if from.is_empty() {
        return Err(RuleError::invalid(name, "no distributions to replace"));
    }
    if to.is_empty() {
        return Err(RuleError::invalid(name, "target distribution must not be empty"));
    }
    let from = from.to_vec();
    let to = to.to_string();
    RewriteStep::new(name, DISTRIBUTION_QUERY, move |node, _| {
        Ok(match node.as_scalar() {
            Some(scalar)
                if from.iter().any(|old| old == scalar.value()) && scalar.value() != to =>
            {
                Rewrite::Replace(Node::Scalar(scalar.with_value(to.as_str())))
            }
            _ => Rewrite::Unchanged,
        })
    })
    .map_err(RuleError::query(name))
}

/// Raise `with.java-version` of setup-java steps to `minimum` when its major
/// version is lower. Values that are not version numbers are left alone.
pub fn setup_java_upgrade_java_version(
    name: &str,
    minimum: u32,
) -> Result<RewriteStep, RuleError> {
    raise_major_version(name, JAVA_VERSION_QUERY, minimum)
}

/// Replace the version scalars `query` selects with `minimum` when their
/// leading major number is below it.
pub(crate) fn raise_major_version(
    name: &str,
    query: &str,
    minimum: u32,
) -> Result<RewriteStep, RuleError> {
    if minimum == 0 {
        return Err(RuleError::invalid(name, "minimum major version must be positive"));
    }
    let version = Regex::new(VERSION_PATTERN).map_err(|source| RuleError::Pattern {
        rule: name.to_string(),
        source,
    })?;
    RewriteStep::new(name, query, move |node, _| {
        let Some(scalar) = node.as_scalar() else {
            return Ok(Rewrite::Unchanged);
        };
        let major = version
            .captures(scalar.value())
            .and_then(|caps| caps.get(1))
            .and_then(|major| major.as_str().parse::<u32>().ok());
        Ok(match major {
            Some(major) if major < minimum => {
                Rewrite::Replace(Node::Scalar(scalar.with_value(minimum.to_string())))
            }
            _ => Rewrite::Unchanged,
        })
    })
    .map_err(RuleError::query(name))
}

/// Turns on the built-in dependency cache of `actions/setup-java` in the
/// build job and drops the `actions/cache` steps it supersedes.
#[derive(Debug, Clone)]
pub struct SetupJavaCaching {
    name: String,
    gradle: PathQuery,
    maven: PathQuery,
    setup_java: PathQuery,
    cache_action: PathQuery,
}

impl TwoPhase for SetupJavaCaching {
    /// Build tool the job runs, as setup-java names its cache.
    type Facts = Option<&'static str>;

    fn name(&self) -> &str {
        &self.name
    }

    fn precondition(&self) -> Option<&PathQuery> {
        Some(&self.setup_java)
    }

    fn collect(&self, root: &Node) -> Option<&'static str> {
        if !find_all(root, &self.gradle).is_empty() {
            Some("gradle")
        } else if !find_all(root, &self.maven).is_empty() {
            Some("maven")
        } else {
            None
        }
    }

    fn should_mutate(&self, facts: &Option<&'static str>) -> bool {
        facts.is_some()
    }

    fn mutate(&self, root: &mut Node, facts: &Option<&'static str>) -> Result<(), RewriteError> {
        let Some(cache) = *facts else {
            return Ok(());
        };
        let mut changed = false;
        for path in find_all(root, &self.setup_java) {
            let step = root.get_path_mut(&path).ok_or_else(|| RewriteError::Detached {
                path: display_path(&path),
            })?;
            changed |= enable_cache(step, cache).map_err(|source| RewriteError::Edit {
                path: display_path(&path),
                source,
            })?;
        }
        if !changed {
            return Ok(());
        }
        // Last match first, so earlier indices stay valid.
        for path in find_all(root, &self.cache_action).into_iter().rev() {
            debug!(step = %self.name, path = %display_path(&path), "removing actions/cache step");
            editor::delete_path(root, &path).map_err(|source| RewriteError::Edit {
                path: display_path(&path),
                source,
            })?;
        }
        Ok(())
    }
}

/// Set `with.cache` on one setup-java step. A step without `with` gets one
/// right after its `uses`.
fn enable_cache(step: &mut Node, cache: &str) -> Result<bool, editor::EditError> {
    let with_key = Segment::Key("with".to_string());
    let current = match step.child(&with_key) {
        Some(Node::Mapping(with)) => with.get("cache").map(|value| value.as_str() == Some(cache)),
        Some(_) => return Ok(false),
        None => {
            if !step.as_mapping().is_some_and(|mapping| mapping.contains_key("uses")) {
                return Ok(false);
            }
            let with = Node::fragment(&json!({ "cache": cache }));
            let uses = Segment::Key("uses".to_string());
            editor::insert_after(step, &uses, NewChild::entry("with", with))?;
            return Ok(true);
        }
    };
    let Some(with) = step.child_mut(&with_key) else {
        return Ok(false);
    };
    match current {
        Some(true) => return Ok(false),
        Some(false) => {
            editor::replace(with, &Segment::Key("cache".to_string()), Node::string(cache))?;
        }
        None => editor::append(with, NewChild::entry("cache", Node::string(cache)))?,
    }
    Ok(true)
}

/// Use setup-java's `cache` input for Gradle or Maven builds instead of a
/// separate `actions/cache` step.
pub fn setup_java_caching(name: &str) -> Result<TwoPhaseStep<SetupJavaCaching>, RuleError> {
    let parse = |query: &str| PathQuery::parse(query).map_err(RuleError::query(name));
    Ok(TwoPhaseStep(SetupJavaCaching {
        name: name.to_string(),
        gradle: parse(GRADLE_RUN_QUERY)?,
        maven: parse(MAVEN_RUN_QUERY)?,
        setup_java: parse(SETUP_JAVA_QUERY)?,
        cache_action: parse(CACHE_ACTION_QUERY)?,
    }))
}
