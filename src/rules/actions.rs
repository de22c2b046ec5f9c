//! Rules over `uses:` references and `${{ secrets.* }}` expressions.

use crate::rewrite::{RewriteStep, TextRewrite};
use crate::rules::{quote_regex, set_scalar, RuleError};

fn uses_query(action: &str) -> String {
    format!("$.jobs..steps[?(@.uses =~ '{}(?:@.+)?')].uses", quote_regex(action))
}

/// Pin every step that uses `action` (with or without a ref) to `action@version`.
pub fn change_action_version(
    name: &str,
    action: &str,
    version: &str,
) -> Result<RewriteStep, RuleError> {
    change_action(name, action, action, version)
}

/// Replace `old_action` (any ref) with `new_action@new_version`.
pub fn change_action(
    name: &str,
    old_action: &str,
    new_action: &str,
    new_version: &str,
) -> Result<RewriteStep, RuleError> {
    if old_action.is_empty() || new_action.is_empty() {
        return Err(RuleError::invalid(name, "action names must not be empty"));
    }
    if new_version.is_empty() {
        return Err(RuleError::invalid(name, "version must not be empty"));
    }
    let query = uses_query(old_action);
    let target = format!("{new_action}@{new_version}");
    RewriteStep::new(name, &query, move |node, _| Ok(set_scalar(node, &target)))
        .and_then(|step| step.with_precondition(&query))
        .map_err(RuleError::query(name))
}

/// Rewrite `${{ secrets.OLD }}` (any inner spacing) to `${{ secrets.NEW }}`
/// in every scalar of the document.
pub fn replace_secrets(
    name: &str,
    old_secret: &str,
    new_secret: &str,
) -> Result<RewriteStep, RuleError> {
    if old_secret.is_empty() || new_secret.is_empty() {
        return Err(RuleError::invalid(name, "secret names must not be empty"));
    }
    let pattern = format!(r"\$\{{\{{\s*secrets\.{}\s*\}}\}}", regex::escape(old_secret));
    let replacement = format!("${{{{ secrets.{new_secret} }}}}");
    let rewrite = TextRewrite::new(&pattern, replacement).map_err(|source| RuleError::Pattern {
        rule: name.to_string(),
        source,
    })?;
    RewriteStep::new(name, "$..*", move |node, _| Ok(rewrite.rewrite_scalar(node)))
        .map_err(RuleError::query(name))
}
