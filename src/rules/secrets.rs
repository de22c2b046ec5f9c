//! Rules over `secrets:` mappings: renaming keys and collapsing
//! pass-through secrets of reusable workflow calls into `inherit`.

use crate::path::PathQuery;
use crate::rewrite::{RewriteError, VisitorStep};
use crate::rules::RuleError;
use crate::tree::{display_path, Node, NodeKind};
use crate::visit::{Cursor, Rewrite, Visitor};
use regex::Regex;
use tracing::debug;

/// Renames `old` to `new` in every mapping that has it.
#[derive(Debug, Clone)]
pub struct RenameKey {
    old: String,
    new: String,
}

impl Visitor for RenameKey {
    fn enter(&mut self, node: &Node, cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        let Some(mapping) = node.as_mapping() else {
            return Ok(Rewrite::Unchanged);
        };
        if !mapping.contains_key(&self.old) || mapping.contains_key(&self.new) {
            return Ok(Rewrite::Unchanged);
        }
        let mut renamed = mapping.clone();
        renamed
            .rename(&self.old, self.new.as_str())
            .map_err(|source| RewriteError::Edit {
                path: display_path(cursor.path()),
                source,
            })?;
        debug!(
            path = %display_path(cursor.path()),
            from = %self.old,
            to = %self.new,
            "renamed key"
        );
        Ok(Rewrite::Replace(Node::Mapping(renamed)))
    }
}

/// Rename the key `old_key` to `new_key` wherever it appears, e.g. a secret
/// passed under `secrets:` to a reusable workflow. Mappings that already
/// hold `new_key` are left alone.
pub fn replace_secret_keys(
    name: &str,
    old_key: &str,
    new_key: &str,
) -> Result<VisitorStep<impl Fn() -> RenameKey + Send + Sync>, RuleError> {
    if old_key.is_empty() || new_key.is_empty() {
        return Err(RuleError::invalid(name, "key names must not be empty"));
    }
    let visitor = RenameKey {
        old: old_key.to_string(),
        new: new_key.to_string(),
    };
    Ok(VisitorStep::new(name, move || visitor.clone()))
}

const SECRETS_QUERY: &str = "$.jobs..secrets";
const INHERIT: &str = "INHERIT";
const SECRET_REFERENCE: &str = r"^\$\{\{\s*secrets\.([A-Za-z_][A-Za-z0-9_-]*)\s*\}\}$";

/// Replaces a `secrets:` mapping with `inherit` when every entry passes a
/// caller secret through under its own name.
#[derive(Debug, Clone)]
pub struct InheritSecrets {
    secrets: PathQuery,
    reference: Regex,
}

impl InheritSecrets {
    fn passes_through(&self, key: Option<&str>, node: &Node) -> bool {
        let referenced = node
            .as_str()
            .and_then(|text| self.reference.captures(text))
            .and_then(|caps| caps.get(1));
        matches!((key, referenced), (Some(key), Some(name)) if key == name.as_str())
    }
}

impl Visitor for InheritSecrets {
    fn enter(&mut self, node: &Node, cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        if self.secrets.matches(cursor) {
            if node.as_mapping().is_some_and(|secrets| !secrets.is_empty()) {
                cursor.put_message(INHERIT, true);
            }
            return Ok(Rewrite::Unchanged);
        }
        // Only direct entries see `true`: a nested container has already
        // cleared the flag on its way in.
        if cursor.nearest_message::<bool>(INHERIT) == Some(&true)
            && !self.passes_through(cursor.key(), node)
        {
            cursor.put_message_on_nearest(|n| n.kind() == NodeKind::Mapping, INHERIT, false);
        }
        Ok(Rewrite::Unchanged)
    }

    fn leave(&mut self, _node: &Node, cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        if !self.secrets.matches(cursor) || cursor.take_message::<bool>(INHERIT) != Some(true) {
            return Ok(Rewrite::Unchanged);
        }
        debug!(path = %display_path(cursor.path()), "secrets collapse to inherit");
        Ok(Rewrite::Replace(Node::string("inherit")))
    }
}

/// Use `secrets: inherit` for reusable workflow calls that pass each secret
/// on unchanged, as in `TOKEN: ${{ secrets.TOKEN }}`.
pub fn prefer_secrets_inherit_workflow(
    name: &str,
) -> Result<VisitorStep<impl Fn() -> InheritSecrets + Send + Sync>, RuleError> {
    let visitor = InheritSecrets {
        secrets: PathQuery::parse(SECRETS_QUERY).map_err(RuleError::query(name))?,
        reference: Regex::new(SECRET_REFERENCE).map_err(|source| RuleError::Pattern {
            rule: name.to_string(),
            source,
        })?,
    };
    VisitorStep::new(name, move || visitor.clone())
        .with_precondition(SECRETS_QUERY)
        .map_err(RuleError::query(name))
}
