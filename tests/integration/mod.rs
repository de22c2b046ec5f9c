//! Rule sets applied end to end to realistic repository documents.

mod dependabot_updates;
mod workflow_migration;

use flowpatch::config::{apply_rules, load_from_str, DocumentResult};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write `documents` into a fresh directory, returning it with their paths.
pub fn workspace(documents: &[(&str, Value)]) -> (TempDir, Vec<PathBuf>) {
    let dir = TempDir::new().unwrap();
    let mut files = Vec::new();
    for (name, value) in documents {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        files.push(path);
    }
    (dir, files)
}

/// Apply `rules` to `files` and return the rule ids that changed each one.
pub fn apply(rules: &str, files: &[PathBuf]) -> Vec<Vec<String>> {
    let pipeline = load_from_str(rules).unwrap().pipeline;
    apply_rules(&pipeline, files, false)
        .into_iter()
        .map(|(file, result)| match result {
            Ok(DocumentResult::Rewritten { rules, .. }) => rules,
            Ok(DocumentResult::Unchanged { .. }) => Vec::new(),
            Err(e) => panic!("{} failed: {e}", file.display()),
        })
        .collect()
}

pub fn read(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}
