//! Printing and writing rewritten documents.

use crate::source::{self, RenderError, Style};
use crate::tree::Node;
use std::io::{self, Write};
use std::path::Path;

/// Print a tree built in memory, laid out by each node's formatting, with
/// two-space steps and a trailing newline.
pub fn render(root: &Node) -> Result<String, RenderError> {
    source::print(root, Style::default())
}

/// Atomic file write: tempfile in the same directory, fsync, rename.
///
/// Either the whole new content lands or the file is left as it was.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no parent directory", path.display()),
            ))
        }
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn render_keeps_key_order() {
        let root = Node::from_json(&json!({"name": "ci", "on": {"push": {}}, "jobs": {}}));
        let text = render(&root).unwrap();
        let name = text.find("\"name\"").unwrap();
        let on = text.find("\"on\"").unwrap();
        let jobs = text.find("\"jobs\"").unwrap();
        assert!(name < on && on < jobs);
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn render_honours_flow_style() {
        let mut root = Node::from_json(&json!({"runs-on": ["self-hosted", "linux"]}));
        if let Some(runners) = root.as_mapping_mut().and_then(|m| m.get_mut("runs-on")) {
            runners.format_mut().flow = true;
        }
        assert_eq!(
            render(&root).unwrap(),
            "{\n  \"runs-on\": [\"self-hosted\", \"linux\"]\n}\n"
        );
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ci.json");
        fs::write(&path, "old").unwrap();
        atomic_write(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn atomic_write_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("ci.json");
        assert!(atomic_write(&path, b"x").is_err());
    }
}
