//! Rule-set applicator: runs a compiled pipeline over documents on disk.
//!
//! Every document is read, rewritten and written independently. A document
//! whose pipeline fails, or whose result cannot be written back as text, is
//! reported and never written.

use crate::output::atomic_write;
use crate::rewrite::{Pipeline, PipelineError};
use crate::source::{RenderError, SourceDocument, SourceError};
use crate::tree::Document;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Outcome of running the pipeline over one document.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "DocumentResult should be checked for changes"]
pub enum DocumentResult {
    /// At least one rule changed the document.
    Rewritten {
        file: PathBuf,
        /// Ids of the rules that changed it, in run order.
        rules: Vec<String>,
        before: String,
        after: String,
    },
    Unchanged { file: PathBuf },
}

impl DocumentResult {
    pub fn file(&self) -> &Path {
        match self {
            DocumentResult::Rewritten { file, .. } | DocumentResult::Unchanged { file } => file,
        }
    }
}

impl fmt::Display for DocumentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentResult::Rewritten { file, rules, .. } => {
                write!(f, "Rewrote {} ({})", file.display(), rules.join(", "))
            }
            DocumentResult::Unchanged { file } => write!(f, "No changes to {}", file.display()),
        }
    }
}

#[derive(Debug)]
pub enum ApplicationError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: SourceError,
    },
    Render {
        path: PathBuf,
        source: RenderError,
    },
    Pipeline(PipelineError),
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ApplicationError::Parse { path, source } => {
                write!(f, "failed to parse {}: {}", path.display(), source)
            }
            ApplicationError::Render { path, source } => {
                write!(f, "cannot write back {}: {}", path.display(), source)
            }
            ApplicationError::Pipeline(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Io { source, .. } => Some(source),
            ApplicationError::Parse { source, .. } => Some(source),
            ApplicationError::Render { source, .. } => Some(source),
            ApplicationError::Pipeline(e) => Some(e),
        }
    }
}

impl From<PipelineError> for ApplicationError {
    fn from(e: PipelineError) -> Self {
        ApplicationError::Pipeline(e)
    }
}

/// Collect the JSON documents under `paths`, sorted. Files are taken as
/// given; directories are walked for `*.json`.
pub fn discover_documents(paths: &[PathBuf]) -> Result<Vec<PathBuf>, ApplicationError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(path).to_path_buf();
                ApplicationError::Io {
                    path,
                    source: e.into(),
                }
            })?;
            let is_json = entry.path().extension().and_then(|s| s.to_str()) == Some("json");
            if entry.file_type().is_file() && is_json {
                files.push(entry.path().to_path_buf());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Run `pipeline` over each file. With `dry_run` nothing is written.
pub fn apply_rules(
    pipeline: &Pipeline,
    files: &[PathBuf],
    dry_run: bool,
) -> Vec<(PathBuf, Result<DocumentResult, ApplicationError>)> {
    files
        .iter()
        .map(|file| (file.clone(), apply_to_file(pipeline, file, dry_run)))
        .collect()
}

fn apply_to_file(
    pipeline: &Pipeline,
    file: &Path,
    dry_run: bool,
) -> Result<DocumentResult, ApplicationError> {
    let text = fs::read_to_string(file).map_err(|source| ApplicationError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let source = SourceDocument::parse(text).map_err(|source| ApplicationError::Parse {
        path: file.to_path_buf(),
        source,
    })?;
    let document = Document::new(file.display().to_string(), source.root().clone());

    let output = pipeline.run(&document)?;
    if !output.changed() {
        return Ok(DocumentResult::Unchanged {
            file: file.to_path_buf(),
        });
    }

    let after = source
        .render(&output.document.root)
        .map_err(|source| ApplicationError::Render {
            path: file.to_path_buf(),
            source,
        })?;
    debug!(file = %file.display(), bytes = after.len(), "rendered document");

    if !dry_run {
        atomic_write(file, after.as_bytes()).map_err(|source| ApplicationError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        info!(file = %file.display(), rules = ?output.changed_by, "rewrote document");
    }

    Ok(DocumentResult::Rewritten {
        file: file.to_path_buf(),
        rules: output.changed_by,
        before: source.text().to_string(),
        after,
    })
}
