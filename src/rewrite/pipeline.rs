use crate::path::has_match;
use crate::rewrite::errors::PipelineError;
use crate::rewrite::step::Step;
use crate::tree::Document;
use tracing::{debug, debug_span, trace, warn};

/// Result of running every step over one document.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PipelineOutput carries the rewritten document"]
pub struct PipelineOutput {
    pub document: Document,
    /// Names of the steps that changed the tree, in the order they ran.
    pub changed_by: Vec<String>,
}

impl PipelineOutput {
    pub fn changed(&self) -> bool {
        !self.changed_by.is_empty()
    }
}

/// An ordered list of steps; each step's output tree is the next one's input.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn push(&mut self, step: Box<dyn Step>) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| step.name())
    }

    /// Run all steps over one document.
    ///
    /// The input is never modified; on failure nothing of the partially
    /// rewritten tree escapes.
    pub fn run(&self, document: &Document) -> Result<PipelineOutput, PipelineError> {
        let span = debug_span!("document", id = %document.id);
        let _guard = span.enter();

        let mut tree = document.root.clone();
        let mut changed_by = Vec::new();

        for step in &self.steps {
            let span = debug_span!("step", name = step.name());
            let _guard = span.enter();

            if let Some(query) = step.precondition() {
                if !has_match(&tree, query) {
                    trace!(precondition = %query, "skipped");
                    continue;
                }
            }

            let before = tree.clone();
            tree = step.apply(tree).map_err(|source| PipelineError {
                document: document.id.clone(),
                step: step.name().to_string(),
                source,
            })?;
            if tree != before {
                debug!("changed");
                changed_by.push(step.name().to_string());
            }
        }

        Ok(PipelineOutput {
            document: Document::new(document.id.clone(), tree),
            changed_by,
        })
    }

    /// Run every document independently. One failure does not affect the
    /// others; results come back in input order.
    pub fn run_all(&self, documents: &[Document]) -> Vec<Result<PipelineOutput, PipelineError>> {
        documents
            .iter()
            .map(|document| {
                let result = self.run(document);
                if let Err(err) = &result {
                    warn!(
                        document = %err.document,
                        step = %err.step,
                        error = %err.source,
                        "document failed"
                    );
                }
                result
            })
            .collect()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.step_names()).finish()
    }
}
