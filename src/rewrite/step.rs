use crate::path::{PathError, PathQuery};
use crate::rewrite::errors::RewriteError;
use crate::tree::{display_path, Node};
use crate::visit::{walk, Cursor, Rewrite, Visitor};
use tracing::debug;

/// One unit of transformation in a [`Pipeline`](crate::rewrite::Pipeline).
///
/// Steps share nothing with each other but the tree they pass along, and
/// are `Send + Sync` so documents can be fanned out across threads.
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    /// A query that must match somewhere in the document for the step to do
    /// anything. Only a shortcut: skipping must give the same tree as running.
    fn precondition(&self) -> Option<&PathQuery> {
        None
    }

    fn apply(&self, tree: Node) -> Result<Node, RewriteError>;
}

/// When a [`RewriteStep`] callback runs relative to the node's children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Enter,
    /// After every descendant has been visited (post-order).
    Leave,
}

type Callback = dyn Fn(&Node, &mut Cursor<'_>) -> Result<Rewrite, RewriteError> + Send + Sync;

/// A compiled query plus the callback invoked for every node it selects.
pub struct RewriteStep {
    name: String,
    query: PathQuery,
    phase: Phase,
    precondition: Option<PathQuery>,
    callback: Box<Callback>,
}

impl RewriteStep {
    /// Compile `query` and bind `callback` to it. A malformed query is
    /// rejected here, before any document is seen.
    pub fn new<F>(name: impl Into<String>, query: &str, callback: F) -> Result<Self, PathError>
    where
        F: Fn(&Node, &mut Cursor<'_>) -> Result<Rewrite, RewriteError> + Send + Sync + 'static,
    {
        Ok(Self {
            name: name.into(),
            query: PathQuery::parse(query)?,
            phase: Phase::Enter,
            precondition: None,
            callback: Box::new(callback),
        })
    }

    /// Run the callback once the matched node's subtree has been walked.
    pub fn on_leave(mut self) -> Self {
        self.phase = Phase::Leave;
        self
    }

    pub fn with_precondition(mut self, query: &str) -> Result<Self, PathError> {
        self.precondition = Some(PathQuery::parse(query)?);
        Ok(self)
    }

    pub fn query(&self) -> &PathQuery {
        &self.query
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn visit(&self, node: &Node, cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        if !self.query.matches(cursor) {
            return Ok(Rewrite::Unchanged);
        }
        let rewrite = (self.callback)(node, cursor)?;
        if rewrite != Rewrite::Unchanged {
            debug!(
                step = %self.name,
                query = %self.query,
                path = %display_path(cursor.path()),
                "matched"
            );
        }
        Ok(rewrite)
    }
}

impl std::fmt::Debug for RewriteStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteStep")
            .field("name", &self.name)
            .field("query", &self.query.source())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

struct Matching<'s>(&'s RewriteStep);

impl Visitor for Matching<'_> {
    fn enter(&mut self, node: &Node, cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        match self.0.phase {
            Phase::Enter => self.0.visit(node, cursor),
            Phase::Leave => Ok(Rewrite::Unchanged),
        }
    }

    fn leave(&mut self, node: &Node, cursor: &mut Cursor<'_>) -> Result<Rewrite, RewriteError> {
        match self.0.phase {
            Phase::Enter => Ok(Rewrite::Unchanged),
            Phase::Leave => self.0.visit(node, cursor),
        }
    }
}

impl Step for RewriteStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn precondition(&self) -> Option<&PathQuery> {
        self.precondition.as_ref()
    }

    fn apply(&self, mut tree: Node) -> Result<Node, RewriteError> {
        walk(&mut tree, &mut Matching(self))?;
        Ok(tree)
    }
}

/// Adapts a stateful [`Visitor`] into a step. The factory builds a fresh
/// visitor for every document, so no state leaks between documents.
pub struct VisitorStep<F> {
    name: String,
    precondition: Option<PathQuery>,
    factory: F,
}

impl<F, V> VisitorStep<F>
where
    F: Fn() -> V + Send + Sync,
    V: Visitor,
{
    pub fn new(name: impl Into<String>, factory: F) -> Self {
        Self {
            name: name.into(),
            precondition: None,
            factory,
        }
    }

    pub fn with_precondition(mut self, query: &str) -> Result<Self, PathError> {
        self.precondition = Some(PathQuery::parse(query)?);
        Ok(self)
    }
}

impl<F, V> Step for VisitorStep<F>
where
    F: Fn() -> V + Send + Sync,
    V: Visitor,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn precondition(&self) -> Option<&PathQuery> {
        self.precondition.as_ref()
    }

    fn apply(&self, mut tree: Node) -> Result<Node, RewriteError> {
        let mut visitor = (self.factory)();
        walk(&mut tree, &mut visitor)?;
        Ok(tree)
    }
}
