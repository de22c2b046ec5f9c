//! Rewrite steps and their composition.
//!
//! A [`Step`] turns one tree into another. [`RewriteStep`] binds a query to a
//! callback, [`TwoPhaseStep`] runs collect-then-mutate analyses, and a
//! [`Pipeline`] threads a document through an ordered list of steps.

pub mod collect;
pub mod errors;
pub mod pipeline;
pub mod step;
pub mod text;

pub use collect::{FactSet, TwoPhase, TwoPhaseStep};
pub use errors::{PipelineError, RewriteError};
pub use pipeline::{Pipeline, PipelineOutput};
pub use step::{Phase, RewriteStep, Step, VisitorStep};
pub use text::TextRewrite;
