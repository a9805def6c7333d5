//! Graph spec compiler for rrdtool-style graphs.
//!
//! Pipeline:
//! - `assemble`: administrator defaults + request query -> `GraphSpec`
//! - `resolve`: name table, backing DEFs and source multiplicity
//! - `generate`: multiplicity expansion into the engine's argument vector
//!
//! Matching paths to sources and evaluating expressions are delegated to the
//! `SourceMatcher` and `Evaluator` traits; `ListMatcher` and
//! `TemplateEvaluator` are reference implementations.

pub mod assemble;
pub mod config;
pub mod context;
pub mod element;
pub mod error;
pub mod expr;
pub mod format;
pub mod generate;
pub mod graph;
pub mod matcher;
pub mod option;
pub mod quote;
pub mod render;
pub mod resolve;

pub use context::{Evaluator, Expr, RequestContext, Scope, Source, SourceMatcher};
pub use error::{ErrorClass, GraphError};
pub use format::ImageFormat;
pub use graph::{BaseSpec, GraphSpec};

use serde::Serialize;

/// A compiled request, ready for the render engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledGraph {
    pub format: ImageFormat,
    pub content_type: &'static str,
    pub args: Vec<String>,
}

/// Run assemble, resolve and generate in order.
///
/// Aggregated environment values are left in `request.env`.
pub fn compile(
    base: &BaseSpec,
    query: &str,
    format: ImageFormat,
    matcher: &dyn SourceMatcher,
    evaluator: &dyn Evaluator,
    request: &mut RequestContext,
) -> Result<CompiledGraph, GraphError> {
    let mut spec = assemble::assemble(base, query)?;
    resolve::Resolver::new(matcher, evaluator, &base.env).resolve(&mut spec, request)?;
    let args = generate::generate(&spec, format, evaluator, request)?;
    Ok(CompiledGraph {
        format,
        content_type: format.content_type(),
        args,
    })
}
