//! Request context and the collaborator seams the compiler calls out to.
//!
//! Matching wildcarded paths to authorised sources and evaluating dynamic
//! expressions both live outside the compiler; these traits are the only
//! contact points.

use crate::error::GraphError;
use std::collections::BTreeMap;

/// An opaque dynamic expression taken from administrator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr(pub String);

impl Expr {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One concrete, already authorised source matched by a DEF path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub id: String,
    pub vars: BTreeMap<String, String>,
}

impl Source {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vars: BTreeMap::new(),
        }
    }
}

/// Per-request variables plus the environment aggregated during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub vars: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
}

/// What an expression is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    Request(&'a RequestContext),
    Source {
        request: &'a RequestContext,
        source: &'a Source,
    },
}

impl<'a> Scope<'a> {
    pub fn request(&self) -> &'a RequestContext {
        match *self {
            Scope::Request(request) | Scope::Source { request, .. } => request,
        }
    }

    pub fn source(&self) -> Option<&'a Source> {
        match *self {
            Scope::Request(_) => None,
            Scope::Source { source, .. } => Some(source),
        }
    }
}

pub trait Evaluator {
    fn evaluate(&self, expr: &Expr, scope: Scope<'_>) -> Result<String, String>;
}

pub trait SourceMatcher {
    /// Return the authorised sources matching `template`, in a stable order.
    fn match_sources(
        &self,
        template: &str,
        base: Option<&str>,
        request: &RequestContext,
    ) -> Result<Vec<Source>, GraphError>;
}

/// Evaluate `expr`, mapping failures into the server error class.
pub(crate) fn evaluate(
    evaluator: &dyn Evaluator,
    expr: &Expr,
    scope: Scope<'_>,
) -> Result<String, GraphError> {
    evaluator
        .evaluate(expr, scope)
        .map_err(GraphError::Evaluation)
}
