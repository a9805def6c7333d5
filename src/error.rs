//! Error taxonomy for the graph compiler.
//!
//! Every failure falls into one of two classes: the client's graph definition
//! was invalid (request) or the environment around the compiler misbehaved
//! (server). The transport layer maps the class to a status code.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Request,
    Server,
}

impl ErrorClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Server => "server",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("query was not recognised: {0}")]
    Unrecognized(String),

    #[error("the following element could not be unescaped: {0}")]
    Unescape(String),

    #[error("while parsing {kind}: '{name}' was not found")]
    Unresolved { kind: &'static str, name: String },

    /// The rejected value is deliberately not carried.
    #[error("DEF elements must not contain a 'daemon' parameter")]
    DaemonOverride,

    #[error("while parsing DEF path '{path}': {reason}")]
    SourcePattern { path: String, reason: String },

    #[error(
        "CDEF '{name}' combines '{operand}' ({found} sources) with an anchor of {expected} sources"
    )]
    MultiplicityMismatch {
        name: String,
        operand: String,
        expected: usize,
        found: usize,
    },

    #[error("while evaluating an element expression: {0}")]
    Evaluation(String),

    #[error("call to the render engine failed: {0}")]
    Render(String),
}

impl GraphError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unrecognized(_)
            | Self::Unescape(_)
            | Self::Unresolved { .. }
            | Self::DaemonOverride
            | Self::SourcePattern { .. }
            | Self::MultiplicityMismatch { .. } => ErrorClass::Request,
            Self::Evaluation(_) | Self::Render(_) => ErrorClass::Server,
        }
    }
}
