//! The per-request graph definition and the administrator defaults it is
//! built from.

use crate::context::Expr;
use crate::element::{Command, CommandId, Element};
use crate::format::ImageFormat;
use crate::option::GraphOption;
use std::collections::BTreeMap;

/// Administrator defaults, already validated.
#[derive(Debug, Clone, Default)]
pub struct BaseSpec {
    /// Fixed output format; when absent the caller derives one.
    pub format: Option<ImageFormat>,
    pub options: Vec<GraphOption>,
    pub elements: Vec<Element>,
    /// Environment names aggregated over every matched source.
    pub env: BTreeMap<String, Expr>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphSpec {
    pub commands: Vec<Command>,
    pub options: Vec<GraphOption>,
    /// Name table as it stood after the last command was resolved.
    pub names: BTreeMap<String, CommandId>,
}

impl GraphSpec {
    pub fn command(&self, id: CommandId) -> &Command {
        &self.commands[id]
    }

    /// Look up the definition a name currently resolves to.
    pub fn lookup(&self, name: &str) -> Option<&Command> {
        self.names.get(name).map(|&id| &self.commands[id])
    }
}
