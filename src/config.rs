//! Administrator configuration (graph.json).
//!
//! JSON shape:
//! {
//!   "format": "PNG",                                    // optional
//!   "options": [ { "key": "title", "value": "%{SERVER_NAME}" }, { "key": "rigid" } ],
//!   "elements": [
//!     { "element": "DEF:a=x.rrd:in:AVERAGE", "path": "%{HOST}*.rrd", "base": "/var/lib/rrd" },
//!     { "element": "LINE1:a#00ff00:x", "legend": "%{FILENAME}" }
//!   ],
//!   "env": { "HOSTS": "%{HOST}" },
//!   "sources": [ { "id": "h1.rrd", "vars": { "HOST": "h1" }, "authorized": true } ],
//!   "request": { "SERVER_NAME": "example.org" }
//! }
//!
//! Options and elements go through the same parsers as request input. Every
//! configured option value is a dynamic expression. `sources` and `request`
//! only feed the reference collaborators used by the binary.

use crate::context::{Expr, RequestContext, Source};
use crate::element::{DynamicFields, Element, parse_element};
use crate::format::ImageFormat;
use crate::graph::BaseSpec;
use crate::matcher::{CatalogEntry, ListMatcher};
use crate::option::{Arity, OptionValue, arity, parse_option};
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub options: Vec<OptionConfig>,

    #[serde(default)]
    pub elements: Vec<ElementConfig>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    #[serde(default)]
    pub request: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionConfig {
    pub key: String,

    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementConfig {
    pub element: String,

    /// Legend expression for plots, rules and text.
    #[serde(default)]
    pub legend: Option<String>,

    /// DEF path expression.
    #[serde(default)]
    pub path: Option<String>,

    /// DEF base directory expression.
    #[serde(default)]
    pub base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub id: String,

    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    #[serde(default = "authorized_by_default")]
    pub authorized: bool,
}

fn authorized_by_default() -> bool {
    true
}

impl GraphConfig {
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Parse every configured option and element into a `BaseSpec`.
    pub fn validate_and_build(&self) -> anyhow::Result<BaseSpec> {
        use anyhow::bail;

        let format = match &self.format {
            Some(name) => match name.parse::<ImageFormat>() {
                Ok(format) => Some(format),
                Err(e) => bail!("graph.json format: {}", e),
            },
            None => None,
        };

        let mut options = Vec::with_capacity(self.options.len());
        for raw in &self.options {
            let value = raw
                .value
                .as_ref()
                .map(|v| OptionValue::Dynamic(Expr::new(v.as_str())));
            match (parse_option(&raw.key, value), arity(&raw.key)) {
                (Some(option), _) => options.push(option),
                (None, None) => bail!("unknown graph option in graph.json: {}", raw.key),
                (None, Some(Arity::Required)) => {
                    bail!("graph option '{}' requires a value", raw.key)
                }
                (None, Some(Arity::Forbidden)) => {
                    bail!("graph option '{}' does not take a value", raw.key)
                }
            }
        }

        let mut elements = Vec::with_capacity(self.elements.len());
        for raw in &self.elements {
            let dynamic = DynamicFields {
                legend: raw.legend.as_deref().map(Expr::new),
                path: raw.path.as_deref().map(Expr::new),
                base: raw.base.as_deref().map(Expr::new),
            };
            let Some(element) = parse_element(&raw.element, dynamic) else {
                bail!("unrecognised graph element in graph.json: {}", raw.element);
            };

            let is_def = matches!(element, Element::Def(_));
            if raw.legend.is_some() && !carries_legend(&element) {
                bail!("element '{}' cannot take a legend expression", raw.element);
            }
            if (raw.path.is_some() || raw.base.is_some()) && !is_def {
                bail!("only DEF elements take path or base expressions: {}", raw.element);
            }
            elements.push(element);
        }

        let env = self
            .env
            .iter()
            .map(|(name, expr)| (name.clone(), Expr::new(expr.as_str())))
            .collect();

        Ok(BaseSpec {
            format,
            options,
            elements,
            env,
        })
    }

    /// Reference source matcher over the configured catalogue.
    pub fn matcher(&self) -> ListMatcher {
        ListMatcher::new(
            self.sources
                .iter()
                .map(|raw| CatalogEntry {
                    source: Source {
                        id: raw.id.clone(),
                        vars: raw.vars.clone(),
                    },
                    authorized: raw.authorized,
                })
                .collect(),
        )
    }

    pub fn request_context(&self) -> RequestContext {
        RequestContext {
            vars: self.request.clone(),
            env: BTreeMap::new(),
        }
    }
}

fn carries_legend(element: &Element) -> bool {
    matches!(
        element,
        Element::Line { .. }
            | Element::Area(_)
            | Element::Tick { .. }
            | Element::Vrule(_)
            | Element::Hrule(_)
            | Element::Comment(_)
            | Element::TextAlign(_)
    )
}
