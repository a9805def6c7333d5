//! Rendering options: a fixed table of recognised `--key[ value]` flags.

use crate::context::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// `--key value`
    Required,
    /// `--key`
    Forbidden,
}

/// Recognised option names. Anything able to redirect the engine (such as
/// `daemon`) is intentionally absent.
const OPTIONS: &[(&str, Arity)] = &[
    ("alt-autoscale", Arity::Forbidden),
    ("alt-autoscale-max", Arity::Forbidden),
    ("alt-y-grid", Arity::Forbidden),
    ("border", Arity::Required),
    ("color", Arity::Required),
    ("end", Arity::Required),
    ("font", Arity::Required),
    ("font-render-mode", Arity::Required),
    ("font-smoothing-threshold", Arity::Required),
    ("force-rules-legend", Arity::Forbidden),
    ("full-size-mode", Arity::Forbidden),
    ("graph-render-mode", Arity::Required),
    ("height", Arity::Required),
    ("lazy", Arity::Forbidden),
    ("left-axis-format", Arity::Required),
    ("logarithmic", Arity::Forbidden),
    ("lower-limit", Arity::Required),
    ("no-gridfit", Arity::Forbidden),
    ("no-legend", Arity::Forbidden),
    ("only-graph", Arity::Forbidden),
    ("pango-markup", Arity::Forbidden),
    ("right-axis", Arity::Required),
    ("right-axis-format", Arity::Required),
    ("right-axis-label", Arity::Required),
    ("rigid", Arity::Forbidden),
    ("slope-mode", Arity::Forbidden),
    ("start", Arity::Required),
    ("step", Arity::Required),
    ("tabwidth", Arity::Required),
    ("title", Arity::Required),
    ("units-exponent", Arity::Required),
    ("units-length", Arity::Required),
    ("upper-limit", Arity::Required),
    ("use-nan-for-all-missing-data", Arity::Forbidden),
    ("vertical-label", Arity::Required),
    ("watermark", Arity::Required),
    ("width", Arity::Required),
    ("x-grid", Arity::Required),
    ("y-grid", Arity::Required),
    ("zoom", Arity::Required),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Literal(String),
    Dynamic(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphOption {
    pub key: &'static str,
    pub value: Option<OptionValue>,
}

impl GraphOption {
    pub fn is_dynamic(&self) -> bool {
        matches!(self.value, Some(OptionValue::Dynamic(_)))
    }
}

/// Look up the arity of a recognised option name.
pub fn arity(key: &str) -> Option<Arity> {
    OPTIONS
        .binary_search_by(|(name, _)| (*name).cmp(key))
        .ok()
        .map(|i| OPTIONS[i].1)
}

/// Validate `key` and its value against the table. Unknown keys and
/// arity mismatches are not recognised.
pub fn parse_option(key: &str, value: Option<OptionValue>) -> Option<GraphOption> {
    let i = OPTIONS.binary_search_by(|(name, _)| (*name).cmp(key)).ok()?;
    let (name, arity) = OPTIONS[i];
    match (arity, &value) {
        (Arity::Required, Some(_)) | (Arity::Forbidden, None) => Some(GraphOption {
            key: name,
            value,
        }),
        _ => None,
    }
}
