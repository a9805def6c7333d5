//! Merge administrator defaults with a request query into a `GraphSpec`.

use crate::element::{Command, DynamicFields, parse_element};
use crate::error::GraphError;
use crate::graph::{BaseSpec, GraphSpec};
use crate::option::{OptionValue, parse_option};
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;
use tracing::debug;

/// Build a `GraphSpec` from `base` followed by the fragments of `query`.
///
/// The query is `&`-separated; each fragment is URL-unescaped (`+` is left
/// alone) and tried first as an element, then as `key[=value]`. Any fragment
/// that is neither fails the whole request.
pub fn assemble(base: &BaseSpec, query: &str) -> Result<GraphSpec, GraphError> {
    let mut commands: Vec<Command> = base.elements.iter().cloned().map(Command::new).collect();
    let mut options = base.options.clone();

    for (index, fragment) in query.split('&').enumerate() {
        if fragment.is_empty() {
            continue;
        }

        let decoded = percent_decode_str(fragment)
            .decode_utf8()
            .map_err(|_| GraphError::Unescape(fragment.to_string()))?;

        if let Some(element) = parse_element(&decoded, DynamicFields::default()) {
            debug!("query fragment {}: {} element", index, element.kind());
            commands.push(Command::new(element));
            continue;
        }

        let (key, value) = match decoded.split_once('=') {
            Some((key, value)) => (key, Some(OptionValue::Literal(value.to_string()))),
            None => (&*decoded, None),
        };
        match parse_option(key, value) {
            Some(option) => options.push(option),
            None => return Err(GraphError::Unrecognized(fragment.to_string())),
        }
    }

    Ok(GraphSpec {
        commands,
        options,
        names: BTreeMap::new(),
    })
}
