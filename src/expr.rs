//! Reference expression evaluator.
//!
//! Supports the string-template subset administrators use in practice:
//! `%{NAME}` expands a source variable (falling back to the request
//! variables) and `%{env:NAME}` expands the aggregated request environment.
//! Unknown names expand to nothing; everything else is copied verbatim.

use crate::context::{Evaluator, Expr, Scope};
use regex::Regex;

pub struct TemplateEvaluator {
    var_re: Regex,
}

impl TemplateEvaluator {
    pub fn new() -> Result<Self, regex::Error> {
        const VAR_RE: &str = r"%\{(?:(env):)?([A-Za-z_][A-Za-z0-9_]*)\}";
        Ok(Self {
            var_re: Regex::new(VAR_RE)?,
        })
    }

    fn lookup(&self, namespace: Option<&str>, name: &str, scope: Scope<'_>) -> String {
        let request = scope.request();
        let found = match namespace {
            Some(_) => request.env.get(name),
            None => scope
                .source()
                .and_then(|s| s.vars.get(name))
                .or_else(|| request.vars.get(name)),
        };
        found.cloned().unwrap_or_default()
    }
}

impl Evaluator for TemplateEvaluator {
    fn evaluate(&self, expr: &Expr, scope: Scope<'_>) -> Result<String, String> {
        let text = expr.as_str();
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in self.var_re.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            check_literal(&text[last..whole.start()], text)?;
            out.push_str(&text[last..whole.start()]);

            let namespace = caps.get(1).map(|m| m.as_str());
            let name = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            out.push_str(&self.lookup(namespace, name, scope));
            last = whole.end();
        }

        check_literal(&text[last..], text)?;
        out.push_str(&text[last..]);
        Ok(out)
    }
}

/// Any `%{` left between variable references is malformed.
fn check_literal(literal: &str, whole: &str) -> Result<(), String> {
    if literal.contains("%{") {
        return Err(format!("malformed variable reference in '{whole}'"));
    }
    Ok(())
}
