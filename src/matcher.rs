//! Reference source matcher over a fixed catalogue of known sources.

use crate::context::{RequestContext, Source, SourceMatcher};
use crate::error::GraphError;
use regex::Regex;
use tracing::debug;

/// A catalogue entry; unauthorised entries are never returned.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub source: Source,
    pub authorized: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ListMatcher {
    entries: Vec<CatalogEntry>,
}

impl ListMatcher {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }
}

impl SourceMatcher for ListMatcher {
    fn match_sources(
        &self,
        template: &str,
        base: Option<&str>,
        _request: &RequestContext,
    ) -> Result<Vec<Source>, GraphError> {
        let pattern = match base {
            Some(base) if !base.is_empty() => {
                format!("{}/{}", base.trim_end_matches('/'), template)
            }
            _ => template.to_string(),
        };
        debug!("matching wildcard source path '{}'", pattern);

        let re = wildcard_regex(&pattern).map_err(|e| GraphError::SourcePattern {
            path: template.to_string(),
            reason: e.to_string(),
        })?;

        let mut out: Vec<Source> = Vec::new();
        for entry in &self.entries {
            if !re.is_match(&entry.source.id) {
                continue;
            }
            if !entry.authorized {
                debug!("access to source denied, ignoring: {}", entry.source.id);
                continue;
            }
            let mut source = entry.source.clone();
            source
                .vars
                .insert("FILENAME".to_string(), source.id.clone());
            out.push(source);
        }

        out.sort_by(|a, b| a.id.cmp(&b.id));
        out.dedup_by(|a, b| a.id == b.id);
        Ok(out)
    }
}

/// Translate a shell-style wildcard into an anchored regex: `*` matches a
/// run of non-`/` characters and `?` exactly one.
fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for c in pattern.chars() {
        match c {
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            _ => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    re.push('$');
    Regex::new(&re)
}
