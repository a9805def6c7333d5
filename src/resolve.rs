//! Name resolution and multiplicity propagation.
//!
//! A single forward pass over the command list. Each DEF asks the source
//! matcher which concrete sources back it; every later command inherits the
//! backing DEF and source count of whatever name it refers to. Names are
//! visible only from the point they are defined, and a later definition
//! shadows an earlier one.

use crate::context::{Evaluator, Expr, RequestContext, Scope, Source, SourceMatcher, evaluate};
use crate::element::{CommandId, Element};
use crate::error::GraphError;
use crate::graph::GraphSpec;
use std::collections::BTreeMap;
use tracing::{debug, warn};

type Names = BTreeMap<String, CommandId>;

pub struct Resolver<'a> {
    matcher: &'a dyn SourceMatcher,
    evaluator: &'a dyn Evaluator,
    env: &'a BTreeMap<String, Expr>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        matcher: &'a dyn SourceMatcher,
        evaluator: &'a dyn Evaluator,
        env: &'a BTreeMap<String, Expr>,
    ) -> Self {
        Self {
            matcher,
            evaluator,
            env,
        }
    }

    /// Resolve every command in order, stopping at the first error.
    ///
    /// Aggregated environment values are written into `request.env`.
    pub fn resolve(
        &self,
        spec: &mut GraphSpec,
        request: &mut RequestContext,
    ) -> Result<(), GraphError> {
        let mut names = Names::new();

        for id in 0..spec.commands.len() {
            match &spec.commands[id].element {
                Element::Def(_) => self.resolve_def(spec, id, &mut names, request)?,
                Element::Cdef(_) => resolve_cdef(spec, id, &mut names)?,
                Element::Vrule(_)
                | Element::Hrule(_)
                | Element::Comment(_)
                | Element::TextAlign(_) => {}
                _ => resolve_reference(spec, id, &mut names)?,
            }
        }

        spec.names = names;
        Ok(())
    }

    fn resolve_def(
        &self,
        spec: &mut GraphSpec,
        id: CommandId,
        names: &mut Names,
        request: &mut RequestContext,
    ) -> Result<(), GraphError> {
        let Element::Def(def) = &spec.commands[id].element else {
            return Ok(());
        };

        let scope = Scope::Request(request);
        let template = match &def.path_expr {
            Some(expr) => evaluate(self.evaluator, expr, scope)?,
            None => def.path.clone(),
        };
        let base = def
            .base_expr
            .as_ref()
            .map(|expr| evaluate(self.evaluator, expr, scope))
            .transpose()?;
        let vname = def.vname.clone();

        let sources = self
            .matcher
            .match_sources(&template, base.as_deref(), request)?;
        debug!(
            "DEF '{}' matched {} source(s) for '{}'",
            vname,
            sources.len(),
            template
        );

        self.aggregate_env(&sources, request)?;

        let cmd = &mut spec.commands[id];
        cmd.backing_def = Some(id);
        cmd.multiplicity = sources.len();
        if let Element::Def(def) = &mut cmd.element {
            def.sources = sources;
        }
        names.insert(vname, id);
        Ok(())
    }

    /// Evaluate each environment rule against every matched source and
    /// publish the distinct non-empty results, comma-joined.
    fn aggregate_env(
        &self,
        sources: &[Source],
        request: &mut RequestContext,
    ) -> Result<(), GraphError> {
        for (name, expr) in self.env {
            let mut values: Vec<String> = Vec::new();
            for source in sources {
                let value = evaluate(
                    self.evaluator,
                    expr,
                    Scope::Source {
                        request: &*request,
                        source,
                    },
                )?;
                if !value.is_empty() && !values.contains(&value) {
                    values.push(value);
                }
            }
            if !values.is_empty() {
                request.env.insert(name.clone(), values.join(","));
            }
        }
        Ok(())
    }
}

/// The first operand naming an earlier definition anchors the CDEF; every
/// operand that names one is annotated so generation can suffix it.
fn resolve_cdef(spec: &mut GraphSpec, id: CommandId, names: &mut Names) -> Result<(), GraphError> {
    let Element::Cdef(cdef) = &spec.commands[id].element else {
        return Ok(());
    };

    let refs: Vec<Option<CommandId>> = cdef
        .rpn
        .iter()
        .map(|token| names.get(&token.text).copied())
        .collect();
    let anchor = refs.iter().flatten().next().copied();

    let (backing_def, multiplicity) = match anchor {
        Some(target) => {
            let target = &spec.commands[target];
            (target.backing_def, target.multiplicity)
        }
        None => {
            warn!("CDEF '{}' refers to no earlier definition", cdef.vname);
            (None, 0)
        }
    };

    // A fanned-out operand must match the anchor, unless it is a DEF emitted
    // under a single anchor, where its summing CDEF stands in for it.
    if multiplicity > 0 {
        for (token, target) in cdef.rpn.iter().zip(&refs) {
            let Some(target) = *target else { continue };
            let operand = &spec.commands[target];
            let found = operand.multiplicity;
            let summed = multiplicity == 1 && matches!(operand.element, Element::Def(_));
            if found >= 2 && found != multiplicity && !summed {
                return Err(GraphError::MultiplicityMismatch {
                    name: cdef.vname.clone(),
                    operand: token.text.clone(),
                    expected: multiplicity,
                    found,
                });
            }
        }
    }

    let vname = cdef.vname.clone();
    let cmd = &mut spec.commands[id];
    cmd.backing_def = backing_def;
    cmd.multiplicity = multiplicity;
    if let Element::Cdef(cdef) = &mut cmd.element {
        for (token, target) in cdef.rpn.iter_mut().zip(refs) {
            token.reference = target;
        }
    }
    names.insert(vname, id);
    Ok(())
}

/// VDEF, LINE, AREA, TICK, SHIFT, PRINT and GPRINT must name something
/// already defined.
fn resolve_reference(
    spec: &mut GraphSpec,
    id: CommandId,
    names: &mut Names,
) -> Result<(), GraphError> {
    let element = &spec.commands[id].element;
    let Some(name) = element.refers_to() else {
        return Ok(());
    };
    let Some(&target) = names.get(name) else {
        return Err(GraphError::Unresolved {
            kind: element.kind(),
            name: name.to_string(),
        });
    };
    let defines = element.defines().map(str::to_string);

    let (backing_def, multiplicity) = {
        let target = &spec.commands[target];
        (target.backing_def, target.multiplicity)
    };
    let cmd = &mut spec.commands[id];
    cmd.backing_def = backing_def;
    cmd.multiplicity = multiplicity;

    if let Some(vname) = defines {
        names.insert(vname, id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::error::ErrorClass;
    use crate::expr::TemplateEvaluator;
    use crate::graph::BaseSpec;
    use crate::matcher::{CatalogEntry, ListMatcher};
    use pretty_assertions::assert_eq;

    fn matcher() -> ListMatcher {
        let entry = |id: &str, host: &str| {
            let mut source = Source::new(id);
            source.vars.insert("HOST".into(), host.into());
            CatalogEntry {
                source,
                authorized: true,
            }
        };
        ListMatcher::new(vec![
            entry("h1.rrd", "alpha"),
            entry("h2.rrd", "beta"),
            entry("h3.rrd", "alpha"),
            entry("solo.rrd", "gamma"),
            entry("p1.rrd", "delta"),
            entry("p2.rrd", "delta"),
        ])
    }

    fn resolve_with(
        query: &str,
        env: &BTreeMap<String, Expr>,
    ) -> (Result<(), GraphError>, GraphSpec, RequestContext) {
        let matcher = matcher();
        let evaluator = TemplateEvaluator::new().expect("template regex");
        let mut spec = assemble(&BaseSpec::default(), query).expect("assemble");
        let mut request = RequestContext::default();
        let result = Resolver::new(&matcher, &evaluator, env).resolve(&mut spec, &mut request);
        (result, spec, request)
    }

    fn resolve(query: &str) -> (Result<(), GraphError>, GraphSpec) {
        let (result, spec, _) = resolve_with(query, &BTreeMap::new());
        (result, spec)
    }

    fn shape(spec: &GraphSpec) -> Vec<(Option<CommandId>, usize)> {
        spec.commands
            .iter()
            .map(|c| (c.backing_def, c.multiplicity))
            .collect()
    }

    #[test]
    fn multiplicity_flows_from_def_to_dependents() {
        let (result, spec) = resolve(
            "DEF:a=h*.rrd:in:AVERAGE&VDEF:peak=a,MAXIMUM&CDEF:bits=a,8,*&LINE1:bits#ff0000&GPRINT:peak:%lf",
        );
        assert_eq!(result, Ok(()));
        assert_eq!(
            shape(&spec),
            vec![(Some(0), 3), (Some(0), 3), (Some(0), 3), (Some(0), 3), (Some(0), 3)]
        );
        let Element::Def(def) = &spec.commands[0].element else {
            panic!("expected DEF");
        };
        let ids: Vec<&str> = def.sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["h1.rrd", "h2.rrd", "h3.rrd"]);
    }

    #[test]
    fn no_match_is_not_an_error() {
        let (result, spec) = resolve("DEF:a=none*.rrd:in:AVERAGE&LINE1:a#00ff00:Traffic");
        assert_eq!(result, Ok(()));
        assert_eq!(shape(&spec), vec![(Some(0), 0), (Some(0), 0)]);
    }

    #[test]
    fn forward_references_are_rejected() {
        let (result, _) = resolve("LINE1:a#00ff00&DEF:a=h1.rrd:in:AVERAGE");
        assert_eq!(
            result,
            Err(GraphError::Unresolved {
                kind: "LINE",
                name: "a".into()
            })
        );
    }

    #[test]
    fn undefined_gprint_names_the_culprit() {
        let (result, _) = resolve("DEF:a=h1.rrd:in:AVERAGE&GPRINT:b:%.1f");
        let err = result.expect_err("unresolved");
        assert_eq!(err.class(), ErrorClass::Request);
        assert_eq!(err.to_string(), "while parsing GPRINT: 'b' was not found");
    }

    #[test]
    fn vdef_needs_an_existing_source() {
        let (result, _) = resolve("VDEF:peak=missing,MAXIMUM");
        assert_eq!(
            result,
            Err(GraphError::Unresolved {
                kind: "VDEF",
                name: "missing".into()
            })
        );
    }

    #[test]
    fn later_definitions_shadow_earlier_ones() {
        let (result, spec) =
            resolve("DEF:a=h*.rrd:in:AVERAGE&DEF:a=solo.rrd:in:AVERAGE&AREA:a#0000ff");
        assert_eq!(result, Ok(()));
        assert_eq!(spec.commands[2].backing_def, Some(1));
        assert_eq!(spec.commands[2].multiplicity, 1);
        assert_eq!(spec.names.get("a"), Some(&1));
        let current = spec.lookup("a").expect("a is defined");
        assert_eq!(current.multiplicity, 1);
        assert!(spec.lookup("b").is_none());
    }

    #[test]
    fn cdef_anchor_is_first_resolvable_operand() {
        let (result, spec) =
            resolve("DEF:one=solo.rrd:in:AVERAGE&DEF:many=h*.rrd:in:AVERAGE&CDEF:c=2,one,many,+,*");
        assert_eq!(result, Ok(()));
        let cmd = &spec.commands[2];
        assert_eq!((cmd.backing_def, cmd.multiplicity), (Some(0), 1));
        let Element::Cdef(cdef) = &cmd.element else {
            panic!("expected CDEF");
        };
        let refs: Vec<Option<CommandId>> = cdef.rpn.iter().map(|t| t.reference).collect();
        assert_eq!(refs, vec![None, Some(0), Some(1), None, None]);
    }

    #[test]
    fn literal_cdef_is_inert() {
        let (result, spec) = resolve("CDEF:k=1,2,+&LINE1:k#ff0000");
        assert_eq!(result, Ok(()));
        assert_eq!(shape(&spec), vec![(None, 0), (None, 0)]);
    }

    #[test]
    fn cdef_rejects_conflicting_fan_out() {
        let (result, _) =
            resolve("DEF:a=h*.rrd:in:AVERAGE&DEF:b=p*.rrd:in:AVERAGE&CDEF:c=a,b,+");
        assert_eq!(
            result,
            Err(GraphError::MultiplicityMismatch {
                name: "c".into(),
                operand: "b".into(),
                expected: 3,
                found: 2,
            })
        );
    }

    #[test]
    fn single_anchor_only_accepts_summed_fan_out() {
        let (result, _) = resolve("DEF:s=solo.rrd:in:AVERAGE&DEF:a=h*.rrd:in:AVERAGE&CDEF:d=s,a,+");
        assert_eq!(result, Ok(()));

        let (result, _) = resolve(
            "DEF:s=solo.rrd:in:AVERAGE&DEF:a=p*.rrd:in:AVERAGE&CDEF:c=a,8,*&CDEF:d=s,c,+",
        );
        assert_eq!(
            result,
            Err(GraphError::MultiplicityMismatch {
                name: "d".into(),
                operand: "c".into(),
                expected: 1,
                found: 2,
            })
        );

        let (result, _) = resolve(
            "DEF:s=solo.rrd:in:AVERAGE&DEF:a=p*.rrd:in:AVERAGE&VDEF:v=a,MAXIMUM&CDEF:e=s,v,+",
        );
        let err = result.expect_err("VDEF has no summed form");
        assert_eq!(err.class(), ErrorClass::Request);
        assert!(matches!(err, GraphError::MultiplicityMismatch { operand, .. } if operand == "v"));
    }

    #[test]
    fn environment_is_aggregated_per_source() {
        let mut env = BTreeMap::new();
        env.insert("HOSTS".to_string(), Expr::new("%{HOST}"));
        env.insert("NOTHING".to_string(), Expr::new("%{UNSET}"));

        let (result, _, request) = resolve_with("DEF:a=h*.rrd:in:AVERAGE", &env);
        assert_eq!(result, Ok(()));
        assert_eq!(request.env.get("HOSTS").map(String::as_str), Some("alpha,beta"));
        assert_eq!(request.env.get("NOTHING"), None);
    }

    #[test]
    fn dynamic_path_is_evaluated_before_matching() {
        let matcher = matcher();
        let evaluator = TemplateEvaluator::new().expect("template regex");
        let env = BTreeMap::new();
        let base = BaseSpec {
            elements: vec![
                crate::element::parse_element(
                    "DEF:a=ignored.rrd:in:AVERAGE",
                    crate::element::DynamicFields {
                        path: Some(Expr::new("%{WHICH}*.rrd")),
                        ..Default::default()
                    },
                )
                .expect("DEF"),
            ],
            ..Default::default()
        };
        let mut spec = assemble(&base, "").expect("assemble");
        let mut request = RequestContext::default();
        request.vars.insert("WHICH".into(), "p".into());

        Resolver::new(&matcher, &evaluator, &env)
            .resolve(&mut spec, &mut request)
            .expect("resolve");
        assert_eq!(spec.commands[0].multiplicity, 2);
    }

    #[test]
    fn evaluation_failure_is_a_server_error() {
        let mut env = BTreeMap::new();
        env.insert("BROKEN".to_string(), Expr::new("%{"));
        let (result, _, _) = resolve_with("DEF:a=h1.rrd:in:AVERAGE", &env);
        assert_eq!(result.expect_err("broken").class(), ErrorClass::Server);
    }
}
