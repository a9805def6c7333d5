//! Serialise a resolved `GraphSpec` into the engine's argument vector.
//!
//! Per command, by multiplicity:
//! - 0: nothing is emitted.
//! - 1: the literal form, unsuffixed, against the single source.
//! - N: one variant per source with `w<index>` appended to every name that
//!   fans out. A DEF also gets a summing CDEF under its original name.
//!
//! LINE, AREA and TICK with N > 1 absorb the PRINT/GPRINT run directly after
//! them that shares their backing DEF: each source variant of the plot is
//! followed by that variant of every absorbed print.

use crate::context::{Evaluator, RequestContext, Scope, Source, evaluate};
use crate::element::{Cdef, Command, CommandId, Def, Element, Legend, Plot, Print, Rule, Vdef};
use crate::error::GraphError;
use crate::format::ImageFormat;
use crate::graph::GraphSpec;
use crate::option::OptionValue;
use crate::quote::colon_escape;
use std::ops::Range;
use tracing::debug;

/// Program name placed in argv[0].
pub const PROGRAM: &str = "rrdgraph";
/// Tells the engine to render into memory instead of a file.
pub const TO_MEMORY: &str = "-";

/// A command together with the print commands it absorbs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub head: CommandId,
    pub absorbed: Range<CommandId>,
}

/// Partition the command list so that every command appears in exactly one
/// group, either as a head or absorbed by the plot before it.
pub fn group_commands(commands: &[Command]) -> Vec<Group> {
    let mut groups = Vec::with_capacity(commands.len());
    let mut i = 0;
    while i < commands.len() {
        let head = &commands[i];
        let mut end = i + 1;
        if head.element.is_plot() && head.multiplicity > 1 {
            while end < commands.len()
                && commands[end].element.is_print()
                && commands[end].backing_def == head.backing_def
            {
                end += 1;
            }
        }
        groups.push(Group {
            head: i,
            absorbed: i + 1..end,
        });
        i = end;
    }
    groups
}

pub fn generate(
    spec: &GraphSpec,
    format: ImageFormat,
    evaluator: &dyn Evaluator,
    request: &RequestContext,
) -> Result<Vec<String>, GraphError> {
    let mut generator = Generator {
        spec,
        evaluator,
        request,
        args: Vec::new(),
    };
    generator.run(format)?;

    for (i, arg) in generator.args.iter().enumerate() {
        debug!("rrdgraph:{}: {}", i, arg);
    }
    Ok(generator.args)
}

struct Generator<'a> {
    spec: &'a GraphSpec,
    evaluator: &'a dyn Evaluator,
    request: &'a RequestContext,
    args: Vec<String>,
}

impl<'a> Generator<'a> {
    fn run(&mut self, format: ImageFormat) -> Result<(), GraphError> {
        self.args.extend([
            PROGRAM.to_string(),
            TO_MEMORY.to_string(),
            "--imgformat".to_string(),
            format.as_str().to_string(),
        ]);

        for option in &self.spec.options {
            self.args.push(format!("--{}", option.key));
            match &option.value {
                Some(OptionValue::Literal(value)) => self.args.push(value.clone()),
                Some(OptionValue::Dynamic(expr)) => {
                    let value = evaluate(self.evaluator, expr, Scope::Request(self.request))?;
                    self.args.push(value);
                }
                None => {}
            }
        }

        for group in group_commands(&self.spec.commands) {
            self.emit_group(&group)?;
        }
        Ok(())
    }

    fn emit_group(&mut self, group: &Group) -> Result<(), GraphError> {
        let spec = self.spec;
        let cmd = spec.command(group.head);
        let n = cmd.multiplicity;

        match &cmd.element {
            Element::Def(def) => self.emit_def(def),
            Element::Vdef(vdef) => {
                self.emit_vdef(vdef, n);
                Ok(())
            }
            Element::Cdef(cdef) => {
                self.emit_cdef(cdef, n);
                Ok(())
            }
            Element::Line { width, plot } => {
                let head = format!("LINE{width}");
                self.emit_plot(cmd, plot, group, |name, legend| {
                    format!("{head}:{name}{}:{legend}{}", colour(&plot.colour), tail(&plot.args))
                })
            }
            Element::Area(plot) => self.emit_plot(cmd, plot, group, |name, legend| {
                format!("AREA:{name}{}:{legend}{}", colour(&plot.colour), tail(&plot.args))
            }),
            Element::Tick { fraction, plot } => self.emit_plot(cmd, plot, group, |name, legend| {
                format!(
                    "TICK:{name}{}:{fraction}:{legend}{}",
                    colour(&plot.colour),
                    tail(&plot.args)
                )
            }),
            Element::Shift(shift) => {
                self.emit_each(&shift.vname, n, |name| format!("SHIFT:{name}:{}", shift.offset));
                Ok(())
            }
            Element::Print(print) => {
                self.emit_each(&print.vname, n, |name| print_line("PRINT", name, print));
                Ok(())
            }
            Element::Gprint(print) => {
                self.emit_each(&print.vname, n, |name| print_line("GPRINT", name, print));
                Ok(())
            }
            Element::Vrule(rule) => self.emit_rule("VRULE", rule),
            Element::Hrule(rule) => self.emit_rule("HRULE", rule),
            Element::Comment(legend) => self.emit_text("COMMENT", legend),
            Element::TextAlign(legend) => self.emit_text("TEXTALIGN", legend),
        }
    }

    fn emit_def(&mut self, def: &Def) -> Result<(), GraphError> {
        if def.cf.contains(":daemon=") {
            return Err(GraphError::DaemonOverride);
        }

        match def.sources.as_slice() {
            [] => {}
            [source] => self.args.push(format!(
                "DEF:{}={}:{}:{}",
                def.vname,
                colon_escape(&source.id),
                def.dsname,
                def.cf
            )),
            sources => {
                let mut summary = format!("CDEF:{}=", def.vname);
                for (j, source) in sources.iter().enumerate() {
                    self.args.push(format!(
                        "DEF:{}w{j}={}:{}:{}",
                        def.vname,
                        colon_escape(&source.id),
                        def.dsname,
                        def.cf
                    ));
                    if j == 0 {
                        summary.push_str(&format!("{}w0", def.vname));
                    } else {
                        summary.push_str(&format!(",{}w{j},+", def.vname));
                    }
                }
                self.args.push(summary);
            }
        }
        Ok(())
    }

    fn emit_vdef(&mut self, vdef: &Vdef, n: usize) {
        match n {
            0 => {}
            1 => self
                .args
                .push(format!("VDEF:{}={},{}", vdef.vname, vdef.dsname, vdef.rpn)),
            _ => {
                for j in 0..n {
                    self.args.push(format!(
                        "VDEF:{}w{j}={}w{j},{}",
                        vdef.vname, vdef.dsname, vdef.rpn
                    ));
                }
            }
        }
    }

    fn emit_cdef(&mut self, cdef: &Cdef, n: usize) {
        match n {
            0 => {}
            1 => {
                let rpn: Vec<&str> = cdef.rpn.iter().map(|t| t.text.as_str()).collect();
                self.args
                    .push(format!("CDEF:{}={}", cdef.vname, rpn.join(",")));
            }
            _ => {
                for j in 0..n {
                    let rpn: Vec<String> = cdef
                        .rpn
                        .iter()
                        .map(|token| match token.reference {
                            Some(id) if self.spec.command(id).multiplicity >= 2 => {
                                format!("{}w{j}", token.text)
                            }
                            _ => token.text.clone(),
                        })
                        .collect();
                    self.args
                        .push(format!("CDEF:{}w{j}={}", cdef.vname, rpn.join(",")));
                }
            }
        }
    }

    /// Emit a LINE/AREA/TICK (and what it absorbed). `render` receives the
    /// possibly suffixed name and the escaped legend.
    fn emit_plot<F>(
        &mut self,
        cmd: &Command,
        plot: &Plot,
        group: &Group,
        render: F,
    ) -> Result<(), GraphError>
    where
        F: Fn(&str, &str) -> String,
    {
        let sources = self.sources_of(cmd);

        match cmd.multiplicity {
            0 => {}
            1 => {
                let legend = self.legend(&plot.legend, sources.first())?;
                self.args.push(render(&plot.vname, &legend));
            }
            n => {
                for j in 0..n {
                    let legend = self.legend(&plot.legend, sources.get(j))?;
                    self.args
                        .push(render(&format!("{}w{j}", plot.vname), &legend));

                    for id in group.absorbed.clone() {
                        match &self.spec.command(id).element {
                            Element::Print(p) => self
                                .args
                                .push(print_line("PRINT", &format!("{}w{j}", p.vname), p)),
                            Element::Gprint(p) => self
                                .args
                                .push(print_line("GPRINT", &format!("{}w{j}", p.vname), p)),
                            _ => {}
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn emit_each<F>(&mut self, vname: &str, n: usize, render: F)
    where
        F: Fn(&str) -> String,
    {
        match n {
            0 => {}
            1 => self.args.push(render(vname)),
            _ => {
                for j in 0..n {
                    self.args.push(render(&format!("{vname}w{j}")));
                }
            }
        }
    }

    fn emit_rule(&mut self, keyword: &str, rule: &Rule) -> Result<(), GraphError> {
        let legend = self.legend(&rule.legend, None)?;
        self.args.push(format!(
            "{keyword}:{}{}:{legend}{}",
            rule.value,
            colour(&rule.colour),
            tail(&rule.args)
        ));
        Ok(())
    }

    fn emit_text(&mut self, keyword: &str, legend: &Legend) -> Result<(), GraphError> {
        let legend = self.legend(legend, None)?;
        self.args.push(format!("{keyword}:{legend}"));
        Ok(())
    }

    /// Sources behind a command, taken from its backing DEF.
    fn sources_of(&self, cmd: &Command) -> &'a [Source] {
        let spec = self.spec;
        match cmd.backing_def.map(|id| &spec.command(id).element) {
            Some(Element::Def(def)) => &def.sources,
            _ => &[],
        }
    }

    /// Literal legend text, or its expression evaluated against `source`
    /// (the request when there is none); escaped either way.
    fn legend(&self, legend: &Legend, source: Option<&Source>) -> Result<String, GraphError> {
        let text = match &legend.expr {
            Some(expr) => {
                let scope = match source {
                    Some(source) => Scope::Source {
                        request: self.request,
                        source,
                    },
                    None => Scope::Request(self.request),
                };
                evaluate(self.evaluator, expr, scope)?
            }
            None => legend.text.clone(),
        };
        Ok(colon_escape(&text).into_owned())
    }
}

fn print_line(keyword: &str, name: &str, print: &Print) -> String {
    format!("{keyword}:{name}:{}", print.format)
}

fn colour(colour: &Option<String>) -> String {
    colour.as_ref().map(|c| format!("#{c}")).unwrap_or_default()
}

fn tail(args: &str) -> String {
    if args.is_empty() {
        String::new()
    } else {
        format!(":{args}")
    }
}
