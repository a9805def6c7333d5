//! Element parsing: one raw element string into a typed `Element`.
//!
//! Grammar (case-sensitive keyword prefix):
//!   DEF:vname=path:dsname:cf
//!   VDEF:vname=dsname,rpn
//!   CDEF:vname=rpn,rpn,...
//!   LINE<width>:vname[#colour]:legend[:args]
//!   AREA:vname[#colour]:legend[:args]
//!   TICK:vname[#colour]:fraction:legend[:args]
//!   VRULE:value[#colour]:legend[:args]      (HRULE alike)
//!   SHIFT:vname:offset
//!   PRINT:vname:format                       (GPRINT alike)
//!   COMMENT:legend                           (TEXTALIGN alike)
//!
//! Legends may be quoted to carry `:` characters. Trailing args are kept
//! verbatim; their grammar belongs to the engine.

use crate::context::Expr;
use crate::element::command::{
    Cdef, Def, Element, Legend, Plot, Print, RpnToken, Rule, Shift, Vdef,
};
use crate::quote::{split_quoted, split_word};

/// Dynamic expressions an administrator may attach to an element.
/// Request input never carries any.
#[derive(Debug, Clone, Default)]
pub struct DynamicFields {
    pub legend: Option<Expr>,
    pub path: Option<Expr>,
    pub base: Option<Expr>,
}

/// Parse `text` into an element, or `None` when it matches no known grammar.
pub fn parse_element(text: &str, dynamic: DynamicFields) -> Option<Element> {
    if let Some(rest) = text.strip_prefix("DEF:") {
        return parse_def(rest, dynamic);
    }
    if let Some(rest) = text.strip_prefix("VDEF:") {
        return parse_vdef(rest);
    }
    if let Some(rest) = text.strip_prefix("CDEF:") {
        return parse_cdef(rest);
    }
    if let Some(rest) = text.strip_prefix("AREA:") {
        return parse_plot(rest, dynamic.legend).map(Element::Area);
    }
    if let Some(rest) = text.strip_prefix("LINE") {
        let (width, rest) = split_word(rest, ':');
        if !is_line_width(width) {
            return None;
        }
        let plot = parse_plot(rest, dynamic.legend)?;
        return Some(Element::Line {
            width: width.to_string(),
            plot,
        });
    }
    if let Some(rest) = text.strip_prefix("TICK:") {
        return parse_tick(rest, dynamic.legend);
    }
    if let Some(rest) = text.strip_prefix("VRULE:") {
        return Some(Element::Vrule(parse_rule(rest, dynamic.legend)));
    }
    if let Some(rest) = text.strip_prefix("HRULE:") {
        return Some(Element::Hrule(parse_rule(rest, dynamic.legend)));
    }
    if let Some(rest) = text.strip_prefix("SHIFT:") {
        let (vname, offset) = split_word(rest, ':');
        return non_empty(vname).map(|vname| {
            Element::Shift(Shift {
                vname,
                offset: offset.to_string(),
            })
        });
    }
    if let Some(rest) = text.strip_prefix("PRINT:") {
        return parse_print(rest).map(Element::Print);
    }
    if let Some(rest) = text.strip_prefix("GPRINT:") {
        return parse_print(rest).map(Element::Gprint);
    }
    if let Some(rest) = text.strip_prefix("COMMENT:") {
        return Some(Element::Comment(parse_legend(rest, dynamic.legend).0));
    }
    if let Some(rest) = text.strip_prefix("TEXTALIGN:") {
        return Some(Element::TextAlign(parse_legend(rest, dynamic.legend).0));
    }
    None
}

fn parse_def(rest: &str, dynamic: DynamicFields) -> Option<Element> {
    let (vname, rest) = split_word(rest, '=');
    let (path, rest) = split_word(rest, ':');
    let (dsname, cf) = split_word(rest, ':');
    Some(Element::Def(Def {
        vname: non_empty(vname)?,
        path: path.to_string(),
        dsname: dsname.to_string(),
        cf: cf.to_string(),
        path_expr: dynamic.path,
        base_expr: dynamic.base,
        sources: Vec::new(),
    }))
}

fn parse_vdef(rest: &str) -> Option<Element> {
    let (vname, rest) = split_word(rest, '=');
    let (dsname, rpn) = split_word(rest, ',');
    Some(Element::Vdef(Vdef {
        vname: non_empty(vname)?,
        dsname: non_empty(dsname)?,
        rpn: rpn.to_string(),
    }))
}

fn parse_cdef(rest: &str) -> Option<Element> {
    let (vname, rpn) = split_word(rest, '=');
    let rpn = rpn
        .split(',')
        .filter(|t| !t.is_empty())
        .map(|t| RpnToken {
            text: t.to_string(),
            reference: None,
        })
        .collect();
    Some(Element::Cdef(Cdef {
        vname: non_empty(vname)?,
        rpn,
    }))
}

fn parse_tick(rest: &str, legend_expr: Option<Expr>) -> Option<Element> {
    let (vncol, rest) = split_word(rest, ':');
    let (fraction, rest) = split_word(rest, ':');
    let (legend, args) = parse_legend(rest, legend_expr);
    let (vname, colour) = split_colour(vncol);
    Some(Element::Tick {
        fraction: fraction.to_string(),
        plot: Plot {
            vname: non_empty(vname)?,
            colour,
            legend,
            args: args.to_string(),
        },
    })
}

fn parse_plot(rest: &str, legend_expr: Option<Expr>) -> Option<Plot> {
    let (vncol, rest) = split_word(rest, ':');
    let (legend, args) = parse_legend(rest, legend_expr);
    let (vname, colour) = split_colour(vncol);
    Some(Plot {
        vname: non_empty(vname)?,
        colour,
        legend,
        args: args.to_string(),
    })
}

fn parse_rule(rest: &str, legend_expr: Option<Expr>) -> Rule {
    let (valcol, rest) = split_word(rest, ':');
    let (legend, args) = parse_legend(rest, legend_expr);
    let (value, colour) = split_colour(valcol);
    Rule {
        value: value.to_string(),
        colour,
        legend,
        args: args.to_string(),
    }
}

fn parse_print(rest: &str) -> Option<Print> {
    let (vname, format) = split_word(rest, ':');
    Some(Print {
        vname: non_empty(vname)?,
        format: format.to_string(),
    })
}

fn parse_legend(rest: &str, expr: Option<Expr>) -> (Legend, &str) {
    let (text, rest) = split_quoted(rest, ':');
    (Legend { text, expr }, rest)
}

fn split_colour(s: &str) -> (&str, Option<String>) {
    match s.split_once('#') {
        Some((name, colour)) => (name, Some(colour.to_string())),
        None => (s, None),
    }
}

fn is_line_width(width: &str) -> bool {
    width.starts_with(|c: char| c.is_ascii_digit())
        && width.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Option<Element> {
        parse_element(text, DynamicFields::default())
    }

    #[test]
    fn def_splits_path_dsname_and_cf() {
        let Some(Element::Def(def)) = parse("DEF:in=monitor*.rrd:ifInOctets:AVERAGE:step=60")
        else {
            panic!("expected DEF");
        };
        assert_eq!(def.vname, "in");
        assert_eq!(def.path, "monitor*.rrd");
        assert_eq!(def.dsname, "ifInOctets");
        assert_eq!(def.cf, "AVERAGE:step=60");
        assert!(def.sources.is_empty());
    }

    #[test]
    fn vdef_keeps_rpn_after_first_comma() {
        assert_eq!(
            parse("VDEF:peak=in,MAXIMUM"),
            Some(Element::Vdef(Vdef {
                vname: "peak".into(),
                dsname: "in".into(),
                rpn: "MAXIMUM".into(),
            }))
        );
    }

    #[test]
    fn cdef_tokenises_rpn() {
        let Some(Element::Cdef(cdef)) = parse("CDEF:bits=in,8,*") else {
            panic!("expected CDEF");
        };
        let tokens: Vec<&str> = cdef.rpn.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(tokens, vec!["in", "8", "*"]);
        assert!(cdef.rpn.iter().all(|t| t.reference.is_none()));
    }

    #[test]
    fn line_with_colour_quoted_legend_and_args() {
        let parsed = parse(r#"LINE2:in#00ff00:"In: eth0":dashes=3:skipscale"#);
        assert_eq!(
            parsed,
            Some(Element::Line {
                width: "2".into(),
                plot: Plot {
                    vname: "in".into(),
                    colour: Some("00ff00".into()),
                    legend: Legend {
                        text: "In: eth0".into(),
                        expr: None,
                    },
                    args: "dashes=3:skipscale".into(),
                },
            })
        );
    }

    #[test]
    fn line_requires_a_numeric_width() {
        assert!(parse("LINE1.5:in#ff0000:x").is_some());
        assert!(parse("LINE:in#ff0000:x").is_none());
        assert!(parse("LINEAR:in").is_none());
    }

    #[test]
    fn area_without_colour() {
        let Some(Element::Area(plot)) = parse("AREA:in") else {
            panic!("expected AREA");
        };
        assert_eq!(plot.vname, "in");
        assert_eq!(plot.colour, None);
        assert_eq!(plot.legend.text, "");
        assert_eq!(plot.args, "");
    }

    #[test]
    fn tick_reads_fraction_before_legend() {
        let Some(Element::Tick { fraction, plot }) = parse("TICK:fail#ff0000:1.0:Failures")
        else {
            panic!("expected TICK");
        };
        assert_eq!(fraction, "1.0");
        assert_eq!(plot.legend.text, "Failures");
    }

    #[test]
    fn rules_take_values_not_names() {
        let Some(Element::Vrule(rule)) = parse("VRULE:0#FF0000:dashed line:dashes") else {
            panic!("expected VRULE");
        };
        assert_eq!(rule.value, "0");
        assert_eq!(rule.colour.as_deref(), Some("FF0000"));
        assert_eq!(rule.legend.text, "dashed line");
        assert_eq!(rule.args, "dashes");
        assert!(matches!(parse("HRULE:100#0000ff"), Some(Element::Hrule(_))));
    }

    #[test]
    fn shift_print_and_gprint_split_once() {
        assert_eq!(
            parse("GPRINT:peak:%.1lf %s"),
            Some(Element::Gprint(Print {
                vname: "peak".into(),
                format: "%.1lf %s".into(),
            }))
        );
        assert!(matches!(parse("PRINT:peak:%lf"), Some(Element::Print(_))));
        assert!(matches!(parse("SHIFT:in:3600"), Some(Element::Shift(_))));
    }

    #[test]
    fn comment_and_textalign_carry_a_legend() {
        assert_eq!(
            parse(r#"COMMENT:"Generated at: noon""#),
            Some(Element::Comment(Legend {
                text: "Generated at: noon".into(),
                expr: None,
            }))
        );
        assert!(matches!(parse("TEXTALIGN:left"), Some(Element::TextAlign(l)) if l.text == "left"));
    }

    #[test]
    fn dynamic_fields_attach_to_the_right_place() {
        let dynamic = DynamicFields {
            legend: Some(Expr::new("%{HOST}")),
            ..Default::default()
        };
        let Some(Element::Area(plot)) = parse_element("AREA:in#00ff00:ignored", dynamic) else {
            panic!("expected AREA");
        };
        assert_eq!(plot.legend.expr, Some(Expr::new("%{HOST}")));

        let dynamic = DynamicFields {
            path: Some(Expr::new("%{HOST}*.rrd")),
            base: Some(Expr::new("/var/lib/rrd")),
            ..Default::default()
        };
        let Some(Element::Def(def)) = parse_element("DEF:a=x.rrd:in:AVERAGE", dynamic) else {
            panic!("expected DEF");
        };
        assert_eq!(def.path_expr, Some(Expr::new("%{HOST}*.rrd")));
        assert_eq!(def.base_expr, Some(Expr::new("/var/lib/rrd")));
    }

    #[test]
    fn unknown_or_incomplete_elements_are_not_recognised() {
        assert_eq!(parse("title=Traffic"), None);
        assert_eq!(parse("def:a=x.rrd:in:AVERAGE"), None);
        assert_eq!(parse("DEF:=x.rrd:in:AVERAGE"), None);
        assert_eq!(parse("GPRINT::%lf"), None);
        assert_eq!(parse(""), None);
    }
}
