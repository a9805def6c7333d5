use crate::context::{Expr, Source};

/// Index of a command within its `GraphSpec`.
pub type CommandId = usize;

/// Legend text, or an expression that replaces it at generation time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Legend {
    pub text: String,
    pub expr: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Def {
    pub vname: String,
    pub path: String,
    pub dsname: String,
    pub cf: String,
    /// Replaces `path` as the match template when present.
    pub path_expr: Option<Expr>,
    /// Base directory the template is matched under.
    pub base_expr: Option<Expr>,
    /// Filled by the resolver; its length is the multiplicity.
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vdef {
    pub vname: String,
    pub dsname: String,
    pub rpn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpnToken {
    pub text: String,
    /// Set by the resolver when `text` names an earlier definition.
    pub reference: Option<CommandId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cdef {
    pub vname: String,
    pub rpn: Vec<RpnToken>,
}

/// Shared shape of LINE, AREA and TICK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plot {
    pub vname: String,
    pub colour: Option<String>,
    pub legend: Legend,
    /// Trailing text handed to the engine untouched.
    pub args: String,
}

/// VRULE and HRULE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub value: String,
    pub colour: Option<String>,
    pub legend: Legend,
    pub args: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    pub vname: String,
    pub offset: String,
}

/// PRINT and GPRINT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Print {
    pub vname: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Def(Def),
    Vdef(Vdef),
    Cdef(Cdef),
    Line { width: String, plot: Plot },
    Area(Plot),
    Tick { fraction: String, plot: Plot },
    Vrule(Rule),
    Hrule(Rule),
    Shift(Shift),
    Print(Print),
    Gprint(Print),
    Comment(Legend),
    TextAlign(Legend),
}

impl Element {
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Def(_) => "DEF",
            Element::Vdef(_) => "VDEF",
            Element::Cdef(_) => "CDEF",
            Element::Line { .. } => "LINE",
            Element::Area(_) => "AREA",
            Element::Tick { .. } => "TICK",
            Element::Vrule(_) => "VRULE",
            Element::Hrule(_) => "HRULE",
            Element::Shift(_) => "SHIFT",
            Element::Print(_) => "PRINT",
            Element::Gprint(_) => "GPRINT",
            Element::Comment(_) => "COMMENT",
            Element::TextAlign(_) => "TEXTALIGN",
        }
    }

    /// The name this element defines, if any.
    pub fn defines(&self) -> Option<&str> {
        match self {
            Element::Def(d) => Some(&d.vname),
            Element::Vdef(v) => Some(&v.vname),
            Element::Cdef(c) => Some(&c.vname),
            _ => None,
        }
    }

    /// The single earlier name this element must refer to, if any.
    ///
    /// CDEF operands are looked up token by token and are not included.
    pub fn refers_to(&self) -> Option<&str> {
        match self {
            Element::Vdef(v) => Some(&v.dsname),
            Element::Line { plot, .. } | Element::Area(plot) | Element::Tick { plot, .. } => {
                Some(&plot.vname)
            }
            Element::Shift(s) => Some(&s.vname),
            Element::Print(p) | Element::Gprint(p) => Some(&p.vname),
            _ => None,
        }
    }

    /// LINE, AREA and TICK own the PRINT/GPRINT lines that follow them.
    pub fn is_plot(&self) -> bool {
        matches!(
            self,
            Element::Line { .. } | Element::Area(_) | Element::Tick { .. }
        )
    }

    pub fn is_print(&self) -> bool {
        matches!(self, Element::Print(_) | Element::Gprint(_))
    }
}

/// An element plus what resolution learned about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub element: Element,
    /// The DEF that ultimately anchors this command's data.
    pub backing_def: Option<CommandId>,
    /// Number of concrete sources behind this command.
    pub multiplicity: usize,
}

impl Command {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            backing_def: None,
            multiplicity: 0,
        }
    }
}
