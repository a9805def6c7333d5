//! Graph elements: the typed command list and the parser that produces it.

pub mod command;
pub mod parse;

pub use command::{
    Cdef, Command, CommandId, Def, Element, Legend, Plot, Print, RpnToken, Rule, Shift, Vdef,
};
pub use parse::{DynamicFields, parse_element};
