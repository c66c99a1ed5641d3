#![deny(unsafe_code)]

mod css;
mod error;

pub use css::builder::{AtRuleHandling, CssBuilder, TermHandling};
pub use css::cssom::{
    CssomBuilder, Rule, Selector, SelectorPart, SimpleSelector, StyleRule, StyleSheet,
};
pub use css::parser::CssParser;
pub use css::selector::{Combinator, CssSelector};
pub use css::value::{Declaration, ExprOperator, Term};
pub use error::{CssParseError, Error, Result};
