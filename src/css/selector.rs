//! The capability seam for selector construction.
//!
//! The grammar engine builds selectors incrementally through these calls
//! and never inspects the value it is building.

use crate::css::value::Term;
use crate::error::CssParseError;

/// Operator joining two simple selectors.
/// https://www.w3.org/TR/CSS21/selector.html#selector-syntax
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    /// Descendant (whitespace).
    Whitespace,
    /// Child (`>`).
    GreaterThan,
    /// Adjacent sibling (`+`).
    Plus,
}

/// A selector value under construction. `CssBuilder::selector` and
/// `CssBuilder::combine_selectors` return implementations of this trait.
///
/// Every method defaults to a loud failure so a builder that does not
/// support a qualifier kind rejects it instead of silently dropping it.
pub trait CssSelector {
    fn add_hash_id(&mut self, id: &str) -> Result<(), CssParseError> {
        let _ = id;
        Err(CssParseError::unsupported("add_hash_id"))
    }

    fn add_class(&mut self, class: &str) -> Result<(), CssParseError> {
        let _ = class;
        Err(CssParseError::unsupported("add_class"))
    }

    fn add_attribute(&mut self, name: &str) -> Result<(), CssParseError> {
        let _ = name;
        Err(CssParseError::unsupported("add_attribute"))
    }

    fn add_attribute_operation(
        &mut self,
        name: &str,
        op: &str,
        value: &str,
    ) -> Result<(), CssParseError> {
        let _ = (name, op, value);
        Err(CssParseError::unsupported("add_attribute_operation"))
    }

    fn add_pseudo(&mut self, name: &str) -> Result<(), CssParseError> {
        let _ = name;
        Err(CssParseError::unsupported("add_pseudo"))
    }

    fn add_pseudo_function(&mut self, name: &str, args: Term) -> Result<(), CssParseError> {
        let _ = (name, args);
        Err(CssParseError::unsupported("add_pseudo_function"))
    }
}
