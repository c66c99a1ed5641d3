//! The contract between the grammar engine and its rule builder.
//!
//! The engine reports grammatical shape through these hooks and never
//! interprets the meaning of what it parsed; compose [`CssParser`] with a
//! concrete `CssBuilder` to get usable results.
//!
//! [`CssParser`]: crate::css::parser::CssParser

use crate::css::selector::{Combinator, CssSelector};
use crate::css::value::{Declaration, ExprOperator, Term};
use crate::error::CssParseError;

/// The builder's answer to an at-rule keyword the engine does not know.
#[derive(Debug)]
pub enum AtRuleHandling<'a, E> {
    /// The builder parsed the rule itself and the engine resumes at
    /// `remainder`, which must be a suffix of the input at least one
    /// character shorter than it.
    Consumed {
        remainder: &'a str,
        element: Option<E>,
    },
    /// The builder does not handle this keyword; the engine skips the rule.
    Declined,
}

/// The builder's answer to source no term recognizer matched.
#[derive(Debug)]
pub enum TermHandling<'a> {
    /// The builder produced a term and the engine resumes at `remainder`.
    Consumed { remainder: &'a str, term: Term },
    /// No term here; the engine ends the expression.
    Declined,
}

/// One method per parse event. Every hook defaults to a loud
/// "not implemented" failure (except [`at_ident`] and the declining arm of
/// [`term_unknown`], whose neutral answer is to decline), so a partial
/// builder rejects unsupported constructs instead of silently dropping
/// them.
///
/// Cross-invocation state such as namespace tables or font registries is
/// owned by the builder; the engine keeps none.
///
/// [`at_ident`]: CssBuilder::at_ident
/// [`term_unknown`]: CssBuilder::term_unknown
pub trait CssBuilder {
    /// The whole-stylesheet result of entry mode 1.
    type Stylesheet;
    /// One ruleset or at-rule result within a stylesheet.
    type Element;
    /// The declaration-list result of entry modes 2 and 3.
    type Inline;
    /// The mutable selector value built through capability calls.
    type Selector: CssSelector;

    fn begin_stylesheet(&mut self) -> Result<(), CssParseError> {
        Err(CssParseError::unsupported("begin_stylesheet"))
    }

    fn stylesheet(
        &mut self,
        elements: Vec<Self::Element>,
    ) -> Result<Self::Stylesheet, CssParseError> {
        let _ = elements;
        Err(CssParseError::unsupported("stylesheet"))
    }

    fn end_stylesheet(&mut self) -> Result<(), CssParseError> {
        Err(CssParseError::unsupported("end_stylesheet"))
    }

    fn begin_inline(&mut self) -> Result<(), CssParseError> {
        Err(CssParseError::unsupported("begin_inline"))
    }

    fn inline(&mut self, declarations: Vec<Declaration>) -> Result<Self::Inline, CssParseError> {
        let _ = declarations;
        Err(CssParseError::unsupported("inline"))
    }

    fn end_inline(&mut self) -> Result<(), CssParseError> {
        Err(CssParseError::unsupported("end_inline"))
    }

    fn at_charset(&mut self, charset: &str) -> Result<(), CssParseError> {
        let _ = charset;
        Err(CssParseError::unsupported("at_charset"))
    }

    /// `@import`. Resolving the referenced stylesheet (reading it and
    /// running a fresh parser over it) is the builder's business; the
    /// grammar engine performs no I/O and must not be reentered.
    fn at_import(
        &mut self,
        source: &str,
        mediums: &[String],
    ) -> Result<Option<Self::Element>, CssParseError> {
        let _ = (source, mediums);
        Err(CssParseError::unsupported("at_import"))
    }

    fn at_namespace(&mut self, prefix: Option<&str>, uri: &str) -> Result<(), CssParseError> {
        let _ = (prefix, uri);
        Err(CssParseError::unsupported("at_namespace"))
    }

    fn at_media(
        &mut self,
        mediums: &[String],
        elements: Vec<Self::Element>,
    ) -> Result<Option<Self::Element>, CssParseError> {
        let _ = (mediums, elements);
        Err(CssParseError::unsupported("at_media"))
    }

    /// `@page`. `name` carries any `:pseudo-page` suffix joined with `_`
    /// and may be empty; defaulting it (conventionally to `"body"`) is the
    /// builder's business.
    fn at_page(
        &mut self,
        name: &str,
        pseudo: Option<&str>,
        declarations: Vec<Declaration>,
    ) -> Result<Option<Self::Element>, CssParseError> {
        let _ = (name, pseudo, declarations);
        Err(CssParseError::unsupported("at_page"))
    }

    fn at_font_face(
        &mut self,
        declarations: Vec<Declaration>,
    ) -> Result<Option<Self::Element>, CssParseError> {
        let _ = declarations;
        Err(CssParseError::unsupported("at_font_face"))
    }

    fn at_frame(
        &mut self,
        name: Option<&str>,
        declarations: Vec<Declaration>,
    ) -> Result<Option<Self::Element>, CssParseError> {
        let _ = (name, declarations);
        Err(CssParseError::unsupported("at_frame"))
    }

    /// Any other `@keyword`. The builder may consume the rule body itself;
    /// declining makes the engine skip to the next top-level `;` or
    /// balanced block.
    fn at_ident<'a>(
        &mut self,
        keyword: &str,
        src: &'a str,
    ) -> Result<AtRuleHandling<'a, Self::Element>, CssParseError> {
        let _ = (keyword, src);
        Ok(AtRuleHandling::Declined)
    }

    fn selector(&mut self, name: &str) -> Result<Self::Selector, CssParseError> {
        let _ = name;
        Err(CssParseError::unsupported("selector"))
    }

    fn combine_selectors(
        &mut self,
        left: Self::Selector,
        combinator: Combinator,
        right: Self::Selector,
    ) -> Result<Self::Selector, CssParseError> {
        let _ = (left, combinator, right);
        Err(CssParseError::unsupported("combine_selectors"))
    }

    fn resolve_namespace_prefix(
        &mut self,
        prefix: Option<&str>,
        name: &str,
    ) -> Result<String, CssParseError> {
        let _ = (prefix, name);
        Err(CssParseError::unsupported("resolve_namespace_prefix"))
    }

    fn ruleset(
        &mut self,
        selectors: Vec<Self::Selector>,
        declarations: Vec<Declaration>,
    ) -> Result<Option<Self::Element>, CssParseError> {
        let _ = (selectors, declarations);
        Err(CssParseError::unsupported("ruleset"))
    }

    fn property(
        &mut self,
        name: &str,
        value: Term,
        important: bool,
    ) -> Result<Declaration, CssParseError> {
        let _ = (name, value, important);
        Err(CssParseError::unsupported("property"))
    }

    fn combine_terms(
        &mut self,
        left: Term,
        op: Option<ExprOperator>,
        right: Option<Term>,
    ) -> Result<Term, CssParseError> {
        let _ = (left, op, right);
        Err(CssParseError::unsupported("combine_terms"))
    }

    fn term_ident(&mut self, value: &str) -> Result<Term, CssParseError> {
        let _ = value;
        Err(CssParseError::unsupported("term_ident"))
    }

    /// `value` is the matched numeric text; converting it is the builder's
    /// business.
    fn term_number(&mut self, value: &str, unit: Option<&str>) -> Result<Term, CssParseError> {
        let _ = (value, unit);
        Err(CssParseError::unsupported("term_number"))
    }

    fn term_rgb(&mut self, value: &str) -> Result<Term, CssParseError> {
        let _ = value;
        Err(CssParseError::unsupported("term_rgb"))
    }

    fn term_uri(&mut self, value: &str) -> Result<Term, CssParseError> {
        let _ = value;
        Err(CssParseError::unsupported("term_uri"))
    }

    fn term_string(&mut self, value: &str) -> Result<Term, CssParseError> {
        let _ = value;
        Err(CssParseError::unsupported("term_string"))
    }

    fn term_unicode_range(&mut self, value: &str) -> Result<Term, CssParseError> {
        let _ = value;
        Err(CssParseError::unsupported("term_unicode_range"))
    }

    fn term_function(&mut self, name: &str, args: Term) -> Result<Term, CssParseError> {
        let _ = (name, args);
        Err(CssParseError::unsupported("term_function"))
    }

    /// Last-resort term recognizer. Receives the raw remaining source and
    /// either consumes a prefix of it, declines, or fails the parse.
    fn term_unknown<'a>(&mut self, src: &'a str) -> Result<TermHandling<'a>, CssParseError> {
        let _ = src;
        Err(CssParseError::unsupported("term_unknown"))
    }
}
