//! A concrete object model and the reference builder producing it.
//!
//! `CssomBuilder` implements every capability hook by plain construction:
//! it records grammatical shape and nothing else. It is the builder used
//! by the CLI and the test suite, and the starting point for consumers
//! that want a value tree instead of wiring their own builder.

use std::collections::HashMap;

use crate::css::builder::{CssBuilder, TermHandling};
use crate::css::selector::{Combinator, CssSelector};
use crate::css::value::{Declaration, ExprOperator, Term};
use crate::error::CssParseError;

#[derive(Debug, PartialEq)]
pub struct StyleSheet {
    pub charset: Option<String>,
    pub rules: Vec<Rule>,
}

/// A stylesheet is a series of style rules and at-rules.
#[derive(Debug, PartialEq)]
pub enum Rule {
    Style(StyleRule),
    Import {
        source: String,
        mediums: Vec<String>,
    },
    Media {
        mediums: Vec<String>,
        rules: Vec<Rule>,
    },
    Page {
        name: String,
        declarations: Vec<Declaration>,
    },
    FontFace {
        declarations: Vec<Declaration>,
    },
    Frame {
        name: Option<String>,
        declarations: Vec<Declaration>,
    },
}

#[derive(Debug, PartialEq)]
pub struct StyleRule {
    pub selectors: Vec<Selector>,
    pub declarations: Vec<Declaration>,
}

/// One qualifier of a simple selector.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectorPart {
    Id(String),
    Class(String),
    Attribute {
        name: String,
        op: Option<String>,
        value: Option<String>,
    },
    Pseudo(String),
    PseudoFunction {
        name: String,
        args: Term,
    },
}

/// Element name (or `*`) plus qualifiers, no combinator.
#[derive(Clone, Debug, PartialEq)]
pub struct SimpleSelector {
    pub name: String,
    pub parts: Vec<SelectorPart>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    Simple(SimpleSelector),
    Complex(Box<Selector>, Combinator, Box<Selector>),
}

impl Selector {
    /// Qualifiers always attach to the rightmost simple selector of a
    /// combinator chain.
    fn last_simple_mut(&mut self) -> &mut SimpleSelector {
        match self {
            Selector::Simple(simple) => simple,
            Selector::Complex(_, _, right) => right.last_simple_mut(),
        }
    }
}

impl CssSelector for Selector {
    fn add_hash_id(&mut self, id: &str) -> Result<(), CssParseError> {
        self.last_simple_mut().parts.push(SelectorPart::Id(id.to_string()));
        Ok(())
    }

    fn add_class(&mut self, class: &str) -> Result<(), CssParseError> {
        self.last_simple_mut()
            .parts
            .push(SelectorPart::Class(class.to_string()));
        Ok(())
    }

    fn add_attribute(&mut self, name: &str) -> Result<(), CssParseError> {
        self.last_simple_mut().parts.push(SelectorPart::Attribute {
            name: name.to_string(),
            op: None,
            value: None,
        });
        Ok(())
    }

    fn add_attribute_operation(
        &mut self,
        name: &str,
        op: &str,
        value: &str,
    ) -> Result<(), CssParseError> {
        self.last_simple_mut().parts.push(SelectorPart::Attribute {
            name: name.to_string(),
            op: Some(op.to_string()),
            value: Some(value.to_string()),
        });
        Ok(())
    }

    fn add_pseudo(&mut self, name: &str) -> Result<(), CssParseError> {
        self.last_simple_mut()
            .parts
            .push(SelectorPart::Pseudo(name.to_string()));
        Ok(())
    }

    fn add_pseudo_function(&mut self, name: &str, args: Term) -> Result<(), CssParseError> {
        self.last_simple_mut().parts.push(SelectorPart::PseudoFunction {
            name: name.to_string(),
            args,
        });
        Ok(())
    }
}

/// Records parse events into the object model above. The namespace table
/// persists across parse invocations; everything else is per-invocation.
#[derive(Debug, Default)]
pub struct CssomBuilder {
    charset: Option<String>,
    namespaces: HashMap<String, String>,
}

impl CssomBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CssBuilder for CssomBuilder {
    type Stylesheet = StyleSheet;
    type Element = Rule;
    type Inline = Vec<Declaration>;
    type Selector = Selector;

    fn begin_stylesheet(&mut self) -> Result<(), CssParseError> {
        Ok(())
    }

    fn stylesheet(&mut self, elements: Vec<Rule>) -> Result<StyleSheet, CssParseError> {
        Ok(StyleSheet {
            charset: self.charset.take(),
            rules: elements,
        })
    }

    fn end_stylesheet(&mut self) -> Result<(), CssParseError> {
        Ok(())
    }

    fn begin_inline(&mut self) -> Result<(), CssParseError> {
        Ok(())
    }

    fn inline(&mut self, declarations: Vec<Declaration>) -> Result<Vec<Declaration>, CssParseError> {
        Ok(declarations)
    }

    fn end_inline(&mut self) -> Result<(), CssParseError> {
        Ok(())
    }

    fn at_charset(&mut self, charset: &str) -> Result<(), CssParseError> {
        self.charset = Some(charset.to_string());
        Ok(())
    }

    /// Imports are recorded, not fetched; resolution is the caller's
    /// business.
    fn at_import(
        &mut self,
        source: &str,
        mediums: &[String],
    ) -> Result<Option<Rule>, CssParseError> {
        Ok(Some(Rule::Import {
            source: source.to_string(),
            mediums: mediums.to_vec(),
        }))
    }

    fn at_namespace(&mut self, prefix: Option<&str>, uri: &str) -> Result<(), CssParseError> {
        self.namespaces
            .insert(prefix.unwrap_or_default().to_string(), uri.to_string());
        Ok(())
    }

    fn at_media(
        &mut self,
        mediums: &[String],
        elements: Vec<Rule>,
    ) -> Result<Option<Rule>, CssParseError> {
        Ok(Some(Rule::Media {
            mediums: mediums.to_vec(),
            rules: elements,
        }))
    }

    fn at_page(
        &mut self,
        name: &str,
        _pseudo: Option<&str>,
        declarations: Vec<Declaration>,
    ) -> Result<Option<Rule>, CssParseError> {
        Ok(Some(Rule::Page {
            name: name.to_string(),
            declarations,
        }))
    }

    fn at_font_face(&mut self, declarations: Vec<Declaration>) -> Result<Option<Rule>, CssParseError> {
        Ok(Some(Rule::FontFace { declarations }))
    }

    fn at_frame(
        &mut self,
        name: Option<&str>,
        declarations: Vec<Declaration>,
    ) -> Result<Option<Rule>, CssParseError> {
        Ok(Some(Rule::Frame {
            name: name.map(str::to_string),
            declarations,
        }))
    }

    fn selector(&mut self, name: &str) -> Result<Selector, CssParseError> {
        Ok(Selector::Simple(SimpleSelector {
            name: name.to_string(),
            parts: Vec::new(),
        }))
    }

    fn combine_selectors(
        &mut self,
        left: Selector,
        combinator: Combinator,
        right: Selector,
    ) -> Result<Selector, CssParseError> {
        Ok(Selector::Complex(
            Box::new(left),
            combinator,
            Box::new(right),
        ))
    }

    fn resolve_namespace_prefix(
        &mut self,
        prefix: Option<&str>,
        name: &str,
    ) -> Result<String, CssParseError> {
        match prefix {
            None | Some("") => Ok(name.to_string()),
            Some(prefix) => {
                let ns = self.namespaces.get(prefix).map_or(prefix, String::as_str);
                Ok(format!("{}|{}", ns, name))
            }
        }
    }

    fn ruleset(
        &mut self,
        selectors: Vec<Selector>,
        declarations: Vec<Declaration>,
    ) -> Result<Option<Rule>, CssParseError> {
        Ok(Some(Rule::Style(StyleRule {
            selectors,
            declarations,
        })))
    }

    fn property(
        &mut self,
        name: &str,
        value: Term,
        important: bool,
    ) -> Result<Declaration, CssParseError> {
        Ok(Declaration {
            name: name.to_ascii_lowercase(),
            value,
            important,
        })
    }

    fn combine_terms(
        &mut self,
        left: Term,
        op: Option<ExprOperator>,
        right: Option<Term>,
    ) -> Result<Term, CssParseError> {
        Ok(Term::Combined {
            op,
            left: Box::new(left),
            right: right.map(Box::new),
        })
    }

    fn term_ident(&mut self, value: &str) -> Result<Term, CssParseError> {
        Ok(Term::Ident(value.to_string()))
    }

    fn term_number(&mut self, value: &str, unit: Option<&str>) -> Result<Term, CssParseError> {
        let parsed = value
            .parse::<f32>()
            .map_err(|_| CssParseError::new(format!("invalid number `{}`", value), value, value))?;
        Ok(Term::Number {
            value: parsed,
            unit: unit.map(str::to_string),
        })
    }

    fn term_rgb(&mut self, value: &str) -> Result<Term, CssParseError> {
        Ok(Term::Rgb(value.to_string()))
    }

    fn term_uri(&mut self, value: &str) -> Result<Term, CssParseError> {
        Ok(Term::Uri(value.to_string()))
    }

    fn term_string(&mut self, value: &str) -> Result<Term, CssParseError> {
        Ok(Term::String(value.to_string()))
    }

    fn term_unicode_range(&mut self, value: &str) -> Result<Term, CssParseError> {
        Ok(Term::UnicodeRange(value.to_string()))
    }

    fn term_function(&mut self, name: &str, args: Term) -> Result<Term, CssParseError> {
        Ok(Term::Function {
            name: name.to_string(),
            args: Box::new(args),
        })
    }

    /// The object model has no extra term syntax; unmatched source ends
    /// the expression so `!important` and block delimiters take over.
    fn term_unknown<'a>(&mut self, _src: &'a str) -> Result<TermHandling<'a>, CssParseError> {
        Ok(TermHandling::Declined)
    }
}
