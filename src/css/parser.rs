//! Recursive-descent CSS 2.1 grammar engine.
//!
//! Implemented directly from https://www.w3.org/TR/CSS21/grammar.html,
//! plus the paged-output extensions (`@frame`, `@page` with nested
//! at-rules).
//!
//! Each production is a function from the remaining source to
//! `(new remainder, result)`, or it raises a [`CssParseError`]. Two
//! failure modes are kept distinct: *no match* (an `Option` sentinel, so
//! the caller tries an alternative) and *malformed match* (an error,
//! because the production was committed to but could not complete). Once
//! a production commits past a delimiter it never backtracks; only the
//! ordered attempts in [`parse_expression_term`] try alternatives, and
//! only before consuming any input.
//!
//! [`parse_expression_term`]: CssParser::parse_expression_term

use std::path::Path;

use crate::css::builder::{AtRuleHandling, CssBuilder, TermHandling};
use crate::css::patterns;
use crate::css::selector::{Combinator, CssSelector};
use crate::css::value::{Declaration, ExprOperator, Term};
use crate::error::CssParseError;

type ParseResult<'a, T> = Result<(&'a str, T), CssParseError>;

const ATTRIBUTE_OPERATORS: [&str; 7] = ["=", "~=", "|=", "&=", "^=", "!=", "<>"];

/// The grammar engine. Fully generic over its builder: it reports the
/// grammatical shape of the source through [`CssBuilder`] hooks and never
/// interprets the meaning of a selector or declaration.
///
/// A parser instance is single-threaded and must not be reentered from
/// within its own builder callbacks.
#[derive(Debug)]
pub struct CssParser<B: CssBuilder> {
    builder: B,
}

impl<B: CssBuilder> CssParser<B> {
    pub fn new(builder: B) -> Self {
        Self { builder }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut B {
        &mut self.builder
    }

    pub fn into_builder(self) -> B {
        self.builder
    }

    /// Parses a complete stylesheet. Use for embedded stylesheets.
    pub fn parse(&mut self, src: &str) -> Result<B::Stylesheet, CssParseError> {
        let src = patterns::strip_comments(src);
        self.builder.begin_stylesheet()?;
        let result = self.parse_stylesheet(&src);
        let end = self.builder.end_stylesheet();
        let (_, stylesheet) = result.map_err(|err| err.with_full_source(&src, false))?;
        end?;
        Ok(stylesheet)
    }

    /// Reads an external stylesheet from disk and parses it. The read
    /// happens here, before parsing; the grammar productions themselves
    /// never touch I/O.
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> crate::error::Result<B::Stylesheet> {
        let src = std::fs::read_to_string(path)?;
        Ok(self.parse(&src)?)
    }

    /// Parses a declaration list with no enclosing braces. Use for a
    /// tag's `style`-like attribute.
    pub fn parse_inline(&mut self, src: &str) -> Result<B::Inline, CssParseError> {
        self.builder.begin_inline()?;
        let result = self
            .parse_declaration_group(src.trim(), false)
            .map_err(|err| err.with_full_source(src, true))
            .and_then(|(_, declarations)| self.builder.inline(declarations));
        let end = self.builder.end_inline();
        let inline = result?;
        end?;
        Ok(inline)
    }

    /// Parses named attribute-value strings, each as one declaration's
    /// expression, merged into one inline result. Use for a tag's highly
    /// CSS-based attributes like `font`.
    pub fn parse_attributes<K, V, I>(&mut self, attributes: I) -> Result<B::Inline, CssParseError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.builder.begin_inline()?;
        let result = (|| {
            let mut declarations = Vec::new();
            for (name, value) in attributes {
                let (_, declaration) = self
                    .parse_declaration_property(value.as_ref().trim(), name.as_ref())
                    .map_err(|err| err.with_full_source(value.as_ref(), true))?;
                declarations.push(declaration);
            }
            self.builder.inline(declarations)
        })();
        let end = self.builder.end_inline();
        let inline = result?;
        end?;
        Ok(inline)
    }

    /// Parses a single attribute value string and returns the built
    /// expression directly: [`parse_attributes`] with one placeholder
    /// key, whose declaration value is extracted.
    ///
    /// [`parse_attributes`]: CssParser::parse_attributes
    pub fn parse_single_attr(&mut self, value: &str) -> Result<Term, CssParseError> {
        self.builder.begin_inline()?;
        let result = self
            .parse_declaration_property(value.trim(), "temp")
            .map(|(_, declaration)| declaration.value)
            .map_err(|err| err.with_full_source(value, true));
        let end = self.builder.end_inline();
        let term = result?;
        end?;
        Ok(term)
    }

    /// stylesheet
    ///   : [ CHARSET_SYM S* STRING S* ';' ]?
    ///     [S|CDO|CDC]* [ import [S|CDO|CDC]* ]*
    ///     [ namespace [S|CDO|CDC]* ]*
    ///     [ [ ruleset | at_rule ] [S|CDO|CDC]* ]*
    ///   ;
    fn parse_stylesheet<'a>(&mut self, src: &'a str) -> ParseResult<'a, B::Stylesheet> {
        let src = self.parse_at_charset(src)?;
        let src = skip_s_cdo_cdc(src);
        let (src, mut elements) = self.parse_at_imports(src)?;
        let mut src = self.parse_at_namespaces(src)?;

        while !src.is_empty() {
            if src.starts_with('@') {
                let (rest, at_elements) = self.parse_at_keyword(src)?;
                src = rest;
                elements.extend(at_elements);
            } else {
                let (rest, element) = self.parse_ruleset(src)?;
                src = rest;
                elements.extend(element);
            }
            src = skip_s_cdo_cdc(src);
        }

        let stylesheet = self.builder.stylesheet(elements)?;
        Ok((src, stylesheet))
    }

    /// `[ CHARSET_SYM S* STRING S* ';' ]?`
    fn parse_at_charset<'a>(&mut self, src: &'a str) -> Result<&'a str, CssParseError> {
        let ctx = src;
        let Some(rest) = patterns::strip_at_keyword(src, "charset") else {
            return Ok(src);
        };
        let (charset, rest) = patterns::get_string(rest);
        let Some(charset) = charset else {
            return Err(CssParseError::new(
                "@charset expected a quoted charset name",
                rest,
                ctx,
            ));
        };
        let rest = rest.trim_start();
        let Some(rest) = rest.strip_prefix(';') else {
            return Err(CssParseError::new(
                "@charset expected a terminating ';'",
                rest,
                ctx,
            ));
        };
        self.builder.at_charset(charset)?;
        Ok(rest.trim_start())
    }

    /// `[ import [S|CDO|CDC]* ]*`
    fn parse_at_imports<'a>(&mut self, mut src: &'a str) -> ParseResult<'a, Vec<B::Element>> {
        let mut elements = Vec::new();
        while let Some(rest) = patterns::strip_at_keyword(src, "import") {
            let (rest, element) = self.parse_import_directive(rest, src)?;
            elements.extend(element);
            src = skip_s_cdo_cdc(rest);
        }
        Ok((src, elements))
    }

    /// One `@import` directive after its keyword: a string-or-URI source
    /// and a comma-separated medium list, `;`-terminated.
    fn parse_import_directive<'a>(
        &mut self,
        src: &'a str,
        ctx: &str,
    ) -> ParseResult<'a, Option<B::Element>> {
        let (source, rest) = patterns::get_string_or_uri(src);
        let Some(source) = source else {
            return Err(CssParseError::new(
                "@import expected a string or a URI",
                src,
                ctx,
            ));
        };

        let mut mediums = Vec::new();
        let (mut medium, mut rest) = patterns::get_ident(rest.trim_start());
        while let Some(found) = medium {
            mediums.push(found.to_string());
            match rest.trim_start().strip_prefix(',') {
                Some(after) => (medium, rest) = patterns::get_ident(after.trim_start()),
                None => break,
            }
        }
        // no medium inherits; "all" is then appropriate
        if mediums.is_empty() {
            mediums.push("all".to_string());
        }

        let rest = rest.trim_start();
        let Some(rest) = rest.strip_prefix(';') else {
            return Err(CssParseError::new(
                "@import expected a terminating ';'",
                rest,
                ctx,
            ));
        };
        let element = self.builder.at_import(source, &mediums)?;
        Ok((rest.trim_start(), element))
    }

    /// `@namespace S* [IDENT S*]? [STRING|URI] S* ';' S*`
    fn parse_at_namespaces<'a>(&mut self, src: &'a str) -> Result<&'a str, CssParseError> {
        let mut src = skip_s_cdo_cdc(src);
        while let Some(rest) = patterns::strip_at_keyword(src, "namespace") {
            let ctx = src;
            let (uri, rest) = patterns::get_string_or_uri(rest);
            let (prefix, uri, rest) = match uri {
                Some(uri) => (None, uri, rest),
                None => {
                    let (prefix, rest) = patterns::get_ident(rest);
                    let Some(prefix) = prefix else {
                        return Err(CssParseError::new(
                            "@namespace expected an identifier or a URI",
                            rest,
                            ctx,
                        ));
                    };
                    let (uri, rest) = patterns::get_string_or_uri(rest.trim_start());
                    let Some(uri) = uri else {
                        return Err(CssParseError::new("@namespace expected a URI", rest, ctx));
                    };
                    (Some(prefix), uri, rest)
                }
            };
            let rest = rest.trim_start();
            let Some(rest) = rest.strip_prefix(';') else {
                return Err(CssParseError::new(
                    "@namespace expected a terminating ';'",
                    rest,
                    ctx,
                ));
            };
            self.builder.at_namespace(prefix, uri)?;
            src = skip_s_cdo_cdc(rest);
        }
        Ok(src)
    }

    /// Dispatches an at-rule by the identifier parsed after `@`.
    fn parse_at_keyword<'a>(&mut self, src: &'a str) -> ParseResult<'a, Vec<B::Element>> {
        let ctx = src;
        let Some(after_at) = src.strip_prefix('@') else {
            return Err(CssParseError::new("Expected an at-rule", src, ctx));
        };
        let (keyword, rest) = patterns::get_ident(after_at);
        let Some(keyword) = keyword else {
            return Err(CssParseError::new(
                "At-rule expected an identifier for the rule",
                after_at,
                ctx,
            ));
        };

        match keyword.to_ascii_lowercase().as_str() {
            "media" => self.parse_at_media(rest.trim_start(), ctx),
            "page" => self.parse_at_page(rest.trim_start(), ctx),
            "font-face" => {
                let (rest, declarations) = self.parse_declaration_group(rest.trim_start(), true)?;
                let element = self.builder.at_font_face(declarations)?;
                Ok((rest, element.into_iter().collect()))
            }
            "frame" => self.parse_at_frame(rest.trim_start()),
            "import" => {
                let (rest, element) = self.parse_import_directive(rest.trim_start(), ctx)?;
                Ok((rest, element.into_iter().collect()))
            }
            _ => self.parse_at_ident(keyword, rest, ctx),
        }
    }

    /// media
    ///   : MEDIA_SYM S* medium [ ',' S* medium ]* '{' S* [ ruleset | at_rule ]* '}' S*
    ///   ;
    fn parse_at_media<'a>(
        &mut self,
        mut src: &'a str,
        ctx: &str,
    ) -> ParseResult<'a, Vec<B::Element>> {
        let mut mediums = Vec::new();
        while !src.is_empty() && !src.starts_with('{') {
            let (medium, rest) = patterns::get_ident(src);
            let Some(medium) = medium else {
                return Err(CssParseError::new(
                    "@media rule expected a media identifier",
                    src,
                    ctx,
                ));
            };
            // make "and ... {" work: media queries are out of scope, so
            // the literal keyword skips the condition up to the block
            if medium == "and" {
                let Some(idx) = rest.find('{') else {
                    return Err(CssParseError::new(
                        "Ruleset opening '{' not found",
                        rest,
                        ctx,
                    ));
                };
                src = &rest[idx..];
                break;
            }
            mediums.push(medium.to_string());
            let rest = rest.trim_start();
            src = match rest.strip_prefix(',') {
                Some(rest) => rest.trim_start(),
                None => rest,
            };
        }

        let Some(body) = src.strip_prefix('{') else {
            return Err(CssParseError::new("Ruleset opening '{' not found", src, ctx));
        };
        let mut body = body.trim_start();

        let mut elements = Vec::new();
        while !body.is_empty() && !body.starts_with('}') {
            if body.starts_with('@') {
                let (rest, at_elements) = self.parse_at_keyword(body)?;
                body = rest;
                elements.extend(at_elements);
            } else {
                let (rest, element) = self.parse_ruleset(body)?;
                body = rest;
                elements.extend(element);
            }
            body = body.trim_start();
        }
        let Some(rest) = body.strip_prefix('}') else {
            return Err(CssParseError::new("Ruleset closing '}' not found", body, ctx));
        };

        let element = self.builder.at_media(&mediums, elements)?;
        Ok((rest.trim_start(), element.into_iter().collect()))
    }

    /// page
    ///   : PAGE_SYM S* IDENT? pseudo_page? S*
    ///     '{' S* [ declaration_group | at_rule ]* '}' S*
    ///   ;
    ///
    /// Extended for paged output: the block may interleave nested
    /// at-rules (notably `@frame`) with plain declaration runs.
    fn parse_at_page<'a>(&mut self, src: &'a str, ctx: &str) -> ParseResult<'a, Vec<B::Element>> {
        let (name, rest) = patterns::get_ident(src);
        let mut page_name = name.unwrap_or_default().to_string();
        let (pseudo, rest) = match rest.strip_prefix(':') {
            Some(after) => {
                let (pseudo, rest) = patterns::get_ident(after);
                let Some(pseudo) = pseudo else {
                    return Err(CssParseError::new(
                        "@page expected a pseudo-page identifier",
                        after,
                        ctx,
                    ));
                };
                page_name = format!("{}_{}", page_name, pseudo);
                (Some(pseudo), rest)
            }
            None => (None, rest),
        };

        let rest = rest.trim_start();
        let Some(body) = rest.strip_prefix('{') else {
            return Err(CssParseError::new("Ruleset opening '{' not found", rest, ctx));
        };
        let mut body = body.trim_start();

        let mut declarations = Vec::new();
        while !body.is_empty() && !body.starts_with('}') {
            if body.starts_with('@') {
                // nested at-rules act through their hooks; their element
                // results are not part of the page itself
                let (rest, _elements) = self.parse_at_keyword(body)?;
                body = rest;
            } else {
                let (rest, group) = self.parse_declaration_group(body, false)?;
                if rest.len() == body.len() {
                    return Err(CssParseError::new(
                        "@page expected a declaration or an at-rule",
                        body,
                        ctx,
                    ));
                }
                body = rest;
                declarations.extend(group);
            }
            body = body.trim_start();
        }
        let Some(rest) = body.strip_prefix('}') else {
            return Err(CssParseError::new("Ruleset closing '}' not found", body, ctx));
        };

        let element = self.builder.at_page(&page_name, pseudo, declarations)?;
        Ok((rest.trim_start(), element.into_iter().collect()))
    }

    /// `@frame IDENT? declaration_group`, proprietary to paged output.
    fn parse_at_frame<'a>(&mut self, src: &'a str) -> ParseResult<'a, Vec<B::Element>> {
        let (name, rest) = patterns::get_ident(src);
        let (rest, declarations) = self.parse_declaration_group(rest.trim_start(), true)?;
        let element = self.builder.at_frame(name, declarations)?;
        Ok((rest.trim_start(), element.into_iter().collect()))
    }

    /// An at-rule the engine does not know. The builder may consume it;
    /// otherwise everything up to and including the next top-level `;` or
    /// the next balanced block is skipped, whichever comes first.
    fn parse_at_ident<'a>(
        &mut self,
        keyword: &str,
        src: &'a str,
        ctx: &str,
    ) -> ParseResult<'a, Vec<B::Element>> {
        match self.builder.at_ident(keyword, src)? {
            AtRuleHandling::Consumed { remainder, element } => {
                Ok((remainder.trim_start(), element.into_iter().collect()))
            }
            AtRuleHandling::Declined => {
                let semi = src.find(';');
                let block = src.find('{');
                let rest = match (semi, block) {
                    (Some(semi), None) => &src[semi + 1..],
                    (Some(semi), Some(block)) if semi < block => &src[semi + 1..],
                    (None, None) => &src[src.len()..],
                    (_, Some(block)) => {
                        let block_src = &src[block..];
                        match self.parse_declaration_group(block_src, true) {
                            Ok((rest, _declarations)) => rest,
                            // not declaration-shaped; ignore it as a
                            // nested stylesheet block instead
                            Err(_) => self.skip_stylesheet_block(block_src, ctx)?,
                        }
                    }
                };
                Ok((rest.trim_start(), Vec::new()))
            }
        }
    }

    /// Parses a balanced `{...}` block as nested rulesets/at-rules and
    /// discards the results. The hooks still fire; only the elements are
    /// dropped.
    fn skip_stylesheet_block<'a>(
        &mut self,
        src: &'a str,
        ctx: &str,
    ) -> Result<&'a str, CssParseError> {
        let Some(body) = src.strip_prefix('{') else {
            return Err(CssParseError::new("Unable to ignore at-rule block", src, ctx));
        };
        let mut body = skip_s_cdo_cdc(body);
        while !body.is_empty() && !body.starts_with('}') {
            if body.starts_with('@') {
                let (rest, _) = self.parse_at_keyword(body)?;
                body = rest;
            } else {
                let (rest, _) = self.parse_ruleset(body)?;
                body = rest;
            }
            body = skip_s_cdo_cdc(body);
        }
        let Some(rest) = body.strip_prefix('}') else {
            return Err(CssParseError::new("Unable to ignore at-rule block", body, ctx));
        };
        Ok(rest)
    }

    /// ruleset
    ///   : selector [ ',' S* selector ]*
    ///     '{' S* declaration [ ';' S* declaration ]* '}' S*
    ///   ;
    fn parse_ruleset<'a>(&mut self, src: &'a str) -> ParseResult<'a, Option<B::Element>> {
        let (rest, selectors) = self.parse_selector_group(src)?;
        let (rest, declarations) = self.parse_declaration_group(rest.trim_start(), true)?;
        let element = self.builder.ruleset(selectors, declarations)?;
        Ok((rest, element))
    }

    fn parse_selector_group<'a>(&mut self, mut src: &'a str) -> ParseResult<'a, Vec<B::Selector>> {
        let mut selectors = Vec::new();
        while !matches!(
            first_char(src),
            None | Some('{' | '}' | ']' | '(' | ')' | ';')
        ) {
            let (rest, selector) = self.parse_selector(src)?;
            src = rest;
            let Some(selector) = selector else { break };
            selectors.push(selector);
            if let Some(rest) = src.strip_prefix(',') {
                src = rest.trim_start();
            }
        }
        Ok((src, selectors))
    }

    /// selector
    ///   : simple_selector [ combinator simple_selector ]*
    ///   ;
    ///
    /// Returns `None` after local recovery: a simple selector that fails
    /// to consume at least one character skips ahead to the next
    /// delimiter and nulls out this group member, so one malformed
    /// selector cannot take down the whole stylesheet.
    fn parse_selector<'a>(&mut self, src: &'a str) -> ParseResult<'a, Option<B::Selector>> {
        let (mut src, mut selector) = self.parse_simple_selector(src)?;
        while !matches!(
            first_char(src),
            None | Some(',' | ';' | '{' | '}' | '[' | ']' | '(' | ')')
        ) {
            let mut combinator = Combinator::Whitespace;
            if let Some(rest) = src.strip_prefix('>') {
                combinator = Combinator::GreaterThan;
                src = rest.trim_start();
            } else if let Some(rest) = src.strip_prefix('+') {
                combinator = Combinator::Plus;
                src = rest.trim_start();
            }

            let before = src.len();
            let (rest, next) = self.parse_simple_selector(src)?;
            if rest.len() >= before {
                eprintln!("parse error in parse_selector: skipping a malformed selector");
                let rest = skip_to_selector_delimiter(rest);
                return Ok((rest.trim_start(), None));
            }
            src = rest;
            selector = self.builder.combine_selectors(selector, combinator, next)?;
        }
        Ok((src.trim_start(), Some(selector)))
    }

    /// simple_selector
    ///   : [ namespace_selector ]? element_name? [ HASH | class | attrib | pseudo ]* S*
    ///   ;
    fn parse_simple_selector<'a>(&mut self, src: &'a str) -> ParseResult<'a, B::Selector> {
        let ctx = src;
        let (ns_prefix, rest) = patterns::match_namespace_prefix(src);
        let (name, mut rest) = patterns::match_prefix(&patterns::RE_ELEMENT_NAME, rest);
        let name = match name {
            Some(name) => name,
            // a bare qualifier implies the universal selector
            None if matches!(first_char(rest), Some('#' | '.' | '[' | ':')) => "*",
            None => {
                return Err(CssParseError::new(
                    "Selector name or qualifier expected",
                    rest,
                    ctx,
                ));
            }
        };
        let name = self.builder.resolve_namespace_prefix(ns_prefix, name)?;
        let mut selector = self.builder.selector(&name)?;

        while matches!(first_char(rest), Some('#' | '.' | '[' | ':')) {
            let (hash, after) = patterns::match_prefix(&patterns::RE_HASH, rest);
            if let Some(hash) = hash {
                selector.add_hash_id(hash)?;
                rest = after;
                continue;
            }

            let (class, after) = patterns::match_prefix(&patterns::RE_CLASS, rest);
            if let Some(class) = class {
                selector.add_class(class)?;
                rest = after;
                continue;
            }

            if rest.starts_with('[') {
                rest = self.parse_selector_attribute(rest, &mut selector)?;
            } else if rest.starts_with(':') {
                rest = self.parse_selector_pseudo(rest, &mut selector)?;
            } else {
                break;
            }
        }

        Ok((rest.trim_start(), selector))
    }

    /// attrib
    ///   : '[' S* [ namespace_selector ]? IDENT S*
    ///     [ [ '=' | INCLUDES | DASHMATCH ] S* [ IDENT | STRING ] S* ]? ']'
    ///   ;
    fn parse_selector_attribute<'a>(
        &mut self,
        src: &'a str,
        selector: &mut B::Selector,
    ) -> Result<&'a str, CssParseError> {
        let ctx = src;
        let Some(rest) = src.strip_prefix('[') else {
            return Err(CssParseError::new(
                "Selector attribute opening '[' not found",
                src,
                ctx,
            ));
        };
        let rest = rest.trim_start();
        let (ns_prefix, rest) = patterns::match_namespace_prefix(rest);
        let (attr_name, rest) = patterns::get_ident(rest);
        let rest = rest.trim_start();
        let Some(attr_name) = attr_name else {
            return Err(CssParseError::new(
                "Expected a selector attribute name",
                rest,
                ctx,
            ));
        };
        let attr_name = match ns_prefix {
            Some(prefix) => self.builder.resolve_namespace_prefix(Some(prefix), attr_name)?,
            None => attr_name.to_string(),
        };

        let op = ATTRIBUTE_OPERATORS
            .iter()
            .find(|op| rest.starts_with(**op))
            .copied();
        match op {
            Some(op) => {
                let rest = rest[op.len()..].trim_start();
                let (value, rest) = match patterns::get_ident(rest) {
                    (Some(value), rest) => (value, rest),
                    (None, _) => {
                        let (value, after) = patterns::get_string(rest);
                        let Some(value) = value else {
                            return Err(CssParseError::new(
                                "Expected a selector attribute value",
                                rest,
                                ctx,
                            ));
                        };
                        (value, after)
                    }
                };
                let rest = rest.trim_start();
                let Some(rest) = rest.strip_prefix(']') else {
                    return Err(CssParseError::new(
                        "Selector attribute closing ']' not found",
                        rest,
                        ctx,
                    ));
                };
                selector.add_attribute_operation(&attr_name, op, value)?;
                Ok(rest)
            }
            None => {
                // an unrecognized (or missing) operator degrades to a
                // presence-only attribute, resynchronizing at `]`
                let Some(idx) = rest.find(']') else {
                    return Err(CssParseError::new(
                        "Selector attribute closing ']' not found",
                        rest,
                        ctx,
                    ));
                };
                selector.add_attribute(&attr_name)?;
                Ok(&rest[idx + 1..])
            }
        }
    }

    /// pseudo
    ///   : ':' [ IDENT | function ]
    ///   ;
    fn parse_selector_pseudo<'a>(
        &mut self,
        src: &'a str,
        selector: &mut B::Selector,
    ) -> Result<&'a str, CssParseError> {
        let ctx = src;
        let Some(rest) = src.strip_prefix(':') else {
            return Err(CssParseError::new("Selector pseudo ':' not found", src, ctx));
        };
        // `::before` and `:before` are treated alike
        let rest = rest.strip_prefix(':').unwrap_or(rest);
        let (name, rest) = patterns::get_ident(rest);
        let Some(name) = name else {
            return Err(CssParseError::new(
                "Selector pseudo identifier not found",
                rest,
                ctx,
            ));
        };

        if let Some(args) = rest.strip_prefix('(') {
            let (rest, term) = self.parse_expression(args.trim_start(), true)?;
            let Some(rest) = rest.strip_prefix(')') else {
                return Err(CssParseError::new(
                    "Selector pseudo function closing ')' not found",
                    rest,
                    ctx,
                ));
            };
            selector.add_pseudo_function(name, term)?;
            Ok(rest)
        } else {
            selector.add_pseudo(name)?;
            Ok(rest)
        }
    }

    /// `declaration [ ';' S* declaration ]*`, optionally brace-enclosed.
    /// Parsing stops at the first property that is not an identifier.
    fn parse_declaration_group<'a>(
        &mut self,
        src: &'a str,
        braces: bool,
    ) -> ParseResult<'a, Vec<Declaration>> {
        let ctx = src;
        let (rest, braces) = match src.strip_prefix('{') {
            Some(rest) => (rest, true),
            None if braces => {
                return Err(CssParseError::new(
                    "Declaration group opening '{' not found",
                    src,
                    ctx,
                ));
            }
            None => (src, false),
        };

        let mut declarations = Vec::new();
        let mut rest = rest.trim_start();
        while !matches!(
            first_char(rest),
            None | Some(',' | '{' | '}' | '[' | ']' | '(' | ')' | '@')
        ) {
            // "*property: value" vendor hack: neutralize the star with a
            // placeholder prefix instead of failing
            let declaration = if let Some(starred) = rest.strip_prefix('*') {
                let (name, after) = patterns::get_ident(starred);
                let name = format!("-nothing-{}", name.unwrap_or_default());
                let (after, declaration) = self.parse_declaration_tail(after, &name)?;
                rest = after;
                Some(declaration)
            } else {
                let (after, declaration) = self.parse_declaration(rest)?;
                rest = after;
                declaration
            };
            let Some(declaration) = declaration else { break };
            declarations.push(declaration);
            match rest.strip_prefix(';') {
                Some(after) => rest = after.trim_start(),
                None => break,
            }
        }

        if braces {
            let Some(after) = rest.strip_prefix('}') else {
                return Err(CssParseError::new(
                    "Declaration group closing '}' not found",
                    rest,
                    ctx,
                ));
            };
            rest = after;
        }
        Ok((rest.trim_start(), declarations))
    }

    /// declaration
    ///   : IDENT S* ':' S* expr prio?
    ///   | /* empty */
    ///   ;
    fn parse_declaration<'a>(&mut self, src: &'a str) -> ParseResult<'a, Option<Declaration>> {
        let (name, rest) = patterns::get_ident(src);
        let Some(name) = name else {
            return Ok((src, None));
        };
        let name = name.to_string();
        let (rest, declaration) = self.parse_declaration_tail(rest, &name)?;
        Ok((rest, Some(declaration)))
    }

    /// Everything after the property name. The `:` is what the grammar
    /// requires; a null transition and `=` are tolerated.
    fn parse_declaration_tail<'a>(
        &mut self,
        src: &'a str,
        name: &str,
    ) -> ParseResult<'a, Declaration> {
        let mut rest = src.trim_start();
        if rest.starts_with(':') || rest.starts_with('=') {
            rest = rest[1..].trim_start();
        }
        self.parse_declaration_property(rest, name)
    }

    /// `expr prio?` for a named property.
    fn parse_declaration_property<'a>(
        &mut self,
        src: &'a str,
        name: &str,
    ) -> ParseResult<'a, Declaration> {
        let (rest, value) = self.parse_expression(src, false)?;
        let (important, rest) = patterns::match_prefix(&patterns::RE_IMPORTANT, rest);
        let declaration = self.builder.property(name, value, important.is_some())?;
        Ok((rest.trim_start(), declaration))
    }

    /// expr
    ///   : term [ operator term ]*
    ///   ;
    ///
    /// In list mode a lone term is still wrapped through `combine_terms`
    /// so the builder can normalize "one value" vs "many values"
    /// uniformly.
    fn parse_expression<'a>(&mut self, src: &'a str, return_list: bool) -> ParseResult<'a, Term> {
        let ctx = src;
        let (mut rest, term) = self.parse_expression_term(src)?;
        let Some(mut term) = term else {
            return Err(CssParseError::new("Expression expected a term", src, ctx));
        };

        let mut saw_operator = false;
        while !matches!(
            first_char(rest),
            None | Some(';' | '{' | '}' | '[' | ']' | ')')
        ) {
            saw_operator = true;
            let op = if let Some(after) = rest.strip_prefix('/') {
                rest = after;
                Some(ExprOperator::Slash)
            } else if let Some(after) = rest.strip_prefix('+') {
                rest = after;
                Some(ExprOperator::Plus)
            } else if let Some(after) = rest.strip_prefix(',') {
                rest = after;
                Some(ExprOperator::Comma)
            } else {
                // the implicit whitespace join
                None
            };

            let (after, next) = self.parse_expression_term(rest.trim_start())?;
            rest = after;
            let Some(next) = next else { break };
            term = self.builder.combine_terms(term, op, Some(next))?;
        }

        if !saw_operator && return_list {
            term = self.builder.combine_terms(term, None, None)?;
        }
        Ok((rest, term))
    }

    /// term
    ///   : unary_operator? [ NUMBER S* | PERCENTAGE S* | LENGTH S* | function ]
    ///   | STRING S* | IDENT S* | URI S* | RGB S* | UNICODERANGE S*
    ///   ;
    ///
    /// Attempts run in fixed priority order; each backtracks only before
    /// consuming input. Returns `None` when no recognizer matched and the
    /// builder's unknown-term hook declined.
    fn parse_expression_term<'a>(&mut self, src: &'a str) -> ParseResult<'a, Option<Term>> {
        let ctx = src;

        let (number, rest) = patterns::match_prefix(&patterns::RE_NUM, src);
        if let Some(number) = number {
            let (unit, rest) = patterns::match_prefix(&patterns::RE_UNIT, rest);
            let term = self.builder.term_number(number, unit)?;
            return Ok((rest.trim_start(), Some(term)));
        }

        let (uri, rest) = patterns::match_string(&patterns::RE_URI, src);
        if let Some(uri) = uri {
            let term = self.builder.term_uri(uri)?;
            return Ok((rest.trim_start(), Some(term)));
        }

        let (string, rest) = patterns::get_string(src);
        if let Some(string) = string {
            let term = self.builder.term_string(string)?;
            return Ok((rest.trim_start(), Some(term)));
        }

        let (function, rest) = patterns::match_prefix(&patterns::RE_FUNCTION_TERM, src);
        if let Some(function) = function {
            let (rest, args) = self.parse_expression(rest.trim_start(), true)?;
            let Some(rest) = rest.strip_prefix(')') else {
                return Err(CssParseError::new(
                    "Terminal function expression expected a closing ')'",
                    rest,
                    ctx,
                ));
            };
            let term = self.builder.term_function(function, args)?;
            return Ok((rest.trim_start(), Some(term)));
        }

        let (rgb, rest) = patterns::match_prefix(&patterns::RE_RGBCOLOR, src);
        if let Some(rgb) = rgb {
            let term = self.builder.term_rgb(rgb)?;
            return Ok((rest.trim_start(), Some(term)));
        }

        let (range, rest) = patterns::match_prefix(&patterns::RE_UNICODE_RANGE, src);
        if let Some(range) = range {
            let term = self.builder.term_unicode_range(range)?;
            return Ok((rest.trim_start(), Some(term)));
        }

        let (ns_prefix, after_ns) = patterns::match_namespace_prefix(src);
        let (ident, rest) = patterns::get_ident(after_ns);
        if let Some(ident) = ident {
            let ident = match ns_prefix {
                Some(prefix) => self.builder.resolve_namespace_prefix(Some(prefix), ident)?,
                None => ident.to_string(),
            };
            let term = self.builder.term_ident(&ident)?;
            return Ok((rest.trim_start(), Some(term)));
        }

        let (fallback, rest) = patterns::match_prefix(&patterns::RE_UNICODE_ID, after_ns);
        if let Some(fallback) = fallback {
            let term = self.builder.term_ident(fallback)?;
            return Ok((rest.trim_start(), Some(term)));
        }

        match self.builder.term_unknown(after_ns)? {
            TermHandling::Consumed { remainder, term } => Ok((remainder.trim_start(), Some(term))),
            TermHandling::Declined => Ok((src, None)),
        }
    }
}

fn first_char(src: &str) -> Option<char> {
    src.chars().next()
}

/// `[S|CDO|CDC]*`: whitespace runs and the legacy SGML comment markers.
fn skip_s_cdo_cdc(mut src: &str) -> &str {
    loop {
        src = src.trim_start();
        if let Some(rest) = src.strip_prefix("<!--") {
            src = rest;
        } else if let Some(rest) = src.strip_prefix("-->") {
            src = rest;
        } else {
            return src;
        }
    }
}

/// Skips one character, then everything up to the next selector
/// delimiter. Always makes progress.
fn skip_to_selector_delimiter(src: &str) -> &str {
    let mut chars = src.chars();
    chars.next();
    let rest = chars.as_str();
    match rest.find(&[',', ';', '{', '}', '[', ']', '(', ')'][..]) {
        Some(idx) => &rest[idx..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::cssom::{
        CssomBuilder, Rule, Selector, SelectorPart, SimpleSelector, StyleSheet,
    };

    fn parse(css: &str) -> StyleSheet {
        CssParser::new(CssomBuilder::new()).parse(css).unwrap()
    }

    fn parse_value(value: &str) -> Term {
        CssParser::new(CssomBuilder::new())
            .parse_single_attr(value)
            .unwrap()
    }

    fn parse_inline(style: &str) -> Vec<Declaration> {
        CssParser::new(CssomBuilder::new())
            .parse_inline(style)
            .unwrap()
    }

    fn simple(name: &str) -> Selector {
        Selector::Simple(SimpleSelector {
            name: name.to_string(),
            parts: Vec::new(),
        })
    }

    fn qualified(name: &str, parts: Vec<SelectorPart>) -> Selector {
        Selector::Simple(SimpleSelector {
            name: name.to_string(),
            parts,
        })
    }

    fn decl(name: &str, value: Term) -> Declaration {
        Declaration {
            name: name.to_string(),
            value,
            important: false,
        }
    }

    fn num(value: f32, unit: Option<&str>) -> Term {
        Term::Number {
            value,
            unit: unit.map(str::to_string),
        }
    }

    fn ident(value: &str) -> Term {
        Term::Ident(value.to_string())
    }

    #[test]
    fn ruleset_hook_is_invoked_once_in_source_order() {
        let sheet = parse("a, b { color: red; margin: 1px }");
        assert_eq!(sheet.rules.len(), 1);
        let Rule::Style(rule) = &sheet.rules[0] else {
            panic!("expected a style rule");
        };
        assert_eq!(rule.selectors, vec![simple("a"), simple("b")]);
        assert_eq!(
            rule.declarations,
            vec![
                decl("color", ident("red")),
                decl("margin", num(1.0, Some("px"))),
            ]
        );
    }

    #[test]
    fn whitespace_between_tokens_is_insignificant() {
        let tight = parse("a{color:red}");
        let spaced = parse("  a  {  color : red ; }  ");
        let Rule::Style(tight) = &tight.rules[0] else {
            panic!("expected a style rule");
        };
        let Rule::Style(spaced) = &spaced.rules[0] else {
            panic!("expected a style rule");
        };
        assert_eq!(tight.declarations, spaced.declarations);
        assert_eq!(tight.selectors, spaced.selectors);
    }

    #[test]
    fn import_mediums_default_to_all() {
        let sheet = parse(
            "@import \"x.css\" print;\n@import \"y.css\";\na { color: red }\n@import url(z.css);",
        );
        assert_eq!(
            sheet.rules[0],
            Rule::Import {
                source: "x.css".to_string(),
                mediums: vec!["print".to_string()],
            }
        );
        assert_eq!(
            sheet.rules[1],
            Rule::Import {
                source: "y.css".to_string(),
                mediums: vec!["all".to_string()],
            }
        );
        // an @import after the leading section still dispatches
        assert_eq!(
            sheet.rules[3],
            Rule::Import {
                source: "z.css".to_string(),
                mediums: vec!["all".to_string()],
            }
        );
    }

    #[test]
    fn page_pseudo_joins_the_name_with_an_underscore() {
        let sheet = parse("@page :first { margin-top: 1cm }");
        assert_eq!(
            sheet.rules[0],
            Rule::Page {
                name: "_first".to_string(),
                declarations: vec![decl("margin-top", num(1.0, Some("cm")))],
            }
        );

        let sheet = parse("@page land:left { margin: 2cm }");
        let Rule::Page { name, .. } = &sheet.rules[0] else {
            panic!("expected a page rule");
        };
        assert_eq!(name, "land_left");
    }

    #[test]
    fn leading_dot_numbers_parse_like_zero_prefixed_ones() {
        assert_eq!(parse_value(".5em"), parse_value("0.5em"));
        assert_eq!(parse_value(".5em"), num(0.5, Some("em")));
        assert_eq!(parse_value("-10%"), num(-10.0, Some("%")));
        assert_eq!(parse_value("12"), num(12.0, None));
    }

    #[test]
    fn unrecognized_attribute_operator_degrades_to_presence_only() {
        let sheet = parse("a[lang%=en] { color: red }");
        let Rule::Style(rule) = &sheet.rules[0] else {
            panic!("expected a style rule");
        };
        assert_eq!(
            rule.selectors,
            vec![qualified(
                "a",
                vec![SelectorPart::Attribute {
                    name: "lang".to_string(),
                    op: None,
                    value: None,
                }]
            )]
        );

        let sheet = parse("a[lang|=en] { color: red }");
        let Rule::Style(rule) = &sheet.rules[0] else {
            panic!("expected a style rule");
        };
        assert_eq!(
            rule.selectors,
            vec![qualified(
                "a",
                vec![SelectorPart::Attribute {
                    name: "lang".to_string(),
                    op: Some("|=".to_string()),
                    value: Some("en".to_string()),
                }]
            )]
        );
    }

    #[test]
    fn unknown_at_rules_are_skipped_without_a_hook() {
        // block form
        let sheet = parse("@three-dee { a: 1 } b { color: red }");
        assert_eq!(sheet.rules.len(), 1);
        let Rule::Style(rule) = &sheet.rules[0] else {
            panic!("expected a style rule");
        };
        assert_eq!(rule.selectors, vec![simple("b")]);
        assert_eq!(rule.declarations, vec![decl("color", ident("red"))]);

        // semicolon form
        let sheet = parse("@wish url(x);\nb { color: red }");
        assert_eq!(sheet.rules.len(), 1);

        // stylesheet-shaped block form
        let sheet = parse("@three-dee { b { c: d } }\nb { color: red }");
        assert_eq!(sheet.rules.len(), 1);
    }

    #[test]
    fn strings_may_contain_the_other_quote_unescaped() {
        assert_eq!(
            parse_inline("content: \"it's\""),
            vec![decl("content", Term::String("it's".to_string()))]
        );
    }

    #[test]
    fn malformed_selector_recovers_without_aborting_the_sheet() {
        let sheet = parse(".1 { color: red }\nb { color: blue }");
        assert_eq!(sheet.rules.len(), 2);
        // the malformed group member is nulled out; its block still parses
        let Rule::Style(rule) = &sheet.rules[0] else {
            panic!("expected a style rule");
        };
        assert!(rule.selectors.is_empty());
        assert_eq!(rule.declarations, vec![decl("color", ident("red"))]);

        let Rule::Style(rule) = &sheet.rules[1] else {
            panic!("expected a style rule");
        };
        assert_eq!(rule.selectors, vec![simple("b")]);
        assert_eq!(rule.declarations, vec![decl("color", ident("blue"))]);
    }

    #[test]
    fn media_collects_mediums_and_skips_an_and_condition() {
        let sheet = parse("@media print, screen { b { margin: 0 } }");
        let Rule::Media { mediums, rules } = &sheet.rules[0] else {
            panic!("expected a media rule");
        };
        assert_eq!(mediums, &["print".to_string(), "screen".to_string()]);
        assert_eq!(rules.len(), 1);

        let sheet = parse("@media print and (min-width: 8in) { b { margin: 0 } }");
        let Rule::Media { mediums, rules } = &sheet.rules[0] else {
            panic!("expected a media rule");
        };
        assert_eq!(mediums, &["print".to_string()]);
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn page_blocks_interleave_declarations_and_frames() {
        let sheet = parse(
            "@frame header { top: 1cm }\n@page { margin: 2cm; @frame content { left: 1cm } }",
        );
        assert_eq!(
            sheet.rules[0],
            Rule::Frame {
                name: Some("header".to_string()),
                declarations: vec![decl("top", num(1.0, Some("cm")))],
            }
        );
        // the nested frame acts through its hook; the page keeps only its
        // own declarations
        assert_eq!(
            sheet.rules[1],
            Rule::Page {
                name: String::new(),
                declarations: vec![decl("margin", num(2.0, Some("cm")))],
            }
        );
        assert_eq!(sheet.rules.len(), 2);
    }

    #[test]
    fn font_face_dispatches_a_declaration_block() {
        let sheet = parse("@font-face { font-family: X; src: url(x.ttf) }");
        assert_eq!(
            sheet.rules[0],
            Rule::FontFace {
                declarations: vec![
                    decl("font-family", ident("X")),
                    decl("src", Term::Uri("x.ttf".to_string())),
                ],
            }
        );
    }

    #[test]
    fn charset_and_namespaces_feed_the_builder() {
        let sheet = parse(
            "@charset \"utf-8\";\n@namespace svg url(http://www.w3.org/2000/svg);\nsvg|rect { fill: red }",
        );
        assert_eq!(sheet.charset.as_deref(), Some("utf-8"));
        let Rule::Style(rule) = &sheet.rules[0] else {
            panic!("expected a style rule");
        };
        assert_eq!(
            rule.selectors,
            vec![simple("http://www.w3.org/2000/svg|rect")]
        );
    }

    #[test]
    fn important_is_recognized_with_and_without_spacing() {
        assert_eq!(
            parse_inline("color: red !important"),
            vec![Declaration {
                name: "color".to_string(),
                value: ident("red"),
                important: true,
            }]
        );
        assert_eq!(
            parse_inline("color: red ! important; margin: 0"),
            vec![
                Declaration {
                    name: "color".to_string(),
                    value: ident("red"),
                    important: true,
                },
                decl("margin", num(0.0, None)),
            ]
        );
    }

    #[test]
    fn expression_operators_chain_left_to_right() {
        assert_eq!(
            parse_value("12px/16px"),
            Term::Combined {
                op: Some(ExprOperator::Slash),
                left: Box::new(num(12.0, Some("px"))),
                right: Some(Box::new(num(16.0, Some("px")))),
            }
        );
        assert_eq!(
            parse_value("1fr 2fr"),
            Term::Combined {
                op: None,
                left: Box::new(num(1.0, Some("fr"))),
                right: Some(Box::new(num(2.0, Some("fr")))),
            }
        );
    }

    #[test]
    fn function_arguments_are_parsed_in_list_mode() {
        assert_eq!(
            parse_value("rgb(1, 2, 3)"),
            Term::Function {
                name: "rgb".to_string(),
                args: Box::new(Term::Combined {
                    op: Some(ExprOperator::Comma),
                    left: Box::new(Term::Combined {
                        op: Some(ExprOperator::Comma),
                        left: Box::new(num(1.0, None)),
                        right: Some(Box::new(num(2.0, None))),
                    }),
                    right: Some(Box::new(num(3.0, None))),
                }),
            }
        );
    }

    #[test]
    fn pseudo_function_arguments_are_list_wrapped() {
        let sheet = parse("a:lang(fr) { color: red }");
        let Rule::Style(rule) = &sheet.rules[0] else {
            panic!("expected a style rule");
        };
        assert_eq!(
            rule.selectors,
            vec![qualified(
                "a",
                vec![SelectorPart::PseudoFunction {
                    name: "lang".to_string(),
                    args: Term::Combined {
                        op: None,
                        left: Box::new(ident("fr")),
                        right: None,
                    },
                }]
            )]
        );
    }

    #[test]
    fn combinators_nest_leftward() {
        let sheet = parse("#top > .item + li { color: red }");
        let Rule::Style(rule) = &sheet.rules[0] else {
            panic!("expected a style rule");
        };
        assert_eq!(
            rule.selectors,
            vec![Selector::Complex(
                Box::new(Selector::Complex(
                    Box::new(qualified(
                        "*",
                        vec![SelectorPart::Id("top".to_string())]
                    )),
                    Combinator::GreaterThan,
                    Box::new(qualified(
                        "*",
                        vec![SelectorPart::Class("item".to_string())]
                    )),
                )),
                Combinator::Plus,
                Box::new(simple("li")),
            )]
        );
    }

    #[test]
    fn sgml_comment_markers_and_comments_are_skipped() {
        let sheet = parse("<!-- a { color: /* note */ red } -->");
        assert_eq!(sheet.rules.len(), 1);
        let Rule::Style(rule) = &sheet.rules[0] else {
            panic!("expected a style rule");
        };
        assert_eq!(rule.declarations, vec![decl("color", ident("red"))]);
    }

    #[test]
    fn vendor_star_hack_is_neutralized() {
        assert_eq!(
            parse_inline("*font: smaller; color: red"),
            vec![
                decl("-nothing-font", ident("smaller")),
                decl("color", ident("red")),
            ]
        );
    }

    #[test]
    fn attributes_merge_into_one_inline_result() {
        let inline = CssParser::new(CssomBuilder::new())
            .parse_attributes([("font-size", "12pt"), ("color", "black")])
            .unwrap();
        assert_eq!(
            inline,
            vec![
                decl("font-size", num(12.0, Some("pt"))),
                decl("color", ident("black")),
            ]
        );
    }

    #[test]
    fn unicode_ranges_are_terms() {
        assert_eq!(
            parse_value("U+0041-005A"),
            Term::UnicodeRange("U+0041-005A".to_string())
        );
    }

    #[test]
    fn unterminated_blocks_are_fatal_with_full_context() {
        let err = CssParser::new(CssomBuilder::new())
            .parse("a { color: red")
            .unwrap_err();
        assert!(err.message().contains("closing '}'"));
        assert!(err.full_source().is_some());

        let err = CssParser::new(CssomBuilder::new())
            .parse("a { content: \"unterminated }")
            .unwrap_err();
        assert!(err.full_source().is_some());
    }

    #[test]
    fn default_hooks_fail_loudly() {
        struct NullSelector;
        impl CssSelector for NullSelector {}

        struct NullBuilder;
        impl CssBuilder for NullBuilder {
            type Stylesheet = ();
            type Element = ();
            type Inline = ();
            type Selector = NullSelector;
        }

        let err = CssParser::new(NullBuilder)
            .parse("a { color: red }")
            .unwrap_err();
        assert!(err.message().contains("does not implement"));
    }
}
