//! Compiled lexical recognizers for the terminal symbols of the CSS 2.1
//! grammar (https://www.w3.org/TR/CSS21/grammar.html).
//!
//! Every pattern is anchored at the cursor start, case-insensitive, and
//! unicode-aware. Patterns are compiled once and reused for the process
//! lifetime.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

const HEX: &str = "[0-9a-fA-F]";
const NONASCII: &str = r"[^\x00-\x7F]";

fn pattern(p: &str) -> Regex {
    RegexBuilder::new(p).case_insensitive(true).build().unwrap()
}

/// A backslash escape: a codepoint escape or a single escaped character.
fn escape() -> String {
    format!(r"\\{HEX}{{1,6}}\s?|\\[ -~\x80-\x{{10FFFF}}]")
}

/// Identifier start. CSS 2.1 deviation: a hyphen followed by a non-digit
/// is a valid name start (https://www.w3.org/TR/CSS21/syndata.html#value-def-identifier),
/// and all codepoints above 0x7F are legal identifier characters.
fn nmstart() -> String {
    format!("-[^0-9]|[A-Za-z_]|{NONASCII}|{}", escape())
}

fn nmchar() -> String {
    format!("[-0-9A-Za-z_]|{NONASCII}|{}", escape())
}

fn ident() -> String {
    format!("(?:{})(?:{})*", nmstart(), nmchar())
}

fn string_content() -> String {
    format!(r"[\t !#$%&(-~]|\\(?:\n|\r\n|\r|\f)|{NONASCII}|(?:{})", escape())
}

/// Double-quoted string; an unescaped single quote is legal content.
fn string1() -> String {
    format!(r#""((?:{}|')*)""#, string_content())
}

/// Single-quoted string; an unescaped double quote is legal content.
fn string2() -> String {
    format!(r#"'((?:{}|")*)'"#, string_content())
}

pub(crate) static RE_IDENT: Lazy<Regex> = Lazy::new(|| pattern(&format!("^({})", ident())));

/// Permissive fallback: any run of codepoints above 0x7F is an identifier.
pub(crate) static RE_UNICODE_ID: Lazy<Regex> = Lazy::new(|| pattern(&format!("^({NONASCII}+)")));

pub(crate) static RE_ELEMENT_NAME: Lazy<Regex> =
    Lazy::new(|| pattern(&format!(r"^({}|\*)", ident())));

static RE_NAMESPACE_PREFIX: Lazy<Regex> =
    Lazy::new(|| pattern(&format!(r"^({}|\*|)\|", ident())));

pub(crate) static RE_CLASS: Lazy<Regex> = Lazy::new(|| pattern(&format!(r"^\.({})", ident())));

pub(crate) static RE_HASH: Lazy<Regex> =
    Lazy::new(|| pattern(&format!("^#((?:{})+)", nmchar())));

pub(crate) static RE_RGBCOLOR: Lazy<Regex> =
    Lazy::new(|| pattern(&format!("^(#{HEX}{{6}}|#{HEX}{{3}})")));

pub(crate) static RE_STRING: Lazy<Regex> =
    Lazy::new(|| pattern(&format!("^(?:{}|{})", string1(), string2())));

pub(crate) static RE_URI: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"^url\(\s*(?:(?:{}|{})|((?:[!#$%&*-~]|{NONASCII}|(?:{}))+))\s*\)",
        string1(),
        string2(),
        escape()
    ))
});

/// Signed number with an optional fractional part, including the
/// leading-dot form (`.5`).
pub(crate) static RE_NUM: Lazy<Regex> =
    Lazy::new(|| pattern(r"^(([-+]?[0-9]+(?:\.[0-9]+)?)|([-+]?\.[0-9]+))"));

/// Unit suffix. Always matches; the capture is absent when no unit follows.
pub(crate) static RE_UNIT: Lazy<Regex> = Lazy::new(|| pattern(&format!("^(%|{})?", ident())));

/// Function-call head of an expression term, with an optional sign.
pub(crate) static RE_FUNCTION_TERM: Lazy<Regex> =
    Lazy::new(|| pattern(&format!(r"^[-+]?({})\(", ident())));

pub(crate) static RE_UNICODE_RANGE: Lazy<Regex> =
    Lazy::new(|| pattern(&format!(r"^(U\+{HEX}{{1,6}}-{HEX}{{1,6}})")));

static RE_COMMENT: Lazy<Regex> = Lazy::new(|| pattern(r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/"));

pub(crate) static RE_IMPORTANT: Lazy<Regex> = Lazy::new(|| pattern(r"^!\s*(important)"));

/// Applies an anchored recognizer to the cursor. On a match, returns the
/// first capture (absent when the group did not participate) and the
/// remainder after the whole match; otherwise the cursor is untouched.
pub(crate) fn match_prefix<'a>(re: &Regex, src: &'a str) -> (Option<&'a str>, &'a str) {
    let Some(caps) = re.captures(src) else {
        return (None, src);
    };
    let end = caps.get(0).map_or(0, |m| m.end());
    (caps.get(1).map(|m| m.as_str()), &src[end..])
}

/// Like [`match_prefix`], but returns the first *participating* capture:
/// quoted strings and URIs capture their content in different groups
/// depending on the quoting used.
pub(crate) fn match_string<'a>(re: &Regex, src: &'a str) -> (Option<&'a str>, &'a str) {
    let Some(caps) = re.captures(src) else {
        return (None, src);
    };
    let end = caps.get(0).map_or(0, |m| m.end());
    let content = caps.iter().skip(1).flatten().next().map_or("", |m| m.as_str());
    (Some(content), &src[end..])
}

pub(crate) fn get_ident<'a>(src: &'a str) -> (Option<&'a str>, &'a str) {
    match_prefix(&RE_IDENT, src)
}

pub(crate) fn get_string<'a>(src: &'a str) -> (Option<&'a str>, &'a str) {
    match_string(&RE_STRING, src)
}

pub(crate) fn get_string_or_uri<'a>(src: &'a str) -> (Option<&'a str>, &'a str) {
    let (result, rest) = match_string(&RE_URI, src);
    if result.is_some() {
        (result, rest)
    } else {
        get_string(src)
    }
}

/// Matches a namespace prefix (`ns|`, `*|`, or the empty default `|`).
/// The `|` must not be the head of a `|=` attribute operator; the `regex`
/// crate has no lookahead, so the guard is checked here.
pub(crate) fn match_namespace_prefix(src: &str) -> (Option<&str>, &str) {
    let Some(caps) = RE_NAMESPACE_PREFIX.captures(src) else {
        return (None, src);
    };
    let end = caps.get(0).map_or(0, |m| m.end());
    let rest = &src[end..];
    if rest.starts_with('=') {
        return (None, src);
    }
    (caps.get(1).map(|m| m.as_str()), rest)
}

pub(crate) fn strip_comments(src: &str) -> Cow<'_, str> {
    RE_COMMENT.replace_all(src, "")
}

/// Strips a leading `@keyword` (plus trailing whitespace) when the keyword
/// matches exactly; `@medium` is not `@media`.
pub(crate) fn strip_at_keyword<'a>(src: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = src.strip_prefix('@')?;
    let (ident, rest) = get_ident(rest);
    if !ident?.eq_ignore_ascii_case(keyword) {
        return None;
    }
    Some(rest.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idents_allow_the_css21_deviations() {
        assert_eq!(get_ident("-moz-box: 1"), (Some("-moz-box"), ": 1"));
        assert_eq!(get_ident("color:red"), (Some("color"), ":red"));
        assert_eq!(get_ident("über {"), (Some("über"), " {"));
        // a hyphen followed by a digit is not a name start
        assert_eq!(get_ident("-9foo"), (None, "-9foo"));
        assert_eq!(get_ident("9foo"), (None, "9foo"));
    }

    #[test]
    fn strings_allow_the_other_quote_unescaped() {
        assert_eq!(get_string(r#""it's" rest"#), (Some("it's"), " rest"));
        assert_eq!(get_string(r#"'say "hi"';"#), (Some(r#"say "hi""#), ";"));
        assert_eq!(get_string(r#""""#), (Some(""), ""));
        assert_eq!(get_string("no-quote"), (None, "no-quote"));
    }

    #[test]
    fn uris_may_be_bare_or_quoted() {
        assert_eq!(
            get_string_or_uri("url(x.css) print"),
            (Some("x.css"), " print")
        );
        assert_eq!(
            get_string_or_uri("url( \"x.css\" );"),
            (Some("x.css"), ";")
        );
        assert_eq!(get_string_or_uri("\"x.css\";"), (Some("x.css"), ";"));
    }

    #[test]
    fn numbers_include_the_leading_dot_form() {
        assert_eq!(match_prefix(&RE_NUM, ".5em"), (Some(".5"), "em"));
        assert_eq!(match_prefix(&RE_NUM, "0.5em"), (Some("0.5"), "em"));
        assert_eq!(match_prefix(&RE_NUM, "-10%"), (Some("-10"), "%"));
        assert_eq!(match_prefix(&RE_NUM, "+2px"), (Some("+2"), "px"));
        assert_eq!(match_prefix(&RE_NUM, "em"), (None, "em"));
    }

    #[test]
    fn unit_capture_is_absent_without_a_unit() {
        assert_eq!(match_prefix(&RE_UNIT, "em;"), (Some("em"), ";"));
        assert_eq!(match_prefix(&RE_UNIT, "%;"), (Some("%"), ";"));
        assert_eq!(match_prefix(&RE_UNIT, " ;"), (None, " ;"));
    }

    #[test]
    fn rgb_colors_prefer_the_six_digit_form() {
        assert_eq!(
            match_prefix(&RE_RGBCOLOR, "#aabbcc;"),
            (Some("#aabbcc"), ";")
        );
        assert_eq!(match_prefix(&RE_RGBCOLOR, "#abc;"), (Some("#abc"), ";"));
    }

    #[test]
    fn namespace_prefix_is_not_an_attribute_operator() {
        assert_eq!(match_namespace_prefix("svg|rect"), (Some("svg"), "rect"));
        assert_eq!(match_namespace_prefix("*|rect"), (Some("*"), "rect"));
        assert_eq!(match_namespace_prefix("|rect"), (Some(""), "rect"));
        // `lang|=en` is a DASHMATCH, not a namespace
        assert_eq!(match_namespace_prefix("|=en"), (None, "|=en"));
    }

    #[test]
    fn comments_are_stripped_globally() {
        assert_eq!(
            strip_comments("a /* one */ b /* two\n * lines */c"),
            "a  b c"
        );
    }

    #[test]
    fn at_keywords_match_on_identifier_boundaries() {
        assert_eq!(strip_at_keyword("@media print", "media"), Some("print"));
        assert_eq!(strip_at_keyword("@MEDIA print", "media"), Some("print"));
        assert_eq!(strip_at_keyword("@medium x", "media"), None);
        assert_eq!(strip_at_keyword("media", "media"), None);
    }
}
