use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    CssParse(#[from] CssParseError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A failure raised by the grammar engine, carrying the unconsumed source
/// at the point of failure and the broader fragment it was extracted from.
///
/// The full source is attached exactly once, at the top-level entry point.
/// All offsets are byte offsets computed by forward substring search; a
/// failed search yields `None`, never zero, so "not located" is
/// distinguishable from "located at start."
#[derive(Debug, Clone)]
pub struct CssParseError {
    message: String,
    src: String,
    ctx_src: String,
    full_src: Option<String>,
    inline: bool,
    src_ctx_idx: Option<usize>,
    src_full_idx: Option<usize>,
    ctx_full_idx: Option<usize>,
}

impl CssParseError {
    pub fn new(message: impl Into<String>, src: &str, ctx_src: &str) -> Self {
        let ctx_src = if ctx_src.is_empty() { src } else { ctx_src };
        Self {
            message: message.into(),
            src: src.to_string(),
            ctx_src: ctx_src.to_string(),
            full_src: None,
            inline: false,
            src_ctx_idx: ctx_src.find(src),
            src_full_idx: None,
            ctx_full_idx: None,
        }
    }

    /// An error for a builder hook that the concrete builder did not
    /// override. Partial builders fail loudly instead of silently
    /// dropping rules.
    pub fn unsupported(hook: &str) -> Self {
        Self::new(format!("builder does not implement `{}`", hook), "", "")
    }

    /// Attaches the complete original source and computes the absolute
    /// offsets of the failing fragment and its context within it.
    pub(crate) fn with_full_source(mut self, full_src: &str, inline: bool) -> Self {
        if self.full_src.is_some() {
            return self;
        }
        self.inline = inline;
        self.src_full_idx = full_src.find(&self.src);
        self.ctx_full_idx = full_src.find(&self.ctx_src);
        self.full_src = Some(full_src.to_string());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The unconsumed source suffix at the point of failure.
    pub fn failing_fragment(&self) -> &str {
        &self.src
    }

    /// The source fragment of the production that raised the error.
    pub fn context_fragment(&self) -> &str {
        &self.ctx_src
    }

    pub fn full_source(&self) -> Option<&str> {
        self.full_src.as_deref()
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    pub fn fragment_offset_in_context(&self) -> Option<usize> {
        self.src_ctx_idx
    }

    pub fn fragment_offset_in_source(&self) -> Option<usize> {
        self.src_full_idx
    }

    pub fn context_offset_in_source(&self) -> Option<usize> {
        self.ctx_full_idx
    }
}

impl fmt::Display for CssParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.src_ctx_idx {
            Some(idx) => write!(
                f,
                "{}:: ({:?}, {:?})",
                self.message,
                clip_tail(&self.ctx_src[..idx], 40),
                clip_head(&self.ctx_src[idx..], 20),
            ),
            None => write!(f, "{}:: {:?}", self.message, clip_head(&self.src, 40)),
        }
    }
}

impl std::error::Error for CssParseError {}

/// Returns at most `max` bytes from the start of `s`, never splitting a
/// character.
fn clip_head(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Returns at most `max` bytes from the end of `s`, never splitting a
/// character.
fn clip_tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_computed_by_substring_search() {
        let err = CssParseError::new("bad", "red ;", "color: red ;");
        assert_eq!(err.fragment_offset_in_context(), Some(7));

        let err = err.with_full_source("a { color: red ; }", false);
        assert_eq!(err.fragment_offset_in_source(), Some(11));
        assert_eq!(err.context_offset_in_source(), Some(4));
    }

    #[test]
    fn failed_search_yields_absent_offsets() {
        let err = CssParseError::new("bad", "xyz", "color: red");
        assert_eq!(err.fragment_offset_in_context(), None);

        let err = err.with_full_source("something else", true);
        assert_eq!(err.fragment_offset_in_source(), None);
        assert_eq!(err.context_offset_in_source(), None);
        assert!(err.is_inline());
    }

    #[test]
    fn display_is_windowed_around_the_failure() {
        let ctx = format!("{}red", " ".repeat(100));
        let err = CssParseError::new("bad", "red", &ctx);
        let rendered = err.to_string();
        assert!(rendered.starts_with("bad:: "));
        assert!(rendered.len() < ctx.len());
    }
}
