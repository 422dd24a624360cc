//! Span rewriting over an immutable source buffer

use crate::error::{Error, Result};

/// Replace `source[start..end]` with `content`. `start == end` is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementSpan {
    pub start: usize,
    pub end: usize,
    pub content: String,
}

impl ReplacementSpan {
    pub fn new(start: usize, end: usize, content: impl Into<String>) -> Self {
        Self {
            start,
            end,
            content: content.into(),
        }
    }

    pub fn insert(at: usize, content: impl Into<String>) -> Self {
        Self::new(at, at, content)
    }
}

/// Apply non-overlapping spans to `source`.
///
/// Spans are applied in descending `start` order so that every offset still
/// refers to the original buffer when it is used. An insertion sharing its
/// offset with a replacement lands before the replaced text.
///
/// # Errors
///
/// Returns [`Error::InvalidSpan`] when a span is out of bounds, splits a UTF-8
/// character, is reversed, or overlaps another span.
pub fn apply_spans(source: &str, mut spans: Vec<ReplacementSpan>) -> Result<String> {
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

    for span in &spans {
        if span.start > span.end || span.end > source.len() {
            return Err(invalid(span, "out of bounds"));
        }
        if !source.is_char_boundary(span.start) || !source.is_char_boundary(span.end) {
            return Err(invalid(span, "not on a character boundary"));
        }
    }
    for pair in spans.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let both_insert_here = prev.start == prev.end && next.start == next.end;
        if prev.end > next.start || (both_insert_here && prev.start == next.start) {
            return Err(invalid(next, "overlaps another span"));
        }
    }

    let mut output = source.to_string();
    for span in spans.iter().rev() {
        output.replace_range(span.start..span.end, &span.content);
    }
    Ok(output)
}

fn invalid(span: &ReplacementSpan, reason: &str) -> Error {
    Error::InvalidSpan {
        start: span.start,
        end: span.end,
        reason: reason.to_string(),
    }
}
