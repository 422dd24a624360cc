//! Canonical dictionary keys for tagged fragments
//!
//! A tagged fragment such as `` t`你好，${user.name}，共${count}条` `` is
//! split into literal segments (`"你好，"`, `"，共"`, `"条"`) and interpolation
//! slots. The key interleaves the segments with generated placeholder tokens:
//! `"你好，{a}，共{b}条"`, with variables `["a", "b"]`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Delimiters wrapped around generated placeholder names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderStyle {
    pub open: String,
    pub close: String,
}

impl Default for PlaceholderStyle {
    fn default() -> Self {
        Self {
            open: "{".to_string(),
            close: "}".to_string(),
        }
    }
}

impl PlaceholderStyle {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Delimiters must be non-empty and must not contain ASCII letters,
    /// otherwise generated names could not be told apart from them.
    pub fn validate(&self) -> Result<()> {
        for (which, delimiter) in [("open", &self.open), ("close", &self.close)] {
            if delimiter.is_empty() {
                return Err(Error::validation(format!(
                    "placeholder.{} must not be empty",
                    which
                )));
            }
            if delimiter.chars().any(|c| c.is_ascii_alphabetic()) {
                return Err(Error::validation(format!(
                    "placeholder.{} '{}' must not contain ASCII letters",
                    which, delimiter
                )));
            }
        }
        Ok(())
    }

    pub fn token(&self, name: &str) -> String {
        format!("{}{}{}", self.open, name, self.close)
    }
}

/// Placeholder name for slot `index`: 0 → `a`, 25 → `z`, 26 → `aa`, 27 → `bb`
pub fn generate_name(index: usize) -> String {
    let letter = char::from(b'a' + (index % 26) as u8);
    std::iter::repeat_n(letter, index / 26 + 1).collect()
}

/// Counter for placeholder names.
///
/// Each fragment normally starts from a fresh counter. A caller that wants
/// names to stay unique across a whole file threads one counter through every
/// call to [`normalize_fragment_with`].
#[derive(Debug, Clone, Default)]
pub struct PlaceholderCounter {
    next: usize,
}

impl PlaceholderCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_name(&mut self) -> String {
        let name = generate_name(self.next);
        self.next += 1;
        name
    }
}

/// Normalized key plus the ordered placeholder names it contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedKey {
    pub key: String,
    pub variables: Vec<String>,
}

/// Normalize one fragment with a fresh counter.
///
/// `segments` holds the literal text around the slots, so a fragment with `n`
/// slots has `n + 1` segments (possibly empty).
pub fn normalize_fragment(segments: &[&str], style: &PlaceholderStyle) -> NormalizedKey {
    normalize_fragment_with(segments, style, &mut PlaceholderCounter::new())
}

pub fn normalize_fragment_with(
    segments: &[&str],
    style: &PlaceholderStyle,
    counter: &mut PlaceholderCounter,
) -> NormalizedKey {
    let mut key = String::new();
    let mut variables = Vec::with_capacity(segments.len().saturating_sub(1));

    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            let name = counter.next_name();
            key.push_str(&style.token(&name));
            variables.push(name);
        }
        key.push_str(segment);
    }

    NormalizedKey { key, variables }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_name_boundaries() {
        assert_eq!(generate_name(0), "a");
        assert_eq!(generate_name(1), "b");
        assert_eq!(generate_name(25), "z");
        assert_eq!(generate_name(26), "aa");
        assert_eq!(generate_name(27), "bb");
        assert_eq!(generate_name(51), "zz");
        assert_eq!(generate_name(52), "aaa");
    }

    #[test]
    fn test_generate_name_is_injective() {
        let names: HashSet<String> = (0..2000).map(generate_name).collect();
        assert_eq!(names.len(), 2000);
    }

    #[test]
    fn test_plain_fragment() {
        let normalized = normalize_fragment(&["你好世界"], &PlaceholderStyle::default());
        assert_eq!(normalized.key, "你好世界");
        assert!(normalized.variables.is_empty());
    }

    #[test]
    fn test_fragment_with_slots() {
        let normalized = normalize_fragment(&["你好，", "，共", "条"], &PlaceholderStyle::default());
        assert_eq!(normalized.key, "你好，{a}，共{b}条");
        assert_eq!(normalized.variables, vec!["a", "b"]);
    }

    #[test]
    fn test_adjacent_and_edge_slots() {
        let normalized = normalize_fragment(&["", "", "元"], &PlaceholderStyle::default());
        assert_eq!(normalized.key, "{a}{b}元");
        assert_eq!(normalized.variables, vec!["a", "b"]);
    }

    #[test]
    fn test_custom_delimiters() {
        let style = PlaceholderStyle::new("{{", "}}");
        let normalized = normalize_fragment(&["共", "项"], &style);
        assert_eq!(normalized.key, "共{{a}}项");
    }

    #[test]
    fn test_counter_restarts_per_fragment() {
        let style = PlaceholderStyle::default();
        let first = normalize_fragment(&["甲", ""], &style);
        let second = normalize_fragment(&["乙", ""], &style);
        assert_eq!(first.variables, vec!["a"]);
        assert_eq!(second.variables, vec!["a"]);
    }

    #[test]
    fn test_shared_counter_continues() {
        let style = PlaceholderStyle::default();
        let mut counter = PlaceholderCounter::new();
        let first = normalize_fragment_with(&["甲", ""], &style, &mut counter);
        let second = normalize_fragment_with(&["乙", "", ""], &style, &mut counter);
        assert_eq!(first.key, "甲{a}");
        assert_eq!(second.key, "乙{b}{c}");
    }

    #[test]
    fn test_style_validation() {
        assert!(PlaceholderStyle::default().validate().is_ok());
        assert!(PlaceholderStyle::new("%", "%").validate().is_ok());
        assert!(PlaceholderStyle::new("", "}").validate().is_err());
        assert!(PlaceholderStyle::new("<x", ">").validate().is_err());
    }
}
