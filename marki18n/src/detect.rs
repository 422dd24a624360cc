//! Target-script detection
//!
//! A string qualifies for marking when it contains at least one character
//! matched by the configured pattern. The default pattern matches Han
//! ideographs, so `"你好"` and `"共 3 项"` qualify while `"hello"` does not.

use regex::Regex;

use crate::error::{Error, Result};

pub const DEFAULT_PATTERN: &str = r"\p{Han}";

#[derive(Debug, Clone)]
pub struct TextDetector {
    pattern: Regex,
}

impl TextDetector {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            Error::validation(format!("invalid detect pattern '{}': {}", pattern, e))
        })?;
        Ok(Self { pattern })
    }

    /// Does `text` contain target-script characters?
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

impl Default for TextDetector {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_PATTERN).expect("default pattern is valid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_detects_han() {
        let detector = TextDetector::default();
        assert!(detector.matches("你好"));
        assert!(detector.matches("共 3 项"));
        assert!(detector.matches("Hello 世界"));
        assert!(!detector.matches("hello"));
        assert!(!detector.matches(""));
        assert!(!detector.matches("，。！"));
    }

    #[test]
    fn test_custom_pattern() {
        let detector = TextDetector::new(r"[\p{Hiragana}\p{Katakana}]").unwrap();
        assert!(detector.matches("こんにちは"));
        assert!(detector.matches("カタカナ"));
        assert!(!detector.matches("漢字"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(TextDetector::new("(").is_err());
    }
}
