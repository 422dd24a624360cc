//! Anchor tokens that protect key placeholders during machine translation
//!
//! A key such as `"你好，{a}，共{b}条"` would lose its placeholders to a
//! translator that renders `{a}` as `{一}` or drops the braces. Before a
//! request, every distinct placeholder is replaced by an opaque anchor
//! (`_ID1_`, `_ID2_`, ...) and put back afterwards. Anchors are 1-indexed in
//! order of first appearance.

use regex::Regex;

use marki18n::PlaceholderStyle;

use crate::error::{MtError, MtResult};

/// Text ready to send to a provider, plus what is needed to restore it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredText {
    pub text: String,
    /// (anchor, placeholder token) pairs, in anchor order
    pub anchors: Vec<(String, String)>,
}

impl AnchoredText {
    pub fn has_anchors(&self) -> bool {
        !self.anchors.is_empty()
    }
}

pub fn anchor_token(index: usize) -> String {
    format!("_ID{}_", index)
}

/// Finds placeholder tokens written in one placeholder style
#[derive(Debug, Clone)]
pub struct Anchorer {
    pattern: Regex,
}

impl Anchorer {
    pub fn new(style: &PlaceholderStyle) -> MtResult<Self> {
        let pattern = format!(
            "{}[a-z]+{}",
            regex::escape(&style.open),
            regex::escape(&style.close)
        );
        let pattern = Regex::new(&pattern)
            .map_err(|e| MtError::ConfigError(format!("Invalid placeholder style: {}", e)))?;
        Ok(Self { pattern })
    }

    pub fn anchor(&self, text: &str) -> AnchoredText {
        let mut anchors: Vec<(String, String)> = Vec::new();
        let anchored = self.pattern.replace_all(text, |caps: &regex::Captures| {
            let token = &caps[0];
            if let Some((anchor, _)) = anchors.iter().find(|(_, t)| t == token) {
                return anchor.clone();
            }
            let anchor = anchor_token(anchors.len() + 1);
            anchors.push((anchor.clone(), token.to_string()));
            anchor
        });
        AnchoredText {
            text: anchored.into_owned(),
            anchors,
        }
    }
}

/// Put placeholders back into a translation of `anchored`.
///
/// Every anchor must survive translation; a lost anchor means the
/// translation cannot be used.
pub fn restore(translated: &str, anchored: &AnchoredText) -> MtResult<String> {
    let mut result = translated.to_string();
    for (anchor, token) in &anchored.anchors {
        if !result.contains(anchor.as_str()) {
            return Err(MtError::QualityLow(format!(
                "anchor {} for {} lost in translation: {}",
                anchor, token, translated
            )));
        }
        result = result.replace(anchor.as_str(), token);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchorer() -> Anchorer {
        Anchorer::new(&PlaceholderStyle::default()).unwrap()
    }

    #[test]
    fn test_anchor_placeholders_in_order() {
        let anchored = anchorer().anchor("你好，{a}，共{b}条");
        assert_eq!(anchored.text, "你好，_ID1_，共_ID2_条");
        assert_eq!(
            anchored.anchors,
            vec![
                ("_ID1_".to_string(), "{a}".to_string()),
                ("_ID2_".to_string(), "{b}".to_string())
            ]
        );
    }

    #[test]
    fn test_repeated_placeholder_shares_anchor() {
        let anchored = anchorer().anchor("{a}和{a}");
        assert_eq!(anchored.text, "_ID1_和_ID1_");
        assert_eq!(anchored.anchors.len(), 1);
    }

    #[test]
    fn test_no_placeholders() {
        let anchored = anchorer().anchor("你好世界");
        assert_eq!(anchored.text, "你好世界");
        assert!(!anchored.has_anchors());
        assert_eq!(restore("Hello world", &anchored).unwrap(), "Hello world");
    }

    #[test]
    fn test_restore_after_reordering() {
        let anchored = anchorer().anchor("{a}给{b}发了消息");
        let restored = restore("_ID2_ got a message from _ID1_", &anchored).unwrap();
        assert_eq!(restored, "{b} got a message from {a}");
    }

    #[test]
    fn test_lost_anchor_is_quality_failure() {
        let anchored = anchorer().anchor("你好，{a}");
        let err = restore("Hello, ID1", &anchored).unwrap_err();
        assert!(matches!(err, MtError::QualityLow(_)));
    }

    #[test]
    fn test_double_digit_anchors_do_not_collide() {
        let text: String = (0..11).map(|i| format!("{{{}}}", marki18n::generate_name(i))).collect();
        let anchored = anchorer().anchor(&text);
        assert_eq!(anchored.anchors.len(), 11);
        assert!(anchored.text.ends_with("_ID10__ID11_"));
        assert_eq!(restore(&anchored.text, &anchored).unwrap(), text);
    }

    #[test]
    fn test_custom_style() {
        let anchorer = Anchorer::new(&PlaceholderStyle::new("{{", "}}")).unwrap();
        let anchored = anchorer.anchor("共{{a}}条，{b}");
        assert_eq!(anchored.text, "共_ID1_条，{b}");
    }
}
