//! Translation ledger
//!
//! The ledger records, per key, the text of every language a key has been
//! translated into, including the source language itself. It is the source
//! of truth for "is this key translated into that language"; dictionaries
//! are regenerated from it.
//!
//! Persisted as `<translate_mapping>.json`:
//!
//! ```json
//! {
//!   "你好世界": { "en": "Hello world", "zh": "你好世界" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dictionary::{read_json_or_default, write_json};
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationLedger {
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl TranslationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the ledger; a missing file is an empty ledger
    pub fn load(path: &Path) -> Result<Self> {
        read_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn get(&self, key: &str, language: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|languages| languages.get(language))
            .map(String::as_str)
    }

    pub fn is_translated(&self, key: &str, language: &str) -> bool {
        self.get(key, language).is_some()
    }

    /// Record a successful translation, replacing any previous one
    pub fn record(&mut self, key: &str, language: &str, text: &str) {
        self.entries
            .entry(key.to_string())
            .or_default()
            .insert(language.to_string(), text.to_string());
    }

    /// Record the source-language text of `key` unless already present
    pub fn record_source(&mut self, key: &str, language: &str, text: &str) {
        self.entries
            .entry(key.to_string())
            .or_default()
            .entry(language.to_string())
            .or_insert_with(|| text.to_string());
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_and_query() {
        let mut ledger = TranslationLedger::new();
        assert!(!ledger.is_translated("你好", "en"));

        ledger.record("你好", "en", "Hello");
        assert!(ledger.is_translated("你好", "en"));
        assert!(!ledger.is_translated("你好", "ja"));
        assert_eq!(ledger.get("你好", "en"), Some("Hello"));

        ledger.record("你好", "en", "Hi");
        assert_eq!(ledger.get("你好", "en"), Some("Hi"));
    }

    #[test]
    fn test_record_source_keeps_existing() {
        let mut ledger = TranslationLedger::new();
        ledger.record_source("你好", "zh", "你好");
        ledger.record_source("你好", "zh", "别的");
        assert_eq!(ledger.get("你好", "zh"), Some("你好"));
    }

    #[test]
    fn test_persistence_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("translateMapping.json");
        assert!(TranslationLedger::load(&path).unwrap().is_empty());

        let mut ledger = TranslationLedger::new();
        ledger.record("你好世界", "en", "Hello world");
        ledger.record_source("你好世界", "zh", "你好世界");
        ledger.save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"你好世界": {"en": "Hello world", "zh": "你好世界"}})
        );
        assert_eq!(TranslationLedger::load(&path).unwrap(), ledger);
    }
}
