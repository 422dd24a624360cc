//! Per-language dictionaries
//!
//! Each language has a flat JSON file under the output directory:
//!
//! ```json
//! {
//!     "@metadata": { ... },  // kept as is
//!     "你好世界": "Hello world",
//!     "你好，{a}": "Hello, {a}"
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use icu_locale::Locale;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};

const METADATA_KEY: &str = "@metadata";

/// Key → text for one language
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    messages: BTreeMap<String, String>,
    metadata: Option<Value>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a dictionary file; a missing file is an empty dictionary.
    ///
    /// Keys starting with `@` are metadata and not messages. Non-string values
    /// are skipped with a warning.
    pub fn load(path: &Path) -> Result<Self> {
        let object = match read_json_or_default(path)? {
            Value::Object(object) => object,
            Value::Null => return Ok(Self::new()),
            _ => {
                return Err(Error::validation(format!(
                    "dictionary '{}' must be a JSON object",
                    path.display()
                )));
            }
        };

        let mut dictionary = Self::new();
        for (key, value) in object {
            if key == METADATA_KEY {
                dictionary.metadata = Some(value);
                continue;
            }
            if key.starts_with('@') {
                continue;
            }
            match value {
                Value::String(text) => {
                    dictionary.messages.insert(key, text);
                }
                _ => warn!(
                    "Message '{}' in {} is not a string, skipping",
                    key,
                    path.display()
                ),
            }
        }
        Ok(dictionary)
    }

    /// Write pretty-printed JSON with a trailing newline
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut object = Map::new();
        if let Some(metadata) = &self.metadata {
            object.insert(METADATA_KEY.to_string(), metadata.clone());
        }
        for (key, text) in &self.messages {
            object.insert(key.clone(), Value::String(text.clone()));
        }
        write_json(path, &Value::Object(object))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.messages.contains_key(key)
    }

    /// Set `key` unconditionally. Returns whether the value changed.
    pub fn set(&mut self, key: &str, text: &str) -> bool {
        if self.get(key) == Some(text) {
            return false;
        }
        self.messages.insert(key.to_string(), text.to_string());
        true
    }

    /// Set `key` only when absent. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, key: &str, text: &str) -> bool {
        if self.messages.contains_key(key) {
            return false;
        }
        self.messages.insert(key.to_string(), text.to_string());
        true
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.messages.remove(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.messages.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Load every `<lang>.json` in `dir`, keyed by language code.
///
/// Files whose stem is not a language code (the usage map, the ledger) are
/// skipped.
pub fn load_all_dictionaries(dir: &Path) -> Result<BTreeMap<String, Dictionary>> {
    if !dir.is_dir() {
        return Err(Error::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut dictionaries = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(language) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if language.parse::<Locale>().is_err() {
            debug!("Skipping {}: not a language file", path.display());
            continue;
        }
        dictionaries.insert(language.to_string(), Dictionary::load(&path)?);
    }

    if dictionaries.is_empty() {
        warn!("No dictionary files found in {}", dir.display());
    }
    Ok(dictionaries)
}

/// Read JSON from `path`, or the type's default when the file does not exist
pub(crate) fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&content).map_err(|e| Error::json(path, e))
}

/// Write pretty-printed JSON with a trailing newline, creating parent directories
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }
    let mut content = serde_json::to_string_pretty(value).map_err(|e| Error::json(path, e))?;
    content.push('\n');
    fs::write(path, content).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let dictionary = Dictionary::load(&dir.path().join("en.json")).unwrap();
        assert!(dictionary.is_empty());
    }

    #[test]
    fn test_load_skips_metadata_and_non_strings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("en.json");
        fs::write(
            &path,
            r#"{"@metadata": {"authors": ["a"]}, "你好": "Hello", "数字": 3}"#,
        )
        .unwrap();

        let dictionary = Dictionary::load(&path).unwrap();
        assert_eq!(dictionary.len(), 1);
        assert_eq!(dictionary.get("你好"), Some("Hello"));
    }

    #[test]
    fn test_save_keeps_metadata_and_is_pretty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("en.json");
        fs::write(&path, r#"{"@metadata": {"authors": ["a"]}}"#).unwrap();

        let mut dictionary = Dictionary::load(&path).unwrap();
        assert!(dictionary.insert_if_absent("你好", "Hello"));
        dictionary.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("}\n"));
        assert!(content.contains("\n  \"你好\": \"Hello\""));
        assert!(content.contains("@metadata"));
    }

    #[test]
    fn test_insert_if_absent_never_overwrites() {
        let mut dictionary = Dictionary::new();
        assert!(dictionary.insert_if_absent("你好", "Hi there"));
        assert!(!dictionary.insert_if_absent("你好", "Hello"));
        assert_eq!(dictionary.get("你好"), Some("Hi there"));

        assert!(dictionary.set("你好", "Hello"));
        assert!(!dictionary.set("你好", "Hello"));
    }

    #[test]
    fn test_invalid_json_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zh.json");
        fs::write(&path, "{ not json").unwrap();
        let err = Dictionary::load(&path).unwrap_err();
        assert!(matches!(err, Error::Json { .. }));
        assert!(err.to_string().contains("zh.json"));
    }

    #[test]
    fn test_load_all_dictionaries() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("zh.json"), r#"{"你好": "你好"}"#).unwrap();
        fs::write(dir.path().join("en.json"), r#"{"你好": "Hello"}"#).unwrap();
        fs::write(dir.path().join("fileMapping.json"), r#"{"你好": ["a.js"]}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let all = load_all_dictionaries(dir.path()).unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["en", "zh"]);
        assert_eq!(all["en"].get("你好"), Some("Hello"));
    }

    #[test]
    fn test_load_all_requires_directory() {
        let dir = TempDir::new().unwrap();
        assert!(load_all_dictionaries(&dir.path().join("missing")).is_err());
    }
}
