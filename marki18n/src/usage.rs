//! Usage map: which files reference which keys
//!
//! Persisted as `<file_mapping>.json`:
//!
//! ```json
//! {
//!   "你好世界": ["src/app.js", "src/home.vue"]
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::dictionary::{read_json_or_default, write_json};
use crate::error::Result;
use crate::extract::Entry;

/// Key → set of referencing paths
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageMap {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl UsageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a usage map; a missing file is an empty map
    pub fn load(path: &Path) -> Result<Self> {
        read_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    /// Group entries by key. Entries without a file path count as a
    /// reference from the empty path.
    pub fn from_entries(entries: &[Entry]) -> Self {
        let mut map = Self::new();
        for entry in entries {
            map.insert(&entry.key, entry.file_path.as_deref().unwrap_or_default());
        }
        map
    }

    pub fn insert(&mut self, key: &str, path: &str) {
        self.entries
            .entry(key.to_string())
            .or_default()
            .insert(path.to_string());
    }

    pub fn paths(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Files referenced anywhere in the map
    pub fn files(&self) -> BTreeSet<&str> {
        self.entries
            .values()
            .flat_map(|paths| paths.iter().map(String::as_str))
            .collect()
    }

    /// Next usage map after processing `batch`.
    ///
    /// With `auto_remove`, the batch's files are first dropped from every
    /// prior path set, since the batch now holds their complete set of keys.
    /// Keys left without paths disappear unless the batch references them.
    pub fn merge(&self, batch: &UsageMap, auto_remove: bool) -> UsageMap {
        let mut next = self.clone();

        if auto_remove {
            let batch_files = batch.files();
            next.entries.retain(|_, paths| {
                paths.retain(|path| !batch_files.contains(path.as_str()));
                !paths.is_empty()
            });
        }

        for (key, paths) in &batch.entries {
            next.entries
                .entry(key.clone())
                .or_default()
                .extend(paths.iter().cloned());
        }
        next
    }

    /// Partition the keys of both maps into added, removed and unchanged
    pub fn diff(&self, next: &UsageMap) -> DiffReport {
        let mut report = DiffReport::default();
        for (key, paths) in &next.entries {
            let target = if self.entries.contains_key(key) {
                &mut report.unchanged
            } else {
                &mut report.added
            };
            target.entries.insert(key.clone(), paths.clone());
        }
        for (key, paths) in &self.entries {
            if !next.entries.contains_key(key) {
                report.removed.entries.insert(key.clone(), paths.clone());
            }
        }
        report
    }
}

/// Result of diffing two usage maps; the three parts share no key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub added: UsageMap,
    pub removed: UsageMap,
    pub unchanged: UsageMap,
}

/// Path relative to `root` with forward slashes.
///
/// Paths outside `root` are kept as given, with separators normalized.
pub fn normalize_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::CurDir => None,
            Component::RootDir => Some(String::new()),
            other => Some(other.as_os_str().to_string_lossy().into_owned()),
        })
        .collect();
    parts.join("/").replace('\\', "/")
}
