//! Reconciler: merges extracted entries into the usage map and dictionaries
//!
//! Order of effects for one batch:
//!
//! 1. make sure the output directory, every dictionary and the usage map exist
//! 2. merge the batch into the prior usage map and diff the two
//! 3. persist the usage map
//! 4. per language, insert absent keys, drop removed keys, write if changed
//!
//! Existing dictionary values are never overwritten, except the source
//! language's values under `force_update`.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::dictionary::{write_json, Dictionary};
use crate::error::Result;
use crate::extract::Entry;
use crate::usage::{DiffReport, UsageMap};

/// What one reconciliation did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub diff: DiffReport,
    /// Keys new to the usage map or to the source dictionary, sorted
    pub new_keys: Vec<String>,
    /// Languages whose dictionary file was rewritten
    pub written_languages: Vec<String>,
}

/// Merge `entries` and return the newly added keys, sorted and deduplicated
pub fn write_extract_file(
    entries: &[Entry],
    config: &Config,
    auto_remove_key: bool,
) -> Result<Vec<String>> {
    Ok(reconcile(entries, config, auto_remove_key)?.new_keys)
}

/// Merge `entries` into the persisted state and report the full diff
pub fn reconcile(entries: &[Entry], config: &Config, auto_remove_key: bool) -> Result<ReconcileReport> {
    if entries.is_empty() {
        return Ok(ReconcileReport::default());
    }
    ensure_files(config)?;

    let usage_path = config.usage_map_path();
    let prior = UsageMap::load(&usage_path)?;
    let next = prior.merge(&UsageMap::from_entries(entries), auto_remove_key);
    let diff = prior.diff(&next);
    next.save(&usage_path)?;
    debug!(
        "Usage map: {} added, {} removed, {} unchanged",
        diff.added.len(),
        diff.removed.len(),
        diff.unchanged.len()
    );

    // first text wins for a key seen in several files
    let mut texts: BTreeMap<&str, &str> = BTreeMap::new();
    for entry in entries {
        texts.entry(entry.key.as_str()).or_insert(entry.text.as_str());
    }

    let mut new_keys: BTreeSet<String> = diff.added.keys().cloned().collect();
    let mut written_languages = Vec::new();

    for language in config.languages() {
        let path = config.dictionary_path(&language);
        let mut dictionary = Dictionary::load(&path)?;
        let is_source = language == config.source_language;
        let mut changed = false;

        for (key, text) in &texts {
            let existed = dictionary.contains_key(key);
            let updated = if is_source && config.force_update {
                dictionary.set(key, text)
            } else {
                dictionary.insert_if_absent(key, text)
            };
            changed |= updated;
            if updated && is_source && !existed {
                new_keys.insert(key.to_string());
            }
        }

        if auto_remove_key {
            for key in diff.removed.keys() {
                changed |= dictionary.remove(key);
            }
        }

        if changed {
            dictionary.save(&path)?;
            written_languages.push(language);
        }
    }

    let new_keys: Vec<String> = new_keys.into_iter().collect();
    info!(
        "Reconciled {} entries: {} new key(s), {} dictionary file(s) written",
        entries.len(),
        new_keys.len(),
        written_languages.len()
    );

    Ok(ReconcileReport {
        diff,
        new_keys,
        written_languages,
    })
}

/// Create the output directory and empty dictionary and usage map files
pub fn ensure_files(config: &Config) -> Result<()> {
    let empty = serde_json::Map::new();
    let mut paths: Vec<_> = config
        .languages()
        .iter()
        .map(|language| config.dictionary_path(language))
        .collect();
    paths.push(config.usage_map_path());

    for path in paths {
        if !path.exists() {
            debug!("Creating {}", path.display());
            write_json(&path, &empty)?;
        }
    }
    Ok(())
}
