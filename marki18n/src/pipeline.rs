//! Per-file pipeline: mark, then extract from the marked text

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{extract, Entry, ExtractOptions};
use crate::mark::{mark, MarkOptions};
use crate::syntax::SourceKind;
use crate::usage::normalize_path;

/// Result of processing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// Path as recorded in the usage map
    pub normalized_path: String,
    /// New file content, `None` when marking changed nothing
    pub rewritten: Option<String>,
    pub entries: Vec<Entry>,
}

/// Marking and extraction options resolved once per run
#[derive(Debug, Clone)]
pub struct Pipeline {
    mark_options: MarkOptions,
    extract_options: ExtractOptions,
    root_dir: PathBuf,
}

impl Pipeline {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            mark_options: MarkOptions::from_config(config)?,
            extract_options: ExtractOptions::from_config(config),
            root_dir: config.root_dir.clone(),
        })
    }

    pub fn process_file(&self, path: &Path, source: &str) -> Result<FileOutcome> {
        let origin = path.display().to_string();
        let kind = SourceKind::from_path(path)
            .ok_or_else(|| Error::parse(&origin, "unsupported file type"))?;
        let normalized_path = normalize_path(path, &self.root_dir);

        let rewritten = mark(source, kind, &self.mark_options).map_err(|e| with_origin(e, &origin))?;
        let marked = rewritten.as_deref().unwrap_or(source);
        let entries = extract(marked, kind, &self.extract_options, Some(&normalized_path))
            .map_err(|e| with_origin(e, &origin))?;

        debug!(
            "{}: {} entr(ies), {}",
            normalized_path,
            entries.len(),
            if rewritten.is_some() { "rewritten" } else { "unchanged" }
        );
        Ok(FileOutcome {
            path: path.to_path_buf(),
            normalized_path,
            rewritten,
            entries,
        })
    }

    /// Process files in parallel. Files that fail to parse are logged and
    /// skipped; any other error aborts the run.
    pub fn process_files(&self, files: &[(PathBuf, String)]) -> Result<Vec<FileOutcome>> {
        let results: Vec<Result<FileOutcome>> = files
            .par_iter()
            .map(|(path, source)| self.process_file(path, source))
            .collect();

        let mut outcomes = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if e.is_parse_local() => warn!("Skipping file: {}", e),
                Err(e) => return Err(e),
            }
        }
        Ok(outcomes)
    }
}

/// Mark and extract one file with options derived from `config`
pub fn process_file(path: &Path, source: &str, config: &Config) -> Result<FileOutcome> {
    Pipeline::new(config)?.process_file(path, source)
}

/// Mark and extract many files with options derived from `config`
pub fn process_files(files: &[(PathBuf, String)], config: &Config) -> Result<Vec<FileOutcome>> {
    Pipeline::new(config)?.process_files(files)
}

/// Every entry of a run, in file order
pub fn collect_entries(outcomes: &[FileOutcome]) -> Vec<Entry> {
    outcomes
        .iter()
        .flat_map(|outcome| outcome.entries.iter().cloned())
        .collect()
}

fn with_origin(error: Error, origin: &str) -> Error {
    match error {
        Error::Parse { reason, .. } => Error::parse(origin, reason),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            root_dir: PathBuf::from("/repo"),
            ..Config::default()
        }
    }

    #[test]
    fn test_process_file_marks_and_extracts() {
        let outcome = process_file(
            Path::new("/repo/src/app.js"),
            "const a = '你好世界';\nconst b = `你好，${name}`;\n",
            &config(),
        )
        .unwrap();

        assert_eq!(outcome.normalized_path, "src/app.js");
        assert_eq!(
            outcome.rewritten.as_deref(),
            Some("const a = t`你好世界`;\nconst b = t`你好，${name}`;\n")
        );
        let keys: Vec<&str> = outcome.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["你好世界", "你好，{a}"]);
        assert!(outcome
            .entries
            .iter()
            .all(|e| e.file_path.as_deref() == Some("src/app.js")));
    }

    #[test]
    fn test_already_marked_file_is_not_rewritten() {
        let outcome = process_file(Path::new("/repo/a.ts"), "t`你好`;", &config()).unwrap();
        assert!(outcome.rewritten.is_none());
        assert_eq!(outcome.entries.len(), 1);
    }

    #[test]
    fn test_process_files_skips_parse_failures() {
        let files = vec![
            (PathBuf::from("/repo/good.js"), "const a = '你好';".to_string()),
            (PathBuf::from("/repo/bad.js"), "const = ;".to_string()),
            (PathBuf::from("/repo/readme.md"), "# 你好".to_string()),
            (
                PathBuf::from("/repo/view.vue"),
                "<template><p>再见</p></template>".to_string(),
            ),
        ];
        let outcomes = process_files(&files, &config()).unwrap();
        let paths: Vec<&str> = outcomes.iter().map(|o| o.normalized_path.as_str()).collect();
        assert_eq!(paths, vec!["good.js", "view.vue"]);
        assert_eq!(collect_entries(&outcomes).len(), 2);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = process_file(Path::new("/repo/bad.js"), "const = ;", &config()).unwrap_err();
        assert!(err.to_string().contains("bad.js"));
    }
}
