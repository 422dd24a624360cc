//! Marking, extraction and dictionary reconciliation for source-embedded text
//!
//! ```ignore
//! use marki18n::{Config, SourceKind, MarkOptions, ExtractOptions, mark, extract, write_extract_file};
//!
//! let config = Config::default();
//! let source = "const a = '你好世界';";
//!
//! // 1. Rewrite target-language text into tagged templates
//! let marked = mark(source, SourceKind::JavaScript, &MarkOptions::from_config(&config)?)?
//!     .unwrap_or_else(|| source.to_string());
//! assert_eq!(marked, "const a = t`你好世界`;");
//!
//! // 2. Harvest the tagged templates
//! let entries = extract(&marked, SourceKind::JavaScript, &ExtractOptions::from_config(&config), Some("src/a.js"))?;
//!
//! // 3. Merge them into locales/zh.json, locales/en.json and locales/fileMapping.json
//! let added = write_extract_file(&entries, &config, config.auto_remove_key)?;
//! assert_eq!(added, vec!["你好世界"]);
//! ```

pub mod config;
pub mod detect;
pub mod dictionary;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod mark;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod span;
pub mod syntax;
pub mod usage;

// Re-export main types for convenient access
pub use config::{AzureCredentials, Config, GoogleCredentials, TencentCredentials, TranslateConfig};
pub use detect::TextDetector;
pub use dictionary::{load_all_dictionaries, Dictionary};
pub use error::{Error, Result};
pub use extract::{extract, Entry, ExtractOptions};
pub use ledger::TranslationLedger;
pub use mark::{insert_binding, mark, MarkOptions};
pub use normalize::{generate_name, normalize_fragment, NormalizedKey, PlaceholderCounter, PlaceholderStyle};
pub use pipeline::{collect_entries, process_file, process_files, FileOutcome, Pipeline};
pub use reconcile::{reconcile, write_extract_file, ReconcileReport};
pub use span::{apply_spans, ReplacementSpan};
pub use syntax::{Location, NodeKind, ParsedSource, SourceKind, SyntaxNode, SyntaxTree, Walk};
pub use usage::{normalize_path, DiffReport, UsageMap};
