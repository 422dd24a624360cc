//! Error types for marking, extraction and dictionary persistence

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the marki18n core
#[derive(Debug, Error)]
pub enum Error {
    /// Source text could not be parsed into a usable syntax tree.
    /// Callers processing many files log this and skip the file.
    #[error("failed to parse {origin}: {reason}")]
    Parse { origin: String, reason: String },

    /// Configuration is missing a required field or has a malformed value.
    /// Raised before any file is touched.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// Replacement spans overlap or do not fall on character boundaries
    #[error("invalid replacement span {start}..{end}: {reason}")]
    InvalidSpan {
        start: usize,
        end: usize,
        reason: String,
    },

    /// Reading or writing a file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dictionary, usage map or ledger file holds invalid JSON
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The configuration file is not valid TOML for [`crate::Config`]
    #[error("invalid configuration file: {0}")]
    ConfigFile(#[from] toml::de::Error),
}

impl Error {
    /// Create a Parse error for a named source
    pub fn parse(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    /// Create a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only concerns a single source file
    pub fn is_parse_local(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
