//! Resolved configuration shared by marking, extraction, reconciliation and translation
//!
//! Configuration is read from TOML. Every field has a default, so an empty
//! file is a valid configuration:
//!
//! ```toml
//! tag_name = "t"
//! ignore_annotation = "i18n-ignore"
//! import_binding = "import { t } from '@/i18n';"
//! source_language = "zh"
//! target_languages = ["en", "ja"]
//! output_dir = "locales"
//!
//! [placeholder]
//! open = "{"
//! close = "}"
//!
//! [translate]
//! provider = "tencent"
//! fallback_providers = ["google"]
//! max_retries = 3
//! ```

use std::path::{Path, PathBuf};

use icu_locale::Locale;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::normalize::PlaceholderStyle;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identifier used as the tagged-template marker, e.g. `t` in `` t`你好` ``
    pub tag_name: String,
    /// Comment body that excludes the following node from marking
    pub ignore_annotation: String,
    /// Element attributes that are never marked
    pub ignore_attribute_names: Vec<String>,
    /// Statement inserted at the top of a marked file when `tag_name` is not bound
    pub import_binding: Option<String>,
    /// Regex deciding whether a string contains target-script text
    pub detect_pattern: String,
    pub placeholder: PlaceholderStyle,
    pub source_language: String,
    pub target_languages: Vec<String>,
    /// Directory holding `<lang>.json`, the usage map and the ledger
    pub output_dir: PathBuf,
    /// Usage map file name, without extension
    pub file_mapping: String,
    /// Translation ledger file name, without extension
    pub translate_mapping: String,
    /// Usage map paths are stored relative to this directory
    pub root_dir: PathBuf,
    /// Drop keys from dictionaries once no file references them
    pub auto_remove_key: bool,
    /// Overwrite existing values (source dictionary resets, re-translation)
    pub force_update: bool,
    pub translate: TranslateConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tag_name: "t".to_string(),
            ignore_annotation: "i18n-ignore".to_string(),
            ignore_attribute_names: ["class", "className", "style", "id", "key", "src", "href"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            import_binding: None,
            detect_pattern: r"\p{Han}".to_string(),
            placeholder: PlaceholderStyle::default(),
            source_language: "zh".to_string(),
            target_languages: vec!["en".to_string()],
            output_dir: PathBuf::from("locales"),
            file_mapping: "fileMapping".to_string(),
            translate_mapping: "translateMapping".to_string(),
            root_dir: PathBuf::from("."),
            auto_remove_key: true,
            force_update: false,
            translate: TranslateConfig::default(),
        }
    }
}

/// Translation provider selection, pacing and credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Primary provider name (`google`, `tencent`, `azure`, `mock`); `None` disables translation
    pub provider: Option<String>,
    /// Providers tried once after the primary exhausts its retries
    pub fallback_providers: Vec<String>,
    /// Attempts per batch and provider
    pub max_retries: u32,
    /// Base delay between attempts; attempt `n` waits `n * retry_delay_ms`
    pub retry_delay_ms: u64,
    /// Pause between consecutive batches
    pub batch_delay_ms: u64,
    /// Upper bound on items per request, below the provider's own limit
    pub batch_size: Option<usize>,
    pub google: Option<GoogleCredentials>,
    pub tencent: Option<TencentCredentials>,
    pub azure: Option<AzureCredentials>,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            provider: None,
            fallback_providers: Vec::new(),
            max_retries: 3,
            retry_delay_ms: 1000,
            batch_delay_ms: 200,
            batch_size: None,
            google: None,
            tencent: None,
            azure: None,
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleCredentials {
    pub api_key: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TencentCredentials {
    pub secret_id: String,
    pub secret_key: String,
    #[serde(default = "default_tencent_region")]
    pub region: String,
    #[serde(default)]
    pub project_id: i64,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AzureCredentials {
    pub subscription_key: String,
    pub region: String,
}

fn default_tencent_region() -> String {
    "ap-guangzhou".to_string()
}

macro_rules! masked_debug {
    ($ty:ident { $($field:ident),* } secret { $($secret:ident),* }) => {
        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ty))
                    $(.field(stringify!($field), &self.$field))*
                    $(.field(stringify!($secret), &"***"))*
                    .finish()
            }
        }
    };
}

masked_debug!(GoogleCredentials {} secret { api_key });
masked_debug!(TencentCredentials { secret_id, region, project_id } secret { secret_key });
masked_debug!(AzureCredentials { region } secret { subscription_key });

impl Config {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::from_toml_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field that later stages rely on.
    ///
    /// Validation failures are fatal: callers must not touch any file when
    /// this returns an error.
    pub fn validate(&self) -> Result<()> {
        if !is_identifier_path(&self.tag_name) {
            return Err(Error::validation(format!(
                "tag_name '{}' is not an identifier",
                self.tag_name
            )));
        }
        if self.ignore_annotation.trim().is_empty() {
            return Err(Error::validation("ignore_annotation must not be empty"));
        }
        Regex::new(&self.detect_pattern).map_err(|e| {
            Error::validation(format!(
                "detect_pattern '{}' is not a valid regex: {}",
                self.detect_pattern, e
            ))
        })?;
        self.placeholder.validate()?;

        validate_language(&self.source_language)?;
        if self.target_languages.is_empty() {
            return Err(Error::validation("target_languages must not be empty"));
        }
        for lang in &self.target_languages {
            validate_language(lang)?;
            if lang == &self.source_language {
                return Err(Error::validation(format!(
                    "source language '{}' is also listed as a target",
                    lang
                )));
            }
        }

        for (field, value) in [
            ("file_mapping", &self.file_mapping),
            ("translate_mapping", &self.translate_mapping),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(format!("{} must not be empty", field)));
            }
        }

        if self.translate.max_retries == 0 {
            return Err(Error::validation("translate.max_retries must be at least 1"));
        }
        if self.translate.batch_size == Some(0) {
            return Err(Error::validation("translate.batch_size must be at least 1"));
        }
        Ok(())
    }

    /// Source language followed by every target language
    pub fn languages(&self) -> Vec<String> {
        let mut languages = vec![self.source_language.clone()];
        languages.extend(self.target_languages.iter().cloned());
        languages
    }

    pub fn dictionary_path(&self, language: &str) -> PathBuf {
        self.output_dir.join(format!("{}.json", language))
    }

    pub fn usage_map_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", self.file_mapping))
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", self.translate_mapping))
    }
}

/// `t`, `i18n.t`, `$t` are accepted; `t()`, `1t`, `a..b` are not
fn is_identifier_path(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
                    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
                }
                _ => false,
            }
        })
}

fn validate_language(code: &str) -> Result<()> {
    code.parse::<Locale>()
        .map(|_| ())
        .map_err(|e| Error::validation(format!("'{}' is not a valid language code: {:?}", code, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.languages(), vec!["zh", "en"]);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_toml_overrides() {
        let config = Config::from_toml_str(
            r#"
            tag_name = "i18n.t"
            target_languages = ["en", "ja"]
            output_dir = "i18n"

            [placeholder]
            open = "{{"
            close = "}}"

            [translate]
            provider = "mock"
            max_retries = 2

            [translate.tencent]
            secret_id = "id"
            secret_key = "key"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.tag_name, "i18n.t");
        assert_eq!(config.placeholder.open, "{{");
        assert_eq!(config.translate.max_retries, 2);
        assert_eq!(config.translate.tencent.as_ref().unwrap().region, "ap-guangzhou");
        assert_eq!(config.dictionary_path("ja"), PathBuf::from("i18n/ja.json"));
        assert_eq!(config.usage_map_path(), PathBuf::from("i18n/fileMapping.json"));
        assert_eq!(
            config.ledger_path(),
            PathBuf::from("i18n/translateMapping.json")
        );
    }

    #[test]
    fn test_invalid_tag_name() {
        for name in ["", "t()", "1t", "i18n..t"] {
            let config = Config {
                tag_name: name.to_string(),
                ..Config::default()
            };
            assert!(
                matches!(config.validate(), Err(Error::Validation(_))),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_invalid_detect_pattern() {
        let config = Config {
            detect_pattern: "[".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_placeholder() {
        let mut config = Config::default();
        config.placeholder.close = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.placeholder.open = "x".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_languages() {
        let config = Config {
            target_languages: vec!["zh".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            target_languages: vec!["not a locale".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            target_languages: vec![],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_are_masked() {
        let creds = TencentCredentials {
            secret_id: "AKID".to_string(),
            secret_key: "super-secret".to_string(),
            region: "ap-beijing".to_string(),
            project_id: 0,
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("AKID"));
        assert!(debug.contains("***"));
        assert!(!debug.contains("super-secret"));
    }
}
