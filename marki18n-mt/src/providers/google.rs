//! Google Translate API v2 provider
//!
//! # Authentication
//!
//! An API key from the `[translate.google]` config table, or the
//! `GOOGLE_TRANSLATE_API_KEY` environment variable. Obtain a key from:
//! https://console.cloud.google.com/
//!
//! # Example
//!
//! ```ignore
//! use marki18n_mt::{GoogleTranslateProvider, MachineTranslator};
//!
//! let provider = GoogleTranslateProvider::from_env()?;
//! let results = provider.translate_batch(&texts, "zh", "en").await?;
//! ```

use async_trait::async_trait;
use serde_json::json;

use crate::error::{MtError, MtResult};
use crate::translator::{MachineTranslator, UsageLimit, normalize_locale, validate_locale};

use super::http_client;

const SUPPORTED_LANGUAGES: &[&str] = &[
    "af", "ar", "bg", "bn", "ca", "cs", "da", "de", "el", "en", "es", "et", "fa", "fi", "fr",
    "he", "hi", "hr", "hu", "id", "it", "ja", "ko", "lt", "lv", "ms", "nl", "no", "pl", "pt",
    "ro", "ru", "sk", "sl", "sr", "sv", "sw", "ta", "th", "tl", "tr", "uk", "ur", "vi", "zh",
    "zh-CN", "zh-TW",
];

#[derive(Clone)]
pub struct GoogleTranslateProvider {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslateProvider {
    /// Google Translate v2 accepts up to 128 texts per request
    const MAX_BATCH_SIZE: usize = 128;

    /// Recommended upper bound on characters per request
    const MAX_CHARS_PER_REQUEST: usize = 30_000;

    pub fn new(api_key: String) -> MtResult<Self> {
        if api_key.trim().is_empty() {
            return Err(MtError::ConfigError("API key cannot be empty".to_string()));
        }

        Ok(Self {
            api_key,
            client: http_client()?,
            base_url: "https://translation.googleapis.com/language/translate/v2".to_string(),
        })
    }

    /// Create a provider from the `GOOGLE_TRANSLATE_API_KEY` environment variable
    pub fn from_env() -> MtResult<Self> {
        let api_key = std::env::var("GOOGLE_TRANSLATE_API_KEY").map_err(|_| {
            MtError::ConfigError(
                "GOOGLE_TRANSLATE_API_KEY environment variable not set".to_string(),
            )
        })?;

        Self::new(api_key)
    }

    /// Google spells Chinese variants with a region
    pub fn language_code(locale: &str) -> String {
        match locale {
            "zh" | "zh-Hans" | "zh-CN" | "zh-SG" => "zh-CN".to_string(),
            "zh-Hant" | "zh-TW" | "zh-HK" => "zh-TW".to_string(),
            other => normalize_locale(other),
        }
    }

    fn chunk_batch(texts: &[String]) -> Vec<&[String]> {
        texts.chunks(Self::MAX_BATCH_SIZE).collect()
    }

    async fn translate_chunk(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<Vec<String>> {
        let url = format!("{}?key={}", self.base_url, self.api_key);
        let body = json!({
            "q": texts,
            "source": Self::language_code(source_locale),
            "target": Self::language_code(target_locale),
            "format": "text"
        });

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MtError::from_status(status, &error_text));
        }

        let json: serde_json::Value = response.json().await?;

        let translations = json["data"]["translations"].as_array().ok_or_else(|| {
            MtError::QualityLow("Invalid API response: missing 'data.translations' array".to_string())
        })?;

        translations
            .iter()
            .map(|t| {
                t["translatedText"]
                    .as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| {
                        MtError::QualityLow(
                            "Invalid API response: missing 'translatedText' field".to_string(),
                        )
                    })
            })
            .collect()
    }
}

impl std::fmt::Debug for GoogleTranslateProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTranslateProvider")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl MachineTranslator for GoogleTranslateProvider {
    async fn translate_batch(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<Vec<String>> {
        validate_locale(source_locale)?;
        validate_locale(target_locale)?;

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_results = Vec::with_capacity(texts.len());
        for chunk in Self::chunk_batch(texts) {
            let chunk_results = self
                .translate_chunk(chunk, source_locale, target_locale)
                .await?;
            all_results.extend(chunk_results);
        }
        Ok(all_results)
    }

    fn provider_name(&self) -> &str {
        "google"
    }

    fn supported_languages(&self) -> &[&'static str] {
        SUPPORTED_LANGUAGES
    }

    fn usage_limit(&self) -> UsageLimit {
        UsageLimit::new(Self::MAX_BATCH_SIZE, Some(Self::MAX_CHARS_PER_REQUEST))
    }
}
