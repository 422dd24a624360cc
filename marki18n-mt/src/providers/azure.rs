//! Azure Translator (v3) provider
//!
//! Requests carry a bearer token issued by the regional token service. A
//! token is valid for ten minutes; it is reused until one minute before it
//! expires and then fetched again.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;

use marki18n::AzureCredentials;

use crate::error::{MtError, MtResult};
use crate::translator::{MachineTranslator, UsageLimit, normalize_locale, validate_locale};

use super::http_client;

const TRANSLATE_URL: &str = "https://api.cognitive.microsofttranslator.com/translate";
const TOKEN_LIFETIME: Duration = Duration::from_secs(10 * 60);
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

const SUPPORTED_LANGUAGES: &[&str] = &[
    "ar", "bg", "ca", "cs", "da", "de", "el", "en", "es", "et", "fa", "fi", "fr", "he", "hi",
    "hr", "hu", "id", "it", "ja", "ko", "lt", "lv", "ms", "nb", "nl", "pl", "pt", "ro", "ru",
    "sk", "sl", "sv", "th", "tr", "uk", "ur", "vi", "zh-Hans", "zh-Hant",
];

/// A bearer token and the instant it stops being valid
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    pub fn new(value: String, issued_at: Instant) -> Self {
        Self {
            value,
            expires_at: issued_at + TOKEN_LIFETIME,
        }
    }

    /// Usable for at least `margin` after `now`
    pub fn is_fresh(&self, now: Instant, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}

#[derive(Deserialize)]
struct TranslateItem {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
struct Translation {
    text: String,
}

pub struct AzureTranslateProvider {
    credentials: AzureCredentials,
    client: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl AzureTranslateProvider {
    const MAX_BATCH_SIZE: usize = 100;
    const MAX_CHARS_PER_REQUEST: usize = 10_000;

    pub fn new(credentials: AzureCredentials) -> MtResult<Self> {
        if credentials.subscription_key.trim().is_empty() || credentials.region.trim().is_empty() {
            return Err(MtError::ConfigError(
                "Azure subscription_key and region cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            credentials,
            client: http_client()?,
            token: Mutex::new(None),
        })
    }

    pub fn from_env() -> MtResult<Self> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| {
                MtError::ConfigError(format!("{} environment variable not set", name))
            })
        };
        Self::new(AzureCredentials {
            subscription_key: var("AZURE_TRANSLATOR_KEY")?,
            region: var("AZURE_TRANSLATOR_REGION")?,
        })
    }

    /// Azure names Chinese by script
    pub fn language_code(locale: &str) -> String {
        match locale {
            "zh" | "zh-CN" | "zh-SG" | "zh-Hans" => "zh-Hans".to_string(),
            "zh-TW" | "zh-HK" | "zh-Hant" => "zh-Hant".to_string(),
            "no" => "nb".to_string(),
            other => normalize_locale(other),
        }
    }

    fn token_url(&self) -> String {
        format!(
            "https://{}.api.cognitive.microsoft.com/sts/v1.0/issueToken",
            self.credentials.region
        )
    }

    /// Cached token, or a new one when the cached one is about to expire
    async fn access_token(&self) -> MtResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Instant::now(), REFRESH_MARGIN) {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting Azure access token");
        let issued_at = Instant::now();
        let response = self
            .client
            .post(self.token_url())
            .header("Ocp-Apim-Subscription-Key", &self.credentials.subscription_key)
            .header("Content-Length", "0")
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MtError::from_status(status, &error_text));
        }

        let token = AccessToken::new(response.text().await?, issued_at);
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}

impl std::fmt::Debug for AzureTranslateProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureTranslateProvider")
            .field("credentials", &self.credentials)
            .finish()
    }
}

#[async_trait]
impl MachineTranslator for AzureTranslateProvider {
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

        let token = self.access_token().await?;
        let url = format!(
            "{}?api-version=3.0&from={}&to={}",
            TRANSLATE_URL,
            Self::language_code(source_locale),
            Self::language_code(target_locale)
        );
        let body: Vec<serde_json::Value> = texts.iter().map(|text| json!({ "Text": text })).collect();

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Ocp-Apim-Subscription-Region", &self.credentials.region)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            if status == 401 {
                // token rejected; do not reuse it
                *self.token.lock().await = None;
            }
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MtError::from_status(status, &error_text));
        }

        let items: Vec<TranslateItem> = response.json().await?;
        items
            .into_iter()
            .map(|item| {
                item.translations
                    .into_iter()
                    .next()
                    .map(|t| t.text)
                    .ok_or_else(|| MtError::QualityLow("Empty translations array".to_string()))
            })
            .collect()
    }

    fn provider_name(&self) -> &str {
        "azure"
    }

    fn supported_languages(&self) -> &[&'static str] {
        SUPPORTED_LANGUAGES
    }

    fn usage_limit(&self) -> UsageLimit {
        UsageLimit::new(Self::MAX_BATCH_SIZE, Some(Self::MAX_CHARS_PER_REQUEST))
    }

    fn supports(&self, locale: &str) -> bool {
        let code = Self::language_code(locale);
        SUPPORTED_LANGUAGES.iter().any(|supported| *supported == code)
    }
}
