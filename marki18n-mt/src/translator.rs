//! Machine translation trait and locale helpers
//!
//! `MachineTranslator` is the seam between the orchestrator and a provider
//! backend (Google, Tencent, Azure, mock). Providers report which languages
//! they accept and how large a single request may be; the orchestrator plans
//! its batches from that.
//!
//! # Example
//!
//! ```ignore
//! use marki18n_mt::{MachineTranslator, GoogleTranslateProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = GoogleTranslateProvider::from_env()?;
//!
//!     let result = provider.translate("你好世界", "zh", "en").await?;
//!     println!("{}", result); // "Hello world"
//!
//!     let texts = vec!["你好".to_string(), "再见".to_string()];
//!     let results = provider.translate_batch(&texts, "zh", "en").await?;
//!     println!("{:?}", results);
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use icu_locale::Locale;

use crate::error::{MtError, MtResult};

/// Size bounds of a single provider request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageLimit {
    /// Texts per request
    pub max_items: usize,
    /// Total characters per request, when the provider bounds it
    pub max_chars: Option<usize>,
}

impl UsageLimit {
    pub fn new(max_items: usize, max_chars: Option<usize>) -> Self {
        Self {
            max_items: max_items.max(1),
            max_chars,
        }
    }

    /// Lower `max_items` to a configured batch size; never raises it
    pub fn with_batch_size(self, batch_size: Option<usize>) -> Self {
        match batch_size {
            Some(size) => Self::new(self.max_items.min(size), self.max_chars),
            None => self,
        }
    }
}

/// Generic trait for machine translation providers
///
/// All methods are async to support I/O-bound operations like network requests.
#[async_trait]
pub trait MachineTranslator: Send + Sync {
    /// Translate multiple strings in one request
    ///
    /// # Guarantees
    ///
    /// - Output order matches input order
    /// - Output length equals input length, or the call fails
    async fn translate_batch(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<Vec<String>>;

    /// Translate a single text string from source to target locale
    async fn translate(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String> {
        let results = self
            .translate_batch(&[text.to_string()], source_locale, target_locale)
            .await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| MtError::QualityLow("provider returned no translation".to_string()))
    }

    /// Name used in logs and run reports
    fn provider_name(&self) -> &str;

    /// Language codes this provider accepts, in the provider's own spelling.
    /// An empty list means any language.
    fn supported_languages(&self) -> &[&'static str];

    fn usage_limit(&self) -> UsageLimit;

    /// Whether `locale` (or its base language) is accepted
    fn supports(&self, locale: &str) -> bool {
        let supported = self.supported_languages();
        let base = normalize_locale(locale);
        supported.is_empty() || supported.iter().any(|code| *code == locale || *code == base)
    }
}

/// Normalize a locale code by stripping script and region information
///
/// - `en-US` → `en`
/// - `zh-Hans` → `zh`
/// - `EN` → `en`
pub fn normalize_locale(locale: &str) -> String {
    locale
        .split(['-', '_'])
        .next()
        .unwrap_or(locale)
        .to_lowercase()
}

/// Validate that a locale code is a well-formed BCP 47 tag
pub fn validate_locale(locale: &str) -> MtResult<()> {
    if locale.is_empty() {
        return Err(MtError::ConfigError("Locale code is empty".to_string()));
    }
    locale
        .replace('_', "-")
        .parse::<Locale>()
        .map(|_| ())
        .map_err(|e| MtError::ConfigError(format!("Invalid locale code '{}': {:?}", locale, e)))
}
