//! Mock machine translator for testing
//!
//! A deterministic, API-free translator for exercising the orchestrator
//! without API keys or network access.
//!
//! # Example
//!
//! ```ignore
//! use marki18n_mt::{MachineTranslator, MockTranslator, MockMode};
//!
//! let mock = MockTranslator::new(MockMode::Suffix);
//! let result = mock.translate("你好", "zh", "en").await.unwrap();
//! assert_eq!(result, "你好_en");
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ErrorKind, MtError, MtResult};
use crate::translator::{MachineTranslator, UsageLimit};

#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append the target locale: "你好" → "你好_en". Anchors survive untouched.
    Suffix,

    /// (text, target_locale) → translation; unmapped texts fall back to `Suffix`
    Mappings(HashMap<(String, String), String>),

    /// Every call fails with this kind
    Error(ErrorKind),

    /// Return input unchanged
    NoOp,

    /// Fail any batch containing one of these texts; translate others as `Suffix`
    FailOn(HashSet<String>),

    /// Fail the first `n` calls with a network error, then behave as `Suffix`
    Flaky(usize),
}

#[derive(Debug, Clone)]
pub struct MockTranslator {
    mode: MockMode,
    name: String,
    /// Simulated network delay (in milliseconds)
    delay_ms: u64,
    limit: UsageLimit,
    calls: Arc<AtomicUsize>,
}

impl MockTranslator {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            name: "mock".to_string(),
            delay_ms: 0,
            limit: UsageLimit::new(128, None),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mode: MockMode, delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::new(mode)
        }
    }

    /// Register under another name, e.g. to stand in for a fallback provider
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_limit(mut self, limit: UsageLimit) -> Self {
        self.limit = limit;
        self
    }

    /// Number of `translate_batch` calls so far, shared between clones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn suffix(text: &str, target: &str) -> String {
        format!("{}_{}", text, target)
    }

    fn apply_translation(&self, text: &str, target: &str) -> String {
        match &self.mode {
            MockMode::Mappings(map) => map
                .get(&(text.to_string(), target.to_string()))
                .cloned()
                .unwrap_or_else(|| Self::suffix(text, target)),
            MockMode::NoOp => text.to_string(),
            _ => Self::suffix(text, target),
        }
    }
}

fn mock_error(kind: ErrorKind, message: String) -> MtError {
    match kind {
        ErrorKind::NetworkError => MtError::NetworkError(message),
        ErrorKind::RateLimit => MtError::RateLimit(message),
        ErrorKind::AuthError => MtError::AuthError(message),
        ErrorKind::QualityLow => MtError::QualityLow(message),
        ErrorKind::ConfigError | ErrorKind::StoreError => MtError::ConfigError(message),
    }
}

#[async_trait]
impl MachineTranslator for MockTranslator {
    async fn translate_batch(
        &self,
        texts: &[String],
        _source_locale: &str,
        target_locale: &str,
    ) -> MtResult<Vec<String>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        if texts.len() > self.limit.max_items {
            return Err(MtError::ConfigError(format!(
                "{} texts exceed the limit of {} per request",
                texts.len(),
                self.limit.max_items
            )));
        }

        match &self.mode {
            MockMode::Error(kind) => {
                return Err(mock_error(*kind, "simulated failure".to_string()));
            }
            MockMode::FailOn(failing) => {
                if let Some(text) = texts.iter().find(|text| failing.contains(*text)) {
                    return Err(MtError::NetworkError(format!("simulated failure on '{}'", text)));
                }
            }
            MockMode::Flaky(failures) if call < *failures => {
                return Err(MtError::NetworkError(format!(
                    "simulated failure {} of {}",
                    call + 1,
                    failures
                )));
            }
            _ => {}
        }

        Ok(texts
            .iter()
            .map(|text| self.apply_translation(text, target_locale))
            .collect())
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn supported_languages(&self) -> &[&'static str] {
        &[]
    }

    fn usage_limit(&self) -> UsageLimit {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_suffix() {
        let mock = MockTranslator::new(MockMode::Suffix);
        let results = mock.translate_batch(&texts(&["你好", "_ID1_好"]), "zh", "en").await.unwrap();
        assert_eq!(results, vec!["你好_en", "_ID1_好_en"]);
        assert_eq!(mock.translate("你好", "zh", "ja").await.unwrap(), "你好_ja");
    }

    #[tokio::test]
    async fn test_mappings_with_fallback() {
        let mut map = HashMap::new();
        map.insert(("你好世界".to_string(), "en".to_string()), "Hello world".to_string());
        let mock = MockTranslator::new(MockMode::Mappings(map));

        let results = mock.translate_batch(&texts(&["你好世界", "再见"]), "zh", "en").await.unwrap();
        assert_eq!(results, vec!["Hello world", "再见_en"]);
    }

    #[tokio::test]
    async fn test_error_kinds() {
        let mock = MockTranslator::new(MockMode::Error(ErrorKind::AuthError));
        let err = mock.translate("你好", "zh", "en").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthError);
    }

    #[tokio::test]
    async fn test_fail_on() {
        let failing: HashSet<String> = ["坏"].iter().map(|s| s.to_string()).collect();
        let mock = MockTranslator::new(MockMode::FailOn(failing));
        assert!(mock.translate_batch(&texts(&["好", "坏"]), "zh", "en").await.is_err());
        assert!(mock.translate_batch(&texts(&["好"]), "zh", "en").await.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_batches_over_limit() {
        let mock = MockTranslator::new(MockMode::Suffix).with_limit(UsageLimit::new(2, None));
        let err = mock
            .translate_batch(&texts(&["一", "二", "三"]), "zh", "en")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
        assert!(mock.translate_batch(&texts(&["一", "二"]), "zh", "en").await.is_ok());
    }

    #[tokio::test]
    async fn test_flaky_recovers() {
        let mock = MockTranslator::new(MockMode::Flaky(2));
        let shared = mock.clone();
        assert!(mock.translate("你好", "zh", "en").await.is_err());
        assert!(mock.translate("你好", "zh", "en").await.is_err());
        assert_eq!(mock.translate("你好", "zh", "en").await.unwrap(), "你好_en");
        assert_eq!(shared.calls(), 3);
    }

    #[tokio::test]
    async fn test_noop_and_name() {
        let mock = MockTranslator::new(MockMode::NoOp).named("backup");
        assert_eq!(mock.translate("你好", "zh", "en").await.unwrap(), "你好");
        assert_eq!(mock.provider_name(), "backup");
        assert!(mock.supports("tlh"));
    }
}
