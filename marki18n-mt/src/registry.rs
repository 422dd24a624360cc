//! Provider registry
//!
//! Providers are looked up by name. The registry also knows which one is
//! primary and which are fallbacks, in configured order.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use marki18n::TranslateConfig;

use crate::error::{MtError, MtResult};
use crate::providers::{
    AzureTranslateProvider, GoogleTranslateProvider, MockMode, MockTranslator,
    TencentTranslateProvider,
};
use crate::translator::MachineTranslator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Google,
    Tencent,
    Azure,
    Mock,
}

impl FromStr for ProviderKind {
    type Err = MtError;

    fn from_str(name: &str) -> MtResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(ProviderKind::Google),
            "tencent" => Ok(ProviderKind::Tencent),
            "azure" => Ok(ProviderKind::Azure),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(MtError::ConfigError(format!(
                "Unknown translation provider '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Google => "google",
            ProviderKind::Tencent => "tencent",
            ProviderKind::Azure => "azure",
            ProviderKind::Mock => "mock",
        };
        f.write_str(name)
    }
}

impl ProviderKind {
    /// Build a provider from configured credentials, falling back to the
    /// provider's environment variables
    pub fn build(self, config: &TranslateConfig) -> MtResult<Arc<dyn MachineTranslator>> {
        let provider: Arc<dyn MachineTranslator> = match self {
            ProviderKind::Google => Arc::new(match &config.google {
                Some(creds) => GoogleTranslateProvider::new(creds.api_key.clone())?,
                None => GoogleTranslateProvider::from_env()?,
            }),
            ProviderKind::Tencent => Arc::new(match &config.tencent {
                Some(creds) => TencentTranslateProvider::new(creds.clone())?,
                None => TencentTranslateProvider::from_env()?,
            }),
            ProviderKind::Azure => Arc::new(match &config.azure {
                Some(creds) => AzureTranslateProvider::new(creds.clone())?,
                None => AzureTranslateProvider::from_env()?,
            }),
            ProviderKind::Mock => Arc::new(MockTranslator::new(MockMode::Suffix)),
        };
        Ok(provider)
    }
}

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn MachineTranslator>>,
    primary: Option<String>,
    fallbacks: Vec<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the provider every batch goes to first
    pub fn with_primary(mut self, provider: Arc<dyn MachineTranslator>) -> Self {
        let name = provider.provider_name().to_string();
        self.providers.insert(name.clone(), provider);
        self.primary = Some(name);
        self
    }

    /// Register a fallback, tried after the ones registered before it
    pub fn with_fallback(mut self, provider: Arc<dyn MachineTranslator>) -> Self {
        let name = provider.provider_name().to_string();
        self.providers.insert(name.clone(), provider);
        if !self.fallbacks.contains(&name) {
            self.fallbacks.push(name);
        }
        self
    }

    /// Build the configured primary and fallback providers.
    ///
    /// With no provider configured the registry is empty and translation is
    /// disabled.
    pub fn from_config(config: &TranslateConfig) -> MtResult<Self> {
        let mut registry = Self::new();
        if let Some(primary) = &config.provider {
            let kind: ProviderKind = primary.parse()?;
            registry = registry.with_primary(kind.build(config)?);
            debug!("Primary translation provider: {}", kind);
        }
        for name in &config.fallback_providers {
            let kind: ProviderKind = name.parse()?;
            registry = registry.with_fallback(kind.build(config)?);
            debug!("Fallback translation provider: {}", kind);
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn MachineTranslator>> {
        self.providers.get(name).cloned()
    }

    pub fn primary(&self) -> Option<Arc<dyn MachineTranslator>> {
        self.primary.as_deref().and_then(|name| self.get(name))
    }

    /// First fallback that is not `failed`
    pub fn fallback_for(&self, failed: &str) -> Option<Arc<dyn MachineTranslator>> {
        self.fallbacks
            .iter()
            .find(|name| name.as_str() != failed)
            .and_then(|name| self.get(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.providers.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("primary", &self.primary)
            .field("fallbacks", &self.fallbacks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marki18n::TencentCredentials;

    #[test]
    fn test_provider_kind_names() {
        for name in ["google", "tencent", "azure", "mock"] {
            let kind: ProviderKind = name.parse().unwrap();
            assert_eq!(kind.to_string(), name);
        }
        assert_eq!("Tencent".parse::<ProviderKind>().unwrap(), ProviderKind::Tencent);
        assert!(matches!(
            "deepl".parse::<ProviderKind>(),
            Err(MtError::ConfigError(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let config = TranslateConfig {
            provider: Some("tencent".to_string()),
            fallback_providers: vec!["mock".to_string()],
            tencent: Some(TencentCredentials {
                secret_id: "id".to_string(),
                secret_key: "key".to_string(),
                region: "ap-guangzhou".to_string(),
                project_id: 0,
            }),
            ..TranslateConfig::default()
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.primary().unwrap().provider_name(), "tencent");
        assert_eq!(registry.fallback_for("tencent").unwrap().provider_name(), "mock");
        assert!(registry.fallback_for("mock").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["mock", "tencent"]);
    }

    #[test]
    fn test_no_provider_configured() {
        let registry = ProviderRegistry::from_config(&TranslateConfig::default()).unwrap();
        assert!(registry.is_empty());
        assert!(registry.primary().is_none());
    }

    #[test]
    fn test_fallback_skips_failed_provider() {
        let registry = ProviderRegistry::new()
            .with_primary(Arc::new(MockTranslator::new(MockMode::Suffix).named("a")))
            .with_fallback(Arc::new(MockTranslator::new(MockMode::Suffix).named("a")))
            .with_fallback(Arc::new(MockTranslator::new(MockMode::NoOp).named("b")));
        assert_eq!(registry.fallback_for("a").unwrap().provider_name(), "b");
        assert_eq!(registry.fallback_for("c").unwrap().provider_name(), "a");
    }
}
