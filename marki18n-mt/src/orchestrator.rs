//! Translation orchestrator
//!
//! Drives keys through the configured providers and keeps the ledger and the
//! language dictionaries in step:
//!
//! 1. per target language, pick the keys the ledger has no translation for
//!    (every key under `force_update`)
//! 2. anchor placeholders and split the texts into batches that fit the
//!    primary provider's usage limit
//! 3. per batch, try the primary with retries, then one fallback (re-planned
//!    against the fallback's own limit); a batch that fails everywhere keeps
//!    its original text
//! 4. record successes in the ledger and sync them into the dictionaries
//!
//! A dictionary value is only replaced when the key is missing, still holds
//! the untranslated key itself, or `force_update` is set. Values edited by a
//! person are otherwise left alone.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use marki18n::{Config, Dictionary, TranslationLedger};

use crate::batch::{check_quality, plan_batches};
use crate::error::{MtError, MtResult};
use crate::placeholder::{AnchoredText, Anchorer, restore};
use crate::registry::ProviderRegistry;
use crate::translator::MachineTranslator;

const PRIMARY_CONFIDENCE: f32 = 1.0;
const FALLBACK_CONFIDENCE: f32 = 0.8;
const UNTRANSLATED_PROVIDER: &str = "none";

/// What happened to one key in one language
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationOutcome {
    pub key: String,
    pub language: String,
    pub text: String,
    pub provider: String,
    /// 1.0 from the primary, lower from a fallback, 0.0 when untranslated
    pub confidence: f32,
}

impl TranslationOutcome {
    /// The original text standing in for a failed translation
    pub fn is_untranslated(&self) -> bool {
        self.confidence == 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranslationReport {
    pub outcomes: Vec<TranslationOutcome>,
    /// (key, language) pairs left untranslated, to be retried on the next run
    pub failed: Vec<(String, String)>,
}

impl TranslationReport {
    pub fn translated_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_untranslated()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Persist {
    PerBatch,
    PerPass,
}

struct BatchItem {
    key: String,
    source: String,
    anchored: AnchoredText,
}

pub struct TranslationOrchestrator {
    config: Config,
    registry: ProviderRegistry,
    anchorer: Anchorer,
    ledger: Mutex<TranslationLedger>,
    write_guard: Arc<Mutex<()>>,
}

impl TranslationOrchestrator {
    /// Load the ledger from `config.output_dir` and use `registry` for requests
    pub fn new(config: Config, registry: ProviderRegistry) -> MtResult<Self> {
        let ledger = TranslationLedger::load(&config.ledger_path())?;
        let anchorer = Anchorer::new(&config.placeholder)?;
        Ok(Self {
            config,
            registry,
            anchorer,
            ledger: Mutex::new(ledger),
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    /// Build providers from the `[translate]` section
    pub fn from_config(config: Config) -> MtResult<Self> {
        let registry = ProviderRegistry::from_config(&config.translate)?;
        Self::new(config, registry)
    }

    /// Share a write guard with other writers of the output directory
    pub fn with_write_guard(mut self, write_guard: Arc<Mutex<()>>) -> Self {
        self.write_guard = write_guard;
        self
    }

    pub fn write_guard(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.write_guard)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Snapshot of the in-memory ledger
    pub async fn ledger(&self) -> TranslationLedger {
        self.ledger.lock().await.clone()
    }

    /// Translate `keys`, persisting after every batch
    pub async fn translate_keys(&self, keys: &[String]) -> MtResult<TranslationReport> {
        self.run(keys, Persist::PerBatch).await
    }

    /// Translate every key of the source dictionary, persisting once at the end
    pub async fn translate_project(&self) -> MtResult<TranslationReport> {
        let source = Dictionary::load(&self.config.dictionary_path(&self.config.source_language))?;
        let keys: Vec<String> = source.keys().cloned().collect();
        self.run(&keys, Persist::PerPass).await
    }

    async fn run(&self, keys: &[String], persist: Persist) -> MtResult<TranslationReport> {
        let mut report = TranslationReport::default();
        if keys.is_empty() {
            return Ok(report);
        }
        let Some(primary) = self.registry.primary() else {
            warn!("No translation provider configured, {} key(s) left as is", keys.len());
            return Ok(report);
        };

        let source_language = &self.config.source_language;
        let source_dictionary = Dictionary::load(&self.config.dictionary_path(source_language))?;
        let source_text = |key: &str| source_dictionary.get(key).unwrap_or(key).to_string();

        {
            let mut ledger = self.ledger.lock().await;
            for key in keys {
                ledger.record_source(key, source_language, &source_text(key));
            }
        }

        let limit = primary
            .usage_limit()
            .with_batch_size(self.config.translate.batch_size);
        let batch_delay = Duration::from_millis(self.config.translate.batch_delay_ms);
        let mut first_batch = true;

        for language in &self.config.target_languages {
            let items: Vec<BatchItem> = {
                let ledger = self.ledger.lock().await;
                keys.iter()
                    .filter(|key| self.config.force_update || !ledger.is_translated(key, language))
                    .map(|key| {
                        let source = source_text(key);
                        BatchItem {
                            key: key.clone(),
                            anchored: self.anchorer.anchor(&source),
                            source,
                        }
                    })
                    .collect()
            };
            if items.is_empty() {
                debug!("{}: nothing to translate", language);
                continue;
            }

            let texts: Vec<String> = items.iter().map(|item| item.anchored.text.clone()).collect();
            let batches = plan_batches(&texts, limit);
            info!(
                "Translating {} key(s) into {} in {} batch(es) with {}",
                items.len(),
                language,
                batches.len(),
                primary.provider_name()
            );

            for range in batches {
                if !first_batch && !batch_delay.is_zero() {
                    tokio::time::sleep(batch_delay).await;
                }
                first_batch = false;

                let outcomes = self
                    .translate_batch(&primary, &items[range], language)
                    .await;
                {
                    let mut ledger = self.ledger.lock().await;
                    for outcome in outcomes.iter().filter(|o| !o.is_untranslated()) {
                        ledger.record(&outcome.key, language, &outcome.text);
                    }
                }
                for outcome in outcomes.iter().filter(|o| o.is_untranslated()) {
                    report.failed.push((outcome.key.clone(), language.clone()));
                }
                if persist == Persist::PerBatch {
                    self.sync_to_language_files(&outcomes).await?;
                }
                report.outcomes.extend(outcomes);
            }
        }

        match persist {
            Persist::PerPass => self.sync_to_language_files(&report.outcomes).await?,
            // source texts recorded above
            Persist::PerBatch => self.sync_to_language_files(&[]).await?,
        }

        info!(
            "Translation finished: {} translated, {} failed",
            report.translated_count(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Primary with retries, then one fallback, then the original texts.
    ///
    /// The fallback gets the batch re-planned against its own usage limit.
    async fn translate_batch(
        &self,
        primary: &Arc<dyn MachineTranslator>,
        items: &[BatchItem],
        language: &str,
    ) -> Vec<TranslationOutcome> {
        match self.attempt(primary.as_ref(), items, language).await {
            Ok(texts) => {
                return translated(items, texts, primary.as_ref(), language, PRIMARY_CONFIDENCE);
            }
            Err(e) => warn!(
                "{} failed on {} key(s) into {}: [{}] {}",
                primary.provider_name(),
                items.len(),
                language,
                e.kind(),
                e
            ),
        }

        let Some(fallback) = self.registry.fallback_for(primary.provider_name()) else {
            return untranslated(items, language);
        };
        let limit = fallback
            .usage_limit()
            .with_batch_size(self.config.translate.batch_size);
        let texts: Vec<String> = items.iter().map(|item| item.anchored.text.clone()).collect();

        let mut outcomes = Vec::with_capacity(items.len());
        for range in plan_batches(&texts, limit) {
            let chunk = &items[range];
            match self.attempt(fallback.as_ref(), chunk, language).await {
                Ok(texts) => outcomes.extend(translated(
                    chunk,
                    texts,
                    fallback.as_ref(),
                    language,
                    FALLBACK_CONFIDENCE,
                )),
                Err(e) => {
                    warn!(
                        "{} failed on {} key(s) into {}: [{}] {}",
                        fallback.provider_name(),
                        chunk.len(),
                        language,
                        e.kind(),
                        e
                    );
                    outcomes.extend(untranslated(chunk, language));
                }
            }
        }
        outcomes
    }

    /// Up to `max_retries` attempts with one provider; attempt `n` is
    /// followed by a pause of `n * retry_delay`
    async fn attempt(
        &self,
        provider: &dyn MachineTranslator,
        items: &[BatchItem],
        language: &str,
    ) -> MtResult<Vec<String>> {
        if !provider.supports(language) {
            return Err(MtError::ConfigError(format!(
                "{} does not support '{}'",
                provider.provider_name(),
                language
            )));
        }

        let texts: Vec<String> = items.iter().map(|item| item.anchored.text.clone()).collect();
        let max_retries = self.config.translate.max_retries.max(1);
        let retry_delay = Duration::from_millis(self.config.translate.retry_delay_ms);
        let mut attempt = 1;

        loop {
            let result: MtResult<Vec<String>> = match provider
                .translate_batch(&texts, &self.config.source_language, language)
                .await
            {
                Ok(outputs) => check_quality(&texts, &outputs).and_then(|_| {
                    items
                        .iter()
                        .zip(&outputs)
                        .map(|(item, output)| restore(output, &item.anchored))
                        .collect()
                }),
                Err(e) => Err(e),
            };

            match result {
                Ok(translated) => return Ok(translated),
                Err(e) if !e.is_retryable() || attempt >= max_retries => return Err(e),
                Err(e) => {
                    debug!(
                        "{} attempt {}/{} failed: {}",
                        provider.provider_name(),
                        attempt,
                        max_retries,
                        e
                    );
                    tokio::time::sleep(retry_delay * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Persist the ledger and write `outcomes` into their dictionaries.
    ///
    /// Untranslated outcomes only fill keys that are missing.
    pub async fn sync_to_language_files(&self, outcomes: &[TranslationOutcome]) -> MtResult<()> {
        let _guard = self.write_guard.lock().await;
        self.ledger.lock().await.save(&self.config.ledger_path())?;

        let mut by_language: BTreeMap<&str, Vec<&TranslationOutcome>> = BTreeMap::new();
        for outcome in outcomes {
            by_language.entry(outcome.language.as_str()).or_default().push(outcome);
        }

        for (language, outcomes) in by_language {
            let path = self.config.dictionary_path(language);
            let mut dictionary = Dictionary::load(&path)?;
            let mut changed = false;

            for outcome in outcomes {
                if outcome.is_untranslated() {
                    changed |= dictionary.insert_if_absent(&outcome.key, &outcome.text);
                    continue;
                }
                let replace = self.config.force_update
                    || match dictionary.get(&outcome.key) {
                        None => true,
                        Some(value) => value == outcome.key,
                    };
                if replace {
                    changed |= dictionary.set(&outcome.key, &outcome.text);
                }
            }

            if changed {
                dictionary.save(&path)?;
                debug!("Wrote {}", path.display());
            }
        }
        Ok(())
    }

    /// Rewrite every dictionary from the ledger.
    ///
    /// Each key of the source dictionary gets the ledger's text, else the
    /// dictionary's current value, else the key itself; keys the source
    /// dictionary no longer has are dropped. Returns the languages written.
    pub async fn force_refresh_language_files(&self) -> MtResult<Vec<String>> {
        let _guard = self.write_guard.lock().await;
        let ledger = self.ledger.lock().await;

        let source = Dictionary::load(&self.config.dictionary_path(&self.config.source_language))?;
        let mut keys: BTreeSet<String> = source.keys().cloned().collect();
        if keys.is_empty() {
            keys = ledger.keys().cloned().collect();
        }

        let mut written = Vec::new();
        for language in self.config.languages() {
            let path = self.config.dictionary_path(&language);
            let mut dictionary = Dictionary::load(&path)?;
            let mut changed = false;

            let stale: Vec<String> = dictionary
                .keys()
                .filter(|key| !keys.contains(*key))
                .cloned()
                .collect();
            for key in stale {
                changed |= dictionary.remove(&key);
            }

            for key in &keys {
                let value = ledger
                    .get(key, &language)
                    .or_else(|| dictionary.get(key))
                    .unwrap_or(key)
                    .to_string();
                changed |= dictionary.set(key, &value);
            }

            if changed {
                dictionary.save(&path)?;
                written.push(language);
            }
        }

        info!("Refreshed {} dictionary file(s) from the ledger", written.len());
        Ok(written)
    }
}

fn translated(
    items: &[BatchItem],
    texts: Vec<String>,
    provider: &dyn MachineTranslator,
    language: &str,
    confidence: f32,
) -> Vec<TranslationOutcome> {
    debug!(
        "{} translated {} key(s) into {}",
        provider.provider_name(),
        items.len(),
        language
    );
    items
        .iter()
        .zip(texts)
        .map(|(item, text)| TranslationOutcome {
            key: item.key.clone(),
            language: language.to_string(),
            text,
            provider: provider.provider_name().to_string(),
            confidence,
        })
        .collect()
}

/// Sentinel outcomes carrying the original text
fn untranslated(items: &[BatchItem], language: &str) -> Vec<TranslationOutcome> {
    items
        .iter()
        .map(|item| TranslationOutcome {
            key: item.key.clone(),
            language: language.to_string(),
            text: item.source.clone(),
            provider: UNTRANSLATED_PROVIDER.to_string(),
            confidence: 0.0,
        })
        .collect()
}

impl std::fmt::Debug for TranslationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationOrchestrator")
            .field("output_dir", &self.config.output_dir)
            .field("registry", &self.registry)
            .finish()
    }
}
