//! Extract queue
//!
//! Collects entries from many files, reconciles them into the output
//! directory in bursts and hands newly added keys to the orchestrator.
//!
//! The queue is owned by the caller's session and shared as
//! `Arc<ExtractQueue>`. All methods that schedule work must be called from
//! within a Tokio runtime.
//!
//! ```ignore
//! let queue = ExtractQueue::with_orchestrator(config, FlushPolicy::Interactive, orchestrator);
//! for outcome in outcomes {
//!     queue.add(outcome.entries);
//! }
//! queue.wait_for_all_operations().await;
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use marki18n::{Config, Entry, write_extract_file};

use crate::orchestrator::TranslationOrchestrator;

/// Busy-flag waits before a flush request gives up and re-queues itself
const MAX_BUSY_RETRIES: u32 = 5;
const BUSY_BACKOFF_BASE: Duration = Duration::from_millis(10);

/// When a scheduled flush runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Yield once so the current burst of `add` calls lands in one flush
    Interactive,
    /// Wait a fixed delay before flushing
    Batch { delay: Duration },
}

#[derive(Default)]
struct QueueState {
    /// Keyed by (key, file path); the latest entry for a pair wins
    buffer: BTreeMap<(String, Option<String>), Entry>,
    pending_keys: BTreeSet<String>,
}

pub struct ExtractQueue {
    config: Config,
    policy: FlushPolicy,
    orchestrator: Option<Arc<TranslationOrchestrator>>,
    write_guard: Arc<Mutex<()>>,
    state: StdMutex<QueueState>,
    operations: StdMutex<Vec<JoinHandle<()>>>,
    flush_scheduled: AtomicBool,
    flushing: AtomicBool,
    translating: AtomicBool,
}

impl ExtractQueue {
    /// A queue that only reconciles
    pub fn new(config: Config, policy: FlushPolicy) -> Arc<Self> {
        Arc::new(Self::build(config, policy, None, Arc::new(Mutex::new(()))))
    }

    /// A queue that also translates new keys; dictionary writes are
    /// serialized with the orchestrator's
    pub fn with_orchestrator(
        config: Config,
        policy: FlushPolicy,
        orchestrator: Arc<TranslationOrchestrator>,
    ) -> Arc<Self> {
        let write_guard = orchestrator.write_guard();
        Arc::new(Self::build(config, policy, Some(orchestrator), write_guard))
    }

    fn build(
        config: Config,
        policy: FlushPolicy,
        orchestrator: Option<Arc<TranslationOrchestrator>>,
        write_guard: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            config,
            policy,
            orchestrator,
            write_guard,
            state: StdMutex::new(QueueState::default()),
            operations: StdMutex::new(Vec::new()),
            flush_scheduled: AtomicBool::new(false),
            flushing: AtomicBool::new(false),
            translating: AtomicBool::new(false),
        }
    }

    /// Buffer `entries` and make sure a flush is scheduled.
    ///
    /// Entries of one file should arrive in one call: removals are computed
    /// per flushed file.
    pub fn add(self: &Arc<Self>, entries: Vec<Entry>) {
        if entries.is_empty() {
            return;
        }
        {
            let mut state = self.state();
            for entry in entries {
                state
                    .buffer
                    .insert((entry.key.clone(), entry.file_path.clone()), entry);
            }
        }
        if !self.flush_scheduled.swap(true, Ordering::SeqCst) {
            self.spawn(Arc::clone(self).run_flush());
        }
    }

    /// Number of buffered entries not yet flushed
    pub fn pending(&self) -> usize {
        self.state().buffer.len()
    }

    /// Wait for every flush and translation run, including those started by
    /// the ones being waited on
    pub async fn wait_for_all_operations(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.operations());
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    error!("Queue operation panicked: {}", e);
                }
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn operations(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.operations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.operations().push(handle);
    }

    fn run_flush(self: Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            match self.policy {
                FlushPolicy::Interactive => tokio::task::yield_now().await,
                FlushPolicy::Batch { delay } => tokio::time::sleep(delay).await,
            }

            if !self.acquire_flush().await {
                debug!("Flush still busy, re-requesting");
                self.spawn(Arc::clone(&self).run_flush());
                return;
            }

            // entries added from here on schedule their own flush
            self.flush_scheduled.store(false, Ordering::SeqCst);
            let entries: Vec<Entry> = std::mem::take(&mut self.state().buffer)
                .into_values()
                .collect();

            if !entries.is_empty() {
                self.flush(entries).await;
            }
            self.flushing.store(false, Ordering::SeqCst);
        })
    }

    /// Take the busy flag, backing off exponentially while another flush runs
    async fn acquire_flush(&self) -> bool {
        for attempt in 0..=MAX_BUSY_RETRIES {
            if self
                .flushing
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
            if attempt < MAX_BUSY_RETRIES {
                tokio::time::sleep(BUSY_BACKOFF_BASE * 2u32.pow(attempt)).await;
            }
        }
        false
    }

    async fn flush(self: &Arc<Self>, entries: Vec<Entry>) {
        let count = entries.len();
        let config = self.config.clone();
        let auto_remove_key = config.auto_remove_key;

        let result = {
            let _guard = self.write_guard.lock().await;
            tokio::task::spawn_blocking(move || {
                write_extract_file(&entries, &config, auto_remove_key)
            })
            .await
        };

        match result {
            Ok(Ok(new_keys)) => {
                info!("Flushed {} entries, {} new key(s)", count, new_keys.len());
                if !new_keys.is_empty() && self.orchestrator.is_some() {
                    self.state().pending_keys.extend(new_keys);
                    self.schedule_translation();
                }
            }
            Ok(Err(e)) => error!("Flush of {} entries failed: {}", count, e),
            Err(e) => error!("Flush task failed: {}", e),
        }
    }

    fn schedule_translation(self: &Arc<Self>) {
        if self.translating.swap(true, Ordering::SeqCst) {
            // the running translation picks the keys up
            return;
        }
        let queue = Arc::clone(self);
        self.spawn(async move { queue.run_translation().await });
    }

    async fn run_translation(&self) {
        let Some(orchestrator) = self.orchestrator.as_ref() else {
            self.translating.store(false, Ordering::SeqCst);
            return;
        };

        loop {
            let keys: Vec<String> = std::mem::take(&mut self.state().pending_keys)
                .into_iter()
                .collect();
            if keys.is_empty() {
                self.translating.store(false, Ordering::SeqCst);
                // keys may have arrived between the take and the store
                if self.state().pending_keys.is_empty()
                    || self.translating.swap(true, Ordering::SeqCst)
                {
                    break;
                }
                continue;
            }

            match orchestrator.translate_keys(&keys).await {
                Ok(report) if !report.failed.is_empty() => warn!(
                    "{} of {} translation(s) failed, kept original text",
                    report.failed.len(),
                    report.outcomes.len()
                ),
                Ok(report) => debug!("Translated {} key(s)", report.translated_count()),
                Err(e) => error!("Translation of {} key(s) failed: {}", keys.len(), e),
            }
        }
    }
}

impl std::fmt::Debug for ExtractQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractQueue")
            .field("policy", &self.policy)
            .field("pending", &self.pending())
            .field("translates", &self.orchestrator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockMode, MockTranslator};
    use crate::registry::ProviderRegistry;
    use marki18n::{Dictionary, UsageMap};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        let mut config = Config {
            output_dir: dir.path().join("locales"),
            target_languages: vec!["en".to_string()],
            ..Config::default()
        };
        config.translate.retry_delay_ms = 1;
        config.translate.batch_delay_ms = 0;
        config
    }

    fn entry(key: &str, path: &str) -> Entry {
        Entry {
            key: key.to_string(),
            text: key.to_string(),
            variables: vec![],
            line: 1,
            file_path: Some(path.to_string()),
        }
    }

    fn dictionary(config: &Config, language: &str) -> Dictionary {
        Dictionary::load(&config.dictionary_path(language)).unwrap()
    }

    #[tokio::test]
    async fn test_burst_is_flushed_together() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let queue = ExtractQueue::new(config.clone(), FlushPolicy::Interactive);

        queue.add(vec![entry("你好", "a.js"), entry("再见", "a.js")]);
        queue.add(vec![entry("你好", "b.js")]);
        queue.add(vec![]);
        queue.wait_for_all_operations().await;

        assert_eq!(queue.pending(), 0);
        let zh = dictionary(&config, "zh");
        assert_eq!(zh.len(), 2);
        let usage = UsageMap::load(&config.usage_map_path()).unwrap();
        assert_eq!(usage.paths("你好").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_policy_and_later_flushes() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let queue = ExtractQueue::new(
            config.clone(),
            FlushPolicy::Batch {
                delay: Duration::from_millis(5),
            },
        );

        queue.add(vec![entry("一", "a.js")]);
        queue.wait_for_all_operations().await;
        queue.add(vec![entry("二", "b.js")]);
        queue.wait_for_all_operations().await;

        let zh = dictionary(&config, "zh");
        assert!(zh.contains_key("一"));
        assert!(zh.contains_key("二"));
    }

    #[tokio::test]
    async fn test_concurrent_adds_lose_nothing() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let queue = ExtractQueue::new(config.clone(), FlushPolicy::Interactive);

        let mut producers = Vec::new();
        for i in 0..8 {
            let queue = Arc::clone(&queue);
            producers.push(tokio::spawn(async move {
                for j in 0..5 {
                    queue.add(vec![entry(&format!("键{}_{}", i, j), &format!("f{}_{}.js", i, j))]);
                    tokio::task::yield_now().await;
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }
        queue.wait_for_all_operations().await;

        assert_eq!(dictionary(&config, "zh").len(), 40);
    }

    #[tokio::test]
    async fn test_new_keys_are_translated() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let mock = MockTranslator::new(MockMode::Suffix);
        let registry = ProviderRegistry::new().with_primary(Arc::new(mock.clone()));
        let orchestrator = Arc::new(TranslationOrchestrator::new(config.clone(), registry).unwrap());
        let queue = ExtractQueue::with_orchestrator(
            config.clone(),
            FlushPolicy::Interactive,
            Arc::clone(&orchestrator),
        );

        queue.add(vec![entry("你好", "a.js")]);
        queue.wait_for_all_operations().await;
        assert_eq!(dictionary(&config, "en").get("你好"), Some("你好_en"));

        // a known key is not translated again
        queue.add(vec![entry("你好", "b.js")]);
        queue.wait_for_all_operations().await;
        assert_eq!(mock.calls(), 1);
        assert!(orchestrator.ledger().await.is_translated("你好", "en"));
    }
}
