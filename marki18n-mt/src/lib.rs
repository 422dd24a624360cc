//! Machine translation for marki18n dictionaries
//!
//! This crate takes the keys that marking and extraction produce and fills
//! the target-language dictionaries through a machine translation provider.
//!
//! # Workflow
//!
//! ```ignore
//! use std::sync::Arc;
//! use marki18n::{Config, process_files};
//! use marki18n_mt::{ExtractQueue, FlushPolicy, TranslationOrchestrator};
//!
//! let config = Config::load("marki18n.toml".as_ref())?;
//!
//! // 1. Mark and extract every file
//! let outcomes = process_files(&files, &config)?;
//!
//! // 2. Reconcile through the queue; new keys are translated as they arrive
//! let orchestrator = Arc::new(TranslationOrchestrator::from_config(config.clone())?);
//! let queue = ExtractQueue::with_orchestrator(config, FlushPolicy::Interactive, orchestrator);
//! for outcome in outcomes {
//!     queue.add(outcome.entries);
//! }
//! queue.wait_for_all_operations().await;
//! ```
//!
//! # Placeholders
//!
//! Keys such as `"你好，{a}"` are sent as `"你好，_ID1_"` and restored after
//! translation, so a provider cannot translate or drop the placeholder. A
//! translation that loses an anchor is rejected and retried.

pub mod batch;
pub mod error;
pub mod orchestrator;
pub mod placeholder;
pub mod providers;
pub mod queue;
pub mod registry;
pub mod translator;


// Re-export main types for convenient access
pub use batch::{check_quality, plan_batches};
pub use error::{ErrorKind, MtError, MtResult};
pub use orchestrator::{TranslationOrchestrator, TranslationOutcome, TranslationReport};
pub use placeholder::{AnchoredText, Anchorer, anchor_token, restore};
pub use providers::{
    AzureTranslateProvider, GoogleTranslateProvider, MockMode, MockTranslator,
    TencentTranslateProvider, sign_request,
};
pub use queue::{ExtractQueue, FlushPolicy};
pub use registry::{ProviderKind, ProviderRegistry};
pub use translator::{MachineTranslator, UsageLimit, normalize_locale, validate_locale};
