/*!
 * # traduki
 *
 * A Rust library and CLI for translating gettext-style PO catalogs
 * through third-party translation backends.
 *
 * ## Features
 *
 * - Translate untranslated catalog entries via DeepL, Google Cloud
 *   Translation or DeepSeek
 * - Preserve embedded markup and format placeholders across backends
 *   that would otherwise mangle them
 * - Persistent translation cache so repeated runs issue no redundant
 *   backend calls
 * - Batch, parallel or sequential dispatch depending on backend
 *   capability and configuration
 * - Checkpointed progress with resume after interruption
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `catalog`: PO catalog parsing and serialization
 * - `placeholder`: Markup/format-token isolation around backend calls
 * - `retry`: Bounded retry with exponential backoff
 * - `engine`: The scheduling engine coordinating cache, batching,
 *   concurrency and checkpoints:
 *   - `engine::job`: Job definition and dispatch selection
 *   - `engine::scheduler`: The orchestrator itself
 * - `providers`: Client implementations for the translation backends:
 *   - `providers::deepl`: DeepL API client
 *   - `providers::google`: Google Cloud Translation client
 *   - `providers::deepseek`: DeepSeek chat API client
 * - `storage`: SQLite-backed cache and checkpoint persistence
 * - `language_utils`: ISO language code utilities
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod catalog;
pub mod engine;
pub mod errors;
pub mod language_utils;
pub mod placeholder;
pub mod providers;
pub mod retry;
pub mod storage;

// Re-export main types for easier usage
pub use app_config::Config;
pub use catalog::{Catalog, TranslationUnit, UnitStatus};
pub use engine::{Job, JobConfig, JobState, JobSummary, SchedulingEngine, StopHandle};
pub use errors::{AppError, CatalogError, ConfigError, ProviderError, TranslationError};
pub use placeholder::PlaceholderCodec;
pub use providers::{Provider, ProviderCapability};
pub use retry::RetryExecutor;
pub use storage::{CacheStore, CheckpointStore, StorageConnection};
