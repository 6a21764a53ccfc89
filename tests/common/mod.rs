/*!
 * Common test utilities shared by unit and integration tests
 */

pub mod mock_provider;

use std::sync::Arc;

use traduki::catalog::TranslationUnit;
use traduki::engine::SchedulingEngine;
use traduki::providers::Provider;
use traduki::retry::RetryExecutor;
use traduki::storage::{CacheStore, CheckpointStore, StorageConnection};

/// Build pending units from plain source texts
pub fn units_from(texts: &[&str]) -> Vec<TranslationUnit> {
    texts.iter().map(|t| TranslationUnit::new(*t)).collect()
}

/// Engine over an in-memory store with a fast retry policy.
///
/// Returns the engine plus the shared storage so tests can reuse the same
/// cache and checkpoint state across runs.
pub fn engine_with_storage(
    provider: Arc<dyn Provider>,
    storage: StorageConnection,
    cache_enabled: bool,
) -> SchedulingEngine {
    let cache = CacheStore::new(storage.clone(), cache_enabled);
    let checkpoints = CheckpointStore::new(storage);
    SchedulingEngine::new(provider, cache, checkpoints)
        .with_retry(RetryExecutor::new(3, std::time::Duration::from_millis(1)))
}

/// Fresh in-memory storage
pub fn in_memory_storage() -> StorageConnection {
    StorageConnection::new_in_memory().expect("in-memory storage")
}

/// Progress callback that ignores updates
pub fn no_progress(_done: usize, _total: usize) {}
