/*!
 * Persistent storage for translations and job progress.
 *
 * This module provides SQLite-based persistence for:
 * - Translation cache for cross-run deduplication
 * - Job checkpoints with resume capability
 */

pub mod cache;
pub mod checkpoint;
pub mod connection;
pub mod schema;

// Re-export main types
pub use cache::CacheStore;
pub use checkpoint::{CheckpointRecord, CheckpointStore};
pub use connection::StorageConnection;
