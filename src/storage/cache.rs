/*!
 * Persistent translation cache.
 *
 * Repeated runs over overlapping catalogs should not pay for the same
 * backend call twice. Entries are content-addressed by a digest of
 * (source text, target language, provider identity) and never expire;
 * clearing the cache means deleting the storage namespace externally.
 */

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use log::{debug, warn};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use super::connection::StorageConnection;

/// Compute the content-addressed cache key.
///
/// The digest is scoped by provider identity: different backends produce
/// different, non-interchangeable translations, so the same source text
/// translated by two backends occupies two cache entries.
pub fn cache_key(source_text: &str, target_language: &str, provider_identity: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_text.as_bytes());
    hasher.update([0x1f]);
    hasher.update(target_language.as_bytes());
    hasher.update([0x1f]);
    hasher.update(provider_identity.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Translation cache backed by the storage database
#[derive(Clone)]
pub struct CacheStore {
    /// Storage connection
    db: StorageConnection,

    /// Whether caching is enabled, fixed per job
    enabled: bool,

    /// Cache hit counter
    hits: Arc<RwLock<usize>>,

    /// Cache miss counter
    misses: Arc<RwLock<usize>>,
}

impl CacheStore {
    /// Create a new cache store over the given connection
    pub fn new(db: StorageConnection, enabled: bool) -> Self {
        Self {
            db,
            enabled,
            hits: Arc::new(RwLock::new(0)),
            misses: Arc::new(RwLock::new(0)),
        }
    }

    /// Look up a previously obtained translation.
    ///
    /// Storage errors are logged and reported as misses; a degraded cache
    /// never blocks translation.
    pub async fn get(
        &self,
        source_text: &str,
        target_language: &str,
        provider_identity: &str,
    ) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let key = cache_key(source_text, target_language, provider_identity);

        let result = self
            .db
            .execute_async(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT translated_text FROM translation_cache WHERE key = ?1")?;
                let mut rows = stmt.query([key])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row.get::<_, String>(0)?)),
                    None => Ok(None),
                }
            })
            .await;

        match result {
            Ok(Some(translation)) => {
                *self.hits.write() += 1;
                debug!(
                    "Cache hit for '{}' ({} via {})",
                    truncate_text(source_text, 30),
                    target_language,
                    provider_identity
                );
                Some(translation)
            }
            Ok(None) => {
                *self.misses.write() += 1;
                None
            }
            Err(e) => {
                warn!("Cache lookup failed, treating as miss: {}", e);
                *self.misses.write() += 1;
                None
            }
        }
    }

    /// Store a translation in the cache
    pub async fn put(
        &self,
        source_text: &str,
        target_language: &str,
        provider_identity: &str,
        translation: &str,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let key = cache_key(source_text, target_language, provider_identity);
        let target_language = target_language.to_string();
        let provider_identity = provider_identity.to_string();
        let translation = translation.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO translation_cache \
                     (key, target_language, provider, translated_text, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        key,
                        target_language,
                        provider_identity,
                        translation,
                        Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Get cache statistics as (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = *self.hits.read();
        let misses = *self.misses.read();
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    /// Number of entries in the cache
    pub async fn len(&self) -> usize {
        self.db
            .execute_async(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM translation_cache", [], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .unwrap_or(0)
    }

    /// Whether the cache has no entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Truncate text to a maximum length with ellipsis
fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_length).collect::<String>())
    }
}
