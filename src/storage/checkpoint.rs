/*!
 * Durable job progress checkpoints.
 *
 * A long catalog translation survives process interruption through a
 * small record of how many units have completed. The record is keyed by
 * a stable identifier derived from the job's output destination, so
 * re-running the same job finds its own checkpoint, and carries the
 * catalog fingerprint so a checkpoint from a stale catalog is detected
 * and discarded instead of skipping the wrong units.
 */

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use log::debug;
use sha2::{Digest, Sha256};

use super::connection::StorageConnection;

/// One persisted progress record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    /// Stable job identifier
    pub job_id: String,
    /// Fingerprint of the catalog the count refers to
    pub catalog_fingerprint: String,
    /// Units completed so far
    pub completed_count: usize,
    /// Total units in the job
    pub total_count: usize,
}

/// Derive the stable job identifier from the output destination
pub fn job_id_for_output<P: AsRef<Path>>(output: P) -> String {
    let mut hasher = Sha256::new();
    hasher.update(output.as_ref().to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Store for job progress checkpoints
#[derive(Clone)]
pub struct CheckpointStore {
    /// Storage connection
    db: StorageConnection,
}

impl CheckpointStore {
    /// Create a new checkpoint store over the given connection
    pub fn new(db: StorageConnection) -> Self {
        Self { db }
    }

    /// Load the checkpoint for a job, if one exists
    pub async fn load(&self, job_id: &str) -> Result<Option<CheckpointRecord>> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT job_id, catalog_fingerprint, completed_count, total_count \
                     FROM job_checkpoints WHERE job_id = ?1",
                )?;
                let mut rows = stmt.query([job_id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(CheckpointRecord {
                        job_id: row.get(0)?,
                        catalog_fingerprint: row.get(1)?,
                        completed_count: row.get::<_, i64>(2)? as usize,
                        total_count: row.get::<_, i64>(3)? as usize,
                    })),
                    None => Ok(None),
                }
            })
            .await
    }

    /// Persist a checkpoint, overwriting any previous record for the job.
    ///
    /// Called from the coordinating task only; workers never write here.
    pub async fn save(&self, record: &CheckpointRecord) -> Result<()> {
        let record = record.clone();

        debug!(
            "Checkpoint for job {}: {}/{} units",
            record.job_id, record.completed_count, record.total_count
        );

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO job_checkpoints \
                     (job_id, catalog_fingerprint, completed_count, total_count, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        record.job_id,
                        record.catalog_fingerprint,
                        record.completed_count as i64,
                        record.total_count as i64,
                        Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Remove the checkpoint for a job
    pub async fn clear(&self, job_id: &str) -> Result<()> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute("DELETE FROM job_checkpoints WHERE job_id = ?1", [job_id])?;
                Ok(())
            })
            .await
    }
}
