/*!
 * The scheduling engine.
 *
 * Turns a sequence of untranslated catalog units into translated units by
 * coordinating the cache, placeholder isolation, retries and checkpointed
 * progress over whatever dispatch shape the backend supports. One dispatch
 * mode is fixed per job: chunked batch requests, a bounded pool of parallel
 * single requests, or strict sequential processing.
 *
 * Failures stay contained at the unit boundary: a failed unit keeps its
 * source text untranslated and the job carries on. Only configuration
 * preconditions abort a job.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use tokio::sync::Semaphore;

use crate::catalog::{TranslationUnit, UnitStatus};
use crate::engine::job::{DispatchMode, Job, JobState, JobSummary};
use crate::errors::TranslationError;
use crate::placeholder::PlaceholderCodec;
use crate::providers::Provider;
use crate::retry::RetryExecutor;
use crate::storage::checkpoint::CheckpointRecord;
use crate::storage::{CacheStore, CheckpointStore};

/// Handle for requesting a cooperative stop.
///
/// In-flight backend calls finish, a checkpoint is persisted, and no new
/// requests are issued.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Request a stop
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tracks which unit positions reached a terminal status.
///
/// Checkpoints record the length of the contiguous completed prefix, never
/// a raw completion count: in parallel mode results land out of order, and
/// a resume must only skip units that are genuinely behind the high-water
/// mark.
struct ProgressLedger {
    done: Vec<bool>,
    prefix: usize,
}

impl ProgressLedger {
    fn new(total: usize, offset: usize) -> Self {
        let mut done = vec![false; total];
        for slot in done.iter_mut().take(offset) {
            *slot = true;
        }
        let mut ledger = Self { done, prefix: 0 };
        ledger.advance();
        ledger
    }

    fn mark(&mut self, idx: usize) {
        self.done[idx] = true;
        self.advance();
    }

    fn advance(&mut self) {
        while self.prefix < self.done.len() && self.done[self.prefix] {
            self.prefix += 1;
        }
    }

    fn completed_prefix(&self) -> usize {
        self.prefix
    }

    fn terminal_count(&self) -> usize {
        self.done.iter().filter(|d| **d).count()
    }

    fn total(&self) -> usize {
        self.done.len()
    }
}

/// Orchestrator for one job at a time
pub struct SchedulingEngine {
    /// The backend adapter, behind the capability interface
    provider: Arc<dyn Provider>,

    /// Persistent translation cache
    cache: CacheStore,

    /// Durable job progress records
    checkpoints: CheckpointStore,

    /// Retry policy for backend calls
    retry: RetryExecutor,

    /// Cooperative stop flag
    stop: StopHandle,
}

impl SchedulingEngine {
    /// Create an engine over a provider and its stores
    pub fn new(
        provider: Arc<dyn Provider>,
        cache: CacheStore,
        checkpoints: CheckpointStore,
    ) -> Self {
        Self {
            provider,
            cache,
            checkpoints,
            retry: RetryExecutor::default(),
            stop: StopHandle::default(),
        }
    }

    /// Replace the default retry policy
    pub fn with_retry(mut self, retry: RetryExecutor) -> Self {
        self.retry = retry;
        self
    }

    /// Handle for requesting a cooperative stop from outside the job
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run a job over `units`, mutating them in place.
    ///
    /// Output order always equals input order regardless of dispatch mode;
    /// results are written into the slot of the unit they came from.
    pub async fn run(
        &self,
        job: &mut Job,
        units: &mut [TranslationUnit],
        progress: impl Fn(usize, usize) + Send + Sync,
    ) -> Result<JobSummary> {
        if let Err(e) = job.config.validate() {
            job.state = JobState::Failed;
            return Err(e.into());
        }

        job.state = JobState::Running;

        let total = units.len();
        let capability = self.provider.capability();
        let identity = self.provider.identity();
        let mode = job.config.dispatch_mode(&capability);
        let delay = job.config.effective_delay(&capability);

        // Resume: skip units the checkpoint already covers, by position
        let offset = if job.config.resume {
            self.resume_offset(job, total).await?
        } else {
            0
        };

        info!(
            "Job {} starting: {} units, {} skipped by checkpoint, mode {:?}",
            job.id, total, offset, mode
        );

        let mut summary = JobSummary {
            total,
            resumed: offset,
            ..Default::default()
        };
        let mut ledger = ProgressLedger::new(total, offset);
        let mut flushed_at = ledger.terminal_count();

        // Partition the remaining work into cache hits and misses. Hits
        // resolve immediately; misses go to the backend.
        let mut misses: Vec<usize> = Vec::new();
        for idx in offset..total {
            let unit = &mut units[idx];
            if !unit.needs_translation() {
                ledger.mark(idx);
                progress(ledger.terminal_count(), total);
                continue;
            }

            match self
                .cache
                .get(&unit.source_text, &job.config.target_language, &identity)
                .await
            {
                Some(hit) => {
                    unit.target_text = hit;
                    unit.status = UnitStatus::Translated;
                    summary.cached += 1;
                    ledger.mark(idx);
                    progress(ledger.terminal_count(), total);
                }
                None => misses.push(idx),
            }
        }

        debug!(
            "Job {}: {} cache hits, {} misses",
            job.id,
            summary.cached,
            misses.len()
        );

        let interrupted = match mode {
            DispatchMode::Batch { chunk_size } => {
                self.run_batched(
                    job, units, &misses, chunk_size, delay, &mut summary, &mut ledger,
                    &mut flushed_at, &progress,
                )
                .await?
            }
            DispatchMode::Parallel { workers } => {
                self.run_parallel(
                    job, units, &misses, workers, delay, &mut summary, &mut ledger,
                    &mut flushed_at, &progress,
                )
                .await?
            }
            DispatchMode::Sequential => {
                self.run_sequential(
                    job, units, &misses, delay, &mut summary, &mut ledger, &mut flushed_at,
                    &progress,
                )
                .await?
            }
        };

        job.state = if interrupted {
            JobState::Interrupted
        } else {
            JobState::Completed
        };

        // Final flush is unconditional so the recovery point is always the
        // latest prefix, including on interruption
        self.flush_checkpoint(job, &ledger).await?;

        info!(
            "Job {} {}: {} translated, {} cached, {} failed",
            job.id,
            if interrupted { "interrupted" } else { "completed" },
            summary.translated,
            summary.cached,
            summary.failed
        );

        Ok(summary)
    }

    /// Work out the resume offset from a stored checkpoint, discarding
    /// checkpoints that belong to a different catalog
    async fn resume_offset(&self, job: &Job, total: usize) -> Result<usize> {
        match self.checkpoints.load(&job.id).await? {
            Some(record) if record.catalog_fingerprint == job.catalog_fingerprint => {
                info!(
                    "Resuming job {} from checkpoint: {}/{} units already completed",
                    job.id, record.completed_count, record.total_count
                );
                Ok(record.completed_count.min(total))
            }
            Some(_) => {
                warn!(
                    "Checkpoint for job {} was written for a different catalog, restarting from zero",
                    job.id
                );
                self.checkpoints.clear(&job.id).await?;
                Ok(0)
            }
            None => {
                debug!("No checkpoint for job {}, starting fresh", job.id);
                Ok(0)
            }
        }
    }

    /// Persist a checkpoint if enough units completed since the last flush
    async fn maybe_flush_checkpoint(
        &self,
        job: &Job,
        ledger: &ProgressLedger,
        flushed_at: &mut usize,
    ) -> Result<()> {
        let terminal = ledger.terminal_count();
        if terminal - *flushed_at >= job.config.checkpoint_interval {
            self.flush_checkpoint(job, ledger).await?;
            *flushed_at = terminal;
        }
        Ok(())
    }

    /// Persist the current progress prefix.
    ///
    /// Only the coordinating task calls this; workers never write here.
    async fn flush_checkpoint(&self, job: &Job, ledger: &ProgressLedger) -> Result<()> {
        self.checkpoints
            .save(&CheckpointRecord {
                job_id: job.id.clone(),
                catalog_fingerprint: job.catalog_fingerprint.clone(),
                completed_count: ledger.completed_prefix(),
                total_count: ledger.total(),
            })
            .await
    }

    /// Strict one-at-a-time processing with the full delay between calls.
    ///
    /// Returns whether the job was interrupted.
    #[allow(clippy::too_many_arguments)]
    async fn run_sequential(
        &self,
        job: &Job,
        units: &mut [TranslationUnit],
        misses: &[usize],
        delay: Duration,
        summary: &mut JobSummary,
        ledger: &mut ProgressLedger,
        flushed_at: &mut usize,
        progress: &(impl Fn(usize, usize) + Send + Sync),
    ) -> Result<bool> {
        for (pos, &idx) in misses.iter().enumerate() {
            if self.stop.is_stopped() {
                return Ok(true);
            }
            if pos > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let outcome = self
                .translate_source(&units[idx].source_text, &job.config.target_language)
                .await;
            self.apply_outcome(&mut units[idx], &job.config.target_language, outcome, summary)
                .await;
            ledger.mark(idx);
            progress(ledger.terminal_count(), units.len());
            self.maybe_flush_checkpoint(job, ledger, flushed_at).await?;
        }

        Ok(false)
    }

    /// Bounded worker pool of single-segment requests.
    ///
    /// The configured delay is divided across workers so aggregate request
    /// pressure on the backend stays the same as sequential mode. Workers
    /// return (index, outcome) pairs; the coordinating task writes each
    /// result into its original slot, so completion order never affects
    /// output order.
    #[allow(clippy::too_many_arguments)]
    async fn run_parallel(
        &self,
        job: &Job,
        units: &mut [TranslationUnit],
        misses: &[usize],
        workers: usize,
        delay: Duration,
        summary: &mut JobSummary,
        ledger: &mut ProgressLedger,
        flushed_at: &mut usize,
        progress: &(impl Fn(usize, usize) + Send + Sync),
    ) -> Result<bool> {
        let semaphore = Arc::new(Semaphore::new(workers));
        let per_worker_delay = delay / workers as u32;
        let target = job.config.target_language.clone();
        let mut interrupted = false;

        // Sources are copied out up front so workers hold no borrow on the
        // unit slice while the coordinating loop below writes into it
        let work: Vec<(usize, String)> = misses
            .iter()
            .map(|&idx| (idx, units[idx].source_text.clone()))
            .collect();

        let mut results = stream::iter(work.into_iter().map(|(idx, source)| {
            let target = target.clone();
            let semaphore = semaphore.clone();
            let stop = self.stop.clone();

            async move {
                // The semaphore lives for the whole stream, so acquire
                // cannot observe a closed semaphore
                let _permit = semaphore.acquire().await.ok();

                if stop.is_stopped() {
                    return (idx, None);
                }
                if !per_worker_delay.is_zero() {
                    tokio::time::sleep(per_worker_delay).await;
                }

                let outcome = self.translate_source(&source, &target).await;
                (idx, Some(outcome))
            }
        }))
        .buffer_unordered(workers);

        while let Some((idx, outcome)) = results.next().await {
            match outcome {
                Some(outcome) => {
                    self.apply_outcome(&mut units[idx], &job.config.target_language, outcome, summary)
                        .await;
                    ledger.mark(idx);
                    progress(ledger.terminal_count(), units.len());
                    self.maybe_flush_checkpoint(job, ledger, flushed_at).await?;
                }
                // A worker observed the stop flag before starting; the
                // unit stays pending for the next run
                None => interrupted = true,
            }
        }

        Ok(interrupted)
    }

    /// Chunked batch dispatch, one outstanding request at a time.
    ///
    /// A chunk that fails as a whole degrades to per-unit sequential retry
    /// for that chunk only; units succeed or fail independently from there.
    #[allow(clippy::too_many_arguments)]
    async fn run_batched(
        &self,
        job: &Job,
        units: &mut [TranslationUnit],
        misses: &[usize],
        chunk_size: usize,
        delay: Duration,
        summary: &mut JobSummary,
        ledger: &mut ProgressLedger,
        flushed_at: &mut usize,
        progress: &(impl Fn(usize, usize) + Send + Sync),
    ) -> Result<bool> {
        let isolate = !self.provider.capability().preserves_markup;
        let target = &job.config.target_language;

        for (chunk_pos, chunk) in misses.chunks(chunk_size).enumerate() {
            if self.stop.is_stopped() {
                return Ok(true);
            }
            if chunk_pos > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            // Isolate per unit, keeping each unit's token list for its own
            // restore; token lists are never shared across units
            let mut payloads = Vec::with_capacity(chunk.len());
            let mut token_lists = Vec::with_capacity(chunk.len());
            for &idx in chunk {
                let source = &units[idx].source_text;
                if isolate {
                    let (stripped, tokens) = PlaceholderCodec::isolate(source);
                    payloads.push(stripped);
                    token_lists.push(Some(tokens));
                } else {
                    payloads.push(source.clone());
                    token_lists.push(None);
                }
            }

            let batch_result = self
                .retry
                .execute(|| self.provider.translate_batch(&payloads, target))
                .await;

            match batch_result {
                Ok(translations) if translations.len() == chunk.len() => {
                    for ((&idx, translated), tokens) in
                        chunk.iter().zip(translations).zip(&token_lists)
                    {
                        let outcome = match tokens {
                            Some(tokens) => {
                                PlaceholderCodec::restore(&translated, tokens)
                            }
                            None => Ok(translated),
                        };
                        self.apply_outcome(&mut units[idx], target, outcome, summary)
                            .await;
                        ledger.mark(idx);
                        progress(ledger.terminal_count(), units.len());
                    }
                    self.maybe_flush_checkpoint(job, ledger, flushed_at).await?;
                }
                other => {
                    match &other {
                        Err(e) => warn!(
                            "Batch of {} units failed ({}), retrying units individually",
                            chunk.len(),
                            e
                        ),
                        Ok(translations) => warn!(
                            "Batch returned {} segments for {} units, retrying units individually",
                            translations.len(),
                            chunk.len()
                        ),
                    }

                    // Degraded path: each unit of this chunk is attempted on
                    // its own so any subset can still succeed
                    for (pos, &idx) in chunk.iter().enumerate() {
                        if self.stop.is_stopped() {
                            return Ok(true);
                        }
                        if pos > 0 && !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }

                        let outcome = self
                            .translate_source(&units[idx].source_text, target)
                            .await;
                        self.apply_outcome(&mut units[idx], target, outcome, summary)
                            .await;
                        ledger.mark(idx);
                        progress(ledger.terminal_count(), units.len());
                        self.maybe_flush_checkpoint(job, ledger, flushed_at).await?;
                    }
                }
            }
        }

        Ok(false)
    }

    /// Translate one source string: isolate, call the backend through the
    /// retry policy, restore
    async fn translate_source(
        &self,
        source: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        if self.provider.capability().preserves_markup {
            let translated = self
                .retry
                .execute(|| self.provider.translate_one(source, target_lang))
                .await?;
            return Ok(translated);
        }

        let (stripped, tokens) = PlaceholderCodec::isolate(source);
        let translated = self
            .retry
            .execute(|| self.provider.translate_one(&stripped, target_lang))
            .await?;

        PlaceholderCodec::restore(&translated, &tokens)
    }

    /// Record a unit outcome: fill the slot and cache on success, mark
    /// failed and keep the source untranslated otherwise
    async fn apply_outcome(
        &self,
        unit: &mut TranslationUnit,
        target_lang: &str,
        outcome: Result<String, TranslationError>,
        summary: &mut JobSummary,
    ) {
        match outcome {
            Ok(translated) => {
                if let Err(e) = self
                    .cache
                    .put(
                        &unit.source_text,
                        target_lang,
                        &self.provider.identity(),
                        &translated,
                    )
                    .await
                {
                    warn!("Failed to cache translation: {}", e);
                }
                unit.target_text = translated;
                unit.status = UnitStatus::Translated;
                summary.translated += 1;
            }
            Err(TranslationError::PlaceholderMismatch {
                expected,
                found,
                degraded,
            }) => {
                warn!(
                    "Placeholder mismatch for '{}': expected {}, found {}; kept untranslated. Backend output: {}",
                    truncate(&unit.source_text, 40),
                    expected,
                    found,
                    degraded
                );
                unit.status = UnitStatus::Failed;
                summary.failed += 1;
            }
            Err(e) => {
                warn!(
                    "Translation failed for '{}': {}",
                    truncate(&unit.source_text, 40),
                    e
                );
                unit.status = UnitStatus::Failed;
                summary.failed += 1;
            }
        }
    }
}

/// Truncate text to a maximum length with ellipsis
fn truncate(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_length).collect::<String>())
    }
}
