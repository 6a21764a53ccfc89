use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::language_utils;
use crate::providers::ProviderCapability;
use crate::storage::checkpoint::job_id_for_output;

// @module: Job definition and per-job scheduling configuration

/// Default pause between backend requests
const DEFAULT_INTER_REQUEST_DELAY: Duration = Duration::from_millis(500);

/// Default number of completed units between checkpoint flushes
const DEFAULT_CHECKPOINT_INTERVAL: usize = 50;

/// Scheduling configuration for one job
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Target language (locale code, e.g. "es" or "es_ES")
    pub target_language: String,

    /// Segments per batch request; 1 disables batching
    pub batch_size: usize,

    /// Parallel workers; 1 means strict sequential processing
    pub workers: usize,

    /// Pause between backend requests
    pub inter_request_delay: Duration,

    /// Whether the translation cache is consulted and filled
    pub cache_enabled: bool,

    /// Whether to resume from a previous checkpoint
    pub resume: bool,

    /// Completed units between checkpoint flushes
    pub checkpoint_interval: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            target_language: "es".to_string(),
            batch_size: 1,
            workers: 1,
            inter_request_delay: DEFAULT_INTER_REQUEST_DELAY,
            cache_enabled: true,
            resume: false,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }
}

impl JobConfig {
    /// Validate the configuration before any unit is processed.
    ///
    /// Batch and parallel dispatch are mutually exclusive: combining them
    /// would multiply outstanding backend load in a way no rate limit
    /// hint accounts for.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                setting: "batch_size",
                value: self.batch_size.to_string(),
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                setting: "workers",
                value: self.workers.to_string(),
            });
        }
        if self.checkpoint_interval == 0 {
            return Err(ConfigError::InvalidValue {
                setting: "checkpoint_interval",
                value: self.checkpoint_interval.to_string(),
            });
        }
        if self.batch_size > 1 && self.workers > 1 {
            return Err(ConfigError::BatchParallelConflict {
                batch_size: self.batch_size,
                workers: self.workers,
            });
        }
        if language_utils::validate_language_code(&self.target_language).is_err() {
            return Err(ConfigError::InvalidLanguage(self.target_language.clone()));
        }

        Ok(())
    }

    /// Pick the dispatch mode for this job, fixed for the job's lifetime
    pub fn dispatch_mode(&self, capability: &ProviderCapability) -> DispatchMode {
        if self.batch_size > 1 && capability.supports_batch {
            DispatchMode::Batch {
                chunk_size: self.batch_size.min(capability.max_batch_size),
            }
        } else if self.workers > 1 {
            DispatchMode::Parallel {
                workers: self.workers,
            }
        } else {
            DispatchMode::Sequential
        }
    }

    /// Effective pause between requests, never shorter than what the
    /// backend's rate limit hint asks for
    pub fn effective_delay(&self, capability: &ProviderCapability) -> Duration {
        self.inter_request_delay.max(capability.rate_limit_hint)
    }
}

/// Dispatch strategy, chosen once per job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Group cache misses into chunks and translate each in one request
    Batch {
        /// Segments per chunk
        chunk_size: usize,
    },
    /// Bounded worker pool of single-segment requests
    Parallel {
        /// Pool size
        workers: usize,
    },
    /// Strict one-at-a-time processing
    Sequential,
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Job created, not yet started
    Pending,
    /// Units are being processed
    Running,
    /// Every unit reached a terminal status
    Completed,
    /// Stopped cooperatively before all units were processed
    Interrupted,
    /// A precondition prevented the job from starting
    Failed,
}

/// One invocation of the engine over a catalog
#[derive(Debug, Clone)]
pub struct Job {
    /// Stable identifier derived from the output destination
    pub id: String,

    /// Fingerprint of the catalog being translated
    pub catalog_fingerprint: String,

    /// Scheduling configuration
    pub config: JobConfig,

    /// Current lifecycle state
    pub state: JobState,
}

impl Job {
    /// Create a job for a catalog going to `output`
    pub fn new<P: AsRef<Path>>(output: P, catalog_fingerprint: String, config: JobConfig) -> Self {
        Self {
            id: job_id_for_output(output),
            catalog_fingerprint,
            config,
            state: JobState::Pending,
        }
    }
}

/// Outcome counters reported after a job ends
#[derive(Debug, Clone, Default)]
pub struct JobSummary {
    /// Units in the job
    pub total: usize,
    /// Units translated by a backend in this run
    pub translated: usize,
    /// Units resolved from the cache
    pub cached: usize,
    /// Units that failed and were kept untranslated
    pub failed: usize,
    /// Units skipped because a checkpoint already covered them
    pub resumed: usize,
}
