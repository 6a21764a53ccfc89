/*!
 * Translation orchestration engine.
 *
 * This module contains the scheduling core that drives catalog units
 * through cache lookups, placeholder isolation, backend calls and
 * checkpointed progress. It is split into:
 *
 * - `job`: job definition, per-job configuration and dispatch selection
 * - `scheduler`: the engine itself
 */

// Re-export main types for easier usage
pub use self::job::{DispatchMode, Job, JobConfig, JobState, JobSummary};
pub use self::scheduler::{SchedulingEngine, StopHandle};

// Submodules
pub mod job;
pub mod scheduler;
