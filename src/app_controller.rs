use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::app_config::{Config, TranslationProvider};
use crate::catalog::Catalog;
use crate::engine::{Job, JobConfig, JobState, JobSummary, SchedulingEngine};
use crate::providers::{DeepL, DeepSeek, GoogleTranslate, Provider};
use crate::storage::{CacheStore, CheckpointStore, StorageConnection};

// @module: Application controller wiring catalog, engine and storage

/// Main application controller for catalog translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Build the provider adapter selected by the configuration
    fn build_provider(&self) -> Result<Arc<dyn Provider>> {
        let provider: Arc<dyn Provider> = match self.config.provider {
            TranslationProvider::DeepL => {
                Arc::new(DeepL::new(&self.config.api_key, &self.config.endpoint)?)
            }
            TranslationProvider::Google => {
                Arc::new(GoogleTranslate::new(&self.config.api_key, &self.config.endpoint)?)
            }
            TranslationProvider::DeepSeek => {
                Arc::new(DeepSeek::new(&self.config.api_key, &self.config.endpoint)?)
            }
        };

        Ok(provider)
    }

    /// Open the storage database, honoring a custom path override
    fn open_storage(&self) -> Result<StorageConnection> {
        match &self.config.storage_path {
            Some(path) => StorageConnection::new(path),
            None => StorageConnection::new_default(),
        }
    }

    /// Translate a catalog file and write the result.
    ///
    /// Returns the job summary on success. A stop request (Ctrl-C) still
    /// writes the partially translated catalog and leaves a checkpoint
    /// behind for a resumed run.
    pub async fn run(&self, input: &Path, output: &Path) -> Result<JobSummary> {
        info!(
            "Translating {:?} to {} via {}",
            input,
            self.config.target_language,
            self.config.provider.display_name()
        );

        let mut catalog = Catalog::from_file(input)?;
        let untranslated = catalog.untranslated_indices().len();
        info!(
            "Catalog has {} units, {} untranslated",
            catalog.len(),
            untranslated
        );

        let provider = self.build_provider()?;
        let storage = self.open_storage()?;
        let cache = CacheStore::new(storage.clone(), self.config.cache_enabled);
        let checkpoints = CheckpointStore::new(storage);

        let engine = SchedulingEngine::new(provider, cache.clone(), checkpoints);

        // Ctrl-C requests a cooperative stop: in-flight calls finish, a
        // checkpoint lands, and the partial catalog is still written
        let stop_handle = engine.stop_handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Stop requested, finishing in-flight requests");
                stop_handle.stop();
            }
        });

        let job_config = JobConfig {
            target_language: self.config.target_language.clone(),
            batch_size: self.config.batch_size,
            workers: self.config.workers,
            inter_request_delay: self.config.inter_request_delay(),
            cache_enabled: self.config.cache_enabled,
            resume: self.config.resume,
            ..Default::default()
        };

        let mut job = Job::new(output, catalog.fingerprint(), job_config);

        let progress_bar = build_progress_bar(catalog.len() as u64);
        let pb = progress_bar.clone();
        let summary = engine
            .run(&mut job, &mut catalog.units, move |done, _total| {
                pb.set_position(done as u64);
            })
            .await;

        progress_bar.finish_and_clear();

        let summary = summary.with_context(|| "Translation job failed to start")?;

        catalog
            .write_to_file(output)
            .with_context(|| format!("Failed to write output catalog: {:?}", output))?;

        let (hits, misses, hit_rate) = cache.stats();
        info!(
            "Cache: {} hits, {} misses ({:.0}% hit rate)",
            hits,
            misses,
            hit_rate * 100.0
        );

        match job.state {
            JobState::Interrupted => warn!(
                "Job interrupted after {} units; re-run with --resume to continue",
                summary.translated + summary.cached
            ),
            _ => info!(
                "Done: {} translated, {} from cache, {} failed, {} skipped by checkpoint",
                summary.translated, summary.cached, summary.failed, summary.resumed
            ),
        }

        Ok(summary)
    }

    /// Derive the default output path: `messages.po` -> `messages_es.po`
    pub fn default_output_path(input: &Path, target_language: &str) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "catalog".to_string());
        let extension = input
            .extension()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "po".to_string());

        input.with_file_name(format!("{}_{}.{}", stem, target_language, extension))
    }
}

/// Progress bar in the house style
fn build_progress_bar(total: u64) -> ProgressBar {
    let progress_bar = ProgressBar::new(total);
    let template_result = ProgressStyle::default_bar()
        .template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(template_result);
    progress_bar
}
