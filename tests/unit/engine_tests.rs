/*!
 * Tests for the scheduling engine
 */

use std::sync::{Arc, Mutex};
use std::time::Duration;

use traduki::catalog::UnitStatus;
use traduki::engine::{Job, JobConfig, JobState};
use traduki::storage::CheckpointStore;
use traduki::storage::checkpoint::CheckpointRecord;

use crate::common::mock_provider::{MockProvider, POISON};
use crate::common::{engine_with_storage, in_memory_storage, no_progress, units_from};

/// Job config with no delays, suitable for tests
fn quick_config() -> JobConfig {
    JobConfig {
        target_language: "es".to_string(),
        inter_request_delay: Duration::ZERO,
        ..Default::default()
    }
}

fn quick_job(config: JobConfig) -> Job {
    Job::new("/tmp/out_es.po", "test-fingerprint".to_string(), config)
}

#[tokio::test]
async fn test_run_sequential_shouldTranslateAllUnits() {
    let mock = Arc::new(MockProvider::without_batch());
    let calls = mock.calls();
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let mut units = units_from(&["one", "two", "three"]);
    let mut job = quick_job(quick_config());

    let summary = engine.run(&mut job, &mut units, no_progress).await.unwrap();

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(summary.translated, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(units[0].target_text, "[es] one");
    assert_eq!(units[2].target_text, "[es] three");
    assert!(units.iter().all(|u| u.status == UnitStatus::Translated));
    assert_eq!(calls.lock().unwrap().single_calls.len(), 3);
}

#[tokio::test]
async fn test_run_parallel_shouldPreserveInputOrder() {
    let mock = Arc::new(MockProvider::without_batch());
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let texts: Vec<String> = (0..12).map(|i| format!("unit {}", i)).collect();
    let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
    let mut units = units_from(&refs);

    let mut job = quick_job(JobConfig {
        workers: 4,
        ..quick_config()
    });

    let summary = engine.run(&mut job, &mut units, no_progress).await.unwrap();

    assert_eq!(summary.translated, 12);
    // Results land in the slot of the unit they came from, so output
    // order equals input order regardless of completion order
    for (i, unit) in units.iter().enumerate() {
        assert_eq!(unit.target_text, format!("[es] unit {}", i));
    }
}

#[tokio::test]
async fn test_run_withWarmCache_shouldIssueZeroBackendCalls() {
    let storage = in_memory_storage();

    let mock = Arc::new(MockProvider::without_batch());
    let engine = engine_with_storage(mock.clone(), storage.clone(), true);
    let mut units = units_from(&["alpha", "beta"]);
    let mut job = quick_job(quick_config());
    engine.run(&mut job, &mut units, no_progress).await.unwrap();
    assert_eq!(mock.calls().lock().unwrap().request_count(), 2);

    // Second run over an unchanged catalog resolves everything from cache
    let mock2 = Arc::new(MockProvider::without_batch());
    let engine2 = engine_with_storage(mock2.clone(), storage, true);
    let mut units2 = units_from(&["alpha", "beta"]);
    let mut job2 = quick_job(quick_config());
    let summary = engine2
        .run(&mut job2, &mut units2, no_progress)
        .await
        .unwrap();

    assert_eq!(mock2.calls().lock().unwrap().request_count(), 0);
    assert_eq!(summary.cached, 2);
    assert_eq!(units2[0].target_text, "[es] alpha");
}

#[tokio::test]
async fn test_run_withCacheDisabled_shouldAlwaysCallBackend() {
    let storage = in_memory_storage();

    let mock = Arc::new(MockProvider::without_batch());
    let engine = engine_with_storage(mock.clone(), storage.clone(), false);
    let mut units = units_from(&["alpha"]);
    let mut job = quick_job(quick_config());
    engine.run(&mut job, &mut units, no_progress).await.unwrap();

    let mock2 = Arc::new(MockProvider::without_batch());
    let engine2 = engine_with_storage(mock2.clone(), storage, false);
    let mut units2 = units_from(&["alpha"]);
    let mut job2 = quick_job(quick_config());
    engine2
        .run(&mut job2, &mut units2, no_progress)
        .await
        .unwrap();

    assert_eq!(mock2.calls().lock().unwrap().request_count(), 1);
}

#[tokio::test]
async fn test_run_withResume_shouldSkipCheckpointedPrefix() {
    let storage = in_memory_storage();
    let mock = Arc::new(MockProvider::without_batch());
    let calls = mock.calls();
    let engine = engine_with_storage(mock, storage.clone(), true);

    let mut job = quick_job(JobConfig {
        resume: true,
        ..quick_config()
    });

    // A previous run completed the first two units
    CheckpointStore::new(storage)
        .save(&CheckpointRecord {
            job_id: job.id.clone(),
            catalog_fingerprint: job.catalog_fingerprint.clone(),
            completed_count: 2,
            total_count: 4,
        })
        .await
        .unwrap();

    let mut units = units_from(&["a", "b", "c", "d"]);
    let summary = engine.run(&mut job, &mut units, no_progress).await.unwrap();

    assert_eq!(summary.resumed, 2);
    assert_eq!(summary.translated, 2);
    // Skipped units are untouched, by position not content
    assert_eq!(units[0].status, UnitStatus::Pending);
    assert_eq!(units[1].status, UnitStatus::Pending);
    assert_eq!(units[2].status, UnitStatus::Translated);
    assert_eq!(units[3].status, UnitStatus::Translated);

    let sent = calls.lock().unwrap().single_calls.clone();
    assert_eq!(sent, vec!["c".to_string(), "d".to_string()]);
}

#[tokio::test]
async fn test_run_withStaleCheckpoint_shouldRestartFromZero() {
    let storage = in_memory_storage();
    let mock = Arc::new(MockProvider::without_batch());
    let engine = engine_with_storage(mock.clone(), storage.clone(), true);

    let mut job = quick_job(JobConfig {
        resume: true,
        ..quick_config()
    });

    // Checkpoint written for a different catalog
    CheckpointStore::new(storage)
        .save(&CheckpointRecord {
            job_id: job.id.clone(),
            catalog_fingerprint: "some-other-catalog".to_string(),
            completed_count: 2,
            total_count: 4,
        })
        .await
        .unwrap();

    let mut units = units_from(&["a", "b", "c", "d"]);
    let summary = engine.run(&mut job, &mut units, no_progress).await.unwrap();

    assert_eq!(summary.resumed, 0);
    assert_eq!(summary.translated, 4);
    assert_eq!(mock.calls().lock().unwrap().request_count(), 4);
}

#[tokio::test]
async fn test_run_batchMode_shouldChunkRequests() {
    let mock = Arc::new(MockProvider::new());
    let calls = mock.calls();
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let texts: Vec<String> = (0..7).map(|i| format!("text {}", i)).collect();
    let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
    let mut units = units_from(&refs);

    let mut job = quick_job(JobConfig {
        batch_size: 5,
        ..quick_config()
    });

    let summary = engine.run(&mut job, &mut units, no_progress).await.unwrap();

    assert_eq!(summary.translated, 7);
    let log = calls.lock().unwrap();
    assert_eq!(log.batch_calls.len(), 2);
    assert_eq!(log.batch_calls[0].len(), 5);
    assert_eq!(log.batch_calls[1].len(), 2);
    assert!(log.single_calls.is_empty());
}

#[tokio::test]
async fn test_run_batchFailure_shouldDegradeToIndependentUnits() {
    // One poisoned unit makes the whole batch fail; after degrading, the
    // other four succeed and only the poisoned one is marked failed
    let mock = Arc::new(MockProvider::new().fail_batches());
    let calls = mock.calls();
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let poisoned = format!("bad {}", POISON);
    let mut units = units_from(&["u0", "u1", &poisoned, "u3", "u4"]);

    let mut job = quick_job(JobConfig {
        batch_size: 5,
        ..quick_config()
    });

    let summary = engine.run(&mut job, &mut units, no_progress).await.unwrap();

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(summary.translated, 4);
    assert_eq!(summary.failed, 1);

    assert_eq!(units[0].status, UnitStatus::Translated);
    assert_eq!(units[2].status, UnitStatus::Failed);
    assert_eq!(units[2].target_text, "");
    assert_eq!(units[4].status, UnitStatus::Translated);

    let log = calls.lock().unwrap();
    // The batch is permanent-failed once, then each unit is attempted alone
    assert_eq!(log.batch_calls.len(), 1);
    assert_eq!(log.single_calls.len(), 5);
}

#[tokio::test]
async fn test_run_withIsolatingBackend_shouldRestoreMarkup() {
    let mock = Arc::new(MockProvider::without_batch());
    let calls = mock.calls();
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let mut units = units_from(&["Click <b>%s</b> to continue"]);
    let mut job = quick_job(quick_config());
    engine.run(&mut job, &mut units, no_progress).await.unwrap();

    // The backend never saw the raw markup
    let sent = calls.lock().unwrap().single_calls[0].clone();
    assert!(!sent.contains("<b>"));
    assert!(sent.contains('\u{27e6}'));

    // The original literals are back, in order
    assert_eq!(units[0].target_text, "[es] Click <b>%s</b> to continue");
}

#[tokio::test]
async fn test_run_withNativeMarkupBackend_shouldSendRawText() {
    let mock = Arc::new(MockProvider::with_native_markup());
    let calls = mock.calls();
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let mut units = units_from(&["Click <b>%s</b> to continue"]);
    let mut job = quick_job(JobConfig {
        batch_size: 2,
        ..quick_config()
    });
    engine.run(&mut job, &mut units, no_progress).await.unwrap();

    let log = calls.lock().unwrap();
    assert!(log.batch_calls[0][0].contains("<b>%s</b>"));
}

#[tokio::test]
async fn test_run_withMangledMarkers_shouldFailUnitAndKeepSource() {
    let mock = Arc::new(MockProvider::without_batch().mangle_markers_in("Click"));
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let mut units = units_from(&["Click <b>here</b>", "plain text"]);
    let mut job = quick_job(quick_config());
    let summary = engine.run(&mut job, &mut units, no_progress).await.unwrap();

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.translated, 1);

    // Never a partially substituted string: the unit keeps its source and
    // an empty target
    assert_eq!(units[0].status, UnitStatus::Failed);
    assert_eq!(units[0].target_text, "");
    assert_eq!(units[0].source_text, "Click <b>here</b>");
    assert_eq!(units[1].status, UnitStatus::Translated);
}

#[tokio::test]
async fn test_run_withTransientFailure_shouldRetryAndSucceed() {
    let mock = Arc::new(MockProvider::without_batch().with_transient_failures(1));
    let calls = mock.calls();
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let mut units = units_from(&["hello"]);
    let mut job = quick_job(quick_config());
    let summary = engine.run(&mut job, &mut units, no_progress).await.unwrap();

    assert_eq!(summary.translated, 1);
    assert_eq!(summary.failed, 0);
    // First attempt failed transiently, second succeeded
    assert_eq!(calls.lock().unwrap().single_calls.len(), 2);
}

#[tokio::test]
async fn test_run_withBatchParallelConflict_shouldFailBeforeAnyCall() {
    let mock = Arc::new(MockProvider::new());
    let calls = mock.calls();
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let mut units = units_from(&["a"]);
    let mut job = quick_job(JobConfig {
        batch_size: 5,
        workers: 3,
        ..quick_config()
    });

    let result = engine.run(&mut job, &mut units, no_progress).await;

    assert!(result.is_err());
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(calls.lock().unwrap().request_count(), 0);
    assert_eq!(units[0].status, UnitStatus::Pending);
}

#[tokio::test]
async fn test_run_withInvalidLanguage_shouldFail() {
    let mock = Arc::new(MockProvider::new());
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let mut units = units_from(&["a"]);
    let mut job = quick_job(JobConfig {
        target_language: "zz".to_string(),
        ..quick_config()
    });

    assert!(engine.run(&mut job, &mut units, no_progress).await.is_err());
    assert_eq!(job.state, JobState::Failed);
}

#[tokio::test]
async fn test_run_withStopRequested_shouldInterruptWithoutCalls() {
    let mock = Arc::new(MockProvider::without_batch());
    let calls = mock.calls();
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    engine.stop_handle().stop();

    let mut units = units_from(&["a", "b"]);
    let mut job = quick_job(quick_config());
    engine.run(&mut job, &mut units, no_progress).await.unwrap();

    assert_eq!(job.state, JobState::Interrupted);
    assert!(units.iter().all(|u| u.status == UnitStatus::Pending));
    assert_eq!(calls.lock().unwrap().request_count(), 0);
}

#[tokio::test]
async fn test_run_shouldPersistFinalCheckpoint() {
    let storage = in_memory_storage();
    let mock = Arc::new(MockProvider::without_batch());
    let engine = engine_with_storage(mock, storage.clone(), true);

    let poisoned = format!("x {}", POISON);
    let mut units = units_from(&["a", &poisoned, "c"]);
    let mut job = quick_job(quick_config());
    engine.run(&mut job, &mut units, no_progress).await.unwrap();

    // Failed units are terminal too; the whole catalog is covered
    let record = CheckpointStore::new(storage)
        .load(&job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.completed_count, 3);
    assert_eq!(record.total_count, 3);
    assert_eq!(record.catalog_fingerprint, job.catalog_fingerprint);
}

#[tokio::test]
async fn test_run_withAlreadyTranslatedUnits_shouldSkipThem() {
    let mock = Arc::new(MockProvider::without_batch());
    let calls = mock.calls();
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let mut units = units_from(&["todo", "done"]);
    units[1].target_text = "hecho".to_string();
    units[1].status = UnitStatus::Translated;

    let mut job = quick_job(quick_config());
    let summary = engine.run(&mut job, &mut units, no_progress).await.unwrap();

    assert_eq!(summary.translated, 1);
    assert_eq!(units[1].target_text, "hecho");
    assert_eq!(calls.lock().unwrap().single_calls, vec!["todo".to_string()]);
}

#[tokio::test]
async fn test_run_withEmptyCatalog_shouldCompleteImmediately() {
    let mock = Arc::new(MockProvider::new());
    let engine = engine_with_storage(mock.clone(), in_memory_storage(), true);

    let mut units = units_from(&[]);
    let mut job = quick_job(quick_config());
    let summary = engine.run(&mut job, &mut units, no_progress).await.unwrap();

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(summary.total, 0);
    assert_eq!(mock.calls().lock().unwrap().request_count(), 0);
}

#[tokio::test]
async fn test_run_progress_shouldBeMonotonic() {
    let mock = Arc::new(MockProvider::without_batch());
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let mut units = units_from(&["a", "b", "c", "d"]);
    let mut job = quick_job(JobConfig {
        workers: 2,
        ..quick_config()
    });

    let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    engine
        .run(&mut job, &mut units, move |done, total| {
            assert_eq!(total, 4);
            seen_clone.lock().unwrap().push(done);
        })
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(*seen.last().unwrap(), 4);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}
