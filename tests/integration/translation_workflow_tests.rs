/*!
 * End-to-end catalog translation tests
 *
 * Parse a PO catalog, run it through the engine with a mock backend,
 * write the result and read it back.
 */

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use traduki::catalog::{Catalog, UnitStatus};
use traduki::engine::{Job, JobConfig, JobState};

use crate::common::mock_provider::{MockProvider, POISON};
use crate::common::{engine_with_storage, in_memory_storage, no_progress};

const SAMPLE_PO: &str = r#"msgid ""
msgstr "Content-Type: text/plain; charset=UTF-8\n"

#: src/form.php:12
msgid "Click <b>%s</b> to continue"
msgstr ""

msgid "Welcome back"
msgstr ""

msgid "Already translated"
msgstr "Ya traducido"
"#;

fn workflow_config() -> JobConfig {
    JobConfig {
        target_language: "es".to_string(),
        inter_request_delay: Duration::ZERO,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_workflow_shouldTranslateOnlyUntranslatedEntries() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("messages.po");
    let output = dir.path().join("messages_es.po");
    std::fs::write(&input, SAMPLE_PO).unwrap();

    let mut catalog = Catalog::from_file(&input).unwrap();
    assert_eq!(catalog.untranslated_indices().len(), 2);

    let mock = Arc::new(MockProvider::without_batch());
    let calls = mock.calls();
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let mut job = Job::new(&output, catalog.fingerprint(), workflow_config());
    let summary = engine
        .run(&mut job, &mut catalog.units, no_progress)
        .await
        .unwrap();

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(summary.translated, 2);

    // The header and the already-translated entry were never sent
    assert_eq!(calls.lock().unwrap().request_count(), 2);

    catalog.write_to_file(&output).unwrap();
    let reloaded = Catalog::from_file(&output).unwrap();

    assert_eq!(reloaded.len(), 4);
    assert_eq!(
        reloaded.units[1].target_text,
        "[es] Click <b>%s</b> to continue"
    );
    assert_eq!(reloaded.units[2].target_text, "[es] Welcome back");
    assert_eq!(reloaded.units[3].target_text, "Ya traducido");
    // Comments survive the round trip
    assert_eq!(reloaded.units[1].comments, vec!["#: src/form.php:12"]);
}

#[tokio::test]
async fn test_workflow_failedUnit_shouldStayUntranslatedInOutput() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out_es.po");

    let po = format!(
        "msgid \"good entry\"\nmsgstr \"\"\n\nmsgid \"{} entry\"\nmsgstr \"\"\n",
        POISON
    );
    let mut catalog = Catalog {
        source_file: dir.path().join("in.po"),
        units: Catalog::parse(&po).unwrap(),
    };

    let mock = Arc::new(MockProvider::without_batch());
    let engine = engine_with_storage(mock, in_memory_storage(), true);

    let mut job = Job::new(&output, catalog.fingerprint(), workflow_config());
    let summary = engine
        .run(&mut job, &mut catalog.units, no_progress)
        .await
        .unwrap();

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(summary.failed, 1);

    catalog.write_to_file(&output).unwrap();
    let reloaded = Catalog::from_file(&output).unwrap();

    // The failed entry keeps its source text and an empty msgstr: never
    // blank source, never corrupted output
    assert!(reloaded.units[1].source_text.contains("entry"));
    assert_eq!(reloaded.units[1].target_text, "");
    assert_eq!(reloaded.units[1].status, UnitStatus::Pending);
    assert_eq!(reloaded.units[0].target_text, "[es] good entry");
}

#[tokio::test]
async fn test_workflow_rerunWithCache_shouldNotCallBackend() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("messages.po");
    let output = dir.path().join("messages_es.po");
    std::fs::write(&input, SAMPLE_PO).unwrap();

    let storage = in_memory_storage();

    // First run fills the cache
    let mut catalog = Catalog::from_file(&input).unwrap();
    let mock = Arc::new(MockProvider::without_batch());
    let engine = engine_with_storage(mock, storage.clone(), true);
    let mut job = Job::new(&output, catalog.fingerprint(), workflow_config());
    engine
        .run(&mut job, &mut catalog.units, no_progress)
        .await
        .unwrap();

    // Second run over the unchanged input is served entirely from cache
    let mut catalog2 = Catalog::from_file(&input).unwrap();
    let mock2 = Arc::new(MockProvider::without_batch());
    let engine2 = engine_with_storage(mock2.clone(), storage, true);
    let mut job2 = Job::new(&output, catalog2.fingerprint(), workflow_config());
    let summary = engine2
        .run(&mut job2, &mut catalog2.units, no_progress)
        .await
        .unwrap();

    assert_eq!(mock2.calls().lock().unwrap().request_count(), 0);
    assert_eq!(summary.cached, 2);
}
