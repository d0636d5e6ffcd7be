mod utils;

use pdfmill::engine::{BulkEngine, EngineConfig};
use pdfmill::modules::billing::Tier;
use pdfmill::modules::jobs::application::BulkOrchestrator;
use pdfmill::modules::jobs::domain::entities::{ItemFailure, JobKind, JobStatus, NewJobRecord};
use pdfmill::modules::jobs::domain::repository::JobStore;
use pdfmill::modules::jobs::infrastructure::InMemoryJobStore;
use pdfmill::modules::storage::FileStorage;
use pdfmill::shared::errors::AppError;
use std::sync::Arc;
use std::time::Duration;
use utils::factories::{free_limits, pdf_descriptor, pdf_upload, premium_limits};
use utils::helpers::{FlakyStorage, StubProcessor, TestContext};
use uuid::Uuid;

fn archive_entries(path: &std::path::Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

async fn wait_for_terminal(engine: &BulkEngine, job_id: Uuid) -> JobStatus {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let progress = engine.get_progress(job_id).await.unwrap();
            if progress.status.is_terminal() {
                return progress.status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job did not reach a terminal status in time")
}

#[tokio::test]
async fn engine_runs_a_bulk_job_to_completion() {
    let ctx = TestContext::new(premium_limits());
    let engine = BulkEngine::new(
        ctx.store.clone(),
        ctx.storage.clone(),
        Arc::new(StubProcessor::passing()),
        ctx.billing.clone(),
        EngineConfig::default(),
    );
    engine.spawn_workers().unwrap();

    let files = vec![pdf_upload("report.pdf", 1024), pdf_upload("invoice.pdf", 2048)];
    let receipt = engine
        .create_and_dispatch("owner-1", files, serde_json::json!({"quality": "high"}))
        .await
        .unwrap()
        .unwrap();

    let status = wait_for_terminal(&engine, receipt.job_id).await;
    assert_eq!(status, JobStatus::Completed);

    let progress = engine.get_progress(receipt.job_id).await.unwrap();
    assert_eq!(progress.completed_count, 2);
    assert_eq!(progress.progress_percent, 100.0);
    assert!(progress.error_message.is_none());

    let result_path = engine
        .get_result_path(receipt.job_id, "owner-1")
        .await
        .unwrap();
    let entries = archive_entries(&ctx.storage.resolve(&result_path));
    assert_eq!(entries, vec!["invoice.pdf", "report.pdf"]);

    // One usage increment per job, counting successful items
    assert_eq!(
        ctx.billing.recorded_usage(),
        vec![("owner-1".to_string(), 2)]
    );

    engine.shutdown();
}

#[tokio::test]
async fn rejected_batches_create_no_state() {
    let ctx = TestContext::new(free_limits());
    let engine = BulkEngine::new(
        ctx.store.clone(),
        ctx.storage.clone(),
        Arc::new(StubProcessor::passing()),
        ctx.billing.clone(),
        EngineConfig::default(),
    );

    let files = vec![pdf_upload("a.pdf", 100), pdf_upload("b.pdf", 100)];
    let outcome = engine
        .create_and_dispatch("owner-free", files, serde_json::json!({}))
        .await
        .unwrap();

    let rejection = outcome.unwrap_err();
    assert_eq!(rejection.error_code(), "PREMIUM_REQUIRED");
    assert!(ctx.store.is_empty());
    assert!(ctx.storage.list_dir("").await.unwrap().is_empty());
}

#[tokio::test]
async fn partial_failure_completes_with_error_list() {
    let ctx = TestContext::new(premium_limits());
    let (orchestrator, _rx) = ctx.orchestrator();

    let files = vec![
        pdf_upload("a.pdf", 512),
        pdf_upload("bad.pdf", 512),
        pdf_upload("c.pdf", 512),
    ];
    let job = orchestrator
        .create_bulk_job("owner-1", &files, serde_json::json!({}))
        .await
        .unwrap();

    let worker = ctx.worker(Arc::new(StubProcessor::failing_on("bad")));
    worker.process_job(job.id).await.unwrap();

    let done = ctx.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.completed_count, 3);
    assert_eq!(done.error_message.as_deref(), Some("1 of 3 items failed"));

    let result_path = done.result_path.unwrap();
    let archive_path = ctx.storage.resolve(&result_path);
    let entries = archive_entries(&archive_path);
    assert_eq!(entries, vec!["a.pdf", "c.pdf", "errors.json"]);

    let mut archive = zip::ZipArchive::new(std::fs::File::open(&archive_path).unwrap()).unwrap();
    let entry = archive.by_name("errors.json").unwrap();
    let failures: Vec<ItemFailure> = serde_json::from_reader(entry).unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].original_name, "bad.pdf");
    assert_eq!(failures[0].index, 1);

    // Only the two successes count against the daily quota
    assert_eq!(
        ctx.billing.recorded_usage(),
        vec![("owner-1".to_string(), 2)]
    );
}

#[tokio::test]
async fn archive_restores_filenames_the_sanitizer_changed() {
    let ctx = TestContext::new(premium_limits());
    let (orchestrator, _rx) = ctx.orchestrator();

    // Both names are stored sanitized on disk but must come back verbatim
    let files = vec![pdf_upload("my report.pdf", 512), pdf_upload("café.pdf", 512)];
    let job = orchestrator
        .create_bulk_job("owner-1", &files, serde_json::json!({}))
        .await
        .unwrap();

    let worker = ctx.worker(Arc::new(StubProcessor::passing()));
    worker.process_job(job.id).await.unwrap();

    let done = ctx.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);

    let entries = archive_entries(&ctx.storage.resolve(&done.result_path.unwrap()));
    assert_eq!(entries, vec!["café.pdf", "my report.pdf"]);
}

#[tokio::test]
async fn missing_manifest_fails_the_job() {
    let ctx = TestContext::new(premium_limits());

    // Job record exists but nothing was ever written to its directory
    let job = ctx
        .store
        .create(NewJobRecord {
            id: Uuid::new_v4(),
            owner_id: "owner-1".to_string(),
            kind: JobKind::Bulk,
            item_count: 2,
            original_size_bytes: 1024,
            settings: serde_json::json!({}),
            working_directory: "owner-1/missing".to_string(),
        })
        .await
        .unwrap();

    let worker = ctx.worker(Arc::new(StubProcessor::passing()));
    worker.process_job(job.id).await.unwrap();

    let done = ctx.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Failed);
    assert!(done
        .error_message
        .as_deref()
        .unwrap()
        .contains("no item manifest"));
}

#[tokio::test]
async fn validate_and_admit_reports_the_batch_summary() {
    let ctx = TestContext::new(premium_limits());
    let engine = BulkEngine::new(
        ctx.store.clone(),
        ctx.storage.clone(),
        Arc::new(StubProcessor::passing()),
        ctx.billing.clone(),
        EngineConfig::default(),
    );

    let files = [pdf_descriptor("a.pdf", 1000), pdf_descriptor("b.pdf", 2000)];
    let batch = engine
        .validate_and_admit("owner-1", &files)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(batch.file_count, 2);
    assert_eq!(batch.total_size_bytes, 3000);
    assert_eq!(batch.tier, Tier::Premium);
}

#[tokio::test]
async fn job_fails_when_every_item_fails() {
    let ctx = TestContext::new(premium_limits());
    let (orchestrator, _rx) = ctx.orchestrator();

    let files = vec![pdf_upload("bad_one.pdf", 512), pdf_upload("bad_two.pdf", 512)];
    let job = orchestrator
        .create_bulk_job("owner-1", &files, serde_json::json!({}))
        .await
        .unwrap();

    let worker = ctx.worker(Arc::new(StubProcessor::failing_on("bad")));
    worker.process_job(job.id).await.unwrap();

    let done = ctx.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.error_message.as_deref(), Some("all 2 items failed"));
    assert!(done.result_path.is_none());
    assert!(ctx.billing.recorded_usage().is_empty());
}

#[tokio::test]
async fn redispatch_of_a_finished_job_is_a_no_op() {
    let ctx = TestContext::new(premium_limits());
    let (orchestrator, _rx) = ctx.orchestrator();

    let files = vec![pdf_upload("a.pdf", 512)];
    let job = orchestrator
        .create_bulk_job("owner-1", &files, serde_json::json!({}))
        .await
        .unwrap();

    let worker = ctx.worker(Arc::new(StubProcessor::passing()));
    worker.process_job(job.id).await.unwrap();
    worker.process_job(job.id).await.unwrap();

    let done = ctx.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.completed_count, 1);
    assert_eq!(
        ctx.billing.recorded_usage(),
        vec![("owner-1".to_string(), 1)]
    );
}

#[tokio::test]
async fn failed_persist_rolls_back_the_working_directory() {
    let tempdir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryJobStore::new());
    let storage = Arc::new(FlakyStorage::new(tempdir.path()));
    let (tx, _rx) = tokio::sync::mpsc::channel(4);
    let orchestrator = BulkOrchestrator::new(store.clone(), storage.clone(), tx);

    // First file persists, the second one hits the injected write failure
    let files = vec![pdf_upload("fine.pdf", 256), pdf_upload("boom.pdf", 256)];
    let err = orchestrator
        .create_bulk_job("owner-1", &files, serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StorageError(_)));

    assert!(store.is_empty());
    let owner_dirs = storage.list_dir("owner-1").await.unwrap();
    assert!(owner_dirs.is_empty());
}

#[tokio::test]
async fn dispatch_stores_the_task_handle_and_queues_the_job() {
    let ctx = TestContext::new(premium_limits());
    let (orchestrator, mut rx) = ctx.orchestrator();

    let files = vec![pdf_upload("a.pdf", 256)];
    let job = orchestrator
        .create_bulk_job("owner-1", &files, serde_json::json!({}))
        .await
        .unwrap();

    let handle = orchestrator.dispatch(&job).await.unwrap();

    let message = rx.recv().await.unwrap();
    assert_eq!(message.job_id, job.id);

    let stored = ctx.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(stored.task_handle.as_deref(), Some(handle.as_str()));
}

#[tokio::test]
async fn result_path_is_owner_scoped() {
    let ctx = TestContext::new(premium_limits());
    let (orchestrator, _rx) = ctx.orchestrator();

    let files = vec![pdf_upload("a.pdf", 256)];
    let job = orchestrator
        .create_bulk_job("owner-1", &files, serde_json::json!({}))
        .await
        .unwrap();

    let worker = ctx.worker(Arc::new(StubProcessor::passing()));
    worker.process_job(job.id).await.unwrap();

    let err = orchestrator
        .get_result_path(job.id, "someone-else")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    assert!(orchestrator.get_result_path(job.id, "owner-1").await.is_ok());
}
