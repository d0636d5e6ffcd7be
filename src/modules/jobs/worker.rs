/// Background worker for bulk job execution
///
/// Consumes job ids from the dispatch channel and processes their items
/// with bounded parallelism, writing progress back to the store after every
/// item so external pollers observe live progress. One item's failure never
/// aborts the remaining items; only infrastructure faults force the whole
/// job to failed.
use crate::modules::billing::Entitlements;
use crate::modules::jobs::application::orchestrator::{JobMessage, MANIFEST_FILE};
use crate::modules::jobs::assembler;
use crate::modules::jobs::domain::entities::{ItemFailure, ItemSuccess, JobRecord, ManifestEntry};
use crate::modules::jobs::domain::repository::JobStore;
use crate::modules::processing::ItemProcessor;
use crate::modules::storage::FileStorage;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::logger::LogContext;
use crate::{log_error, log_info, log_warn};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One input file planned from the job's manifest
#[derive(Debug, Clone)]
struct PlannedItem {
    index: usize,
    original_name: String,
    rel_path: String,
}

enum ItemOutcome {
    Success(ItemSuccess),
    Failure(ItemFailure),
}

pub struct JobWorker {
    store: Arc<dyn JobStore>,
    storage: Arc<dyn FileStorage>,
    processor: Arc<dyn ItemProcessor>,
    billing: Arc<dyn Entitlements>,
    /// Max jobs processed at once by this worker
    job_concurrency: usize,
    /// Max items of one job processed at once
    item_concurrency: usize,
}

impl JobWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        storage: Arc<dyn FileStorage>,
        processor: Arc<dyn ItemProcessor>,
        billing: Arc<dyn Entitlements>,
        job_concurrency: usize,
        item_concurrency: usize,
    ) -> Self {
        Self {
            store,
            storage,
            processor,
            billing,
            job_concurrency: job_concurrency.max(1),
            item_concurrency: item_concurrency.max(1),
        }
    }

    /// Worker loop: pull job ids from the queue until cancelled or the
    /// queue closes. Jobs run as spawned tasks bounded by job_concurrency
    /// so one large job cannot starve the queue.
    pub async fn run(
        self: Arc<Self>,
        mut queue: mpsc::Receiver<JobMessage>,
        cancel: CancellationToken,
    ) {
        log_info!("Job worker started");

        let gate = Arc::new(Semaphore::new(self.job_concurrency));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log_info!("Job worker stopped");
                    break;
                }
                message = queue.recv() => {
                    let Some(message) = message else {
                        log_info!("Job queue closed, worker stopping");
                        break;
                    };
                    let Ok(permit) = gate.clone().acquire_owned().await else {
                        break;
                    };
                    let worker = Arc::clone(&self);
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(e) = worker.process_job(message.job_id).await {
                            log_error!("Worker error for job {}: {}", message.job_id, e);
                        }
                    });
                }
            }
        }
    }

    /// Execute one job end to end. Safe to call again for a job that is
    /// already processing or terminal: the store-level CAS detects the
    /// re-dispatch and the call returns without reprocessing.
    pub async fn process_job(&self, job_id: Uuid) -> AppResult<()> {
        let Some(job) = self.store.get(job_id).await? else {
            log_warn!("Dispatch received for unknown job {}", job_id);
            return Ok(());
        };

        if !self.store.try_mark_processing(job_id).await? {
            log_info!(
                "Job {} is already {}; skipping re-dispatch",
                job_id,
                job.status
            );
            return Ok(());
        }

        if let Err(e) = self.run_items(&job).await {
            // Fail-safe: an infrastructure fault forces the job to failed,
            // even when some items had already succeeded
            log_error!("Job {} hit an infrastructure fault: {}", job_id, e);
            if let Err(mark) = self.store.mark_failed(job_id, &e.to_string()).await {
                log_error!("Job {}: could not record failure: {}", job_id, mark);
            }
        }

        Ok(())
    }

    async fn run_items(&self, job: &JobRecord) -> AppResult<()> {
        let items = self.plan_items(job).await?;
        let total = items.len();

        let outcomes: Vec<AppResult<ItemOutcome>> = stream::iter(items)
            .map(|item| self.run_item(job, item))
            .buffer_unordered(self.item_concurrency)
            .collect()
            .await;

        let mut successes: Vec<ItemSuccess> = Vec::new();
        let mut failures: Vec<ItemFailure> = Vec::new();
        for outcome in outcomes {
            match outcome? {
                ItemOutcome::Success(s) => successes.push(s),
                ItemOutcome::Failure(f) => failures.push(f),
            }
        }
        successes.sort_by_key(|s| s.index);
        failures.sort_by_key(|f| f.index);

        if successes.is_empty() {
            log_warn!("Job {}: all {} items failed", job.id, total);
            self.store
                .mark_failed(job.id, &format!("all {} items failed", total))
                .await?;
            return Ok(());
        }

        let working_dir = self.storage.resolve(&job.working_directory);
        let success_count = successes.len();
        let failure_count = failures.len();
        let job_id = job.id;

        // Zip assembly is synchronous disk work; keep it off the async pool
        let (archive_name, archive_size) = tokio::task::spawn_blocking(move || {
            assembler::build_archive(&working_dir, job_id, &successes, &failures)
        })
        .await
        .map_err(|e| AppError::InternalError(format!("Archive task failed: {}", e)))??;
        let result_path = format!("{}/{}", job.working_directory, archive_name);

        let error_message = if failure_count == 0 {
            None
        } else {
            Some(format!("{} of {} items failed", failure_count, total))
        };

        self.store
            .mark_completed(job.id, &result_path, archive_size, error_message.as_deref())
            .await?;

        // One usage increment per job, by the number of successful items
        if let Err(e) = self
            .billing
            .increment_usage(&job.owner_id, success_count as u32)
            .await
        {
            log_warn!("Job {}: failed to record usage: {}", job.id, e);
        }

        log_info!(
            "Job {} completed: {} succeeded, {} failed",
            job.id,
            success_count,
            failure_count
        );
        Ok(())
    }

    async fn run_item(&self, job: &JobRecord, item: PlannedItem) -> AppResult<ItemOutcome> {
        let input = self.storage.resolve(&item.rel_path);

        let outcome = match self.processor.process(&input, &job.settings).await {
            Ok(output) => ItemOutcome::Success(ItemSuccess {
                index: item.index,
                original_name: item.original_name,
                output_path: output.output_path,
                output_size_bytes: output.output_size_bytes,
            }),
            Err(e) => {
                log_warn!(
                    "Job {}: item {} ({}) failed: {}",
                    job.id,
                    item.index,
                    item.original_name,
                    e
                );
                ItemOutcome::Failure(ItemFailure {
                    index: item.index,
                    original_name: item.original_name,
                    error: e.to_string(),
                })
            }
        };

        // Persist a progress snapshot after every item, success or failure
        let completed = self.store.increment_progress(job.id, 1).await?;
        LogContext::job_progress(&job.id.to_string(), completed, job.item_count);

        Ok(outcome)
    }

    /// Load the item list from the manifest persisted next to the inputs;
    /// stored names are sanitized, the manifest keeps the uploaded ones
    async fn plan_items(&self, job: &JobRecord) -> AppResult<Vec<PlannedItem>> {
        let manifest_path = format!("{}/{}", job.working_directory, MANIFEST_FILE);
        let bytes = self.storage.read(&manifest_path).await.map_err(|e| {
            AppError::StorageError(format!(
                "Working directory {} has no item manifest: {}",
                job.working_directory, e
            ))
        })?;
        let entries: Vec<ManifestEntry> = serde_json::from_slice(&bytes)?;

        let mut items: Vec<PlannedItem> = entries
            .into_iter()
            .map(|e| PlannedItem {
                index: e.index,
                original_name: e.original_name,
                rel_path: format!("{}/{}", job.working_directory, e.stored_name),
            })
            .collect();
        items.sort_by_key(|i| i.index);

        if items.is_empty() {
            return Err(AppError::StorageError(format!(
                "Working directory {} has no input files",
                job.working_directory
            )));
        }

        Ok(items)
    }
}
