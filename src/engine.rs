/// Engine facade wiring admission, orchestration, workers, and retention
/// behind one handle
use crate::modules::admission::domain::{AdmissionError, AdmissionResult, FileDescriptor};
use crate::modules::admission::QuotaValidator;
use crate::modules::billing::Entitlements;
use crate::modules::jobs::application::orchestrator::{
    BulkOrchestrator, DispatchReceipt, IncomingFile, JobMessage,
};
use crate::modules::jobs::domain::entities::JobProgress;
use crate::modules::jobs::domain::repository::JobStore;
use crate::modules::jobs::worker::JobWorker;
use crate::modules::processing::ItemProcessor;
use crate::modules::retention::policy::RetentionPolicy;
use crate::modules::retention::sweeper::{CleanupStatistics, SweepReport, Sweeper};
use crate::modules::storage::FileStorage;
use crate::shared::errors::{AppError, AppResult};
use crate::log_info;
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity of the dispatch channel
    pub queue_depth: usize,
    /// Jobs processed concurrently by the worker
    pub job_concurrency: usize,
    /// Items of one job processed concurrently
    pub item_concurrency: usize,
    pub sweep_interval: std::time::Duration,
    pub retention: RetentionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            job_concurrency: 4,
            item_concurrency: 4,
            sweep_interval: std::time::Duration::from_secs(15 * 60),
            retention: RetentionPolicy::default(),
        }
    }
}

pub struct BulkEngine {
    validator: QuotaValidator,
    orchestrator: BulkOrchestrator,
    worker: Arc<JobWorker>,
    sweeper: Arc<Sweeper>,
    /// Held until spawn_workers hands it to the worker loop
    queue_rx: Mutex<Option<mpsc::Receiver<JobMessage>>>,
    cancel: CancellationToken,
}

impl BulkEngine {
    pub fn new(
        store: Arc<dyn JobStore>,
        storage: Arc<dyn FileStorage>,
        processor: Arc<dyn ItemProcessor>,
        billing: Arc<dyn Entitlements>,
        config: EngineConfig,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_depth.max(1));

        let validator = QuotaValidator::new(Arc::clone(&billing));
        let orchestrator =
            BulkOrchestrator::new(Arc::clone(&store), Arc::clone(&storage), queue_tx);
        let worker = Arc::new(JobWorker::new(
            Arc::clone(&store),
            Arc::clone(&storage),
            processor,
            Arc::clone(&billing),
            config.job_concurrency,
            config.item_concurrency,
        ));
        let sweeper = Arc::new(Sweeper::new(
            store,
            storage,
            billing,
            config.retention,
            config.sweep_interval,
        ));

        Self {
            validator,
            orchestrator,
            worker,
            sweeper,
            queue_rx: Mutex::new(Some(queue_rx)),
            cancel: CancellationToken::new(),
        }
    }

    /// Start the background worker loop. Call once; a second call fails
    /// because the dispatch channel has a single consumer.
    pub fn spawn_workers(&self) -> AppResult<()> {
        let rx = self
            .queue_rx
            .lock()
            .map_err(|_| AppError::InternalError("Engine state lock poisoned".to_string()))?
            .take()
            .ok_or_else(|| AppError::InternalError("Workers already started".to_string()))?;

        tokio::spawn(Arc::clone(&self.worker).run(rx, self.cancel.clone()));
        log_info!("Engine workers started");
        Ok(())
    }

    /// Start the periodic retention sweeper
    pub fn spawn_sweeper(&self) {
        tokio::spawn(Arc::clone(&self.sweeper).run(self.cancel.clone()));
        log_info!("Engine sweeper started");
    }

    /// Admission check only; no state is created either way. On success the
    /// caller gets the admitted-batch summary (count, total size, tier).
    pub async fn validate_and_admit(
        &self,
        owner_id: &str,
        files: &[FileDescriptor],
    ) -> AppResult<AdmissionResult> {
        self.validator.validate(owner_id, files).await
    }

    /// Full intake path: admission, persistence, dispatch. The outer error
    /// is infrastructure failure; the inner one a rejected batch.
    pub async fn create_and_dispatch(
        &self,
        owner_id: &str,
        files: Vec<IncomingFile>,
        settings: JsonValue,
    ) -> AppResult<Result<DispatchReceipt, AdmissionError>> {
        let descriptors: Vec<FileDescriptor> = files.iter().map(|f| f.descriptor()).collect();
        if let Err(rejection) = self.validator.validate(owner_id, &descriptors).await? {
            return Ok(Err(rejection));
        }

        let job = self
            .orchestrator
            .create_bulk_job(owner_id, &files, settings)
            .await?;
        let task_handle = self.orchestrator.dispatch(&job).await?;

        Ok(Ok(DispatchReceipt {
            job_id: job.id,
            task_handle,
        }))
    }

    pub async fn get_progress(&self, job_id: Uuid) -> AppResult<JobProgress> {
        self.orchestrator.get_progress(job_id).await
    }

    pub async fn get_result_path(&self, job_id: Uuid, owner_id: &str) -> AppResult<String> {
        self.orchestrator.get_result_path(job_id, owner_id).await
    }

    /// Run one sweep immediately, outside the periodic schedule
    pub async fn run_sweep_now(&self) -> AppResult<SweepReport> {
        self.sweeper.sweep().await
    }

    pub async fn cleanup_statistics(&self) -> AppResult<CleanupStatistics> {
        self.sweeper.statistics().await
    }

    /// Stop background loops; in-flight jobs finish their current await
    pub fn shutdown(&self) {
        self.cancel.cancel();
        log_info!("Engine shutdown requested");
    }
}
