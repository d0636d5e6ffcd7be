/// Bulk Orchestrator: turns an admitted batch into a persisted job plus
/// saved input files, then hands the job to the dispatcher queue.
use crate::modules::admission::domain::{sanitize_filename, FileDescriptor};
use crate::modules::jobs::domain::entities::{
    JobKind, JobProgress, JobRecord, ManifestEntry, NewJobRecord,
};
use crate::modules::jobs::domain::repository::JobStore;
use crate::modules::storage::FileStorage;
use crate::shared::errors::{AppError, AppResult};
use crate::{log_info, log_warn};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Manifest written into the working directory next to the inputs, mapping
/// sanitized stored names back to the uploaded ones
pub const MANIFEST_FILE: &str = "manifest.json";

/// One uploaded file as received from the web layer
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    /// Derive the admission-time descriptor for this upload
    pub fn descriptor(&self) -> FileDescriptor {
        FileDescriptor {
            name: self.name.clone(),
            size_bytes: self.bytes.len() as i64,
            content_type: self.content_type.clone(),
            head: self.bytes.iter().take(8).copied().collect(),
        }
    }
}

/// Message placed on the worker channel; workers pull and write back to the
/// store, pollers only ever read the store
#[derive(Debug, Clone, Copy)]
pub struct JobMessage {
    pub job_id: Uuid,
}

/// Handed back to the web layer after a successful dispatch
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReceipt {
    pub job_id: Uuid,
    pub task_handle: String,
}

pub struct BulkOrchestrator {
    store: Arc<dyn JobStore>,
    storage: Arc<dyn FileStorage>,
    queue: mpsc::Sender<JobMessage>,
}

impl BulkOrchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        storage: Arc<dyn FileStorage>,
        queue: mpsc::Sender<JobMessage>,
    ) -> Self {
        Self {
            store,
            storage,
            queue,
        }
    }

    /// Persist inputs and create the job record as one logical unit: a
    /// failure partway removes the working directory and leaves no record.
    pub async fn create_bulk_job(
        &self,
        owner_id: &str,
        files: &[IncomingFile],
        settings: JsonValue,
    ) -> AppResult<JobRecord> {
        if files.is_empty() {
            return Err(AppError::InvalidInput(
                "Cannot create a job from an empty batch".to_string(),
            ));
        }

        let job_id = Uuid::new_v4();
        let working_directory = format!("{}/{}", owner_id, job_id);

        self.storage.create_dir(&working_directory).await?;

        let mut original_size_bytes = 0i64;
        let mut manifest: Vec<ManifestEntry> = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            let stored_name = format!("{}_{}", index, sanitize_filename(&file.name));
            let stored_path = format!("{}/{}", working_directory, stored_name);
            if let Err(e) = self.storage.save(&stored_path, &file.bytes).await {
                self.rollback_directory(&working_directory).await;
                return Err(e);
            }
            original_size_bytes += file.bytes.len() as i64;
            manifest.push(ManifestEntry {
                index,
                original_name: file.name.clone(),
                stored_name,
            });
        }

        if let Err(e) = self.write_manifest(&working_directory, &manifest).await {
            self.rollback_directory(&working_directory).await;
            return Err(e);
        }

        let kind = if files.len() == 1 {
            JobKind::Single
        } else {
            JobKind::Bulk
        };

        let created = self
            .store
            .create(NewJobRecord {
                id: job_id,
                owner_id: owner_id.to_string(),
                kind,
                item_count: files.len() as i32,
                original_size_bytes,
                settings,
                working_directory: working_directory.clone(),
            })
            .await;

        match created {
            Ok(job) => {
                log_info!(
                    "Created {} job {} for owner {} ({} files, {} bytes)",
                    job.kind,
                    job.id,
                    owner_id,
                    job.item_count,
                    job.original_size_bytes
                );
                Ok(job)
            }
            Err(e) => {
                self.rollback_directory(&working_directory).await;
                Err(e)
            }
        }
    }

    /// Fire-and-forget hand-off to the worker channel; returns the task
    /// handle stored on the job for later correlation
    pub async fn dispatch(&self, job: &JobRecord) -> AppResult<String> {
        let handle = Uuid::new_v4().to_string();
        self.store.set_task_handle(job.id, &handle).await?;

        self.queue
            .send(JobMessage { job_id: job.id })
            .await
            .map_err(|_| AppError::InternalError("Job queue is closed".to_string()))?;

        log_info!("Dispatched job {} (task handle {})", job.id, handle);
        Ok(handle)
    }

    /// Progress snapshot straight from the store; never waits on dispatch
    pub async fn get_progress(&self, job_id: Uuid) -> AppResult<JobProgress> {
        let job = self
            .store
            .get(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

        Ok(job.progress())
    }

    /// Result location, only for the job's owner and only once completed
    /// with at least one success
    pub async fn get_result_path(&self, job_id: Uuid, owner_id: &str) -> AppResult<String> {
        let job = self
            .store
            .get(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

        if job.owner_id != owner_id {
            return Err(AppError::Unauthorized(
                "Job belongs to another owner".to_string(),
            ));
        }

        job.result_path
            .ok_or_else(|| AppError::NotFound(format!("Job {} has no result available", job_id)))
    }

    async fn write_manifest(
        &self,
        working_directory: &str,
        manifest: &[ManifestEntry],
    ) -> AppResult<()> {
        let bytes = serde_json::to_vec(manifest)?;
        self.storage
            .save(&format!("{}/{}", working_directory, MANIFEST_FILE), &bytes)
            .await
    }

    async fn rollback_directory(&self, working_directory: &str) {
        if let Err(e) = self.storage.delete_dir(working_directory).await {
            log_warn!(
                "Failed to roll back working directory {}: {}",
                working_directory,
                e
            );
        }
    }
}
