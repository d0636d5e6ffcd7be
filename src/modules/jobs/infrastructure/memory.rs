/// DashMap-backed implementation of JobStore
///
/// The single authoritative state holder for embedded runs and tests: every
/// mutation happens under the map's per-entry lock, so increments and status
/// transitions have the same atomicity guarantees as the SQL store.
use crate::modules::jobs::domain::entities::{
    JobRecord, JobStatus, NewJobRecord, StatusCounts,
};
use crate::modules::jobs::domain::repository::JobStore;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<Uuid, JobRecord>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fully-formed record, bypassing lifecycle defaults.
    /// Intended for embedding and test fixtures that need backdated jobs.
    pub fn insert(&self, record: JobRecord) {
        self.jobs.insert(record.id, record);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: NewJobRecord) -> AppResult<JobRecord> {
        let record = JobRecord {
            id: job.id,
            owner_id: job.owner_id,
            kind: job.kind,
            status: JobStatus::Pending,
            item_count: job.item_count,
            completed_count: 0,
            original_size_bytes: job.original_size_bytes,
            result_size_bytes: None,
            settings: job.settings,
            working_directory: job.working_directory,
            result_path: None,
            error_message: None,
            task_handle: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        self.jobs.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, job_id: Uuid) -> AppResult<Option<JobRecord>> {
        Ok(self.jobs.get(&job_id).map(|j| j.clone()))
    }

    async fn try_mark_processing(&self, job_id: Uuid) -> AppResult<bool> {
        match self.jobs.get_mut(&job_id) {
            Some(mut job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Processing;
                job.started_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_progress(&self, job_id: Uuid, delta: i32) -> AppResult<i32> {
        let mut job = self
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

        job.completed_count = (job.completed_count + delta).min(job.item_count);
        Ok(job.completed_count)
    }

    async fn mark_completed(
        &self,
        job_id: Uuid,
        result_path: &str,
        result_size_bytes: i64,
        error_message: Option<&str>,
    ) -> AppResult<()> {
        let mut job = self
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

        if job.is_terminal() {
            return Err(AppError::ValidationError(format!(
                "Job {} is already terminal",
                job_id
            )));
        }

        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now());
        job.result_path = Some(result_path.to_string());
        job.result_size_bytes = Some(result_size_bytes);
        job.error_message = error_message.map(str::to_string);
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, reason: &str) -> AppResult<()> {
        let mut job = self
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

        if job.is_terminal() {
            return Err(AppError::ValidationError(format!(
                "Job {} is already terminal",
                job_id
            )));
        }

        job.status = JobStatus::Failed;
        job.completed_at = Some(Utc::now());
        job.error_message = Some(reason.to_string());
        Ok(())
    }

    async fn set_task_handle(&self, job_id: Uuid, handle: &str) -> AppResult<()> {
        let mut job = self
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

        job.task_handle = Some(handle.to_string());
        Ok(())
    }

    async fn list_expired(
        &self,
        status: JobStatus,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<JobRecord>> {
        Ok(self
            .jobs
            .iter()
            .filter(|j| j.status == status && j.retention_reference() < cutoff)
            .map(|j| j.clone())
            .collect())
    }

    async fn list_by_owner(&self, owner_id: &str) -> AppResult<Vec<JobRecord>> {
        Ok(self
            .jobs
            .iter()
            .filter(|j| j.owner_id == owner_id)
            .map(|j| j.clone())
            .collect())
    }

    async fn list_all(&self) -> AppResult<Vec<JobRecord>> {
        Ok(self.jobs.iter().map(|j| j.clone()).collect())
    }

    async fn delete(&self, job_id: Uuid) -> AppResult<bool> {
        Ok(self.jobs.remove(&job_id).is_some())
    }

    async fn count_by_status(&self) -> AppResult<StatusCounts> {
        let mut counts = StatusCounts::default();
        for job in self.jobs.iter() {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
            counts.total += 1;
        }
        Ok(counts)
    }
}
