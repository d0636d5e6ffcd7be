/// Store trait for job persistence
///
/// The job record is the single source of truth shared by admission,
/// dispatch, and retention; every mutation here must be safe under
/// concurrent writers (parallel item workers, the sweeper).
use super::entities::{JobRecord, JobStatus, NewJobRecord, StatusCounts};
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job in `pending`
    async fn create(&self, job: NewJobRecord) -> AppResult<JobRecord>;

    async fn get(&self, job_id: Uuid) -> AppResult<Option<JobRecord>>;

    /// Atomic pending -> processing transition, stamping started_at.
    /// Returns false when the job is already processing or terminal; this is
    /// the idempotency gate for re-dispatch.
    async fn try_mark_processing(&self, job_id: Uuid) -> AppResult<bool>;

    /// Atomically add `delta` finished items, clamped to item_count.
    /// Returns the new completed_count.
    async fn increment_progress(&self, job_id: Uuid, delta: i32) -> AppResult<i32>;

    /// Terminal transition; rejected when the job is already terminal.
    /// error_message carries the partial-failure count, if any.
    async fn mark_completed(
        &self,
        job_id: Uuid,
        result_path: &str,
        result_size_bytes: i64,
        error_message: Option<&str>,
    ) -> AppResult<()>;

    /// Terminal transition; rejected when the job is already terminal
    async fn mark_failed(&self, job_id: Uuid, reason: &str) -> AppResult<()>;

    /// Correlate the job with its background execution
    async fn set_task_handle(&self, job_id: Uuid, handle: &str) -> AppResult<()>;

    /// Jobs in `status` whose retention reference time is before `cutoff`
    async fn list_expired(
        &self,
        status: JobStatus,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<JobRecord>>;

    async fn list_by_owner(&self, owner_id: &str) -> AppResult<Vec<JobRecord>>;

    async fn list_all(&self) -> AppResult<Vec<JobRecord>>;

    /// Returns true if the job existed and was removed
    async fn delete(&self, job_id: Uuid) -> AppResult<bool>;

    async fn count_by_status(&self) -> AppResult<StatusCounts>;
}
