/// Diesel-based implementation of JobStore
///
/// Status transitions and progress counters are updated with single atomic
/// UPDATE statements so concurrent item workers never lose an increment and
/// terminal states never regress.
use crate::modules::jobs::domain::entities::{
    JobRecord, JobStatus, NewJobRecord, StatusCounts,
};
use crate::modules::jobs::domain::repository::JobStore;
use crate::modules::jobs::domain::value_objects::JobStatusDb;
use crate::modules::jobs::infrastructure::models::{BulkJobModel, NewBulkJobModel};
use crate::schema::bulk_jobs;
use crate::shared::database::DbPool;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

pub struct PostgresJobStore {
    pool: DbPool,
}

impl PostgresJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get database connection from pool
    fn get_conn(
        &self,
    ) -> AppResult<
        diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::PgConnection>>,
    > {
        self.pool
            .get()
            .map_err(|e| AppError::DatabaseError(format!("Failed to get connection: {}", e)))
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn create(&self, job: NewJobRecord) -> AppResult<JobRecord> {
        let model = NewBulkJobModel::from(job);
        let mut conn = self.get_conn()?;

        let inserted: BulkJobModel = diesel::insert_into(bulk_jobs::table)
            .values(&model)
            .get_result(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to create job: {}", e)))?;

        Ok(inserted.into_record())
    }

    async fn get(&self, job_id: Uuid) -> AppResult<Option<JobRecord>> {
        let mut conn = self.get_conn()?;

        let job: Option<BulkJobModel> = bulk_jobs::table
            .find(job_id)
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::DatabaseError(format!("Failed to get job by id: {}", e)))?;

        Ok(job.map(|j| j.into_record()))
    }

    async fn try_mark_processing(&self, job_id: Uuid) -> AppResult<bool> {
        let mut conn = self.get_conn()?;

        // Compare-and-set: only a pending job can enter processing
        let updated = diesel::sql_query(
            "UPDATE bulk_jobs
             SET status = 'processing', started_at = NOW()
             WHERE id = $1 AND status = 'pending'",
        )
        .bind::<diesel::sql_types::Uuid, _>(job_id)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to mark job processing: {}", e)))?;

        Ok(updated == 1)
    }

    async fn increment_progress(&self, job_id: Uuid, delta: i32) -> AppResult<i32> {
        let mut conn = self.get_conn()?;

        let updated: BulkJobModel = diesel::sql_query(
            "UPDATE bulk_jobs
             SET completed_count = LEAST(item_count, completed_count + $2)
             WHERE id = $1
             RETURNING id, owner_id, kind, status, item_count, completed_count,
                       original_size_bytes, result_size_bytes, settings,
                       working_directory, result_path, error_message, task_handle,
                       created_at, started_at, completed_at",
        )
        .bind::<diesel::sql_types::Uuid, _>(job_id)
        .bind::<diesel::sql_types::Integer, _>(delta)
        .get_result(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to record progress: {}", e)))?;

        Ok(updated.completed_count)
    }

    async fn mark_completed(
        &self,
        job_id: Uuid,
        result_path: &str,
        result_size_bytes: i64,
        error_message: Option<&str>,
    ) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        let updated = diesel::sql_query(
            "UPDATE bulk_jobs
             SET status = 'completed', completed_at = NOW(),
                 result_path = $2, result_size_bytes = $3, error_message = $4
             WHERE id = $1 AND status NOT IN ('completed', 'failed')",
        )
        .bind::<diesel::sql_types::Uuid, _>(job_id)
        .bind::<diesel::sql_types::Text, _>(result_path)
        .bind::<diesel::sql_types::BigInt, _>(result_size_bytes)
        .bind::<diesel::sql_types::Nullable<diesel::sql_types::Text>, _>(error_message)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to mark job completed: {}", e)))?;

        if updated == 0 {
            return Err(AppError::ValidationError(format!(
                "Job {} is already terminal or missing",
                job_id
            )));
        }

        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, reason: &str) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        let updated = diesel::sql_query(
            "UPDATE bulk_jobs
             SET status = 'failed', completed_at = NOW(), error_message = $2
             WHERE id = $1 AND status NOT IN ('completed', 'failed')",
        )
        .bind::<diesel::sql_types::Uuid, _>(job_id)
        .bind::<diesel::sql_types::Text, _>(reason)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to mark job failed: {}", e)))?;

        if updated == 0 {
            return Err(AppError::ValidationError(format!(
                "Job {} is already terminal or missing",
                job_id
            )));
        }

        Ok(())
    }

    async fn set_task_handle(&self, job_id: Uuid, handle: &str) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        diesel::update(bulk_jobs::table.find(job_id))
            .set(bulk_jobs::task_handle.eq(handle))
            .execute(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to set task handle: {}", e)))?;

        Ok(())
    }

    async fn list_expired(
        &self,
        status: JobStatus,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<JobRecord>> {
        let mut conn = self.get_conn()?;

        // Terminal jobs age from completion, the rest from creation
        let jobs: Vec<BulkJobModel> = bulk_jobs::table
            .filter(bulk_jobs::status.eq(JobStatusDb::from(status)))
            .filter(
                bulk_jobs::completed_at.lt(cutoff).or(bulk_jobs::completed_at
                    .is_null()
                    .and(bulk_jobs::created_at.lt(cutoff))),
            )
            .select(BulkJobModel::as_select())
            .load(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to list expired jobs: {}", e)))?;

        Ok(jobs.into_iter().map(|j| j.into_record()).collect())
    }

    async fn list_by_owner(&self, owner_id: &str) -> AppResult<Vec<JobRecord>> {
        let mut conn = self.get_conn()?;

        let jobs: Vec<BulkJobModel> = bulk_jobs::table
            .filter(bulk_jobs::owner_id.eq(owner_id))
            .order(bulk_jobs::created_at.desc())
            .select(BulkJobModel::as_select())
            .load(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to list jobs by owner: {}", e)))?;

        Ok(jobs.into_iter().map(|j| j.into_record()).collect())
    }

    async fn list_all(&self) -> AppResult<Vec<JobRecord>> {
        let mut conn = self.get_conn()?;

        let jobs: Vec<BulkJobModel> = bulk_jobs::table
            .order(bulk_jobs::created_at.asc())
            .select(BulkJobModel::as_select())
            .load(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to list jobs: {}", e)))?;

        Ok(jobs.into_iter().map(|j| j.into_record()).collect())
    }

    async fn delete(&self, job_id: Uuid) -> AppResult<bool> {
        let mut conn = self.get_conn()?;

        let deleted = diesel::delete(bulk_jobs::table.find(job_id))
            .execute(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete job: {}", e)))?;

        Ok(deleted > 0)
    }

    async fn count_by_status(&self) -> AppResult<StatusCounts> {
        let mut conn = self.get_conn()?;

        let mut counts = StatusCounts::default();
        for status in JobStatus::ALL {
            let count: i64 = bulk_jobs::table
                .filter(bulk_jobs::status.eq(JobStatusDb::from(status)))
                .count()
                .get_result(&mut conn)
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to count {} jobs: {}", status, e))
                })?;

            match status {
                JobStatus::Pending => counts.pending = count,
                JobStatus::Processing => counts.processing = count,
                JobStatus::Completed => counts.completed = count,
                JobStatus::Failed => counts.failed = count,
            }
            counts.total += count;
        }

        Ok(counts)
    }
}
