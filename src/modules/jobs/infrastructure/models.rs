/// Diesel models for the bulk_jobs table
use crate::modules::jobs::domain::entities::{JobRecord, NewJobRecord};
use crate::modules::jobs::domain::value_objects::{JobKindDb, JobStatusDb};
use crate::schema::bulk_jobs;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Diesel model for inserting new jobs
#[derive(Insertable, Debug)]
#[diesel(table_name = bulk_jobs)]
pub struct NewBulkJobModel {
    pub id: Uuid,
    pub owner_id: String,
    pub kind: JobKindDb,
    pub status: JobStatusDb,
    pub item_count: i32,
    pub original_size_bytes: i64,
    pub settings: JsonValue,
    pub working_directory: String,
}

impl From<NewJobRecord> for NewBulkJobModel {
    fn from(job: NewJobRecord) -> Self {
        Self {
            id: job.id,
            owner_id: job.owner_id,
            kind: job.kind.into(),
            status: JobStatusDb::Pending,
            item_count: job.item_count,
            original_size_bytes: job.original_size_bytes,
            settings: job.settings,
            working_directory: job.working_directory,
        }
    }
}

/// Diesel model for querying existing jobs
#[derive(Queryable, Selectable, QueryableByName, Debug, Clone)]
#[diesel(table_name = bulk_jobs)]
pub struct BulkJobModel {
    pub id: Uuid,
    pub owner_id: String,
    pub kind: JobKindDb,
    pub status: JobStatusDb,
    pub item_count: i32,
    pub completed_count: i32,
    pub original_size_bytes: i64,
    pub result_size_bytes: Option<i64>,
    pub settings: JsonValue,
    pub working_directory: String,
    pub result_path: Option<String>,
    pub error_message: Option<String>,
    pub task_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BulkJobModel {
    /// Convert to domain JobRecord
    pub fn into_record(self) -> JobRecord {
        JobRecord {
            id: self.id,
            owner_id: self.owner_id,
            kind: self.kind.into(),
            status: self.status.into(),
            item_count: self.item_count,
            completed_count: self.completed_count,
            original_size_bytes: self.original_size_bytes,
            result_size_bytes: self.result_size_bytes,
            settings: self.settings,
            working_directory: self.working_directory,
            result_path: self.result_path,
            error_message: self.error_message,
            task_handle: self.task_handle,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}
