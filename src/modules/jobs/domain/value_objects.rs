/// Database enum mappings for the jobs domain
use super::entities::{JobKind, JobStatus};
use serde::{Deserialize, Serialize};

/// Job status enum matching the job_status database type
#[derive(
    diesel_derive_enum::DbEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[ExistingTypePath = "crate::schema::sql_types::JobStatus"]
#[serde(rename_all = "lowercase")]
pub enum JobStatusDb {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl From<JobStatus> for JobStatusDb {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => JobStatusDb::Pending,
            JobStatus::Processing => JobStatusDb::Processing,
            JobStatus::Completed => JobStatusDb::Completed,
            JobStatus::Failed => JobStatusDb::Failed,
        }
    }
}

impl From<JobStatusDb> for JobStatus {
    fn from(status: JobStatusDb) -> Self {
        match status {
            JobStatusDb::Pending => JobStatus::Pending,
            JobStatusDb::Processing => JobStatus::Processing,
            JobStatusDb::Completed => JobStatus::Completed,
            JobStatusDb::Failed => JobStatus::Failed,
        }
    }
}

/// Job kind enum matching the job_kind database type
#[derive(
    diesel_derive_enum::DbEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[ExistingTypePath = "crate::schema::sql_types::JobKind"]
#[serde(rename_all = "lowercase")]
pub enum JobKindDb {
    Single,
    Bulk,
}

impl From<JobKind> for JobKindDb {
    fn from(kind: JobKind) -> Self {
        match kind {
            JobKind::Single => JobKindDb::Single,
            JobKind::Bulk => JobKindDb::Bulk,
        }
    }
}

impl From<JobKindDb> for JobKind {
    fn from(kind: JobKindDb) -> Self {
        match kind {
            JobKindDb::Single => JobKind::Single,
            JobKindDb::Bulk => JobKind::Bulk,
        }
    }
}
