/// Domain entities for the bulk job lifecycle
///
/// A Job is one admitted unit of work; items inside it are processed
/// independently and only ever surface here as progress counters and
/// ephemeral success/failure records.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use uuid::Uuid;

/// Job status enum matching database type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed jobs never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// Job kind: a single-item job is simply a bulk job with item_count == 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Single,
    Bulk,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Single => write!(f, "single"),
            JobKind::Bulk => write!(f, "bulk"),
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(JobKind::Single),
            "bulk" => Ok(JobKind::Bulk),
            _ => Err(format!("Invalid job kind: {}", s)),
        }
    }
}

/// New job to be persisted (before insertion into the store)
#[derive(Debug, Clone)]
pub struct NewJobRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub kind: JobKind,
    pub item_count: i32,
    pub original_size_bytes: i64,
    pub settings: JsonValue,
    pub working_directory: String,
}

/// Job record as held by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub kind: JobKind,
    pub status: JobStatus,
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

impl JobRecord {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Result size relative to the original, when both are known
    pub fn compression_ratio(&self) -> Option<f64> {
        match (self.original_size_bytes, self.result_size_bytes) {
            (original, Some(result)) if original > 0 => Some(result as f64 / original as f64),
            _ => None,
        }
    }

    pub fn progress_percent(&self) -> f64 {
        if self.item_count == 0 {
            return 0.0;
        }
        (self.completed_count as f64 / self.item_count as f64) * 100.0
    }

    /// Age reference for retention: time of completion for terminal jobs,
    /// creation time otherwise
    pub fn retention_reference(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.created_at)
    }

    pub fn progress(&self) -> JobProgress {
        JobProgress {
            job_id: self.id,
            status: self.status,
            item_count: self.item_count,
            completed_count: self.completed_count,
            progress_percent: self.progress_percent(),
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            error_message: self.error_message.clone(),
        }
    }
}

/// Snapshot served to pollers; always read from the store, never blocking on
/// dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub item_count: i32,
    pub completed_count: i32,
    pub progress_percent: f64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// One line of the manifest persisted next to the inputs: stored names are
/// sanitized for the filesystem, the manifest keeps the name the owner
/// uploaded so results can carry it back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub index: usize,
    pub original_name: String,
    pub stored_name: String,
}

/// One successfully processed item (ephemeral, lives only inside a running
/// dispatch)
#[derive(Debug, Clone)]
pub struct ItemSuccess {
    pub index: usize,
    pub original_name: String,
    pub output_path: PathBuf,
    pub output_size_bytes: i64,
}

/// One failed item; never aborts the remaining items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    pub index: usize,
    pub original_name: String,
    pub error: String,
}

/// Per-status totals for monitoring
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub total: i64,
}
