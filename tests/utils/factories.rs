use chrono::{Duration, Utc};
use pdfmill::modules::admission::domain::FileDescriptor;
use pdfmill::modules::billing::{Tier, TierLimits};
use pdfmill::modules::jobs::application::IncomingFile;
use pdfmill::modules::jobs::domain::entities::{JobKind, JobRecord, JobStatus};
use uuid::Uuid;

/// A plausible PDF upload: magic bytes plus padding up to `size` bytes
pub fn pdf_upload(name: &str, size: usize) -> IncomingFile {
    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.resize(size.max(bytes.len()), b'x');
    IncomingFile {
        name: name.to_string(),
        content_type: Some("application/pdf".to_string()),
        bytes,
    }
}

pub fn pdf_descriptor(name: &str, size_bytes: i64) -> FileDescriptor {
    FileDescriptor {
        name: name.to_string(),
        size_bytes,
        content_type: Some("application/pdf".to_string()),
        head: b"%PDF-1.7".to_vec(),
    }
}

pub fn premium_limits() -> TierLimits {
    TierLimits {
        tier: Tier::Premium,
        max_files: 20,
        max_file_size_mb: 50,
        max_total_size_mb: 200,
        storage_quota_mb: 1024,
        daily_quota_remaining: 100,
        bulk_entitled: true,
    }
}

pub fn free_limits() -> TierLimits {
    TierLimits {
        tier: Tier::Free,
        max_files: 1,
        max_file_size_mb: 10,
        max_total_size_mb: 10,
        storage_quota_mb: 100,
        daily_quota_remaining: 3,
        bulk_entitled: false,
    }
}

/// Terminal or in-flight job record backdated by `age`, for sweeper fixtures
pub fn aged_job(owner_id: &str, status: JobStatus, age: Duration) -> JobRecord {
    let id = Uuid::new_v4();
    let then = Utc::now() - age;
    JobRecord {
        id,
        owner_id: owner_id.to_string(),
        kind: JobKind::Bulk,
        status,
        item_count: 2,
        completed_count: if status.is_terminal() { 2 } else { 0 },
        original_size_bytes: 2048,
        result_size_bytes: None,
        settings: serde_json::json!({}),
        working_directory: format!("{}/{}", owner_id, id),
        result_path: None,
        error_message: None,
        task_handle: None,
        created_at: then,
        started_at: (status != JobStatus::Pending).then_some(then),
        completed_at: status.is_terminal().then_some(then),
    }
}
