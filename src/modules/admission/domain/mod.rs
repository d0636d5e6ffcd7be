/// Admission domain types: candidate batches and structured rejections
use crate::modules::billing::Tier;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Leading bytes every admissible PDF must carry
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// What the web layer knows about a candidate file before persistence
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub name: String,
    pub size_bytes: i64,
    pub content_type: Option<String>,
    /// First bytes of the file, used for the magic signature sniff
    pub head: Vec<u8>,
}

/// Summary of an admitted batch
#[derive(Debug, Clone, Serialize)]
pub struct AdmittedBatch {
    pub file_count: usize,
    pub total_size_bytes: i64,
    pub tier: Tier,
}

/// One file that failed individual validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileIssue {
    pub index: usize,
    pub name: String,
    pub reason: String,
}

/// Structured rejection returned synchronously to the caller.
/// Checks fail fast except per-file validation, which aggregates: independent
/// files are independently fixable.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum AdmissionError {
    #[error("bulk processing requires a premium subscription")]
    PremiumRequired,

    #[error("batch contains no files")]
    EmptyBatch,

    #[error("batch of {submitted} files exceeds the limit of {limit}")]
    TooManyFiles { submitted: usize, limit: u32 },

    #[error("{} file(s) failed validation", .issues.len())]
    InvalidFiles { issues: Vec<FileIssue> },

    #[error("total batch size {total_bytes} bytes exceeds the limit of {limit_bytes} bytes")]
    TotalSizeExceeded { total_bytes: i64, limit_bytes: i64 },

    #[error("daily processing quota exhausted")]
    QuotaExhausted,
}

impl AdmissionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AdmissionError::PremiumRequired => "PREMIUM_REQUIRED",
            AdmissionError::EmptyBatch => "EMPTY_BATCH",
            AdmissionError::TooManyFiles { .. } => "TOO_MANY_FILES",
            AdmissionError::InvalidFiles { .. } => "INVALID_FILES",
            AdmissionError::TotalSizeExceeded { .. } => "TOTAL_SIZE_EXCEEDED",
            AdmissionError::QuotaExhausted => "QUOTA_EXHAUSTED",
        }
    }
}

/// Outcome of admission: an admitted summary or a structured rejection
pub type AdmissionResult = Result<AdmittedBatch, AdmissionError>;

/// Reduce an uploaded filename to a safe storage name: path components are
/// stripped and anything outside [A-Za-z0-9._-] becomes an underscore.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(['.', '_']).is_empty() {
        "file.pdf".to_string()
    } else {
        cleaned
    }
}
