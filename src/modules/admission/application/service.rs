use crate::modules::admission::domain::{
    AdmissionError, AdmissionResult, AdmittedBatch, FileDescriptor, FileIssue, PDF_MAGIC,
};
use crate::modules::billing::{Entitlements, TierLimits};
use crate::shared::errors::AppResult;
use crate::{log_debug, log_info};
use std::sync::Arc;

/// Validates a candidate batch against the owner's tier limits before any
/// persistent state is created. Pure validation over already-available data;
/// no file is persisted here.
pub struct QuotaValidator {
    billing: Arc<dyn Entitlements>,
}

impl QuotaValidator {
    pub fn new(billing: Arc<dyn Entitlements>) -> Self {
        Self { billing }
    }

    pub async fn validate(
        &self,
        owner_id: &str,
        files: &[FileDescriptor],
    ) -> AppResult<AdmissionResult> {
        let limits = self.billing.tier_limits(owner_id).await?;
        log_debug!(
            "Admission check for owner {} ({} files, tier {})",
            owner_id,
            files.len(),
            limits.tier
        );

        let outcome = Self::check_batch(files, &limits);
        match &outcome {
            Ok(batch) => log_info!(
                "Admitted batch for owner {}: {} files, {} bytes",
                owner_id,
                batch.file_count,
                batch.total_size_bytes
            ),
            Err(rejection) => log_info!(
                "Rejected batch for owner {}: {}",
                owner_id,
                rejection.error_code()
            ),
        }

        Ok(outcome)
    }

    /// Ordered checks; the first failing check wins, except per-file
    /// validation which reports every failing file at once.
    fn check_batch(files: &[FileDescriptor], limits: &TierLimits) -> AdmissionResult {
        if !limits.bulk_entitled && files.len() > 1 {
            return Err(AdmissionError::PremiumRequired);
        }

        if files.is_empty() {
            return Err(AdmissionError::EmptyBatch);
        }

        if files.len() > limits.max_files as usize {
            return Err(AdmissionError::TooManyFiles {
                submitted: files.len(),
                limit: limits.max_files,
            });
        }

        let issues: Vec<FileIssue> = files
            .iter()
            .enumerate()
            .filter_map(|(index, file)| {
                Self::check_file(file, limits).map(|reason| FileIssue {
                    index,
                    name: file.name.clone(),
                    reason,
                })
            })
            .collect();
        if !issues.is_empty() {
            return Err(AdmissionError::InvalidFiles { issues });
        }

        let total_size_bytes: i64 = files.iter().map(|f| f.size_bytes).sum();
        if total_size_bytes > limits.max_total_size_bytes() {
            return Err(AdmissionError::TotalSizeExceeded {
                total_bytes: total_size_bytes,
                limit_bytes: limits.max_total_size_bytes(),
            });
        }

        if limits.daily_quota_remaining == 0 {
            return Err(AdmissionError::QuotaExhausted);
        }

        Ok(AdmittedBatch {
            file_count: files.len(),
            total_size_bytes,
            tier: limits.tier,
        })
    }

    fn check_file(file: &FileDescriptor, limits: &TierLimits) -> Option<String> {
        let extension_ok = file
            .name
            .rsplit('.')
            .next()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !extension_ok {
            return Some("unsupported file type, only PDF is accepted".to_string());
        }

        if let Some(content_type) = &file.content_type {
            if content_type != "application/pdf" && content_type != "application/octet-stream" {
                return Some(format!("unsupported content type: {}", content_type));
            }
        }

        if file.size_bytes == 0 {
            return Some("file is empty".to_string());
        }

        if file.size_bytes > limits.max_file_size_bytes() {
            return Some(format!(
                "file size {} bytes exceeds the per-file limit of {} bytes",
                file.size_bytes,
                limits.max_file_size_bytes()
            ));
        }

        if !file.head.starts_with(PDF_MAGIC) {
            return Some("file does not look like a PDF (bad signature)".to_string());
        }

        None
    }
}
