/// Retention windows per job status
use crate::modules::jobs::domain::entities::JobStatus;
use chrono::Duration;

/// Time-to-live per status plus the orphan grace period. Pending and
/// processing TTLs act as safety nets for jobs that were never dispatched
/// or whose worker died.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    pub pending_ttl: Duration,
    pub processing_ttl: Duration,
    pub completed_ttl: Duration,
    pub failed_ttl: Duration,
    /// Grace period before directories with no matching job record are removed
    pub orphan_ttl: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            pending_ttl: Duration::hours(6),
            processing_ttl: Duration::hours(12),
            completed_ttl: Duration::days(7),
            failed_ttl: Duration::days(3),
            orphan_ttl: Duration::hours(24),
        }
    }
}

impl RetentionPolicy {
    pub fn ttl_for(&self, status: JobStatus) -> Duration {
        match status {
            JobStatus::Pending => self.pending_ttl,
            JobStatus::Processing => self.processing_ttl,
            JobStatus::Completed => self.completed_ttl,
            JobStatus::Failed => self.failed_ttl,
        }
    }

    /// Expiry rules in sweep order; processing comes first so abandoned jobs
    /// are resolved before the terminal passes run
    pub fn rules(&self) -> [(JobStatus, Duration); 4] {
        [
            (JobStatus::Processing, self.processing_ttl),
            (JobStatus::Pending, self.pending_ttl),
            (JobStatus::Completed, self.completed_ttl),
            (JobStatus::Failed, self.failed_ttl),
        ]
    }
}
