/// Retention sweeper: periodic background cleanup of the storage root
///
/// Each sweep runs three passes against the same snapshot of time:
///   1. expiry: jobs past their status TTL lose their files and record
///   2. quota: owners over their storage quota lose oldest files first
///   3. orphans: directories with no job record are removed after a grace
/// A failing deletion is logged into the report and never aborts the sweep.
use crate::modules::billing::Entitlements;
use crate::modules::jobs::domain::entities::{JobStatus, StatusCounts};
use crate::modules::jobs::domain::repository::JobStore;
use crate::modules::retention::policy::RetentionPolicy;
use crate::modules::storage::{FileStorage, StoredFile};
use crate::shared::errors::AppResult;
use crate::shared::utils::logger::LogContext;
use crate::{log_debug, log_info, log_warn};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Outcome of one sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub jobs_deleted: usize,
    pub files_deleted: usize,
    pub space_freed_mb: f64,
    pub errors: Vec<String>,
}

/// Point-in-time view of retained jobs, for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct CleanupStatistics {
    pub total_jobs: i64,
    pub jobs_by_status: StatusCounts,
    pub jobs_last_day: usize,
    pub jobs_last_week: usize,
    pub jobs_older: usize,
    pub estimated_space_to_free_mb: f64,
}

pub struct Sweeper {
    store: Arc<dyn JobStore>,
    storage: Arc<dyn FileStorage>,
    billing: Arc<dyn Entitlements>,
    policy: RetentionPolicy,
    interval: std::time::Duration,
}

impl Sweeper {
    pub fn new(
        store: Arc<dyn JobStore>,
        storage: Arc<dyn FileStorage>,
        billing: Arc<dyn Entitlements>,
        policy: RetentionPolicy,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            store,
            storage,
            billing,
            policy,
            interval,
        }
    }

    /// Periodic sweep loop until cancelled
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        log_info!("Retention sweeper started (every {:?})", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately; skip the startup tick
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log_info!("Retention sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep().await {
                        Ok(report) => {
                            if !report.errors.is_empty() {
                                log_warn!("Sweep finished with {} errors", report.errors.len());
                            }
                        }
                        Err(e) => log_warn!("Sweep failed: {}", e),
                    }
                }
            }
        }
    }

    /// One full sweep over expiry, quota, and orphans
    pub async fn sweep(&self) -> AppResult<SweepReport> {
        let mut report = SweepReport::default();

        self.expiry_pass(&mut report).await?;
        self.quota_pass(&mut report).await;
        self.orphan_pass(&mut report).await;

        LogContext::sweep_result(report.jobs_deleted, report.files_deleted, report.space_freed_mb);
        Ok(report)
    }

    /// Pass 1: remove jobs past the TTL for their status, files first then
    /// the record. Processing jobs past their TTL are abandoned workers; they
    /// are forced to failed before removal so a late mark_completed from a
    /// stuck worker bounces off the terminal guard.
    async fn expiry_pass(&self, report: &mut SweepReport) -> AppResult<()> {
        let now = Utc::now();
        let mut seen: HashSet<Uuid> = HashSet::new();

        for (status, ttl) in self.policy.rules() {
            let cutoff = now - ttl;
            let expired = self.store.list_expired(status, cutoff).await?;

            for job in expired {
                if !seen.insert(job.id) {
                    continue;
                }

                if status == JobStatus::Processing {
                    if let Err(e) = self
                        .store
                        .mark_failed(job.id, "abandoned: exceeded processing time limit")
                        .await
                    {
                        log_debug!("Job {}: abandon mark skipped: {}", job.id, e);
                    }
                }

                let (file_count, dir_bytes) = self.measure_dir(&job.working_directory).await;
                match self.storage.delete_dir(&job.working_directory).await {
                    Ok(existed) => {
                        if existed {
                            report.files_deleted += file_count;
                            report.space_freed_mb += mb(dir_bytes);
                        }
                    }
                    Err(e) => {
                        report.errors.push(format!(
                            "delete_dir {} failed: {}",
                            job.working_directory, e
                        ));
                        continue;
                    }
                }

                match self.store.delete(job.id).await {
                    Ok(true) => {
                        report.jobs_deleted += 1;
                        log_debug!("Expired {} job {} removed", status, job.id);
                    }
                    Ok(false) => {}
                    Err(e) => report
                        .errors
                        .push(format!("delete job {} failed: {}", job.id, e)),
                }
            }
        }

        Ok(())
    }

    /// Pass 2: bring each owner back under their storage quota by deleting
    /// the oldest files first, never touching directories of live jobs
    async fn quota_pass(&self, report: &mut SweepReport) {
        let owners = match self.storage.list_dir("").await {
            Ok(entries) => entries,
            Err(e) => {
                report.errors.push(format!("list storage root failed: {}", e));
                return;
            }
        };

        let protected = match self.protected_directories().await {
            Ok(set) => set,
            Err(e) => {
                report.errors.push(format!("resolve live jobs failed: {}", e));
                return;
            }
        };

        for owner in owners.into_iter().filter(|e| e.is_dir) {
            let usage = match self.storage.dir_size(&owner.path).await {
                Ok(size) => size,
                Err(e) => {
                    report
                        .errors
                        .push(format!("dir_size {} failed: {}", owner.path, e));
                    continue;
                }
            };

            let quota = match self.billing.tier_limits(&owner.name).await {
                Ok(limits) => limits.storage_quota_bytes(),
                Err(e) => {
                    report
                        .errors
                        .push(format!("tier lookup for {} failed: {}", owner.name, e));
                    continue;
                }
            };

            if usage <= quota {
                continue;
            }
            log_info!(
                "Owner {} over quota ({} of {} bytes), reclaiming",
                owner.name,
                usage,
                quota
            );

            let mut candidates = Vec::new();
            self.collect_files(&owner.path, &protected, &mut candidates)
                .await;
            candidates.sort_by_key(|f| f.modified);

            let mut remaining = usage;
            for file in candidates {
                if remaining <= quota {
                    break;
                }
                match self.storage.delete(&file.path).await {
                    Ok(true) => {
                        remaining -= file.size_bytes;
                        report.files_deleted += 1;
                        report.space_freed_mb += mb(file.size_bytes);
                    }
                    Ok(false) => {}
                    Err(e) => report
                        .errors
                        .push(format!("delete {} failed: {}", file.path, e)),
                }
            }
        }
    }

    /// Pass 3: remove job directories no record points at, once older than
    /// the orphan grace period
    async fn orphan_pass(&self, report: &mut SweepReport) {
        let known = match self.known_directories().await {
            Ok(set) => set,
            Err(e) => {
                report.errors.push(format!("list jobs failed: {}", e));
                return;
            }
        };

        let owners = match self.storage.list_dir("").await {
            Ok(entries) => entries,
            Err(e) => {
                report.errors.push(format!("list storage root failed: {}", e));
                return;
            }
        };

        let cutoff = Utc::now() - self.policy.orphan_ttl;
        for owner in owners.into_iter().filter(|e| e.is_dir) {
            let entries = match self.storage.list_dir(&owner.path).await {
                Ok(entries) => entries,
                Err(e) => {
                    report
                        .errors
                        .push(format!("list_dir {} failed: {}", owner.path, e));
                    continue;
                }
            };

            for entry in entries {
                if known.contains(&entry.path) || entry.modified >= cutoff {
                    continue;
                }

                let outcome = if entry.is_dir {
                    let (count, bytes) = self.measure_dir(&entry.path).await;
                    self.storage
                        .delete_dir(&entry.path)
                        .await
                        .map(|existed| existed.then_some((count, bytes)))
                } else {
                    self.storage
                        .delete(&entry.path)
                        .await
                        .map(|existed| existed.then_some((1, entry.size_bytes)))
                };

                match outcome {
                    Ok(Some((count, bytes))) => {
                        report.files_deleted += count;
                        report.space_freed_mb += mb(bytes);
                        log_debug!("Removed orphan {}", entry.path);
                    }
                    Ok(None) => {}
                    Err(e) => report
                        .errors
                        .push(format!("remove orphan {} failed: {}", entry.path, e)),
                }
            }
        }
    }

    /// Monitoring snapshot without deleting anything
    pub async fn statistics(&self) -> AppResult<CleanupStatistics> {
        let counts = self.store.count_by_status().await?;
        let jobs = self.store.list_all().await?;

        let now = Utc::now();
        let day = Duration::days(1);
        let week = Duration::days(7);

        let mut last_day = 0;
        let mut last_week = 0;
        let mut older = 0;
        let mut reclaimable = 0i64;

        for job in &jobs {
            let age = now - job.created_at;
            if age < day {
                last_day += 1;
            } else if age < week {
                last_week += 1;
            } else {
                older += 1;
            }

            let ttl = self.policy.ttl_for(job.status);
            if now - job.retention_reference() > ttl {
                reclaimable += self
                    .storage
                    .dir_size(&job.working_directory)
                    .await
                    .unwrap_or(0);
            }
        }

        Ok(CleanupStatistics {
            total_jobs: counts.total,
            jobs_by_status: counts,
            jobs_last_day: last_day,
            jobs_last_week: last_week,
            jobs_older: older,
            estimated_space_to_free_mb: mb(reclaimable),
        })
    }

    /// Working directories of jobs that may still be written to
    async fn protected_directories(&self) -> AppResult<HashSet<String>> {
        let jobs = self.store.list_all().await?;
        Ok(jobs
            .into_iter()
            .filter(|j| !j.is_terminal())
            .map(|j| j.working_directory)
            .collect())
    }

    /// Working directories of every known job, live or terminal
    async fn known_directories(&self) -> AppResult<HashSet<String>> {
        let jobs = self.store.list_all().await?;
        Ok(jobs.into_iter().map(|j| j.working_directory).collect())
    }

    /// File count and total size under a directory; best effort
    async fn measure_dir(&self, rel_path: &str) -> (usize, i64) {
        let mut files = Vec::new();
        self.collect_files(rel_path, &HashSet::new(), &mut files)
            .await;
        let bytes = files.iter().map(|f| f.size_bytes).sum();
        (files.len(), bytes)
    }

    /// Depth-first file collection, skipping protected directory subtrees
    async fn collect_files(
        &self,
        rel_path: &str,
        protected: &HashSet<String>,
        out: &mut Vec<StoredFile>,
    ) {
        let mut stack = vec![rel_path.to_string()];
        while let Some(dir) = stack.pop() {
            if protected.contains(&dir) {
                continue;
            }
            let entries = match self.storage.list_dir(&dir).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries {
                if entry.is_dir {
                    stack.push(entry.path);
                } else {
                    out.push(entry);
                }
            }
        }
    }
}

fn mb(bytes: i64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
