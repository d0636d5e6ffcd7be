use async_trait::async_trait;
use pdfmill::modules::billing::{Entitlements, TierLimits};
use pdfmill::modules::jobs::application::{BulkOrchestrator, JobMessage};
use pdfmill::modules::jobs::infrastructure::InMemoryJobStore;
use pdfmill::modules::jobs::worker::JobWorker;
use pdfmill::modules::processing::{ItemProcessor, ProcessedOutput};
use pdfmill::modules::retention::{RetentionPolicy, Sweeper};
use pdfmill::modules::storage::{FileStorage, LocalFileStorage, StoredFile};
use pdfmill::shared::errors::{AppError, AppResult};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Entitlements stub returning fixed limits and recording usage increments
pub struct FixedEntitlements {
    limits: Mutex<TierLimits>,
    usage: Mutex<Vec<(String, u32)>>,
}

impl FixedEntitlements {
    pub fn new(limits: TierLimits) -> Self {
        Self {
            limits: Mutex::new(limits),
            usage: Mutex::new(Vec::new()),
        }
    }

    pub fn set_limits(&self, limits: TierLimits) {
        *self.limits.lock().unwrap() = limits;
    }

    pub fn recorded_usage(&self) -> Vec<(String, u32)> {
        self.usage.lock().unwrap().clone()
    }
}

#[async_trait]
impl Entitlements for FixedEntitlements {
    async fn tier_limits(&self, _owner_id: &str) -> AppResult<TierLimits> {
        Ok(self.limits.lock().unwrap().clone())
    }

    async fn increment_usage(&self, owner_id: &str, count: u32) -> AppResult<()> {
        self.usage.lock().unwrap().push((owner_id.to_string(), count));
        Ok(())
    }
}

/// Processor that writes `processed:` plus the input bytes next to the input.
/// Items whose stored filename contains `fail_marker` fail instead.
pub struct StubProcessor {
    fail_marker: Option<String>,
}

impl StubProcessor {
    pub fn passing() -> Self {
        Self { fail_marker: None }
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
        }
    }
}

#[async_trait]
impl ItemProcessor for StubProcessor {
    async fn process(&self, input: &Path, _settings: &JsonValue) -> AppResult<ProcessedOutput> {
        let file_name = input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        if let Some(marker) = &self.fail_marker {
            if file_name.contains(marker) {
                return Err(AppError::ProcessingError(format!(
                    "simulated failure for {}",
                    file_name
                )));
            }
        }

        let bytes = tokio::fs::read(input).await?;
        let mut output = b"processed:".to_vec();
        output.extend_from_slice(&bytes);

        // "out." prefix keeps outputs out of the {index}_{name} input pattern
        let output_path = input.with_file_name(format!("out.{}", file_name));
        tokio::fs::write(&output_path, &output).await?;

        Ok(ProcessedOutput {
            output_size_bytes: output.len() as i64,
            output_path,
        })
    }
}

/// Storage wrapper that fails saves for paths containing "boom"
pub struct FlakyStorage {
    inner: LocalFileStorage,
}

impl FlakyStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: LocalFileStorage::new(root),
        }
    }
}

#[async_trait]
impl FileStorage for FlakyStorage {
    async fn save(&self, rel_path: &str, bytes: &[u8]) -> AppResult<()> {
        if rel_path.contains("boom") {
            return Err(AppError::StorageError("disk write rejected".to_string()));
        }
        self.inner.save(rel_path, bytes).await
    }

    async fn read(&self, rel_path: &str) -> AppResult<Vec<u8>> {
        self.inner.read(rel_path).await
    }

    async fn size(&self, rel_path: &str) -> AppResult<i64> {
        self.inner.size(rel_path).await
    }

    async fn exists(&self, rel_path: &str) -> AppResult<bool> {
        self.inner.exists(rel_path).await
    }

    async fn delete(&self, rel_path: &str) -> AppResult<bool> {
        self.inner.delete(rel_path).await
    }

    async fn create_dir(&self, rel_path: &str) -> AppResult<()> {
        self.inner.create_dir(rel_path).await
    }

    async fn delete_dir(&self, rel_path: &str) -> AppResult<bool> {
        self.inner.delete_dir(rel_path).await
    }

    async fn list_dir(&self, rel_path: &str) -> AppResult<Vec<StoredFile>> {
        self.inner.list_dir(rel_path).await
    }

    async fn dir_size(&self, rel_path: &str) -> AppResult<i64> {
        self.inner.dir_size(rel_path).await
    }

    fn resolve(&self, rel_path: &str) -> PathBuf {
        self.inner.resolve(rel_path)
    }
}

/// Shared fixture: in-memory store, tempdir-backed storage, stub billing
pub struct TestContext {
    pub store: Arc<InMemoryJobStore>,
    pub storage: Arc<LocalFileStorage>,
    pub billing: Arc<FixedEntitlements>,
    pub _tempdir: tempfile::TempDir,
}

impl TestContext {
    pub fn new(limits: TierLimits) -> Self {
        let tempdir = tempfile::tempdir().unwrap();
        Self {
            store: Arc::new(InMemoryJobStore::new()),
            storage: Arc::new(LocalFileStorage::new(tempdir.path())),
            billing: Arc::new(FixedEntitlements::new(limits)),
            _tempdir: tempdir,
        }
    }

    pub fn orchestrator(&self) -> (BulkOrchestrator, mpsc::Receiver<JobMessage>) {
        let (tx, rx) = mpsc::channel(16);
        let orchestrator = BulkOrchestrator::new(
            self.store.clone(),
            self.storage.clone(),
            tx,
        );
        (orchestrator, rx)
    }

    pub fn worker(&self, processor: Arc<dyn ItemProcessor>) -> Arc<JobWorker> {
        Arc::new(JobWorker::new(
            self.store.clone(),
            self.storage.clone(),
            processor,
            self.billing.clone(),
            2,
            2,
        ))
    }

    pub fn sweeper(&self, policy: RetentionPolicy) -> Sweeper {
        Sweeper::new(
            self.store.clone(),
            self.storage.clone(),
            self.billing.clone(),
            policy,
            std::time::Duration::from_secs(60),
        )
    }

    /// Put a file under the storage root, for sweeper fixtures
    pub fn write_file(&self, rel_path: &str, bytes: &[u8]) {
        let path = self.storage.resolve(rel_path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }
}
