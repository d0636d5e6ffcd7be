/// File storage seam
///
/// All paths handed to this trait are relative to the storage root; the
/// engine persists relative paths in job records so the root can move
/// between environments.
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub mod local;

pub use local::LocalFileStorage;

/// One entry of a directory listing
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Path relative to the storage root
    pub path: String,
    /// Final path component
    pub name: String,
    pub size_bytes: i64,
    pub modified: DateTime<Utc>,
    pub is_dir: bool,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn save(&self, rel_path: &str, bytes: &[u8]) -> AppResult<()>;

    async fn read(&self, rel_path: &str) -> AppResult<Vec<u8>>;

    async fn size(&self, rel_path: &str) -> AppResult<i64>;

    async fn exists(&self, rel_path: &str) -> AppResult<bool>;

    /// Returns true if the file existed and was removed
    async fn delete(&self, rel_path: &str) -> AppResult<bool>;

    async fn create_dir(&self, rel_path: &str) -> AppResult<()>;

    /// Recursively removes a directory; true if it existed
    async fn delete_dir(&self, rel_path: &str) -> AppResult<bool>;

    /// Non-recursive listing; empty for a missing directory
    async fn list_dir(&self, rel_path: &str) -> AppResult<Vec<StoredFile>>;

    /// Total size of all files under a directory, recursively
    async fn dir_size(&self, rel_path: &str) -> AppResult<i64>;

    /// Absolute filesystem path for a relative one (for external processors)
    fn resolve(&self, rel_path: &str) -> PathBuf;
}
