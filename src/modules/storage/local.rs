/// Local-disk implementation of the storage seam
use super::{FileStorage, StoredFile};
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn checked_path(&self, rel_path: &str) -> AppResult<PathBuf> {
        if rel_path.split(['/', '\\']).any(|part| part == "..") {
            return Err(AppError::InvalidInput(format!(
                "Path escapes storage root: {}",
                rel_path
            )));
        }
        Ok(self.root.join(rel_path))
    }

    fn modified_time(meta: &std::fs::Metadata) -> DateTime<Utc> {
        meta.modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now())
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, rel_path: &str, bytes: &[u8]) -> AppResult<()> {
        let path = self.checked_path(rel_path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn read(&self, rel_path: &str) -> AppResult<Vec<u8>> {
        let path = self.checked_path(rel_path)?;
        Ok(fs::read(&path).await?)
    }

    async fn size(&self, rel_path: &str) -> AppResult<i64> {
        let path = self.checked_path(rel_path)?;
        let meta = fs::metadata(&path).await?;
        Ok(meta.len() as i64)
    }

    async fn exists(&self, rel_path: &str) -> AppResult<bool> {
        let path = self.checked_path(rel_path)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, rel_path: &str) -> AppResult<bool> {
        let path = self.checked_path(rel_path)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_dir(&self, rel_path: &str) -> AppResult<()> {
        let path = self.checked_path(rel_path)?;
        fs::create_dir_all(&path).await?;
        Ok(())
    }

    async fn delete_dir(&self, rel_path: &str) -> AppResult<bool> {
        let path = self.checked_path(rel_path)?;
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_dir(&self, rel_path: &str) -> AppResult<Vec<StoredFile>> {
        let path = self.checked_path(rel_path)?;
        if !fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let meta = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let entry_rel = if rel_path.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", rel_path.trim_end_matches('/'), name)
            };
            entries.push(StoredFile {
                path: entry_rel,
                name,
                size_bytes: meta.len() as i64,
                modified: Self::modified_time(&meta),
                is_dir: meta.is_dir(),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn dir_size(&self, rel_path: &str) -> AppResult<i64> {
        let mut total = 0i64;
        let mut pending = vec![rel_path.to_string()];

        while let Some(dir) = pending.pop() {
            for entry in self.list_dir(&dir).await? {
                if entry.is_dir {
                    pending.push(entry.path);
                } else {
                    total += entry.size_bytes;
                }
            }
        }

        Ok(total)
    }

    fn resolve(&self, rel_path: &str) -> PathBuf {
        self.root.join(rel_path)
    }
}
