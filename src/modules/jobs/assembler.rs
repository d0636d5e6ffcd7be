/// Result assembly: merge successful item outputs into one archive
///
/// Entries are named by the item's original filename so internal storage
/// names never leak; when some items failed, an errors.json entry carries
/// the machine-readable per-item error list.
use crate::modules::jobs::domain::entities::{ItemFailure, ItemSuccess};
use crate::shared::errors::{AppError, AppResult};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Entry holding the per-item error list for partially-failed jobs
pub const ERROR_LIST_ENTRY: &str = "errors.json";

/// Deterministic archive name derived from the job id
pub fn archive_name(job_id: Uuid) -> String {
    format!("result_{}.zip", job_id)
}

/// Build the result archive inside the job's working directory.
/// Only called with at least one success; returns the archive file name and
/// its size in bytes.
pub fn build_archive(
    working_dir: &Path,
    job_id: Uuid,
    successes: &[ItemSuccess],
    failures: &[ItemFailure],
) -> AppResult<(String, i64)> {
    let name = archive_name(job_id);
    let archive_path = working_dir.join(&name);

    let file = std::fs::File::create(&archive_path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    let mut used_names: HashSet<String> = HashSet::new();
    for item in successes {
        let mut entry_name = item.original_name.clone();
        if !used_names.insert(entry_name.clone()) {
            // Duplicate original names get an index prefix to stay unique
            entry_name = format!("{}_{}", item.index, item.original_name);
            used_names.insert(entry_name.clone());
        }

        writer
            .start_file(entry_name, options)
            .map_err(|e| AppError::StorageError(format!("Failed to add archive entry: {}", e)))?;
        let bytes = std::fs::read(&item.output_path)?;
        writer.write_all(&bytes)?;
    }

    if !failures.is_empty() {
        writer
            .start_file(ERROR_LIST_ENTRY, options)
            .map_err(|e| AppError::StorageError(format!("Failed to add error list: {}", e)))?;
        writer.write_all(&serde_json::to_vec_pretty(failures)?)?;
    }

    writer
        .finish()
        .map_err(|e| AppError::StorageError(format!("Failed to finalize archive: {}", e)))?;

    let size = std::fs::metadata(&archive_path)?.len() as i64;
    Ok((name, size))
}
