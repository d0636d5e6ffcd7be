/// Single-item processing seam
///
/// The engine treats the actual document transform (compress, convert, OCR)
/// as an opaque, potentially slow, potentially failing primitive. Settings
/// are an uninterpreted key/value bag owned by the processor.
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

/// Output of one processed item
#[derive(Debug, Clone)]
pub struct ProcessedOutput {
    /// Absolute path of the produced file
    pub output_path: PathBuf,
    pub output_size_bytes: i64,
}

#[async_trait]
pub trait ItemProcessor: Send + Sync {
    async fn process(&self, input: &Path, settings: &JsonValue) -> AppResult<ProcessedOutput>;
}
