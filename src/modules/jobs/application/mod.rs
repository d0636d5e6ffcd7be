pub mod orchestrator;

pub use orchestrator::{BulkOrchestrator, DispatchReceipt, IncomingFile, JobMessage};
