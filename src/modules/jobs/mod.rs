pub mod application;
pub mod assembler;
pub mod domain;
pub mod infrastructure;
pub mod worker;

pub use application::{BulkOrchestrator, DispatchReceipt, IncomingFile, JobMessage};
pub use domain::entities::{JobKind, JobProgress, JobRecord, JobStatus, StatusCounts};
pub use domain::repository::JobStore;
pub use infrastructure::{InMemoryJobStore, PostgresJobStore};
pub use worker::JobWorker;
