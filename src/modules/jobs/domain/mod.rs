pub mod entities;
pub mod repository;
pub mod value_objects;

pub use entities::{
    ItemFailure, ItemSuccess, JobKind, JobProgress, JobRecord, JobStatus, NewJobRecord,
    StatusCounts,
};
pub use repository::JobStore;
