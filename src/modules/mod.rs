pub mod admission;
pub mod billing;
pub mod jobs;
pub mod processing;
pub mod retention;
pub mod storage;
