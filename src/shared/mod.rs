// Shared kernel: error types, logging, and database plumbing used by all modules

pub mod database;
pub mod errors;
pub mod utils;

// Re-exports for convenience
pub use database::{Database, DbConnection, DbPool};
pub use errors::{AppError, AppResult};
