pub mod engine;
pub mod modules;
pub mod schema;
pub mod shared;

pub use engine::{BulkEngine, EngineConfig};
pub use shared::errors::{AppError, AppResult};
pub use shared::utils::init_logger;
