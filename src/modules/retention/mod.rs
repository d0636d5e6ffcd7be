pub mod policy;
pub mod sweeper;

pub use policy::RetentionPolicy;
pub use sweeper::{CleanupStatistics, SweepReport, Sweeper};
