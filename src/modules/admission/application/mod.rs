pub mod service;

pub use service::QuotaValidator;
