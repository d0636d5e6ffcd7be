/// Admission module: quota validation ahead of any persistent state
pub mod application;
pub mod domain;

pub use application::QuotaValidator;
pub use domain::{
    sanitize_filename, AdmissionError, AdmissionResult, AdmittedBatch, FileDescriptor, FileIssue,
};
