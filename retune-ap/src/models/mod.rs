//! Data models for the audio job pipeline

pub mod analysis;
pub mod outcome;
pub mod request;

pub use analysis::AnalysisResult;
pub use outcome::{JobOutcome, JobRecord, JobStatus};
pub use request::AudioJobRequest;
