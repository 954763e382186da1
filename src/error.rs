//! Error types for the document pipeline
//!
//! Recognition and overlay problems are absorbed by fallback tiers inside the
//! pipeline. Only the conditions below reach the caller.

use thiserror::Error;

/// Pipeline result type
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input too large: {size} bytes exceeds the {limit} byte limit")]
    InputTooLarge { size: usize, limit: usize },

    #[error("Unsupported content type: {0}")]
    UnsupportedMimeType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Processing task failed: {0}")]
    TaskFailed(String),
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_panic() {
            PipelineError::TaskFailed(format!("task panicked: {}", e))
        } else {
            PipelineError::TaskFailed(e.to_string())
        }
    }
}
