use thiserror::Error;

/// Error taxonomy for a pipeline run. Segment-level transcription failures
/// are absorbed into empty text and never appear here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or disallowed input at the boundary. Never retried.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Source audio could not be parsed. Aborts the run.
    #[error("failed to decode audio: {0}")]
    Decode(String),

    /// Catch-all for unexpected failures outside segment transcription.
    #[error("pipeline failure: {0}")]
    Upstream(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
