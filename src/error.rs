use thiserror::Error;

/// Step-level failure taxonomy. Each pipeline stage builds its own variant
/// at the failure site; the launcher surfaces the first failure and stops.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("story source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("video composition failed: {0}")]
    CompositionFailed(String),

    #[error("missing configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
