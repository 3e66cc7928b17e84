use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("step not found: {0}")]
    StepNotFound(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session already completed: {0}")]
    SessionCompleted(String),

    #[error("context error: {0}")]
    ContextError(String),

    #[error("step execution failed: {0}")]
    StepFailed(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;
