use thiserror::Error;

/// Failures surfaced by browser driver implementations.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("driver internal error: {0}")]
    Internal(String),
}

impl DriverError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Knowledge(#[from] scout_knowledge::KnowledgeError),
    #[error("artifact write failed: {0}")]
    Io(#[from] std::io::Error),
}
