use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("unknown state id: {0}")]
    UnknownState(String),
    #[error("unknown action id: {0}")]
    UnknownAction(String),
    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("raw trace decoding failed: {0}")]
    TraceDecode(String),
}
