//! Error types for the embedder bridge

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Failures a bridge operation can report back over the call channel
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Missing, empty or mistyped argument
    #[error("{0}")]
    InvalidArgument(String),

    #[error("TextEmbedder not initialized. Call initialize() first.")]
    NotInitialized,

    /// The model identifier did not resolve to model files
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to initialize: {0}")]
    Initialization(#[source] anyhow::Error),

    /// Inference ran but produced no embedding
    #[error("No embeddings generated")]
    NoEmbedding,

    #[error("Failed to embed text: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("Failed to calculate similarity: {0}")]
    Similarity(#[source] anyhow::Error),

    #[error("Failed to get model info: {0}")]
    Info(#[source] serde_json::Error),

    #[error("Failed to dispose: {0}")]
    Dispose(#[source] anyhow::Error),
}

impl BridgeError {
    /// Stable code sent over the wire
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::InvalidArgument(_) => "INVALID_ARGUMENT",
            BridgeError::NotInitialized => "NOT_INITIALIZED",
            BridgeError::ModelNotFound(_) => "MODEL_NOT_FOUND",
            BridgeError::Initialization(_) => "INIT_ERROR",
            BridgeError::NoEmbedding | BridgeError::Embedding(_) => "EMBED_ERROR",
            BridgeError::Similarity(_) => "SIMILARITY_ERROR",
            BridgeError::Info(_) => "INFO_ERROR",
            BridgeError::Dispose(_) => "DISPOSE_ERROR",
        }
    }

    /// Diagnostic text (the cause chain). Opaque to callers.
    pub fn details(&self) -> Option<String> {
        match self {
            BridgeError::Initialization(e)
            | BridgeError::Embedding(e)
            | BridgeError::Similarity(e) => Some(format!("{:?}", e)),
            _ => None,
        }
    }
}

/// Wire form of a failure: `{ code, message, details }`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MethodError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl MethodError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

impl From<BridgeError> for MethodError {
    fn from(err: BridgeError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            details: err.details(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_codes() {
        assert_eq!(BridgeError::NotInitialized.code(), "NOT_INITIALIZED");
        assert_eq!(BridgeError::NoEmbedding.code(), "EMBED_ERROR");
        assert_eq!(
            BridgeError::Embedding(anyhow::anyhow!("boom")).code(),
            "EMBED_ERROR"
        );
        assert_eq!(
            BridgeError::ModelNotFound("x".to_string()).code(),
            "MODEL_NOT_FOUND"
        );
    }

    #[test]
    fn test_wire_form_carries_cause_chain() {
        let cause: anyhow::Result<()> = Err(anyhow::anyhow!("session builder failed"));
        let err = BridgeError::Initialization(cause.context("Failed to load model").unwrap_err());

        let wire = MethodError::from(err);
        assert_eq!(wire.code, "INIT_ERROR");
        assert_eq!(wire.message, "Failed to initialize: Failed to load model");
        let details = wire.details.unwrap();
        assert!(details.contains("session builder failed"));
    }

    #[test]
    fn test_plain_errors_have_no_details() {
        let wire = MethodError::from(BridgeError::InvalidArgument("Text is required".into()));
        assert_eq!(wire.code, "INVALID_ARGUMENT");
        assert_eq!(wire.message, "Text is required");
        assert_eq!(wire.details, None);
    }
}
