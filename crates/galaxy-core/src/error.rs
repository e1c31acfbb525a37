//! Error types for neuro-galaxy.

use thiserror::Error;

use crate::models::NoteId;

/// Result type alias using neuro-galaxy's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for neuro-galaxy operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Embedding model could not be loaded or probed. Fatal at startup.
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// A layout recomputation failed; the previous cache stays servable.
    #[error("Pipeline failure: {0}")]
    Pipeline(String),

    /// Note id is not part of the current layout
    #[error("Unknown note id: {0}")]
    UnknownNoteId(NoteId),

    /// Similarity query arrived while the layout cache is empty
    #[error("Embeddings unavailable: layout cache is empty")]
    EmbeddingsUnavailable,

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Note store read or write failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a stage failure as a pipeline failure, keeping the stage name.
    pub fn pipeline(stage: &str, err: impl std::fmt::Display) -> Self {
        Error::Pipeline(format!("{stage}: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_model_unavailable() {
        let err = Error::ModelUnavailable("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "Embedding model unavailable: connection refused"
        );
    }

    #[test]
    fn test_error_display_unknown_note_id() {
        let err = Error::UnknownNoteId(999);
        assert_eq!(err.to_string(), "Unknown note id: 999");
    }

    #[test]
    fn test_error_display_embeddings_unavailable() {
        let err = Error::EmbeddingsUnavailable;
        assert!(err.to_string().contains("layout cache is empty"));
    }

    #[test]
    fn test_pipeline_helper_keeps_stage() {
        let err = Error::pipeline("embed", Error::Embedding("timeout".to_string()));
        assert_eq!(
            err.to_string(),
            "Pipeline failure: embed: Embedding error: timeout"
        );
    }

    #[test]
    fn test_error_display_storage() {
        let err = Error::Storage("disk full".to_string());
        assert_eq!(err.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
