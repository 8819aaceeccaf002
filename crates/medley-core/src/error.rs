//! Error types for the medley catalog engine.

use thiserror::Error;

/// Result type alias using medley's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for catalog engine operations.
///
/// Absence of results is never an error: an empty candidate pool or a
/// zero-match search is reported through response metadata, not through
/// this type.
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced record does not exist
    #[error("Record not found: {0}")]
    NotFound(uuid::Uuid),

    /// Operation requires an embedding that is absent
    #[error("Missing embedding: {0}")]
    MissingEmbedding(String),

    /// Embedding provider or vector store call failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// Invalid input (empty query, empty id list, malformed weights)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let id = Uuid::nil();
        let err = Error::NotFound(id);
        assert_eq!(err.to_string(), format!("Record not found: {}", id));
    }

    #[test]
    fn test_error_display_missing_embedding() {
        let err = Error::MissingEmbedding("record has no vector".to_string());
        assert_eq!(err.to_string(), "Missing embedding: record has no vector");
    }

    #[test]
    fn test_error_display_provider() {
        let err = Error::Provider("embedding API unreachable".to_string());
        assert_eq!(err.to_string(), "Provider error: embedding API unreachable");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("empty query".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty query");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing API key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing API key");
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
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_not_found_with_random_uuid() {
        let id = Uuid::new_v4();
        let err = Error::NotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
