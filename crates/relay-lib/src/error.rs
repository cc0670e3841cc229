// crates/relay-lib/src/error.rs

//! Central error type for the relay.
//!
//! Every error here is handled inside the event handler that detected it and
//! reported back to the offending connection as an `error` message. Nothing
//! in this module terminates the process.
use thiserror::Error;

use crate::validation::ValidationError;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Cannot watch your own broadcast")]
    SelfSubscribe,

    #[error("Already broadcasting; stop the current stream first")]
    AlreadyBroadcasting,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("No resolvable target for signal")]
    UnknownTarget,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::StreamNotFound(_) => "STREAM_001",
            AppError::SelfSubscribe => "STREAM_002",
            AppError::AlreadyBroadcasting => "STREAM_003",
            AppError::MalformedPayload(_) => "PAYLOAD_001",
            AppError::Json(_) => "PAYLOAD_002",
            AppError::UnknownTarget => "SIGNAL_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::StreamNotFound(_) => "Stream not found".to_string(),
            AppError::SelfSubscribe => "Cannot watch your own broadcast".to_string(),
            AppError::AlreadyBroadcasting => "Already broadcasting".to_string(),
            AppError::MalformedPayload(_) | AppError::Json(_) => {
                "Invalid message format".to_string()
            },
            AppError::UnknownTarget => "Signal target not found".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }

    /// Message sent back to the offending connection.
    ///
    /// Detailed in development, sanitized in production.
    pub fn client_message(&self) -> String {
        if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::MalformedPayload(err.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for AppError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        AppError::Internal("Failed to send message".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let not_found = AppError::StreamNotFound("abc".to_string());
        assert_eq!(not_found.to_string(), "Stream not found: abc");

        let malformed = AppError::MalformedPayload("sdp must not be empty".to_string());
        assert!(malformed.to_string().contains("Malformed payload"));

        assert_eq!(
            AppError::UnknownTarget.to_string(),
            "No resolvable target for signal"
        );
    }

    #[test]
    fn test_app_error_error_codes() {
        assert_eq!(
            AppError::StreamNotFound("abc".to_string()).error_code(),
            "STREAM_001"
        );
        assert_eq!(AppError::SelfSubscribe.error_code(), "STREAM_002");
        assert_eq!(AppError::UnknownTarget.error_code(), "SIGNAL_001");

        let json_err: serde_json::Error =
            serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        assert_eq!(AppError::Json(json_err).error_code(), "PAYLOAD_002");
    }

    #[test]
    fn test_sanitized_message_hides_detail() {
        let err = AppError::Internal("lock poisoned at registry.rs:42".to_string());
        assert!(!err.sanitized_message().contains("registry.rs"));

        let json_err: serde_json::Error =
            serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        assert_eq!(
            AppError::Json(json_err).sanitized_message(),
            "Invalid message format"
        );
    }

    #[test]
    fn test_error_from_impls() {
        let validation_err = ValidationError::InvalidStreamId("must not be empty".to_string());
        let app_err: AppError = validation_err.into();
        assert!(matches!(app_err, AppError::MalformedPayload(_)));

        let send_err = tokio::sync::mpsc::error::SendError(1u32);
        let app_err: AppError = send_err.into();
        assert!(matches!(app_err, AppError::Internal(_)));
    }
}
