// ============================
// crates/relay-lib/src/validation.rs
// ============================
//! Signaling payload validation.

use relay_common::SessionDescription;
use thiserror::Error;

const MAX_STREAM_ID_LENGTH: usize = 64;
// Generous ceiling; real browser SDP runs a few KB.
const MAX_SDP_LENGTH: usize = 256 * 1024;

/// Possible validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid stream ID: {0}")]
    InvalidStreamId(String),

    #[error("Invalid session description: {0}")]
    InvalidSessionDescription(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a stream identifier received from a client
pub fn validate_stream_id(stream_id: &str) -> ValidationResult<&str> {
    if stream_id.is_empty() {
        return Err(ValidationError::InvalidStreamId(
            "Stream ID must not be empty".to_string(),
        ));
    }

    if stream_id.len() > MAX_STREAM_ID_LENGTH {
        return Err(ValidationError::InvalidStreamId(format!(
            "Stream ID must be at most {MAX_STREAM_ID_LENGTH} characters"
        )));
    }

    if stream_id
        .chars()
        .any(|c| c.is_control() || c.is_whitespace())
    {
        return Err(ValidationError::InvalidStreamId(
            "Stream ID must not contain whitespace or control characters".to_string(),
        ));
    }

    Ok(stream_id)
}

/// Check a session description has its two required sub-fields and that its
/// `type` matches what the handshake step expects (`offer` or `answer`).
pub fn validate_session_description(
    desc: &SessionDescription,
    expected_kind: &str,
) -> ValidationResult<()> {
    if desc.sdp.trim().is_empty() {
        return Err(ValidationError::InvalidSessionDescription(
            "sdp must be present and non-empty".to_string(),
        ));
    }

    if desc.sdp.len() > MAX_SDP_LENGTH {
        return Err(ValidationError::InvalidSessionDescription(format!(
            "sdp exceeds {MAX_SDP_LENGTH} bytes"
        )));
    }

    if desc.kind != expected_kind {
        return Err(ValidationError::InvalidSessionDescription(format!(
            "expected type \"{expected_kind}\", got \"{}\"",
            desc.kind
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(sdp: &str, kind: &str) -> SessionDescription {
        SessionDescription {
            sdp: sdp.to_string(),
            kind: kind.to_string(),
        }
    }

    #[test]
    fn test_validate_stream_id() {
        assert!(validate_stream_id("b7f1c2d3").is_ok());
        assert!(validate_stream_id("").is_err());
        assert!(validate_stream_id("has space").is_err());
        assert!(validate_stream_id("tab\there").is_err());
        assert!(validate_stream_id(&"x".repeat(65)).is_err());
        assert!(validate_stream_id(&"x".repeat(64)).is_ok());
    }

    #[test]
    fn test_validate_session_description() {
        assert!(validate_session_description(&desc("v=0", "offer"), "offer").is_ok());

        // Missing sub-fields
        assert!(validate_session_description(&desc("", "offer"), "offer").is_err());
        assert!(validate_session_description(&desc("   ", "offer"), "offer").is_err());
        assert!(validate_session_description(&desc("v=0", ""), "offer").is_err());

        // Wrong handshake direction
        assert!(validate_session_description(&desc("v=0", "answer"), "offer").is_err());
        assert!(validate_session_description(&desc("v=0", "offer"), "answer").is_err());
    }

    #[test]
    fn test_oversized_sdp_rejected() {
        let oversized = "x".repeat(MAX_SDP_LENGTH + 1);
        assert!(validate_session_description(&desc(&oversized, "offer"), "offer").is_err());
    }
}
