//! Error taxonomy for the bridge.
//!
//! Connection errors are fatal to a session. Generation errors are recovered
//! by emitting a single fallback fragment and letting the conversation go on.
//! A cancelled generation is not an error at all: its fragments are dropped.

use std::time::Duration;

/// Transport-level failure on the duplex connection to the voice provider.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connection closed")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to encode outbound fragment: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure of a single completion stream.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("completion backend error: {0}")]
    Backend(String),
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("completion stream ended without producing any content")]
    Empty,
}

/// A frame from the connection could not be decoded.
#[derive(Debug, thiserror::Error)]
#[error("malformed transcript frame: {0}")]
pub struct CodecError(#[from] pub serde_json::Error);

/// Failure while registering a call with the voice-agent provider.
#[derive(Debug, thiserror::Error)]
pub enum RegistrarError {
    #[error("register-call request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("register-call returned status {0}: {1}")]
    Status(u16, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ConnectionError::Closed.to_string(), "connection closed");
        assert_eq!(
            GenerationError::Timeout(Duration::from_secs(3)).to_string(),
            "generation timed out after 3s"
        );
        assert_eq!(
            RegistrarError::Status(401, "unauthorized".into()).to_string(),
            "register-call returned status 401: unauthorized"
        );
    }

    #[test]
    fn test_codec_error_wraps_serde() {
        let err: CodecError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(err.to_string().starts_with("malformed transcript frame"));
    }
}
