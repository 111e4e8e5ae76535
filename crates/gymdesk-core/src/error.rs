//! Error types for GymDesk Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Session errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Unauthorized: the backend rejected the session credential")]
    Unauthorized,

    #[error("Session expired")]
    SessionExpired,

    #[error("Superseded by a newer session transition")]
    Superseded,

    // Transport errors
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Backend error {status}: {message}")]
    Backend { status: u16, message: String },

    // Input errors
    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    // Local resources
    #[error("Credential store error: {0}")]
    CredentialStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        assert_eq!(Error::InvalidCredentials.to_string(), "Invalid credentials");

        let err = Error::Backend {
            status: 409,
            message: "Payment for this period already exists".to_string(),
        };
        assert!(err.to_string().contains("409"));
        assert!(err.to_string().contains("already exists"));

        let err = Error::MalformedToken("expected 3 segments".to_string());
        assert_eq!(err.to_string(), "Malformed token: expected 3 segments");
    }
}
