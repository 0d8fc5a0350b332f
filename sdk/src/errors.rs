//! Error types and handling
//!
//! This module provides the error types shared by the engine and the API server.
//! All errors implement the `MibuErrorExt` trait which provides user-friendly
//! hints, indicates whether errors are recoverable, and maps each error to the
//! HTTP status the browser client receives.
//!
//! # Security
//!
//! Error messages never carry API keys. Upstream response bodies are scrubbed
//! by the engine before they are wrapped in an `EngineError`.

use thiserror::Error;

/// Trait for Mibu error extensions
pub trait MibuErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// secrets or internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors go away when the user corrects the request or
    /// an upstream service comes back.
    fn is_recoverable(&self) -> bool;

    /// HTTP status code used when the error reaches the browser client
    fn status_code(&self) -> u16;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Request**: malformed input from the browser client (400)
/// - **Configuration**: invalid config or missing API keys (500)
/// - **Database**: SQLite operation failures (500)
/// - **Upstream**: LLM, speech, vision and directions services (500)
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, MibuErrorExt};
///
/// let error = EngineError::InvalidRequest("No text provided".to_string());
/// assert_eq!(error.status_code(), 400);
/// assert!(error.is_recoverable());
///
/// let missing = EngineError::MissingSecret("SERPAPI_KEY".to_string());
/// assert_eq!(missing.to_string(), "SERPAPI_KEY not configured");
/// assert_eq!(missing.status_code(), 500);
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Request errors
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unknown category")]
    UnknownCategory(String),

    #[error("{0} not found")]
    NotFound(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} not configured")]
    MissingSecret(String),

    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Upstream service errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("{service} request failed: {message}")]
    Upstream { service: String, message: String },

    #[error("{message}")]
    Parse {
        message: String,
        raw: Option<String>,
    },

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Build an upstream failure for a named service
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Build a parse failure that keeps the raw model output for the client
    pub fn parse_with_raw(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            raw: Some(raw.into()),
        }
    }

    /// Raw upstream content attached to the error, if any
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Parse { raw, .. } => raw.as_deref(),
            _ => None,
        }
    }
}

impl MibuErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => "Check the request body and try again",
            Self::UnknownCategory(_) => "This kind of command is not supported yet",
            Self::NotFound(_) => "The requested record does not exist",

            Self::Config(_) => "Check your config.toml file for errors",
            Self::MissingSecret(_) => "Set the API key in the environment or the system keychain",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",

            Self::Database(_) => "Database operation failed. Try restarting the server",

            Self::LLMProvider(_) => "The language model is unavailable. Try again later",
            Self::Upstream { .. } => "An external service failed. Try again later",
            Self::Parse { .. } => "The assistant answer could not be understood. Rephrase and retry",

            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Config(_) | Self::MissingSecret(_) | Self::KeyringError(_)
        )
    }

    fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) | Self::UnknownCategory(_) => 400,
            Self::NotFound(_) => 404,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_errors_map_to_400() {
        assert_eq!(
            EngineError::InvalidRequest("x".into()).status_code(),
            400
        );
        assert_eq!(
            EngineError::UnknownCategory("recipe".into()).status_code(),
            400
        );
        assert_eq!(
            EngineError::UnknownCategory("recipe".into()).to_string(),
            "Unknown category"
        );
    }

    #[test]
    fn test_parse_error_keeps_raw() {
        let err = EngineError::parse_with_raw("Failed to parse AI response", "not json");
        assert_eq!(err.to_string(), "Failed to parse AI response");
        assert_eq!(err.raw(), Some("not json"));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_config_errors_not_recoverable() {
        assert!(!EngineError::MissingSecret("GROK_API_KEY".into()).is_recoverable());
        assert!(EngineError::upstream("Whisper", "503").is_recoverable());
    }
}
