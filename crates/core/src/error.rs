//! Error types for the Denkitsu domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all pipeline operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- Transcription errors ---
    #[error("Transcription failed: {0}")]
    Transcription(String),

    // --- Routing invariant violation ---
    /// A second hand-off was requested after the single allowed hop was
    /// already consumed. Fatal for the operation, never retried.
    #[error("Routing loop detected: agent '{agent}' requested a hand-off after the allowed hop")]
    RoutingLoop { agent: String },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the transport client (atomic calls) or carried by a
/// terminal stream event.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl TransportError {
    /// The provider-supplied message for this failure, when one exists.
    ///
    /// Notifications prefer this text over a generic fallback string.
    pub fn provider_message(&self) -> Option<&str> {
        match self {
            TransportError::ApiError { message, .. } if !message.is_empty() => Some(message),
            TransportError::AuthenticationFailed(msg)
            | TransportError::ModelNotFound(msg)
            | TransportError::StreamInterrupted(msg)
                if !msg.is_empty() =>
            {
                Some(msg)
            }
            _ => None,
        }
    }
}

impl Error {
    /// Text to surface in a user-facing error notification.
    ///
    /// Uses the provider-supplied message when the failure carries one,
    /// otherwise a generic fallback.
    pub fn notification_text(&self) -> String {
        match self {
            Error::Transport(te) => te
                .provider_message()
                .map(String::from)
                .unwrap_or_else(|| "The request to the AI service failed".into()),
            other => other.to_string(),
        }
    }
}
