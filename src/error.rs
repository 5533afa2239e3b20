//! Error types for the wellness intake service.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {key}. {hint}")]
    MissingEnvVar { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid intake instructions: {0}")]
    InvalidInstructions(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while running an intake turn.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("User message is empty")]
    EmptyInput,

    #[error("Model call failed: {0}")]
    Model(#[from] LlmError),
}

/// Summary document rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("No classification is available to render")]
    NothingToRender,

    #[error("Document encoding failed: {0}")]
    Encoding(String),
}

/// Booking state machine rejections. The booking is never mutated when one
/// of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("Booking is only available once intake has produced a classification")]
    NoClassification,

    #[error("Booking has not been started")]
    NotStarted,

    #[error("Booking is already confirmed for {slot}")]
    AlreadyConfirmed { slot: String },

    #[error("Unknown slot: {0}")]
    UnknownSlot(String),

    #[error("No slot has been selected")]
    NoSlotSelected,
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
