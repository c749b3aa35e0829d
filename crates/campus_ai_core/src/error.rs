//! crates/campus_ai_core/src/error.rs
//!
//! The error taxonomy of the generation pipeline.

use crate::domain::ResourceId;
use crate::ports::{GatewayError, PortError};
use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Caller input was rejected by the validation gate. Never retried.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The resource, attachment or staged file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Resource {0} has no attachments")]
    NoAttachments(ResourceId),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The model credential is missing or was rejected.
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Model request failed after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        attempts: u32,
        last_error: GatewayError,
    },

    /// The model answered, but its output could not be parsed or failed the schema.
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// The job queue cannot take more work right now.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Service port error: {0}")]
    Port(PortError),
}

impl GenerationError {
    /// Whether a queued job may attempt the same work again. Model failures
    /// have already used up the gateway's own retries and are final.
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transport(_) | GenerationError::Port(_))
    }
}

impl From<PortError> for GenerationError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => GenerationError::NotFound(what),
            other => GenerationError::Port(other),
        }
    }
}

impl From<GatewayError> for GenerationError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Auth(msg) => GenerationError::Auth(msg),
            other => GenerationError::Transport(other.to_string()),
        }
    }
}
