//! crates/campus_ai_core/src/ports.rs
//!
//! Defines the service contracts (traits) the generation pipeline depends on.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! core independent of the concrete model API, cache store, database and
//! file storage.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::{GatewayRequest, ResourceAttachment, ResourceId};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, storage).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The failure of a single outbound call to the generative model.
/// Every variant is eligible for retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model API rejected the credential: {0}")]
    Auth(String),
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Performs exactly one call to the model and returns the raw response envelope.
    async fn generate(&self, request: &GatewayRequest) -> Result<Value, GatewayError>;
}

/// A shared key-value store with per-entry time-to-live.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<Value>>;

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> PortResult<()>;
}

#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Lists the attachments of a resource in upload order.
    /// Fails with `PortError::NotFound` when the resource does not exist.
    async fn attachments_for_resource(
        &self,
        resource_id: ResourceId,
    ) -> PortResult<Vec<ResourceAttachment>>;
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Resolves an attachment to a readable local file. The returned path is
    /// treated as read-only by the pipeline.
    async fn stage(&self, attachment: &ResourceAttachment) -> PortResult<PathBuf>;
}
