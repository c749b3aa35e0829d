//! services/api/src/generation/pipeline.rs
//!
//! The synchronous generation pipeline: validation gate, memoizer, prompt
//! builder, retrying gateway and response parser, in that order.

use campus_ai_core::{
    fingerprint, parser, prompt, validation, AttachmentId, GatewayRequest, GeneratedContent,
    GenerationConfig, GenerationError, GenerationInput, GenerationRequest, PortError,
    PromptAttachment, ResourceAttachment, ResourceId, ResourceRepository, ValidationError,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::info;

use super::gateway::RetryingGateway;
use super::memo::Memoizer;

pub struct ContentGenerator {
    gateway: RetryingGateway,
    memo: Memoizer,
    cache_ttl: Duration,
    generation_config: GenerationConfig,
}

impl ContentGenerator {
    pub fn new(gateway: RetryingGateway, memo: Memoizer, cache_ttl: Duration) -> Self {
        Self {
            gateway,
            memo,
            cache_ttl,
            generation_config: GenerationConfig::default(),
        }
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = config;
        self
    }

    /// Validates the input and returns the quiz or summary for it, from
    /// cache when an identical request for identical file content was
    /// already answered within the TTL.
    pub async fn generate(&self, input: GenerationInput) -> Result<GeneratedContent, GenerationError> {
        // The gate stats and opens the file, so it runs off the async workers.
        let request = tokio::task::spawn_blocking(move || validation::validate(input))
            .await
            .map_err(|e| PortError::Unexpected(format!("validation task failed: {e}")))??;

        let bytes = read_source(&request.source_path, validation::MAX_SOURCE_BYTES).await?;
        let key = fingerprint::cache_key(
            &fingerprint::content_fingerprint(&bytes),
            &request.parameters,
        );

        self.memo
            .get_or_compute(&key, self.cache_ttl, || self.produce(&request, bytes))
            .await
    }

    async fn produce(
        &self,
        request: &GenerationRequest,
        bytes: Vec<u8>,
    ) -> Result<GeneratedContent, GenerationError> {
        info!(
            content_type = %request.content_type(),
            mime_type = %request.mime_type,
            "Generating content with the model"
        );

        let attachment = if request.mime_type == "text/plain" {
            PromptAttachment::Text(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            PromptAttachment::InlineData {
                mime_type: request.mime_type.clone(),
                data: bytes,
            }
        };
        let gateway_request = GatewayRequest {
            prompt: prompt::build_prompt(&request.parameters),
            attachment: Some(attachment),
            config: self.generation_config,
        };

        let envelope = self.gateway.send(&gateway_request).await?;
        parser::parse(&envelope, &request.parameters)
    }
}

/// Reads at most `max` bytes of the source. A file that grew past the limit
/// after validation is rejected rather than read in full.
async fn read_source(path: &Path, max: u64) -> Result<Vec<u8>, ValidationError> {
    let unreadable = |e: std::io::Error| ValidationError::SourceUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let file = tokio::fs::File::open(path).await.map_err(unreadable)?;
    let mut bytes = Vec::new();
    file.take(max + 1)
        .read_to_end(&mut bytes)
        .await
        .map_err(unreadable)?;

    let size = bytes.len() as u64;
    if size > max {
        return Err(ValidationError::SourceTooLarge { size, max });
    }
    Ok(bytes)
}

/// Picks the requested attachment of a resource, or its first one.
pub async fn resolve_attachment(
    resources: &Arc<dyn ResourceRepository>,
    resource_id: ResourceId,
    attachment_id: Option<AttachmentId>,
) -> Result<ResourceAttachment, GenerationError> {
    let attachments = resources.attachments_for_resource(resource_id).await?;
    if attachments.is_empty() {
        return Err(GenerationError::NoAttachments(resource_id));
    }

    match attachment_id {
        Some(id) => attachments.into_iter().find(|a| a.id == id).ok_or_else(|| {
            GenerationError::NotFound(format!(
                "Attachment {} of resource {}",
                id, resource_id
            ))
        }),
        None => attachments
            .into_iter()
            .next()
            .ok_or(GenerationError::NoAttachments(resource_id)),
    }
}
