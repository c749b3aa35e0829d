//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for Google's Gemini `generateContent` API.
//! It implements the `GenerativeModel` port from the `core` crate: one HTTP
//! call per invocation, with retries layered on top by `RetryingGateway`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use campus_ai_core::{
    GatewayError, GatewayRequest, GenerationError, GenerativeModel, PromptAttachment,
};
use reqwest::{Certificate, StatusCode};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::GeminiSettings;

/// Well-known CA bundle locations, checked in order when none is configured.
pub const CA_BUNDLE_CANDIDATES: [&str; 5] = [
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/ssl/cert.pem",
    "/usr/local/etc/openssl/cert.pem",
    "/opt/homebrew/etc/openssl@3/cert.pem",
];

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GenerativeModel` using the Gemini REST API.
#[derive(Clone)]
pub struct GeminiAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiAdapter {
    /// Creates a new `GeminiAdapter`.
    ///
    /// Fails with `GenerationError::Auth` when no API key is configured, before
    /// any network activity.
    pub fn new(settings: &GeminiSettings) -> Result<Self, GenerationError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| GenerationError::Auth("GEMINI_API_KEY is not configured".to_string()))?;

        let mut builder = reqwest::Client::builder().timeout(settings.timeout);
        if !settings.tls_verify {
            warn!("TLS certificate verification is disabled for the Gemini client");
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(bundle) = locate_ca_bundle(settings.ca_bundle.as_deref()) {
            match load_certificates(&bundle) {
                Ok(certificates) => {
                    info!(path = %bundle.display(), count = certificates.len(), "Using CA bundle");
                    for certificate in certificates {
                        builder = builder.add_root_certificate(certificate);
                    }
                }
                Err(e) => warn!(path = %bundle.display(), error = %e, "Ignoring unreadable CA bundle"),
            }
        }

        let client = builder
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                settings.api_base.trim_end_matches('/'),
                settings.model
            ),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Renders the `generateContent` request body.
    pub fn request_body(request: &GatewayRequest) -> Value {
        let mut parts = vec![json!({ "text": request.prompt })];
        match &request.attachment {
            Some(PromptAttachment::InlineData { mime_type, data }) => parts.push(json!({
                "inline_data": {
                    "mime_type": mime_type,
                    "data": BASE64.encode(data),
                }
            })),
            Some(PromptAttachment::Text(text)) => parts.push(json!({ "text": text })),
            None => {}
        }

        json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "temperature": request.config.temperature,
                "topK": request.config.top_k,
                "topP": request.config.top_p,
                "maxOutputTokens": request.config.max_output_tokens,
                "responseMimeType": "application/json",
            }
        })
    }
}

/// Picks the configured bundle if it exists, else the first well-known path that does.
pub fn locate_ca_bundle(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "Configured CA bundle not found, searching defaults");
    }
    CA_BUNDLE_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

fn load_certificates(path: &Path) -> Result<Vec<Certificate>, String> {
    let pem = std::fs::read(path).map_err(|e| e.to_string())?;
    Certificate::from_pem_bundle(&pem).map_err(|e| e.to_string())
}

//=========================================================================================
// `GenerativeModel` Trait Implementation
//=========================================================================================

#[async_trait]
impl GenerativeModel for GeminiAdapter {
    async fn generate(&self, request: &GatewayRequest) -> Result<Value, GatewayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Auth(body),
                _ => GatewayError::Status {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| GatewayError::Transport(format!("failed to read response body: {e}")))
    }
}
