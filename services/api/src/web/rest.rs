//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the AI generation endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::generation::resolve_attachment;
use crate::web::extract::JsonBody;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use campus_ai_core::{
    AsyncJobRecord, AttachmentId, ContentType, GeneratedContent, GenerationError,
    GenerationInput, GenerationOptions, QuizQuestion, ResourceAttachment, ResourceId,
    SummaryResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        generate_quiz_handler,
        generate_summary_handler,
        dispatch_job_handler,
        job_status_handler,
        health_handler,
    ),
    components(
        schemas(
            QuizRequest,
            SummaryRequest,
            JobRequest,
            QuizResponse,
            SummaryResponse,
            SourceInfo,
            JobAccepted,
            HealthResponse,
        )
    ),
    tags(
        (name = "Campus AI API", description = "Quiz and summary generation over uploaded study resources.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct QuizRequest {
    pub attachment_id: Option<AttachmentId>,
    /// Between 1 and 20; defaults to 10.
    pub question_count: Option<i64>,
    /// One of `easy`, `medium`, `hard`; defaults to `medium`.
    pub difficulty: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SummaryRequest {
    pub attachment_id: Option<AttachmentId>,
    /// One of `concise`, `detailed`, `bullet_points`, `key_concepts`; defaults to `concise`.
    pub summary_type: Option<String>,
    /// Between 50 and 1000; defaults to 300.
    pub max_words: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct JobRequest {
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "quiz")]
    pub content_type: ContentType,
    pub attachment_id: Option<AttachmentId>,
    pub question_count: Option<i64>,
    pub difficulty: Option<String>,
    pub summary_type: Option<String>,
    pub max_words: Option<i64>,
}

impl JobRequest {
    fn options(&self) -> GenerationOptions {
        GenerationOptions {
            question_count: self.question_count,
            difficulty: self.difficulty.clone(),
            summary_type: self.summary_type.clone(),
            max_words: self.max_words,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QuizResponse {
    #[schema(value_type = Vec<Object>)]
    pub quiz: Vec<QuizQuestion>,
}

#[derive(Serialize, ToSchema)]
pub struct SourceInfo {
    pub resource_id: ResourceId,
    pub attachment_id: AttachmentId,
    pub file_name: String,
    pub mime_type: String,
    /// Size in bytes as recorded at upload.
    pub size: i64,
}

impl From<&ResourceAttachment> for SourceInfo {
    fn from(attachment: &ResourceAttachment) -> Self {
        Self {
            resource_id: attachment.resource_id,
            attachment_id: attachment.id,
            file_name: attachment.file_name.clone(),
            mime_type: attachment.mime_type.clone(),
            size: attachment.size,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SummaryResponse {
    #[schema(value_type = Object)]
    pub summary: SummaryResult,
    pub source: SourceInfo,
    pub generated_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct JobAccepted {
    pub job_id: Uuid,
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Stages the chosen attachment and runs the synchronous pipeline on it.
async fn generate_for_resource(
    app_state: &AppState,
    resource_id: ResourceId,
    attachment_id: Option<AttachmentId>,
    content_type: ContentType,
    options: GenerationOptions,
) -> Result<(GeneratedContent, ResourceAttachment), ApiError> {
    let attachment = resolve_attachment(&app_state.resources, resource_id, attachment_id).await?;
    let source_path = app_state
        .storage
        .stage(&attachment)
        .await
        .map_err(GenerationError::from)?;

    info!(
        resource_id,
        attachment_id = attachment.id,
        content_type = %content_type,
        "Generating AI content"
    );
    let content = app_state
        .generator
        .generate(GenerationInput {
            content_type,
            source_path,
            mime_type: attachment.mime_type.clone(),
            options,
        })
        .await?;
    Ok((content, attachment))
}

fn unexpected_content(expected: ContentType) -> ApiError {
    ApiError::Internal(format!("pipeline returned content other than {}", expected))
}

/// Generate a multiple-choice quiz from a resource's attachment.
#[utoipa::path(
    post,
    path = "/resources/{resource_id}/ai/quiz",
    request_body = QuizRequest,
    responses(
        (status = 200, description = "Quiz generated", body = QuizResponse),
        (status = 404, description = "Resource, attachment or file not found"),
        (status = 422, description = "Invalid parameters or no attachments"),
        (status = 500, description = "Generation failed")
    ),
    params(("resource_id" = i64, Path, description = "The resource to quiz on."))
)]
pub async fn generate_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(resource_id): Path<ResourceId>,
    JsonBody(request): JsonBody<QuizRequest>,
) -> Result<Json<QuizResponse>, ApiError> {
    let options = GenerationOptions {
        question_count: request.question_count,
        difficulty: request.difficulty,
        ..Default::default()
    };
    let (content, _) = generate_for_resource(
        &app_state,
        resource_id,
        request.attachment_id,
        ContentType::Quiz,
        options,
    )
    .await?;

    match content {
        GeneratedContent::Quiz(quiz) => Ok(Json(QuizResponse { quiz })),
        GeneratedContent::Summary(_) => Err(unexpected_content(ContentType::Quiz)),
    }
}

/// Generate a structured summary of a resource's attachment.
#[utoipa::path(
    post,
    path = "/resources/{resource_id}/ai/summary",
    request_body = SummaryRequest,
    responses(
        (status = 200, description = "Summary generated", body = SummaryResponse),
        (status = 404, description = "Resource, attachment or file not found"),
        (status = 422, description = "Invalid parameters or no attachments"),
        (status = 500, description = "Generation failed")
    ),
    params(("resource_id" = i64, Path, description = "The resource to summarize."))
)]
pub async fn generate_summary_handler(
    State(app_state): State<Arc<AppState>>,
    Path(resource_id): Path<ResourceId>,
    JsonBody(request): JsonBody<SummaryRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let options = GenerationOptions {
        summary_type: request.summary_type,
        max_words: request.max_words,
        ..Default::default()
    };
    let (content, attachment) = generate_for_resource(
        &app_state,
        resource_id,
        request.attachment_id,
        ContentType::Summary,
        options,
    )
    .await?;

    match content {
        GeneratedContent::Summary(summary) => Ok(Json(SummaryResponse {
            summary,
            source: SourceInfo::from(&attachment),
            generated_at: Utc::now(),
        })),
        GeneratedContent::Quiz(_) => Err(unexpected_content(ContentType::Summary)),
    }
}

/// Queue a quiz or summary for background generation.
#[utoipa::path(
    post,
    path = "/resources/{resource_id}/ai/jobs",
    request_body = JobRequest,
    responses(
        (status = 202, description = "Job queued", body = JobAccepted),
        (status = 422, description = "Invalid parameters or malformed body"),
        (status = 500, description = "The job could not be recorded"),
        (status = 503, description = "The queue is full or shutting down")
    ),
    params(("resource_id" = i64, Path, description = "The resource to generate from."))
)]
pub async fn dispatch_job_handler(
    State(app_state): State<Arc<AppState>>,
    Path(resource_id): Path<ResourceId>,
    JsonBody(request): JsonBody<JobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let job_id = app_state
        .jobs
        .dispatch(
            request.content_type,
            resource_id,
            request.attachment_id,
            request.options(),
        )
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job_id,
            status: "queued".to_string(),
        }),
    ))
}

/// Poll the state of a queued job.
#[utoipa::path(
    get,
    path = "/ai/jobs/{job_id}",
    responses(
        (status = 200, description = "The job's latest record"),
        (status = 404, description = "Unknown or expired job")
    ),
    params(("job_id" = Uuid, Path, description = "The id returned when the job was queued."))
)]
pub async fn job_status_handler(
    State(app_state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<AsyncJobRecord>, ApiError> {
    app_state
        .jobs
        .status(job_id)
        .await
        .map(Json)
        .ok_or_else(|| GenerationError::NotFound(format!("Job {}", job_id)).into())
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
