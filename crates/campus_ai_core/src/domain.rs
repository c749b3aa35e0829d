//! crates/campus_ai_core/src/domain.rs
//!
//! Defines the core data structures of the content-generation pipeline.
//! Wire-facing types derive serde so that the same values flow through the
//! cache, the job records and the HTTP responses.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

pub type ResourceId = i64;
pub type AttachmentId = i64;

//=========================================================================================
// Generation Parameters
//=========================================================================================

/// The kind of content the model is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Quiz,
    Summary,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Quiz => "quiz",
            ContentType::Summary => "summary",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parses the lowercase wire name, returning `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryType {
    Concise,
    Detailed,
    BulletPoints,
    KeyConcepts,
}

impl SummaryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryType::Concise => "concise",
            SummaryType::Detailed => "detailed",
            SummaryType::BulletPoints => "bullet_points",
            SummaryType::KeyConcepts => "key_concepts",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "concise" => Some(SummaryType::Concise),
            "detailed" => Some(SummaryType::Detailed),
            "bullet_points" => Some(SummaryType::BulletPoints),
            "key_concepts" => Some(SummaryType::KeyConcepts),
            _ => None,
        }
    }
}

/// Validated generation parameters. The variant doubles as the content type,
/// so a quiz request can never carry summary parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationParameters {
    Quiz {
        question_count: u8,
        difficulty: Difficulty,
    },
    Summary {
        summary_type: SummaryType,
        max_words: u16,
    },
}

impl GenerationParameters {
    pub fn content_type(&self) -> ContentType {
        match self {
            GenerationParameters::Quiz { .. } => ContentType::Quiz,
            GenerationParameters::Summary { .. } => ContentType::Summary,
        }
    }
}

/// Raw, unvalidated options as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default)]
    pub question_count: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub summary_type: Option<String>,
    #[serde(default)]
    pub max_words: Option<i64>,
}

/// An unvalidated generation request, as assembled by a caller that has
/// already staged the source file locally.
#[derive(Debug, Clone)]
pub struct GenerationInput {
    pub content_type: ContentType,
    pub source_path: PathBuf,
    pub mime_type: String,
    pub options: GenerationOptions,
}

/// A generation request that passed the validation gate.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub source_path: PathBuf,
    pub mime_type: String,
    pub parameters: GenerationParameters,
}

impl GenerationRequest {
    pub fn content_type(&self) -> ContentType {
        self.parameters.content_type()
    }
}

//=========================================================================================
// Generated Content
//=========================================================================================

/// One multiple-choice question. `correct_answer` is always one of `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: [String; 4],
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub introduction: String,
    pub concept_summaries: IndexMap<String, String>,
    pub word_count: u32,
    pub summary_type: SummaryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
}

/// The output of a generation run. Serialized untagged: a quiz is a JSON
/// array, a summary a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeneratedContent {
    Quiz(Vec<QuizQuestion>),
    Summary(SummaryResult),
}

impl GeneratedContent {
    pub fn content_type(&self) -> ContentType {
        match self {
            GeneratedContent::Quiz(_) => ContentType::Quiz,
            GeneratedContent::Summary(_) => ContentType::Summary,
        }
    }
}

//=========================================================================================
// Gateway Request
//=========================================================================================

/// Sampling settings forwarded to the model as `generationConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 8192,
        }
    }
}

/// Source material sent alongside the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptAttachment {
    /// Binary documents and images, base64-encoded on the wire.
    InlineData { mime_type: String, data: Vec<u8> },
    /// Plain text is inlined as a second text part.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub prompt: String,
    pub attachment: Option<PromptAttachment>,
    pub config: GenerationConfig,
}

//=========================================================================================
// External Collaborators
//=========================================================================================

/// A file attached to a shared resource. Only the fields the pipeline
/// needs are carried here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAttachment {
    pub id: AttachmentId,
    pub resource_id: ResourceId,
    pub file_name: String,
    pub file_path: String,
    pub mime_type: String,
    pub size: i64,
}

//=========================================================================================
// Async Job Records
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// The polled state of an asynchronous generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncJobRecord {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub resource_id: ResourceId,
    pub attachment_id: Option<AttachmentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GeneratedContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl AsyncJobRecord {
    fn new(
        job_id: Uuid,
        status: JobStatus,
        content_type: ContentType,
        resource_id: ResourceId,
        attachment_id: Option<AttachmentId>,
    ) -> Self {
        Self {
            job_id,
            status,
            content_type,
            resource_id,
            attachment_id,
            result: None,
            error: None,
            generated_at: None,
        }
    }

    pub fn queued(
        job_id: Uuid,
        content_type: ContentType,
        resource_id: ResourceId,
        attachment_id: Option<AttachmentId>,
    ) -> Self {
        Self::new(job_id, JobStatus::Queued, content_type, resource_id, attachment_id)
    }

    pub fn running(
        job_id: Uuid,
        content_type: ContentType,
        resource_id: ResourceId,
        attachment_id: Option<AttachmentId>,
    ) -> Self {
        Self::new(job_id, JobStatus::Running, content_type, resource_id, attachment_id)
    }

    pub fn completed(
        job_id: Uuid,
        resource_id: ResourceId,
        attachment_id: Option<AttachmentId>,
        result: GeneratedContent,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::new(
            job_id,
            JobStatus::Completed,
            result.content_type(),
            resource_id,
            attachment_id,
        );
        record.result = Some(result);
        record.generated_at = Some(generated_at);
        record
    }

    pub fn failed(
        job_id: Uuid,
        content_type: ContentType,
        resource_id: ResourceId,
        attachment_id: Option<AttachmentId>,
        error: String,
    ) -> Self {
        let mut record = Self::new(job_id, JobStatus::Failed, content_type, resource_id, attachment_id);
        record.error = Some(error);
        record
    }
}
