pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod parser;
pub mod ports;
pub mod prompt;
pub mod validation;

pub use domain::{
    AsyncJobRecord, AttachmentId, ContentType, Difficulty, GatewayRequest, GeneratedContent,
    GenerationConfig, GenerationInput, GenerationOptions, GenerationParameters,
    GenerationRequest, JobStatus, PromptAttachment, QuizQuestion, ResourceAttachment,
    ResourceId, SummaryResult, SummaryType,
};
pub use error::GenerationError;
pub use ports::{
    CacheStore, FileStorage, GatewayError, GenerativeModel, PortError, PortResult,
    ResourceRepository,
};
pub use validation::ValidationError;
