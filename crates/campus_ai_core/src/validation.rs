//! crates/campus_ai_core/src/validation.rs
//!
//! The validation gate. Turns an untyped `GenerationInput` into a
//! `GenerationRequest`, rejecting malformed input before the file is read
//! or the model is called.

use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::domain::{
    ContentType, Difficulty, GenerationInput, GenerationOptions, GenerationParameters,
    GenerationRequest, SummaryType,
};

/// Largest source file accepted, in bytes (10 MiB).
pub const MAX_SOURCE_BYTES: u64 = 10 * 1024 * 1024;

/// Mime types the model accepts as source material. Office formats are
/// deliberately absent.
pub const SUPPORTED_MIME_TYPES: [&str; 6] = [
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "text/plain",
];

pub const QUESTION_COUNT_RANGE: RangeInclusive<i64> = 1..=20;
pub const MAX_WORDS_RANGE: RangeInclusive<i64> = 50..=1000;

pub const DEFAULT_QUESTION_COUNT: i64 = 10;
pub const DEFAULT_DIFFICULTY: &str = "medium";
pub const DEFAULT_SUMMARY_TYPE: &str = "concise";
pub const DEFAULT_MAX_WORDS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("source file {0} does not exist")]
    SourceMissing(PathBuf),
    #[error("source file {path} is not readable: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },
    #[error("source file is {size} bytes, the limit is {max} bytes")]
    SourceTooLarge { size: u64, max: u64 },
    #[error("unsupported mime type '{0}'")]
    UnsupportedMimeType(String),
    #[error("question_count must be between 1 and 20, got {0}")]
    QuestionCountOutOfRange(i64),
    #[error("difficulty must be one of easy, medium, hard, got '{0}'")]
    InvalidDifficulty(String),
    #[error("summary_type must be one of concise, detailed, bullet_points, key_concepts, got '{0}'")]
    InvalidSummaryType(String),
    #[error("max_words must be between 50 and 1000, got {0}")]
    MaxWordsOutOfRange(i64),
}

impl ValidationError {
    /// The name of the offending input field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::SourceMissing(_)
            | ValidationError::SourceUnreadable { .. }
            | ValidationError::SourceTooLarge { .. } => "file",
            ValidationError::UnsupportedMimeType(_) => "mime_type",
            ValidationError::QuestionCountOutOfRange(_) => "question_count",
            ValidationError::InvalidDifficulty(_) => "difficulty",
            ValidationError::InvalidSummaryType(_) => "summary_type",
            ValidationError::MaxWordsOutOfRange(_) => "max_words",
        }
    }
}

/// Runs every rule in order: file, size, mime type, parameters.
pub fn validate(input: GenerationInput) -> Result<GenerationRequest, ValidationError> {
    check_source(&input.source_path)?;
    let mime_type = check_mime_type(&input.mime_type)?;
    let parameters = validate_parameters(input.content_type, &input.options)?;

    Ok(GenerationRequest {
        source_path: input.source_path,
        mime_type,
        parameters,
    })
}

/// Checks that the file exists, can be opened and is within the size limit.
/// Returns the file size.
pub fn check_source(path: &Path) -> Result<u64, ValidationError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ValidationError::SourceMissing(path.to_path_buf()),
        _ => ValidationError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    if !metadata.is_file() {
        return Err(ValidationError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    fs::File::open(path).map_err(|e| ValidationError::SourceUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let size = metadata.len();
    if size > MAX_SOURCE_BYTES {
        return Err(ValidationError::SourceTooLarge {
            size,
            max: MAX_SOURCE_BYTES,
        });
    }
    Ok(size)
}

/// Normalizes a mime type (parameters dropped, lowercased) and checks it is supported.
pub fn check_mime_type(mime_type: &str) -> Result<String, ValidationError> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if SUPPORTED_MIME_TYPES.contains(&essence.as_str()) {
        Ok(essence)
    } else {
        Err(ValidationError::UnsupportedMimeType(mime_type.to_string()))
    }
}

/// Converts raw options into typed parameters for the given content type.
/// Options that belong to the other content type are ignored.
pub fn validate_parameters(
    content_type: ContentType,
    options: &GenerationOptions,
) -> Result<GenerationParameters, ValidationError> {
    match content_type {
        ContentType::Quiz => {
            let count = options.question_count.unwrap_or(DEFAULT_QUESTION_COUNT);
            if !QUESTION_COUNT_RANGE.contains(&count) {
                return Err(ValidationError::QuestionCountOutOfRange(count));
            }
            let raw = options.difficulty.as_deref().unwrap_or(DEFAULT_DIFFICULTY);
            let difficulty = Difficulty::parse(raw)
                .ok_or_else(|| ValidationError::InvalidDifficulty(raw.to_string()))?;

            Ok(GenerationParameters::Quiz {
                question_count: count as u8,
                difficulty,
            })
        }
        ContentType::Summary => {
            let raw = options.summary_type.as_deref().unwrap_or(DEFAULT_SUMMARY_TYPE);
            let summary_type = SummaryType::parse(raw)
                .ok_or_else(|| ValidationError::InvalidSummaryType(raw.to_string()))?;
            let max_words = options.max_words.unwrap_or(DEFAULT_MAX_WORDS);
            if !MAX_WORDS_RANGE.contains(&max_words) {
                return Err(ValidationError::MaxWordsOutOfRange(max_words));
            }

            Ok(GenerationParameters::Summary {
                summary_type,
                max_words: max_words as u16,
            })
        }
    }
}
