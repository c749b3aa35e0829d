//! crates/campus_ai_core/src/parser.rs
//!
//! Extracts the model's text from the response envelope and validates it
//! against the quiz or summary schema. A batch is accepted whole or not at all.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::domain::{GeneratedContent, GenerationParameters, QuizQuestion, SummaryResult, SummaryType};
use crate::error::GenerationError;

/// Longest excerpt of model output copied into an error message.
const ERROR_EXCERPT_CHARS: usize = 500;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)\A\s*```[A-Za-z0-9_-]*\s*\n?(.*?)\s*```\s*\z")
            .expect("fence pattern is valid")
    })
}

fn malformed(message: impl Into<String>) -> GenerationError {
    GenerationError::MalformedResponse(message.into())
}

fn excerpt(text: &str) -> String {
    text.chars().take(ERROR_EXCERPT_CHARS).collect()
}

/// Parses a raw response envelope (`candidates[0].content.parts[0].text`).
pub fn parse(
    envelope: &Value,
    parameters: &GenerationParameters,
) -> Result<GeneratedContent, GenerationError> {
    let text = envelope
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("response has no candidates[0].content.parts[0].text"))?;

    parse_text(text, parameters)
}

/// Parses the model's text output, which may be wrapped in Markdown fences.
pub fn parse_text(
    text: &str,
    parameters: &GenerationParameters,
) -> Result<GeneratedContent, GenerationError> {
    let cleaned = strip_code_fences(text);
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| malformed(format!("invalid JSON ({e}): {}", excerpt(cleaned))))?;

    match parameters {
        GenerationParameters::Quiz { .. } => validate_quiz(&value).map(GeneratedContent::Quiz),
        GenerationParameters::Summary { summary_type, .. } => {
            validate_summary(&value, *summary_type).map(GeneratedContent::Summary)
        }
    }
}

/// Removes a surrounding ```` ``` ```` / ```` ```json ```` fence, if any.
pub fn strip_code_fences(text: &str) -> &str {
    match fence_regex().captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

fn non_empty_str<'a>(value: &'a Value, field: &str, context: &str) -> Result<&'a str, GenerationError> {
    match value.get(field).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(malformed(format!("{context}: '{field}' must be a non-empty string"))),
    }
}

fn validate_quiz(value: &Value) -> Result<Vec<QuizQuestion>, GenerationError> {
    let items = value
        .as_array()
        .ok_or_else(|| malformed("quiz must be a JSON array"))?;
    if items.is_empty() {
        return Err(malformed("quiz contains no questions"));
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| validate_question(item, &format!("question {}", i + 1)))
        .collect()
}

fn validate_question(item: &Value, context: &str) -> Result<QuizQuestion, GenerationError> {
    let question = non_empty_str(item, "question", context)?;

    let raw_options = item
        .get("options")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed(format!("{context}: 'options' must be an array")))?;
    if raw_options.len() != 4 {
        return Err(malformed(format!(
            "{context}: expected 4 options, got {}",
            raw_options.len()
        )));
    }

    let mut options: Vec<String> = Vec::with_capacity(4);
    let mut seen = HashSet::new();
    for option in raw_options {
        let text = option
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| malformed(format!("{context}: every option must be a non-empty string")))?;
        if !seen.insert(text) {
            return Err(malformed(format!("{context}: duplicate option '{text}'")));
        }
        options.push(text.to_string());
    }

    let correct_answer = non_empty_str(item, "correct_answer", context)?;
    if !options.iter().any(|o| o == correct_answer) {
        return Err(malformed(format!(
            "{context}: correct_answer '{correct_answer}' is not one of the options"
        )));
    }

    let explanation = item
        .get("explanation")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let options: [String; 4] = options
        .try_into()
        .map_err(|_| malformed(format!("{context}: expected 4 options")))?;

    Ok(QuizQuestion {
        question: question.to_string(),
        options,
        correct_answer: correct_answer.to_string(),
        explanation,
    })
}

fn validate_summary(value: &Value, requested: SummaryType) -> Result<SummaryResult, GenerationError> {
    if !value.is_object() {
        return Err(malformed("summary must be a JSON object"));
    }
    let context = "summary";
    let introduction = non_empty_str(value, "introduction", context)?.to_string();

    let concepts = value
        .get("concept_summaries")
        .and_then(Value::as_object)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| malformed("summary: 'concept_summaries' must be a non-empty object"))?;
    let mut concept_summaries = IndexMap::with_capacity(concepts.len());
    for (name, explanation) in concepts {
        let explanation = explanation
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| malformed(format!("summary: concept '{name}' has no explanation")))?;
        if name.trim().is_empty() {
            return Err(malformed("summary: concept names must be non-empty"));
        }
        concept_summaries.insert(name.clone(), explanation.to_string());
    }

    let word_count = value
        .get("word_count")
        .and_then(Value::as_f64)
        .map(f64::round)
        .filter(|n| (1.0..=f64::from(u32::MAX)).contains(n))
        .ok_or_else(|| {
            malformed(format!(
                "summary: 'word_count' must be a number between 1 and {}",
                u32::MAX
            ))
        })?;

    let key_topics = match value.get("key_topics") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(|t| {
                    t.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| malformed("summary: 'key_topics' must contain strings"))
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Some(_) => return Err(malformed("summary: 'key_topics' must be an array")),
    };

    let confidence_score = match value.get("confidence_score") {
        None | Some(Value::Null) => None,
        Some(v) => match v.as_f64() {
            Some(score) if (0.0..=1.0).contains(&score) => Some(score),
            _ => {
                return Err(malformed(
                    "summary: 'confidence_score' must be a number between 0 and 1",
                ))
            }
        },
    };

    let summary_type = value
        .get("summary_type")
        .and_then(Value::as_str)
        .and_then(SummaryType::parse)
        .unwrap_or(requested);

    Ok(SummaryResult {
        introduction,
        concept_summaries,
        word_count: word_count as u32,
        summary_type,
        key_topics,
        confidence_score,
    })
}
