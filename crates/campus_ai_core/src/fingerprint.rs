//! crates/campus_ai_core/src/fingerprint.rs
//!
//! Deterministic cache keys for generated content. Keys are derived from the
//! file's content hash, never from its path or modification time, so they
//! survive restarts and path reuse.

use sha2::{Digest, Sha256};

use crate::domain::GenerationParameters;

/// Hex-encoded SHA-256 of the source file's bytes.
pub fn content_fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Builds the cache key `ai_{type}_{sha256(type, fingerprint, parameters)}`.
pub fn cache_key(fingerprint: &str, parameters: &GenerationParameters) -> String {
    let content_type = parameters.content_type();
    let mut hasher = Sha256::new();
    hasher.update(content_type.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(fingerprint.as_bytes());
    hasher.update(b"\0");
    hasher.update(canonical_parameters(parameters).as_bytes());
    format!("ai_{}_{:x}", content_type, hasher.finalize())
}

/// Key under which an async job's record is stored.
pub fn job_key(job_id: &uuid::Uuid) -> String {
    format!("ai_job_{job_id}")
}

fn canonical_parameters(parameters: &GenerationParameters) -> String {
    match parameters {
        GenerationParameters::Quiz {
            question_count,
            difficulty,
        } => format!("question_count={question_count};difficulty={}", difficulty.as_str()),
        GenerationParameters::Summary {
            summary_type,
            max_words,
        } => format!("summary_type={};max_words={max_words}", summary_type.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, SummaryType};

    const QUIZ: GenerationParameters = GenerationParameters::Quiz {
        question_count: 5,
        difficulty: Difficulty::Easy,
    };

    #[test]
    fn fingerprint_is_sha256_hex() {
        assert_eq!(
            content_fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn key_is_stable_for_same_inputs() {
        let fp = content_fingerprint(b"lecture notes");
        assert_eq!(cache_key(&fp, &QUIZ), cache_key(&fp, &QUIZ));
        assert!(cache_key(&fp, &QUIZ).starts_with("ai_quiz_"));
    }

    #[test]
    fn key_changes_with_content_or_parameters() {
        let a = content_fingerprint(b"lecture notes v1");
        let b = content_fingerprint(b"lecture notes v2");
        assert_ne!(cache_key(&a, &QUIZ), cache_key(&b, &QUIZ));

        let harder = GenerationParameters::Quiz {
            question_count: 5,
            difficulty: Difficulty::Hard,
        };
        assert_ne!(cache_key(&a, &QUIZ), cache_key(&a, &harder));

        let summary = GenerationParameters::Summary {
            summary_type: SummaryType::Concise,
            max_words: 100,
        };
        assert!(cache_key(&a, &summary).starts_with("ai_summary_"));
    }

    #[test]
    fn job_key_embeds_id() {
        let id = uuid::Uuid::nil();
        assert_eq!(job_key(&id), "ai_job_00000000-0000-0000-0000-000000000000");
    }
}
