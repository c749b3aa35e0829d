//! crates/campus_ai_core/src/prompt.rs
//!
//! Renders the instruction text sent to the model. The JSON field names in
//! these templates are the contract the parser in `parser.rs` validates.

use crate::domain::{Difficulty, GenerationParameters, SummaryType};

const QUIZ_TEMPLATE: &str = r#"You are an experienced university teaching assistant writing a multiple-choice quiz about the attached study material.

Write exactly {question_count} questions at {difficulty} difficulty.
{difficulty_guidance}

Rules:
- Every question must be answerable from the material alone.
- Every question has exactly 4 distinct answer options.
- Exactly one option is correct, and "correct_answer" must repeat that option's text verbatim.
- "explanation" is one or two sentences telling the student why the answer is correct.
- Do not number the questions or prefix options with letters.

Respond with ONLY a JSON array, no prose and no Markdown, in this shape:
[
  {
    "question": "string",
    "options": ["string", "string", "string", "string"],
    "correct_answer": "string",
    "explanation": "string"
  }
]"#;

const SUMMARY_TEMPLATE: &str = r#"You are an experienced university teaching assistant summarizing the attached study material for a student.

Summary style: {summary_type}.
{style_guidance}

Rules:
- Start with a short introduction paragraph that states what the material is about.
- Then explain each important concept in a few sentences, keyed by the concept's name.
- The whole summary must not exceed {max_words} words.
- Use only information found in the material.

Respond with ONLY a JSON object, no prose and no Markdown, in this shape:
{
  "introduction": "string",
  "concept_summaries": { "Concept name": "short explanation" },
  "summary_type": "{summary_type}",
  "word_count": 0,
  "key_topics": ["string"],
  "confidence_score": 0.0
}
"word_count" is the number of words you wrote. "confidence_score" is a number between 0 and 1 describing how well the material supported the summary."#;

/// Builds the prompt for the given parameters.
pub fn build_prompt(parameters: &GenerationParameters) -> String {
    match parameters {
        GenerationParameters::Quiz {
            question_count,
            difficulty,
        } => QUIZ_TEMPLATE
            .replace("{question_count}", &question_count.to_string())
            .replace("{difficulty}", difficulty.as_str())
            .replace("{difficulty_guidance}", difficulty_guidance(*difficulty)),
        GenerationParameters::Summary {
            summary_type,
            max_words,
        } => SUMMARY_TEMPLATE
            .replace("{summary_type}", summary_type.as_str())
            .replace("{style_guidance}", style_guidance(*summary_type))
            .replace("{max_words}", &max_words.to_string()),
    }
}

fn difficulty_guidance(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "Focus on definitions and facts stated directly in the material.",
        Difficulty::Medium => {
            "Mix recall questions with questions that require understanding how ideas relate."
        }
        Difficulty::Hard => {
            "Ask questions that require applying or analysing the material, with plausible distractors."
        }
    }
}

fn style_guidance(summary_type: SummaryType) -> &'static str {
    match summary_type {
        SummaryType::Concise => "Keep every explanation to one or two sentences.",
        SummaryType::Detailed => "Explain each concept thoroughly, including examples from the material.",
        SummaryType::BulletPoints => {
            "Write each concept explanation as short bullet-style fragments separated by semicolons."
        }
        SummaryType::KeyConcepts => {
            "Cover only the most important concepts and the terms a student must remember."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_prompt_carries_count_difficulty_and_fields() {
        let prompt = build_prompt(&GenerationParameters::Quiz {
            question_count: 7,
            difficulty: Difficulty::Hard,
        });
        assert!(prompt.contains("exactly 7 questions at hard difficulty"));
        for field in ["\"question\"", "\"options\"", "\"correct_answer\"", "\"explanation\""] {
            assert!(prompt.contains(field), "missing {field}");
        }
        assert!(!prompt.contains("{question_count}"));
        assert!(!prompt.contains("{difficulty_guidance}"));
    }

    #[test]
    fn summary_prompt_carries_type_limit_and_fields() {
        let prompt = build_prompt(&GenerationParameters::Summary {
            summary_type: SummaryType::BulletPoints,
            max_words: 250,
        });
        assert!(prompt.contains("Summary style: bullet_points."));
        assert!(prompt.contains("must not exceed 250 words"));
        for field in [
            "\"introduction\"",
            "\"concept_summaries\"",
            "\"summary_type\"",
            "\"word_count\"",
            "\"key_topics\"",
            "\"confidence_score\"",
        ] {
            assert!(prompt.contains(field), "missing {field}");
        }
        assert!(!prompt.contains("{max_words}"));
        assert!(!prompt.contains("{style_guidance}"));
    }
}
