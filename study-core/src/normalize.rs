//! Response normalizer: turns the model's raw reply text into typed records.
//!
//! The model is asked for JSON but frequently wraps it in a markdown code fence,
//! leaves fields out or sends `null`. Everything here is a pure text → record
//! transform; the only failures are an empty reply and text that is not JSON.

use serde::de::Error as _;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Result, StudyError};
use crate::models::{AnalysisResult, Question, QuestionResult};
use crate::questions::format_raw_question;

/// Strip a surrounding markdown code fence (```` ```json ```` / ```` ``` ````) and whitespace
pub fn clean_reply(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

/// Clean and parse a reply into a JSON value
pub fn parse_json(text: &str) -> Result<Value> {
    let cleaned = clean_reply(text);
    if cleaned.is_empty() {
        return Err(StudyError::EmptyResponse);
    }

    Ok(serde_json::from_str(cleaned)?)
}

fn unexpected_shape(expected: &str, got: &Value) -> StudyError {
    StudyError::MalformedJson(serde_json::Error::custom(format!(
        "expected {expected}, got {got}"
    )))
}

pub fn parse_analysis(text: &str) -> Result<AnalysisResult> {
    let value = parse_json(text)?;
    if !value.is_object() {
        return Err(unexpected_shape("a JSON object", &value));
    }
    Ok(serde_json::from_value(value)?)
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct QuestionEnvelope {
    #[serde(deserialize_with = "lenient::string")]
    summary: String,
    #[serde(deserialize_with = "lenient::strings")]
    key_points: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    difficulty: String,
}

/// Parse a question-generation reply. Accepts `{"questions": [...], ...}` or a bare array.
pub fn parse_question_result(text: &str, requested_difficulty: &str) -> Result<QuestionResult> {
    let (raw_questions, rest) = match parse_json(text)? {
        Value::Array(items) => (items, Map::new()),
        Value::Object(mut map) => {
            let questions = match map.remove("questions") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            (questions, map)
        }
        other => return Err(unexpected_shape("a JSON object or array", &other)),
    };

    let envelope: QuestionEnvelope = serde_json::from_value(Value::Object(rest))?;

    let questions: Vec<Question> = raw_questions
        .into_iter()
        .map(format_raw_question)
        .filter_map(|raw| match serde_json::from_value::<Question>(raw) {
            Ok(question) => Some(question),
            Err(e) => {
                warn!("Dropping question that is not an object: {}", e);
                None
            }
        })
        .collect();

    for (i, question) in questions.iter().enumerate() {
        if question.answer_index().is_none() {
            warn!(
                "Question {} answer '{}' does not match one of its {} options",
                i + 1,
                question.answer,
                question.options.len()
            );
        }
    }

    let difficulty = if envelope.difficulty.is_empty() {
        requested_difficulty.to_string()
    } else {
        envelope.difficulty
    };

    Ok(QuestionResult::new(
        questions,
        envelope.summary,
        envelope.key_points,
        difficulty,
    ))
}

/// Field-level deserializers that substitute defaults instead of failing
pub(crate) mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn scalar_to_string(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(scalar_to_string(Value::deserialize(deserializer)?).unwrap_or_default())
    }

    pub fn strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items.into_iter().filter_map(scalar_to_string).collect(),
            other => scalar_to_string(other)
                .filter(|s| !s.is_empty())
                .into_iter()
                .collect(),
        })
    }

    pub fn items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, QuestionKind};

    const ANALYSIS: &str = r#"{
        "keyPoints": ["Tamil Nadu was formed in 1956", "Capital is Chennai"],
        "summary": "States reorganisation",
        "tnpscRelevance": "Group 1 history",
        "studyPoints": [{"title": "Reorganisation", "importance": "high"}],
        "tnpscCategories": ["History", "Polity"]
    }"#;

    #[test]
    fn test_fenced_reply_parses_like_bare_json() {
        let fenced = format!("\n\n  ```json\n{}\n```   \n", ANALYSIS);
        let plain_fence = format!("```{}```", ANALYSIS);

        let expected = parse_analysis(ANALYSIS).unwrap();
        assert_eq!(parse_analysis(&fenced).unwrap(), expected);
        assert_eq!(parse_analysis(&plain_fence).unwrap(), expected);
        assert_eq!(expected.key_points.len(), 2);
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let result = parse_analysis(r#"{"summary": "only a summary"}"#).unwrap();
        assert_eq!(result.summary, "only a summary");
        assert!(result.key_points.is_empty());
        assert!(result.study_points.is_empty());
        assert!(result.tnpsc_categories.is_empty());
        assert_eq!(result.tnpsc_relevance, "");

        let result = parse_analysis(r#"{"studyPoints": [{}], "keyPoints": null}"#).unwrap();
        assert!(result.key_points.is_empty());
        let point = &result.study_points[0];
        assert_eq!(point.title, "");
        assert_eq!(point.importance, Priority::Medium);
        assert_eq!(point.tnpsc_priority, Priority::Medium);
    }

    #[test]
    fn test_wrong_typed_fields_are_repaired() {
        let result = parse_analysis(
            r#"{"keyPoints": "single point", "summary": 42, "tnpscCategories": ["Science", 7, null]}"#,
        )
        .unwrap();
        assert_eq!(result.key_points, vec!["single point"]);
        assert_eq!(result.summary, "42");
        assert_eq!(result.tnpsc_categories, vec!["Science", "7"]);
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_analysis("```json\n{\"keyPoints\": [\"unterminated\"\n```").unwrap_err();
        assert!(matches!(err, StudyError::MalformedJson(_)));

        let err = parse_analysis("I could not analyse this page.").unwrap_err();
        assert!(matches!(err, StudyError::MalformedJson(_)));
    }

    #[test]
    fn test_array_reply_is_not_an_analysis() {
        assert!(matches!(
            parse_analysis(r#"["a", "b"]"#),
            Err(StudyError::MalformedJson(_))
        ));
    }

    #[test]
    fn test_blank_reply_is_empty_response() {
        assert!(matches!(
            parse_analysis("  ```json\n```  "),
            Err(StudyError::EmptyResponse)
        ));
    }

    #[test]
    fn test_json_wrapped_in_prose_is_malformed() {
        let err = parse_analysis("Here is the analysis: {\"summary\": \"ok\"} hope it helps")
            .unwrap_err();
        assert!(matches!(err, StudyError::MalformedJson(_)));
    }

    #[test]
    fn test_question_reply_is_formatted_and_counted() {
        let reply = r#"```json
        {
            "questions": [
                {"question": "Who built the Brihadeeswarar temple?", "type": "short", "options": "none"},
                {"question": "Assertion (A) ... Reason (R) ...", "type": "assertion_reason",
                 "options": ["a", "b", "c", "d"], "answer": "B"},
                "not a question"
            ],
            "summary": "Chola architecture",
            "keyPoints": ["Rajaraja I"]
        }
        ```"#;

        let result = parse_question_result(reply, "hard").unwrap();
        assert_eq!(result.total_questions, 2);
        assert_eq!(result.difficulty, "hard");
        assert_eq!(result.summary, "Chola architecture");

        let first = &result.questions[0];
        assert_eq!(first.kind, QuestionKind::Mcq);
        assert_eq!(first.options.len(), 4);
        assert_eq!(first.answer, "A");
        assert_eq!(result.questions[1].kind, QuestionKind::AssertionReason);
    }

    #[test]
    fn test_bare_question_array_is_accepted() {
        let result = parse_question_result(r#"[{"question": "Q1"}]"#, "easy").unwrap();
        assert_eq!(result.total_questions, 1);
        assert!(result.key_points.is_empty());
    }

    #[test]
    fn test_scalar_question_reply_is_malformed() {
        assert!(matches!(
            parse_question_result("42", "easy"),
            Err(StudyError::MalformedJson(_))
        ));
    }
}
