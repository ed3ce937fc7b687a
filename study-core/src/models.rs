use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Result, StudyError};
use crate::normalize::lenient;

/// Upper bound on questions requested in one generation call
pub const MAX_QUESTIONS: u32 = 50;

/// Output language requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Tamil,
}

/// Importance / exam-priority level attached to a study point.
///
/// Parsing never fails: unknown, missing or non-string values collapse to `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(label) => Priority::from_label(&label),
            _ => Priority::default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudyPoint {
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::string")]
    pub description: String,
    pub importance: Priority,
    #[serde(deserialize_with = "lenient::string")]
    pub tnpsc_relevance: String,
    pub tnpsc_priority: Priority,
    #[serde(deserialize_with = "lenient::string")]
    pub memory_tip: String,
}

/// Result of one analysis call (image, page or whole document)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(deserialize_with = "lenient::strings")]
    pub key_points: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub summary: String,
    #[serde(deserialize_with = "lenient::string")]
    pub tnpsc_relevance: String,
    #[serde(deserialize_with = "lenient::items")]
    pub study_points: Vec<StudyPoint>,
    #[serde(deserialize_with = "lenient::strings")]
    pub tnpsc_categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAnalysis {
    pub page_number: u32,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub key_points: Vec<String>,
    #[serde(default, deserialize_with = "lenient::items")]
    pub study_points: Vec<StudyPoint>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub tnpsc_relevance: String,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub tnpsc_categories: Vec<String>,
}

impl PageAnalysis {
    pub fn from_analysis(page_number: u32, analysis: AnalysisResult) -> Self {
        Self {
            page_number,
            key_points: analysis.key_points,
            study_points: analysis.study_points,
            summary: analysis.summary,
            tnpsc_relevance: analysis.tnpsc_relevance,
            tnpsc_categories: analysis.tnpsc_categories,
        }
    }
}

impl From<&PageAnalysis> for AnalysisResult {
    fn from(page: &PageAnalysis) -> Self {
        AnalysisResult {
            key_points: page.key_points.clone(),
            summary: page.summary.clone(),
            tnpsc_relevance: page.tnpsc_relevance.clone(),
            study_points: page.study_points.clone(),
            tnpsc_categories: page.tnpsc_categories.clone(),
        }
    }
}

/// Aggregate produced by the sequential multi-page batch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComprehensiveAnalysis {
    pub page_analyses: Vec<PageAnalysis>,
    pub total_key_points: Vec<String>,
    pub tnpsc_categories: Vec<String>,
    pub summary: String,
    /// Pages found in the source text, including skipped and failed ones
    pub pages_requested: u32,
}

/// Question format. Values other than the two known ones pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QuestionKind {
    #[default]
    Mcq,
    AssertionReason,
    Other(String),
}

impl QuestionKind {
    pub fn as_str(&self) -> &str {
        match self {
            QuestionKind::Mcq => "mcq",
            QuestionKind::AssertionReason => "assertion_reason",
            QuestionKind::Other(other) => other,
        }
    }
}

impl From<String> for QuestionKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "mcq" => QuestionKind::Mcq,
            "assertion_reason" => QuestionKind::AssertionReason,
            _ => QuestionKind::Other(value),
        }
    }
}

impl Serialize for QuestionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QuestionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(kind) => QuestionKind::from(kind),
            _ => QuestionKind::default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Question {
    #[serde(deserialize_with = "lenient::string")]
    pub question: String,
    #[serde(deserialize_with = "lenient::strings")]
    pub options: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub answer: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(deserialize_with = "lenient::string")]
    pub difficulty: String,
    #[serde(deserialize_with = "lenient::string")]
    pub tnpsc_group: String,
    #[serde(deserialize_with = "lenient::string")]
    pub explanation: String,
}

impl Question {
    /// Index of the option the answer letter points at, if it points at one
    pub fn answer_index(&self) -> Option<usize> {
        let mut chars = self.answer.trim().chars();
        let letter = chars.next()?.to_ascii_uppercase();
        if chars.next().is_some() || !('A'..='D').contains(&letter) {
            return None;
        }
        let index = (letter as u8 - b'A') as usize;
        (index < self.options.len()).then_some(index)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub questions: Vec<Question>,
    pub summary: String,
    pub key_points: Vec<String>,
    pub difficulty: String,
    pub total_questions: usize,
}

impl QuestionResult {
    pub fn new(
        questions: Vec<Question>,
        summary: String,
        key_points: Vec<String>,
        difficulty: String,
    ) -> Self {
        let total_questions = questions.len();
        Self {
            questions,
            summary,
            key_points,
            difficulty,
            total_questions,
        }
    }
}

/// Raw image bytes plus their MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageInput {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn png(data: Vec<u8>) -> Self {
        Self::new("image/png", data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Mixed,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Mixed => "mixed",
        }
    }
}

/// Which question formats to ask the model for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStyle {
    #[default]
    Mcq,
    AssertionReason,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuizOptions {
    pub count: u32,
    pub difficulty: Difficulty,
    #[serde(rename = "questionType")]
    pub style: QuestionStyle,
    pub language: Language,
}

impl Default for QuizOptions {
    fn default() -> Self {
        Self {
            count: 10,
            difficulty: Difficulty::default(),
            style: QuestionStyle::default(),
            language: Language::default(),
        }
    }
}

impl QuizOptions {
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 || self.count > MAX_QUESTIONS {
            return Err(StudyError::InvalidQuestionCount {
                count: self.count,
                max: MAX_QUESTIONS,
            });
        }
        Ok(())
    }
}

/// Per-image analyses plus the quiz generated from all of them
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageQuiz {
    pub analyses: Vec<AnalysisResult>,
    pub quiz: QuestionResult,
}
