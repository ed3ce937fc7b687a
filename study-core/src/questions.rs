use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Result, StudyError};
use crate::models::{ComprehensiveAnalysis, PageAnalysis};

/// Normalize one raw question object as returned by the model.
///
/// * `type: "short"` becomes `"mcq"`
/// * non-array `options` become four placeholder options
/// * a missing or null `answer` becomes `"A"`
///
/// Nothing else is checked; unknown types and odd option counts pass through.
pub fn format_raw_question(mut raw: Value) -> Value {
    let Some(question) = raw.as_object_mut() else {
        return raw;
    };

    if question.get("type").and_then(Value::as_str) == Some("short") {
        question.insert("type".to_string(), json!("mcq"));
    }

    if !question.get("options").is_some_and(Value::is_array) {
        question.insert(
            "options".to_string(),
            json!(["Option A", "Option B", "Option C", "Option D"]),
        );
    }

    if question.get("answer").is_none_or(Value::is_null) {
        question.insert("answer".to_string(), json!("A"));
    }

    raw
}

/// Inclusive, 1-based page range for page-scoped quizzes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPageRange")]
pub struct PageRange {
    start: u32,
    end: u32,
}

#[derive(Deserialize)]
struct RawPageRange {
    start: u32,
    end: u32,
}

impl TryFrom<RawPageRange> for PageRange {
    type Error = StudyError;

    fn try_from(raw: RawPageRange) -> Result<Self> {
        PageRange::new(raw.start, raw.end)
    }
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start == 0 || start > end {
            return Err(StudyError::InvalidPageRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn contains(&self, page: u32) -> bool {
        (self.start..=self.end).contains(&page)
    }

    /// Page analyses of `document` that fall inside the range, in document order
    pub fn select<'a>(&self, document: &'a ComprehensiveAnalysis) -> Vec<&'a PageAnalysis> {
        document
            .page_analyses
            .iter()
            .filter(|page| self.contains(page.page_number))
            .collect()
    }
}
