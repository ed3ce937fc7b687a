//! Request builder: prompt templates for every analysis call site.
//!
//! A prompt is a framing sentence, a language directive, the embedded content
//! (cut to a character budget) and the JSON shape the model must fill in.
//! Embedded content is concatenated as-is.

use crate::gemini::ContentRequest;
use crate::models::{AnalysisResult, ImageInput, Language, QuestionStyle, QuizOptions};

pub const DOCUMENT_CHAR_BUDGET: usize = 8000;
pub const PAGE_CHAR_BUDGET: usize = 4000;
pub const QUIZ_CONTENT_CHAR_BUDGET: usize = 8000;

pub const IMAGE_MAX_TOKENS: u32 = 2000;
pub const PAGE_MAX_TOKENS: u32 = 1500;
pub const DOCUMENT_MAX_TOKENS: u32 = 3000;
pub const QUIZ_MAX_TOKENS: u32 = 3000;

const ANALYSIS_SHAPE: &str = r#"{
  "keyPoints": ["short factual statement", "..."],
  "summary": "2-3 sentence summary of the content",
  "tnpscRelevance": "why this matters for TNPSC Group 1/2/4 exams",
  "studyPoints": [
    {
      "title": "topic title",
      "description": "what to remember about it",
      "importance": "high | medium | low",
      "tnpscRelevance": "where it appears in the TNPSC syllabus",
      "tnpscPriority": "high | medium | low",
      "memoryTip": "mnemonic or memory aid"
    }
  ],
  "tnpscCategories": ["History", "Polity", "Geography", "Economy", "Science", "Current Affairs"]
}"#;

const QUESTION_SHAPE: &str = r#"{
  "questions": [
    {
      "question": "question text",
      "options": ["option A", "option B", "option C", "option D"],
      "answer": "A",
      "type": "mcq | assertion_reason",
      "difficulty": "easy | medium | hard",
      "tnpscGroup": "Group 1 | Group 2 | Group 4",
      "explanation": "why the answer is correct"
    }
  ],
  "summary": "one line describing what the questions cover",
  "keyPoints": ["concept tested", "..."],
  "difficulty": "overall difficulty"
}"#;

pub fn language_directive(language: Language) -> &'static str {
    match language {
        Language::English => "Respond entirely in English.",
        Language::Tamil => {
            "Respond entirely in Tamil (தமிழ்). Keep the JSON keys in English, write every value in Tamil."
        }
    }
}

/// Longest prefix of `text` with at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn analysis_prompt(framing: &str, language: Language, content: Option<&str>) -> String {
    let mut prompt = format!("{framing}\n\n{}\n\n", language_directive(language));
    if let Some(content) = content {
        prompt.push_str("Content:\n");
        prompt.push_str(content);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Return ONLY valid JSON in exactly this format, with no extra commentary:\n");
    prompt.push_str(ANALYSIS_SHAPE);
    prompt
}

pub fn image_analysis(image: ImageInput, language: Language) -> ContentRequest {
    ContentRequest {
        prompt: analysis_prompt(
            "You are an expert TNPSC exam tutor. Read all text and diagrams in the attached \
             study-material image and extract what a candidate must learn from it.",
            language,
            None,
        ),
        image: Some(image),
        max_output_tokens: IMAGE_MAX_TOKENS,
    }
}

pub fn page_text_analysis(page_number: u32, text: &str, language: Language) -> ContentRequest {
    let framing = format!(
        "You are an expert TNPSC exam tutor. Analyze page {page_number} of a study document \
         and extract the key points and study points a candidate must learn from it."
    );
    ContentRequest {
        prompt: analysis_prompt(
            &framing,
            language,
            Some(truncate_chars(text, PAGE_CHAR_BUDGET)),
        ),
        image: None,
        max_output_tokens: PAGE_MAX_TOKENS,
    }
}

pub fn page_image_analysis(page_number: u32, image: ImageInput, language: Language) -> ContentRequest {
    let framing = format!(
        "You are an expert TNPSC exam tutor. The attached image is page {page_number} of a \
         study document. Read it and extract the key points and study points a candidate must \
         learn from it."
    );
    ContentRequest {
        prompt: analysis_prompt(&framing, language, None),
        image: Some(image),
        max_output_tokens: PAGE_MAX_TOKENS,
    }
}

pub fn document_analysis(text: &str, language: Language) -> ContentRequest {
    ContentRequest {
        prompt: analysis_prompt(
            "You are an expert TNPSC exam tutor. Analyze the following study document as a \
             whole and extract the most important key points and study points for exam \
             preparation.",
            language,
            Some(truncate_chars(text, DOCUMENT_CHAR_BUDGET)),
        ),
        image: None,
        max_output_tokens: DOCUMENT_MAX_TOKENS,
    }
}

/// Flatten prior analyses into the text the quiz is generated from
pub fn quiz_source_text(analyses: &[AnalysisResult]) -> String {
    let mut text = String::new();
    for (i, analysis) in analyses.iter().enumerate() {
        text.push_str(&format!("Section {}:\n", i + 1));
        if !analysis.summary.is_empty() {
            text.push_str(&format!("Summary: {}\n", analysis.summary));
        }
        for point in &analysis.key_points {
            text.push_str(&format!("- {point}\n"));
        }
        for study in &analysis.study_points {
            text.push_str(&format!("* {}: {}\n", study.title, study.description));
        }
        text.push('\n');
    }
    text
}

fn style_instruction(style: QuestionStyle) -> &'static str {
    match style {
        QuestionStyle::Mcq => {
            "All questions must be multiple choice (type \"mcq\") with exactly four options."
        }
        QuestionStyle::AssertionReason => {
            "All questions must be Assertion-Reason questions (type \"assertion_reason\"): state \
             an Assertion (A) and a Reason (R), and use the four standard options about whether \
             A and R are true and whether R explains A."
        }
        QuestionStyle::Mixed => {
            "Mix multiple choice (type \"mcq\") and Assertion-Reason (type \"assertion_reason\") \
             questions, each with exactly four options."
        }
    }
}

pub fn question_generation(analyses: &[AnalysisResult], options: &QuizOptions) -> ContentRequest {
    let source = quiz_source_text(analyses);
    let prompt = format!(
        "You are a TNPSC question paper setter. Create exactly {count} {difficulty} difficulty \
         questions from the study material below, in the style of TNPSC Group exams.\n\n\
         {style}\n\
         The answer must be the letter (A, B, C or D) of the correct option.\n\n\
         {language}\n\n\
         Study material:\n{material}\n\n\
         Return ONLY valid JSON in exactly this format, with no extra commentary:\n{shape}",
        count = options.count,
        difficulty = options.difficulty.as_str(),
        style = style_instruction(options.style),
        language = language_directive(options.language),
        material = truncate_chars(&source, QUIZ_CONTENT_CHAR_BUDGET),
        shape = QUESTION_SHAPE,
    );

    ContentRequest {
        prompt,
        image: None,
        max_output_tokens: QUIZ_MAX_TOKENS,
    }
}
