use thiserror::Error;

/// Errors produced while building requests, calling the model or parsing its reply
#[derive(Error, Debug)]
pub enum StudyError {
    /// The model endpoint answered with a non-2xx status
    #[error("Generative API request failed with status {status}: {body}")]
    Transport { status: u16, body: String },

    /// The request never produced a response (DNS, TLS, connection reset...).
    /// Built only through [`StudyError::http`]: the request URL carries the API key.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Generative API returned no text content")]
    EmptyResponse,

    #[error("Model reply is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("Invalid page range {start}-{end}: pages start at 1 and start must not exceed end")]
    InvalidPageRange { start: u32, end: u32 },

    #[error("Question count must be between 1 and {max}, got {count}")]
    InvalidQuestionCount { count: u32, max: u32 },

    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("No analysed content to generate questions from")]
    NoContent,

    #[error("Page source error: {0}")]
    PageSource(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StudyError {
    /// Wrap a reqwest failure with its URL stripped
    pub fn http(err: reqwest::Error) -> Self {
        StudyError::Http(err.without_url())
    }

    /// True for failures caused by bad caller input rather than the upstream model
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StudyError::InvalidPageRange { .. }
                | StudyError::InvalidQuestionCount { .. }
                | StudyError::NoContent
        )
    }
}

pub type Result<T> = std::result::Result<T, StudyError>;
