pub mod analyzer;
pub mod config;
pub mod error;
pub mod gemini;
pub mod models;
pub mod normalize;
pub mod pacing;
pub mod pages;
pub mod prompt;
pub mod questions;
pub mod source;

// Re-export commonly used types
pub use analyzer::StudyAnalyzer;
pub use config::GeminiConfig;
pub use error::{Result, StudyError};
pub use gemini::{ContentRequest, GeminiClient, GenerativeModel};
pub use models::*;
pub use pacing::{FixedPacer, NoPacing, Pacer};
pub use questions::PageRange;
pub use source::{PageContent, PageSource, TextPages};
