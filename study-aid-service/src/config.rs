use std::fmt;
use std::time::Duration;

use anyhow::{Context as _, anyhow};
use study_core::GeminiConfig;
use study_core::config::DEFAULT_MODEL;
use study_core::pacing::DEFAULT_PAGE_DELAY;

pub const DEFAULT_PORT: u16 = 3000;
/// Base64 page images from phone cameras easily exceed axum's 2 MiB default
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Service settings, read once at startup
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub gemini: GeminiConfig,
    pub page_delay: Duration,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value lookup (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_key = lookup("GEMINI_API_KEY")
            .ok_or_else(|| anyhow!("GEMINI_API_KEY environment variable is required"))?;

        let mut gemini = GeminiConfig::new(api_key)?
            .with_model(lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()));
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            gemini = gemini.with_base_url(base_url);
        }

        let page_delay = match lookup("PAGE_DELAY_MS") {
            Some(ms) => Duration::from_millis(
                ms.parse::<u64>()
                    .with_context(|| format!("PAGE_DELAY_MS is not a number: {ms}"))?,
            ),
            None => DEFAULT_PAGE_DELAY,
        };

        let port = lookup("PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let max_body_bytes = lookup("MAX_BODY_BYTES")
            .and_then(|b| b.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);

        Ok(Self {
            gemini,
            page_delay,
            port,
            max_body_bytes,
        })
    }
}

/// One-line startup summary. Never includes the API key.
impl fmt::Display for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model {}, page delay {}ms, body limit {} bytes",
            self.gemini.model(),
            self.page_delay.as_millis(),
            self.max_body_bytes
        )
    }
}
