use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Result, StudyError};
use crate::gemini::{ContentRequest, GenerativeModel};
use crate::models::{
    AnalysisResult, ComprehensiveAnalysis, ImageInput, ImageQuiz, Language, PageAnalysis,
    QuestionResult, QuizOptions,
};
use crate::normalize::{parse_analysis, parse_question_result};
use crate::pacing::{FixedPacer, Pacer};
use crate::pages::split_pages;
use crate::prompt;
use crate::questions::PageRange;
use crate::source::{PageContent, PageSource, ensure_page_in_range};

/// Entry points the UI calls. Every call is independent; nothing is cached.
#[derive(Clone)]
pub struct StudyAnalyzer {
    model: Arc<dyn GenerativeModel>,
    pacer: Arc<dyn Pacer>,
}

impl StudyAnalyzer {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            model,
            pacer: Arc::new(FixedPacer::default()),
        }
    }

    /// Replace the pause policy used between pages of a comprehensive analysis
    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    async fn request_analysis(&self, request: ContentRequest) -> Result<AnalysisResult> {
        let reply = self.model.generate(&request).await?;
        parse_analysis(&reply)
    }

    pub async fn analyze_image(
        &self,
        image: ImageInput,
        language: Language,
    ) -> Result<AnalysisResult> {
        info!(
            "Analyzing {} image ({} bytes)",
            image.mime_type,
            image.data.len()
        );
        let analysis = self
            .request_analysis(prompt::image_analysis(image, language))
            .await?;
        info!("Image analysis produced {} key points", analysis.key_points.len());
        Ok(analysis)
    }

    /// Whole-document analysis over the first 8000 characters
    pub async fn analyze_text(&self, text: &str, language: Language) -> Result<AnalysisResult> {
        if text.trim().is_empty() {
            return Err(StudyError::NoContent);
        }
        info!("Analyzing document text ({} characters)", text.chars().count());
        self.request_analysis(prompt::document_analysis(text, language))
            .await
    }

    pub async fn analyze_page_text(
        &self,
        page_number: u32,
        text: &str,
        language: Language,
    ) -> Result<PageAnalysis> {
        if text.trim().is_empty() {
            return Err(StudyError::NoContent);
        }
        info!("Analyzing page {} text", page_number);
        let analysis = self
            .request_analysis(prompt::page_text_analysis(page_number, text, language))
            .await?;
        Ok(PageAnalysis::from_analysis(page_number, analysis))
    }

    /// Analyze one page of a paginated document, as text or as a rendered image
    pub async fn analyze_page(
        &self,
        source: &dyn PageSource,
        page_number: u32,
        language: Language,
    ) -> Result<PageAnalysis> {
        ensure_page_in_range(source, page_number)?;

        match source.page(page_number).await? {
            PageContent::Text(text) => self.analyze_page_text(page_number, &text, language).await,
            PageContent::Image(image) => {
                info!("Analyzing page {} image", page_number);
                let analysis = self
                    .request_analysis(prompt::page_image_analysis(page_number, image, language))
                    .await?;
                Ok(PageAnalysis::from_analysis(page_number, analysis))
            }
        }
    }

    /// Analyze OCR text page by page.
    ///
    /// Pages are processed strictly one after another with the pacer's delay
    /// before every request but the first. Short pages are skipped; a page whose
    /// call or parse fails is logged and left out. This never fails as a whole.
    pub async fn analyze_comprehensive(
        &self,
        text: &str,
        language: Language,
    ) -> ComprehensiveAnalysis {
        let pages = split_pages(text);
        info!("Starting comprehensive analysis of {} pages", pages.len());

        let mut page_analyses = Vec::new();
        let mut requests_issued = 0usize;

        for page in &pages {
            if !page.is_substantial() {
                debug!(
                    "Skipping page {}: only {} characters",
                    page.number,
                    page.text.trim().chars().count()
                );
                continue;
            }

            if requests_issued > 0 {
                let delay = self.pacer.delay(requests_issued);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            requests_issued += 1;

            let request = prompt::page_text_analysis(page.number, &page.text, language);
            match self.request_analysis(request).await {
                Ok(analysis) => {
                    info!(
                        "Page {} analyzed: {} key points",
                        page.number,
                        analysis.key_points.len()
                    );
                    page_analyses.push(PageAnalysis::from_analysis(page.number, analysis));
                }
                Err(e) => warn!("Skipping page {} after failed analysis: {}", page.number, e),
            }
        }

        let pages_requested = u32::try_from(pages.len()).unwrap_or(u32::MAX);
        summarize_pages(page_analyses, pages_requested)
    }

    pub async fn generate_questions(
        &self,
        analyses: &[AnalysisResult],
        options: &QuizOptions,
    ) -> Result<QuestionResult> {
        options.validate()?;
        if analyses.iter().all(is_empty_analysis) {
            return Err(StudyError::NoContent);
        }

        info!(
            "Generating {} {} questions from {} analyses",
            options.count,
            options.difficulty.as_str(),
            analyses.len()
        );
        let request = prompt::question_generation(analyses, options);
        let reply = self.model.generate(&request).await?;
        let result = parse_question_result(&reply, options.difficulty.as_str())?;

        if result.total_questions != options.count as usize {
            warn!(
                "Requested {} questions, model returned {}",
                options.count, result.total_questions
            );
        }
        Ok(result)
    }

    /// Quiz over the pages `start..=end` of a finished comprehensive analysis.
    /// The range is validated before anything is sent.
    pub async fn generate_questions_for_pages(
        &self,
        document: &ComprehensiveAnalysis,
        start: u32,
        end: u32,
        options: &QuizOptions,
    ) -> Result<QuestionResult> {
        let range = PageRange::new(start, end)?;
        options.validate()?;

        let analyses: Vec<AnalysisResult> = range
            .select(document)
            .into_iter()
            .map(AnalysisResult::from)
            .collect();
        if analyses.is_empty() {
            return Err(StudyError::NoContent);
        }

        info!(
            "Generating quiz for pages {}-{} ({} analysed pages)",
            range.start(),
            range.end(),
            analyses.len()
        );
        self.generate_questions(&analyses, options).await
    }

    /// Analyze each image in turn, then generate one quiz from all of them.
    /// The first failing image fails the whole call.
    pub async fn analyze_images_and_generate_questions(
        &self,
        images: &[ImageInput],
        options: &QuizOptions,
    ) -> Result<ImageQuiz> {
        options.validate()?;
        if images.is_empty() {
            return Err(StudyError::NoContent);
        }

        let mut analyses = Vec::with_capacity(images.len());
        for image in images {
            analyses.push(self.analyze_image(image.clone(), options.language).await?);
        }

        let quiz = self.generate_questions(&analyses, options).await?;
        Ok(ImageQuiz { analyses, quiz })
    }
}

fn is_empty_analysis(analysis: &AnalysisResult) -> bool {
    analysis.key_points.is_empty()
        && analysis.study_points.is_empty()
        && analysis.summary.trim().is_empty()
}

/// Build the batch aggregate from the pages that succeeded
pub fn summarize_pages(
    page_analyses: Vec<PageAnalysis>,
    pages_requested: u32,
) -> ComprehensiveAnalysis {
    let total_key_points: Vec<String> = page_analyses
        .iter()
        .flat_map(|page| page.key_points.iter().cloned())
        .collect();

    let tnpsc_categories: Vec<String> = {
        let mut seen = HashSet::new();
        page_analyses
            .iter()
            .flat_map(|page| page.tnpsc_categories.iter())
            .filter(|category| seen.insert(category.as_str()))
            .cloned()
            .collect()
    };

    let summary = format!(
        "Analyzed {} pages and extracted {} key points",
        page_analyses.len(),
        total_key_points.len()
    );

    ComprehensiveAnalysis {
        page_analyses,
        total_key_points,
        tnpsc_categories,
        summary,
        pages_requested,
    }
}
