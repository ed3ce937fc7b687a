use async_trait::async_trait;

use crate::error::{Result, StudyError};
use crate::models::ImageInput;
use crate::pages::{PageText, split_pages};

/// What a page source hands back for one page
#[derive(Debug, Clone, PartialEq)]
pub enum PageContent {
    Text(String),
    Image(ImageInput),
}

/// A paginated document handle (a PDF, pre-extracted OCR text...)
#[async_trait]
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> u32;

    /// Content of 1-based page `number`. Callers check the range first.
    async fn page(&self, number: u32) -> Result<PageContent>;
}

/// Checks that `page` exists in `source`
pub fn ensure_page_in_range(source: &dyn PageSource, page: u32) -> Result<()> {
    let page_count = source.page_count();
    if page == 0 || page > page_count {
        return Err(StudyError::PageOutOfRange { page, page_count });
    }
    Ok(())
}

/// Page source over already-extracted text split on OCR page markers
#[derive(Debug, Clone)]
pub struct TextPages {
    pages: Vec<PageText>,
}

impl TextPages {
    pub fn from_ocr_text(text: &str) -> Self {
        Self {
            pages: split_pages(text),
        }
    }
}

#[async_trait]
impl PageSource for TextPages {
    fn page_count(&self) -> u32 {
        self.pages.iter().map(|p| p.number).max().unwrap_or(0)
    }

    async fn page(&self, number: u32) -> Result<PageContent> {
        // Markers can skip numbers; a gap is an empty page
        let text = self
            .pages
            .iter()
            .find(|p| p.number == number)
            .map(|p| p.text.clone())
            .unwrap_or_default();
        Ok(PageContent::Text(text))
    }
}
