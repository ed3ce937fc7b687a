use std::io::Cursor;
use std::path::PathBuf;

use anyhow::anyhow;
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use pdf2image::{PDF, Pages};
use study_core::{ImageInput, PageContent, PageSource, Result, StudyError};
use tracing::info;

/// PDF on disk, rendered one page at a time with pdf2image (poppler)
#[derive(Debug, Clone)]
pub struct PdfPages {
    path: PathBuf,
    page_count: u32,
}

impl PdfPages {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StudyError::PageSource(format!(
                "PDF file not found: {}",
                path.display()
            )));
        }

        let pdf_path = path.clone();
        let page_count = run_blocking(move || {
            let pdf = PDF::from_file(&pdf_path).map_err(|e| anyhow!("Failed to load PDF: {}", e))?;
            Ok(pdf.page_count())
        })
        .await?;

        info!("Opened PDF {} with {} pages", path.display(), page_count);
        Ok(Self { path, page_count })
    }
}

#[async_trait]
impl PageSource for PdfPages {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    async fn page(&self, number: u32) -> Result<PageContent> {
        let pdf_path = self.path.clone();
        let png = run_blocking(move || {
            let pdf = PDF::from_file(&pdf_path).map_err(|e| anyhow!("Failed to load PDF: {}", e))?;
            let rendered: Vec<DynamicImage> = pdf
                .render(Pages::Range(number..=number), None)
                .map_err(|e| anyhow!("Failed to render page {}: {}", number, e))?;
            let page = rendered
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("Page {} rendered no image", number))?;
            encode_png(&page)
        })
        .await?;

        info!("Rendered page {} ({} PNG bytes)", number, png.len());
        Ok(PageContent::Image(ImageInput::png(png)))
    }
}

fn encode_png(image: &DynamicImage) -> anyhow::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| anyhow!("Failed to encode image: {}", e))?;
    Ok(buffer)
}

/// Run poppler work off the async scheduler and fold every failure into a page-source error
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StudyError::PageSource(format!("PDF worker failed: {e}")))?
        .map_err(|e| StudyError::PageSource(e.to_string()))
}
