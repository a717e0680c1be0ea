use std::path::Path;

use log::debug;
use thiserror::Error;

use parser::backend::{LopdfBackend, PageId, PdfBackend};
use parser::layout::PageLayout;
use quizpdf_core::source::{DocumentSource, PageSource};
use quizpdf_core::types::{Character, ImageRegion};

pub mod cleanup;
pub mod parser;
pub mod raster;
pub mod types;

pub use types::*;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Page not found: {0}")]
    PageNotFound(usize),
    #[error("Image not found: {0}")]
    ImageNotFound(String),
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// An opened PDF document.
///
/// Constructed via [`PdfDocument::from_bytes`] or [`PdfDocument::open`].
/// Pages are decoded lazily, one at a time, through [`DocumentSource`].
pub struct PdfDocument {
    backend: LopdfBackend,
    options: RasterOptions,
}

impl PdfDocument {
    /// Parse PDF bytes.
    pub fn from_bytes(bytes: &[u8], options: RasterOptions) -> Result<Self, PdfError> {
        let backend = LopdfBackend::load_bytes(bytes)?;
        debug!("loaded PDF with {} pages", backend.page_count());
        Ok(PdfDocument { backend, options })
    }

    /// Read and parse the PDF at `path`.
    pub fn open(path: impl AsRef<Path>, options: RasterOptions) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, options)
    }

    /// Get document metadata.
    pub fn info(&self) -> DocumentInfo {
        let raw = self.backend.metadata();
        DocumentInfo {
            title: raw.get("Title").cloned(),
            author: raw.get("Author").cloned(),
            creator: raw.get("Creator").cloned(),
            page_count: self.backend.page_count(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.backend.page_count()
    }

    /// Interpret the content stream of the 1-based page `number`.
    pub fn page_layout(&self, number: usize) -> Result<PageLayout, PdfError> {
        parser::layout::extract_page(&self.backend, self.page_id(number)?)
    }

    fn page_id(&self, number: usize) -> Result<PageId, PdfError> {
        u32::try_from(number)
            .ok()
            .and_then(|n| self.backend.pages().get(&n).copied())
            .ok_or(PdfError::PageNotFound(number))
    }
}

/// One decoded page of a [`PdfDocument`].
pub struct PdfPage<'a> {
    document: &'a PdfDocument,
    number: usize,
    page_id: PageId,
    layout: PageLayout,
}

impl PdfPage<'_> {
    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }
}

impl PageSource for PdfPage<'_> {
    type Raster = image::DynamicImage;
    type Error = PdfError;

    fn number(&self) -> usize {
        self.number
    }

    fn characters(&self) -> &[Character] {
        &self.layout.glyphs
    }

    fn image_regions(&self) -> &[ImageRegion] {
        &self.layout.images
    }

    fn crop(&self, region: &ImageRegion) -> Result<Self::Raster, Self::Error> {
        let stream = self
            .document
            .backend
            .image_stream(self.page_id, region.name.as_bytes())?;
        raster::rasterize(stream, &region.bbox, &self.document.options)
    }
}

impl DocumentSource for PdfDocument {
    type Raster = image::DynamicImage;
    type Page<'a> = PdfPage<'a>;
    type Error = PdfError;

    fn page_numbers(&self) -> Vec<usize> {
        self.backend.pages().keys().map(|&n| n as usize).collect()
    }

    fn load_page(&self, number: usize) -> Result<Self::Page<'_>, Self::Error> {
        let page_id = self.page_id(number)?;
        let layout = parser::layout::extract_page(&self.backend, page_id)?;
        Ok(PdfPage {
            document: self,
            number,
            page_id,
            layout,
        })
    }

    fn page_text(&self, number: usize) -> Result<String, Self::Error> {
        Ok(self.page_layout(number)?.transcript())
    }
}
