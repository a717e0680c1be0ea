//! Interfaces to the collaborators the engine drives but does not own: the
//! PDF decoder that supplies positioned glyphs and image regions, and the
//! store that persists cropped figures.
//!
//! Keeping these behind traits lets the whole pipeline be exercised with
//! in-memory fixtures.

use std::fmt::Display;
use std::path::PathBuf;

use crate::types::{Character, FigureKey, ImageRegion};

/// One decoded page.
pub trait PageSource {
    /// Raster produced by [`PageSource::crop`].
    type Raster;
    type Error: Display;

    /// 1-based page number.
    fn number(&self) -> usize;

    /// Glyphs in decoding order.
    fn characters(&self) -> &[Character];

    /// Embedded images in the order the page enumerates them.
    fn image_regions(&self) -> &[ImageRegion];

    /// Rasterise the page area covered by `region`.
    fn crop(&self, region: &ImageRegion) -> Result<Self::Raster, Self::Error>;
}

/// A multi-page document handle.
pub trait DocumentSource {
    /// Raster type shared by all pages of the document.
    type Raster;
    type Page<'a>: PageSource<Raster = Self::Raster>
    where
        Self: 'a;
    type Error: Display;

    /// Page numbers in ascending order.
    fn page_numbers(&self) -> Vec<usize>;

    /// Decode a single page. Failure affects only that page.
    fn load_page(&self, number: usize) -> Result<Self::Page<'_>, Self::Error>;

    /// Plain-text transcript of a page, used by the last-resort fallback.
    fn page_text(&self, number: usize) -> Result<String, Self::Error>;
}

/// Persists cropped figures and returns where each one was written.
pub trait FigureStore<R> {
    type Error: Display;

    fn persist(&mut self, key: &FigureKey, raster: &R) -> Result<PathBuf, Self::Error>;
}
