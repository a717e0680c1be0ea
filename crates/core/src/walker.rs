//! Document-level driver.
//!
//! Walks pages strictly in ascending order. Each page runs through line
//! grouping, start detection, segmentation and figure association; its
//! blocks are complete before they are appended to the result. A page that
//! fails to decode contributes nothing and the walk continues. Only when
//! every page has been walked and none produced a block does the transcript
//! fallback run, once.

use std::ops::ControlFlow;

use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::config::SegmenterConfig;
use crate::fallback::{join_pages, split_transcript};
use crate::figures::{attach_figures, FigureError};
use crate::lines::group_lines;
use crate::segment::segment_page;
use crate::source::{DocumentSource, FigureStore, PageSource};
use crate::types::QuestionBlock;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalkError {
    /// Neither page geometry nor the transcript fallback found a question.
    #[error("No questions found")]
    NoQuestionsFound,
}

/// A page that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFailure {
    pub page: usize,
    pub reason: String,
}

/// Result of walking one document.
#[derive(Debug, Default, Serialize)]
pub struct Extraction {
    pub blocks: Vec<QuestionBlock>,
    /// True when the blocks came from the transcript fallback.
    pub used_fallback: bool,
    /// True when the progress callback stopped the walk early.
    pub stopped: bool,
    pub skipped_pages: Vec<PageFailure>,
    pub figure_failures: Vec<FigureError>,
}

/// Reported to the progress callback after each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub page: usize,
    /// 1-based position of `page` in the walk.
    pub position: usize,
    pub total: usize,
    /// Blocks accumulated so far, this page included.
    pub blocks: usize,
}

pub struct Walker<'c> {
    config: &'c SegmenterConfig,
}

impl<'c> Walker<'c> {
    pub fn new(config: &'c SegmenterConfig) -> Self {
        Walker { config }
    }

    /// Walk every page of `doc`.
    pub fn walk<D, S>(&self, doc: &D, store: &mut S) -> Result<Extraction, WalkError>
    where
        D: DocumentSource,
        S: FigureStore<D::Raster>,
    {
        self.walk_with_progress(doc, store, |_| ControlFlow::Continue(()))
    }

    /// Walk `doc`, calling `on_page` after each page.
    ///
    /// Returning [`ControlFlow::Break`] stops before the next page. A stopped
    /// walk keeps the blocks gathered so far and skips the fallback.
    pub fn walk_with_progress<D, S, F>(
        &self,
        doc: &D,
        store: &mut S,
        mut on_page: F,
    ) -> Result<Extraction, WalkError>
    where
        D: DocumentSource,
        S: FigureStore<D::Raster>,
        F: FnMut(&PageProgress) -> ControlFlow<()>,
    {
        let pages = doc.page_numbers();
        let total = pages.len();
        let mut extraction = Extraction::default();

        for (i, &number) in pages.iter().enumerate() {
            match doc.load_page(number) {
                Ok(page) => {
                    let (blocks, failures) = self.process_page(&page, store);
                    debug!("page {}: {} blocks", number, blocks.len());
                    extraction.blocks.extend(blocks);
                    extraction.figure_failures.extend(failures);
                }
                Err(e) => {
                    warn!("skipping page {}: {}", number, e);
                    extraction.skipped_pages.push(PageFailure {
                        page: number,
                        reason: e.to_string(),
                    });
                }
            }

            let progress = PageProgress {
                page: number,
                position: i + 1,
                total,
                blocks: extraction.blocks.len(),
            };
            if on_page(&progress).is_break() {
                debug!("walk stopped after page {}", number);
                extraction.stopped = true;
                return Ok(extraction);
            }
        }

        if extraction.blocks.is_empty() {
            info!("no blocks found from page layout; splitting the plain transcript");
            extraction.blocks = self.transcript_blocks(doc, &pages)?;
            extraction.used_fallback = true;
        }

        Ok(extraction)
    }

    /// Segment one page and attach its figures.
    pub fn process_page<P, S>(&self, page: &P, store: &mut S) -> (Vec<QuestionBlock>, Vec<FigureError>)
    where
        P: PageSource,
        S: FigureStore<P::Raster>,
    {
        let lines = group_lines(page.characters(), self.config.line_quantum);
        let mut blocks = segment_page(page.number(), &lines, self.config);
        let failures = attach_figures(page, &mut blocks, store);
        (blocks, failures)
    }

    fn transcript_blocks<D>(&self, doc: &D, pages: &[usize]) -> Result<Vec<QuestionBlock>, WalkError>
    where
        D: DocumentSource,
    {
        let texts = pages.iter().filter_map(|&n| match doc.page_text(n) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("no transcript for page {}: {}", n, e);
                None
            }
        });
        let blocks = split_transcript(&join_pages(texts), self.config);

        if blocks.iter().all(|b| b.number.is_none()) {
            return Err(WalkError::NoQuestionsFound);
        }
        Ok(blocks)
    }
}

/// Walk `doc` with `config`; see [`Walker::walk`].
pub fn walk<D, S>(doc: &D, store: &mut S, config: &SegmenterConfig) -> Result<Extraction, WalkError>
where
    D: DocumentSource,
    S: FigureStore<D::Raster>,
{
    Walker::new(config).walk(doc, store)
}
