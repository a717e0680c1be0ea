//! Figure association: match embedded images to question blocks by box
//! overlap, crop each match and hand it to a [`FigureStore`].
//!
//! Every matched region produces either a [`Figure`] or a [`FigureError`].
//! Errors are logged and reported but never stop the remaining regions or
//! the block itself.

use std::fmt;

use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

use crate::geometry::intersects;
use crate::source::{FigureStore, PageSource};
use crate::types::{BBox, Figure, FigureKey, ImageRegion, QuestionBlock};

/// Which step of figure extraction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FigureStage {
    Crop,
    Persist,
}

impl fmt::Display for FigureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FigureStage::Crop => write!(f, "crop"),
            FigureStage::Persist => write!(f, "persist"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("page {page} block {block} region {region}: {stage} failed: {reason}")]
pub struct FigureError {
    pub page: usize,
    pub block: usize,
    pub region: usize,
    pub stage: FigureStage,
    pub reason: String,
}

impl FigureError {
    fn new(key: &FigureKey, stage: FigureStage, reason: impl fmt::Display) -> Self {
        FigureError {
            page: key.page,
            block: key.block,
            region: key.region,
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Figures extracted for one block plus the regions that could not be.
#[derive(Debug, Default)]
pub struct Association {
    pub figures: Vec<Figure>,
    pub failures: Vec<FigureError>,
}

/// Crop and persist every region of `page` overlapping `block_bbox`.
///
/// Figures keep the page's region enumeration order.
pub fn associate<P, S>(page: &P, block_index: usize, block_bbox: &BBox, store: &mut S) -> Association
where
    P: PageSource,
    S: FigureStore<P::Raster>,
{
    let mut association = Association::default();

    for (region_index, region) in page.image_regions().iter().enumerate() {
        if !intersects(block_bbox, &region.bbox) {
            continue;
        }

        let key = FigureKey {
            page: page.number(),
            block: block_index,
            region: region_index,
        };

        match extract_figure(page, region, &key, store) {
            Ok(figure) => {
                debug!("attached {} to block {}", figure.path.display(), block_index);
                association.figures.push(figure);
            }
            Err(err) => {
                warn!("skipping figure: {}", err);
                association.failures.push(err);
            }
        }
    }

    association
}

/// Attach figures to every located block of one page, in block order.
///
/// Blocks without a bounding box are left untouched. Returns the failures
/// across all blocks.
pub fn attach_figures<P, S>(page: &P, blocks: &mut [QuestionBlock], store: &mut S) -> Vec<FigureError>
where
    P: PageSource,
    S: FigureStore<P::Raster>,
{
    let mut failures = Vec::new();
    for (block_index, block) in blocks.iter_mut().enumerate() {
        let Some(bbox) = block.bounding_box else {
            continue;
        };
        let association = associate(page, block_index, &bbox, store);
        block.figures.extend(association.figures);
        failures.extend(association.failures);
    }
    failures
}

fn extract_figure<P, S>(
    page: &P,
    region: &ImageRegion,
    key: &FigureKey,
    store: &mut S,
) -> Result<Figure, FigureError>
where
    P: PageSource,
    S: FigureStore<P::Raster>,
{
    let raster = page
        .crop(region)
        .map_err(|e| FigureError::new(key, FigureStage::Crop, e))?;
    let path = store
        .persist(key, &raster)
        .map_err(|e| FigureError::new(key, FigureStage::Persist, e))?;

    Ok(Figure {
        path,
        region_index: key.region,
        region: region.bbox,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::fixtures::{region, FakePage, MemoryStore};

    fn block_at(bbox: BBox) -> QuestionBlock {
        QuestionBlock {
            number: Some(1),
            text: "1. q".to_string(),
            page: Some(2),
            bounding_box: Some(bbox),
            figures: Vec::new(),
        }
    }

    #[test]
    fn test_overlapping_region_attached() {
        let page = FakePage::new(2).with_regions(vec![region("Im0", 100.0, 120.0, 200.0, 220.0)]);
        let mut store = MemoryStore::default();
        let result = associate(&page, 0, &BBox::new(72.0, 100.0, 500.0, 150.0), &mut store);

        assert_eq!(result.figures.len(), 1);
        assert!(result.failures.is_empty());
        assert_eq!(result.figures[0].path, PathBuf::from("mem/p2_q0_img0.png"));
        assert_eq!(result.figures[0].region_index, 0);
        assert_eq!(store.persisted.len(), 1);
    }

    #[test]
    fn test_region_above_block_not_attached() {
        let page = FakePage::new(1).with_regions(vec![region("Im0", 72.0, 10.0, 300.0, 90.0)]);
        let mut store = MemoryStore::default();
        let result = associate(&page, 0, &BBox::new(72.0, 100.0, 500.0, 150.0), &mut store);

        assert!(result.figures.is_empty());
        assert!(store.persisted.is_empty());
    }

    #[test]
    fn test_edge_touching_region_attached() {
        let page = FakePage::new(1).with_regions(vec![region("Im0", 72.0, 150.0, 300.0, 200.0)]);
        let mut store = MemoryStore::default();
        let result = associate(&page, 0, &BBox::new(72.0, 100.0, 500.0, 150.0), &mut store);
        assert_eq!(result.figures.len(), 1);
    }

    #[test]
    fn test_figures_follow_region_enumeration_order() {
        let page = FakePage::new(1).with_regions(vec![
            region("Low", 72.0, 140.0, 100.0, 160.0),
            region("Away", 600.0, 600.0, 700.0, 700.0),
            region("High", 72.0, 90.0, 100.0, 110.0),
        ]);
        let mut store = MemoryStore::default();
        let result = associate(&page, 4, &BBox::new(72.0, 100.0, 500.0, 150.0), &mut store);

        let indices: Vec<usize> = result.figures.iter().map(|f| f.region_index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(result.figures[1].path, PathBuf::from("mem/p1_q4_img2.png"));
    }

    #[test]
    fn test_crop_failure_skips_only_that_region() {
        let page = FakePage::new(1)
            .with_regions(vec![
                region("Bad", 72.0, 100.0, 100.0, 120.0),
                region("Good", 120.0, 100.0, 160.0, 120.0),
            ])
            .failing_crop("Bad");
        let mut store = MemoryStore::default();
        let result = associate(&page, 0, &BBox::new(72.0, 100.0, 500.0, 150.0), &mut store);

        assert_eq!(result.figures.len(), 1);
        assert_eq!(result.figures[0].region_index, 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].stage, FigureStage::Crop);
        assert_eq!(result.failures[0].region, 0);
    }

    #[test]
    fn test_persist_failure_reported() {
        let page = FakePage::new(1).with_regions(vec![region("Im0", 72.0, 100.0, 100.0, 120.0)]);
        let mut store = MemoryStore {
            fail: true,
            ..MemoryStore::default()
        };
        let result = associate(&page, 0, &BBox::new(72.0, 100.0, 500.0, 150.0), &mut store);

        assert!(result.figures.is_empty());
        assert_eq!(result.failures[0].stage, FigureStage::Persist);
        assert!(result.failures[0].to_string().contains("persist failed"));
    }

    #[test]
    fn test_attach_figures_keys_by_block_index() {
        let page = FakePage::new(5).with_regions(vec![
            region("A", 72.0, 100.0, 100.0, 120.0),
            region("B", 72.0, 300.0, 100.0, 320.0),
        ]);
        let mut blocks = vec![
            block_at(BBox::new(72.0, 90.0, 500.0, 200.0)),
            block_at(BBox::new(72.0, 250.0, 500.0, 400.0)),
        ];
        let mut store = MemoryStore::default();
        let failures = attach_figures(&page, &mut blocks, &mut store);

        assert!(failures.is_empty());
        assert_eq!(blocks[0].figures[0].path, PathBuf::from("mem/p5_q0_img0.png"));
        assert_eq!(blocks[1].figures[0].path, PathBuf::from("mem/p5_q1_img1.png"));
    }

    #[test]
    fn test_region_spanning_two_blocks_attached_to_both() {
        let page = FakePage::new(1).with_regions(vec![region("Tall", 72.0, 150.0, 100.0, 260.0)]);
        let mut blocks = vec![
            block_at(BBox::new(72.0, 90.0, 500.0, 200.0)),
            block_at(BBox::new(72.0, 250.0, 500.0, 400.0)),
        ];
        let mut store = MemoryStore::default();
        attach_figures(&page, &mut blocks, &mut store);

        assert_eq!(blocks[0].figures.len(), 1);
        assert_eq!(blocks[1].figures.len(), 1);
        assert_ne!(blocks[0].figures[0].path, blocks[1].figures[0].path);
    }
}
