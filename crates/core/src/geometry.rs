//! Bounding-box arithmetic shared by the segmenter and the image associator.

use crate::types::BBox;

/// Tightest rectangle enclosing every box in `boxes`.
///
/// Returns `None` for an empty input; there is no meaningful box to return.
pub fn merge_boxes<'a, I>(boxes: I) -> Option<BBox>
where
    I: IntoIterator<Item = &'a BBox>,
{
    boxes.into_iter().fold(None, |acc, b| {
        Some(match acc {
            None => *b,
            Some(m) => union(&m, b),
        })
    })
}

/// Enclosing rectangle of two boxes.
pub fn union(a: &BBox, b: &BBox) -> BBox {
    BBox {
        left: a.left.min(b.left),
        top: a.top.min(b.top),
        right: a.right.max(b.right),
        bottom: a.bottom.max(b.bottom),
    }
}

/// Separating-axis overlap test with inclusive edges.
///
/// Boxes that only touch along an edge or at a corner count as intersecting.
pub fn intersects(a: &BBox, b: &BBox) -> bool {
    !(a.right < b.left || a.left > b.right || a.bottom < b.top || a.top > b.bottom)
}
