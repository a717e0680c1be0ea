//! Character-to-line grouping.

use std::collections::BTreeMap;

use crate::geometry::merge_boxes;
use crate::types::{Character, Line};

/// Group a page's characters into lines ordered top to bottom.
///
/// Characters are bucketed by `round(top / quantum)` so that sub-unit jitter
/// in glyph positions lands in the same row. Within a row characters are
/// ordered left to right; ties keep their decoding order.
pub fn group_lines(chars: &[Character], quantum: f64) -> Vec<Line> {
    let mut rows: BTreeMap<i64, Vec<Character>> = BTreeMap::new();
    for ch in chars {
        rows.entry(row_key(ch.bbox.top, quantum))
            .or_default()
            .push(ch.clone());
    }

    rows.into_values().filter_map(assemble_line).collect()
}

fn row_key(top: f64, quantum: f64) -> i64 {
    (top / quantum).round() as i64
}

fn assemble_line(mut chars: Vec<Character>) -> Option<Line> {
    chars.sort_by(|a, b| a.bbox.left.total_cmp(&b.bbox.left));
    let bbox = merge_boxes(chars.iter().map(|c| &c.bbox))?;
    let text = chars.iter().map(|c| c.text.as_str()).collect();
    Some(Line { chars, text, bbox })
}
