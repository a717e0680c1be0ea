//! Page-local block segmentation.
//!
//! Boundary policy, applied independently on every page:
//!
//! 1. If any candidate is bold, only bold candidates are boundaries.
//! 2. Otherwise every candidate is a boundary.
//! 3. No candidates: the page yields no blocks.
//!
//! Each block runs from its boundary line up to the next boundary, or to
//! the end of the page.

use crate::config::SegmenterConfig;
use crate::geometry::merge_boxes;
use crate::starts::{detect_starts, parse_question_number};
use crate::types::{BlockSpan, Line, QuestionBlock, StartCandidate};

/// Line indices used as block boundaries, in page order.
pub fn choose_boundaries(starts: &[StartCandidate]) -> Vec<usize> {
    let any_bold = starts.iter().any(|s| s.is_bold);
    starts
        .iter()
        .filter(|s| !any_bold || s.is_bold)
        .map(|s| s.line_index)
        .collect()
}

/// Turn boundary line indices into half-open spans over `line_count` lines.
///
/// Boundaries must be strictly increasing and below `line_count`; anything
/// else is skipped so every returned span holds at least one line.
pub fn spans_from_boundaries(boundaries: &[usize], line_count: usize) -> Vec<BlockSpan> {
    let valid: Vec<usize> = boundaries
        .iter()
        .copied()
        .filter(|&b| b < line_count)
        .fold(Vec::new(), |mut acc, b| {
            if acc.last().is_none_or(|&last| b > last) {
                acc.push(b);
            }
            acc
        });

    valid
        .iter()
        .enumerate()
        .map(|(i, &start)| BlockSpan {
            start,
            end: valid.get(i + 1).copied().unwrap_or(line_count),
        })
        .collect()
}

/// Build one block per span. Figures are attached later by the associator.
pub fn build_blocks(
    page: usize,
    lines: &[Line],
    spans: &[BlockSpan],
    config: &SegmenterConfig,
) -> Vec<QuestionBlock> {
    spans
        .iter()
        .filter_map(|span| {
            let members = lines.get(span.start..span.end)?;
            let bbox = merge_boxes(members.iter().map(|l| &l.bbox))?;
            let text = members
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            Some(QuestionBlock {
                number: parse_question_number(&members[0].text, config),
                text: text.trim().to_string(),
                page: Some(page),
                bounding_box: Some(bbox),
                figures: Vec::new(),
            })
        })
        .collect()
}

/// Detect starts, choose boundaries and build the blocks of one page.
pub fn segment_page(page: usize, lines: &[Line], config: &SegmenterConfig) -> Vec<QuestionBlock> {
    let starts = detect_starts(lines, config);
    let boundaries = choose_boundaries(&starts);
    let spans = spans_from_boundaries(&boundaries, lines.len());
    build_blocks(page, lines, &spans, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::intersects;
    use crate::types::{BBox, Character};

    fn cand(line_index: usize, number: u32, is_bold: bool) -> StartCandidate {
        StartCandidate {
            line_index,
            number,
            is_bold,
        }
    }

    /// Build a line whose leading digits use `digit_font` and the rest Helvetica.
    fn line(text: &str, top: f64, digit_font: &str) -> Line {
        let mut leading = true;
        let chars: Vec<Character> = text
            .chars()
            .enumerate()
            .map(|(i, c)| {
                leading = leading && (c.is_ascii_digit() || c.is_whitespace());
                Character {
                    text: c.to_string(),
                    bbox: BBox::new(72.0 + i as f64 * 6.0, top, 78.0 + i as f64 * 6.0, top + 12.0),
                    font_name: if leading { digit_font } else { "Helvetica" }.to_string(),
                    font_size: 12.0,
                }
            })
            .collect();
        Line {
            bbox: merge_boxes(chars.iter().map(|c| &c.bbox)).unwrap(),
            text: text.to_string(),
            chars,
        }
    }

    // =====================================================================
    // choose_boundaries
    // =====================================================================

    #[test]
    fn test_bold_candidates_win() {
        let starts = vec![cand(0, 1, true), cand(2, 1, false), cand(4, 2, true)];
        assert_eq!(choose_boundaries(&starts), vec![0, 4]);
    }

    #[test]
    fn test_no_bold_uses_all() {
        let starts = vec![cand(0, 1, false), cand(3, 2, false), cand(5, 3, false)];
        assert_eq!(choose_boundaries(&starts), vec![0, 3, 5]);
    }

    #[test]
    fn test_no_candidates_no_boundaries() {
        assert!(choose_boundaries(&[]).is_empty());
    }

    #[test]
    fn test_single_bold_suppresses_every_plain_candidate() {
        let starts: Vec<StartCandidate> = (0..10).map(|i| cand(i, i as u32, i == 7)).collect();
        assert_eq!(choose_boundaries(&starts), vec![7]);
    }

    // =====================================================================
    // spans_from_boundaries
    // =====================================================================

    #[test]
    fn test_spans_run_to_next_boundary_and_page_end() {
        let spans = spans_from_boundaries(&[1, 4], 7);
        assert_eq!(
            spans,
            vec![BlockSpan { start: 1, end: 4 }, BlockSpan { start: 4, end: 7 }]
        );
    }

    #[test]
    fn test_spans_skip_out_of_range_and_duplicates() {
        let spans = spans_from_boundaries(&[0, 0, 9, 2], 5);
        assert_eq!(
            spans,
            vec![BlockSpan { start: 0, end: 2 }, BlockSpan { start: 2, end: 5 }]
        );
    }

    // =====================================================================
    // segment_page
    // =====================================================================

    #[test]
    fn test_plain_single_question() {
        let config = SegmenterConfig::default();
        let lines = vec![
            line("1. What is 2+2?", 100.0, "Helvetica"),
            line("(A) 3 (B) 4 (C) 5 (D) 22", 115.0, "Helvetica"),
        ];
        let blocks = segment_page(1, &lines, &config);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].number, Some(1));
        assert_eq!(blocks[0].page, Some(1));
        assert_eq!(blocks[0].text, "1. What is 2+2?\n(A) 3 (B) 4 (C) 5 (D) 22");
        assert!(blocks[0].figures.is_empty());
    }

    #[test]
    fn test_bold_starts_ignore_plain_numbered_option() {
        let config = SegmenterConfig::default();
        let lines = vec![
            line("1. First question", 100.0, "Times-Bold"),
            line("1) option text", 115.0, "Times-Roman"),
            line("2. Second question", 130.0, "Times-Bold"),
            line("(1) option text", 145.0, "Times-Roman"),
        ];
        let blocks = segment_page(3, &lines, &config);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].number, Some(1));
        assert_eq!(blocks[0].text, "1. First question\n1) option text");
        assert_eq!(blocks[1].number, Some(2));
    }

    #[test]
    fn test_page_without_starts_yields_nothing() {
        let config = SegmenterConfig::default();
        let lines = vec![
            line("General Instructions", 100.0, "Helvetica"),
            line("Read carefully.", 115.0, "Helvetica"),
        ];
        assert!(segment_page(1, &lines, &config).is_empty());
    }

    #[test]
    fn test_preamble_before_first_start_is_dropped() {
        let config = SegmenterConfig::default();
        let lines = vec![
            line("Section A", 80.0, "Helvetica"),
            line("5. Fifth", 100.0, "Helvetica"),
        ];
        let blocks = segment_page(1, &lines, &config);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "5. Fifth");
    }

    #[test]
    fn test_repeated_and_missing_numbers_tolerated() {
        let config = SegmenterConfig::default();
        let lines = vec![
            line("3. a", 100.0, "Helvetica"),
            line("3. b", 115.0, "Helvetica"),
            line("9. c", 130.0, "Helvetica"),
        ];
        let numbers: Vec<Option<u32>> = segment_page(1, &lines, &config)
            .iter()
            .map(|b| b.number)
            .collect();
        assert_eq!(numbers, vec![Some(3), Some(3), Some(9)]);
    }

    #[test]
    fn test_block_box_covers_member_lines() {
        let config = SegmenterConfig::default();
        let lines = vec![
            line("1. short", 100.0, "Helvetica"),
            line("a much longer continuation line", 115.0, "Helvetica"),
            line("2. next", 130.0, "Helvetica"),
        ];
        let blocks = segment_page(1, &lines, &config);
        let bbox = blocks[0].bounding_box.unwrap();
        for member in &lines[0..2] {
            assert!(bbox.contains(&member.bbox));
            assert!(intersects(&bbox, &member.bbox));
        }
        assert_eq!(bbox.top, 100.0);
        assert_eq!(bbox.bottom, 127.0);
    }
}
