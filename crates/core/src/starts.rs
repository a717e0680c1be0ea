//! Question-start detection.
//!
//! A line starts a question when its text matches the configured numeric
//! prefix pattern. Independently, the first few glyphs are checked for a
//! digit set in a bold font: bold numerals separate real question markers
//! from option numbers and numbers quoted in prose.

use log::trace;

use crate::config::SegmenterConfig;
use crate::types::{Line, StartCandidate};

/// Scan `lines` in order and return every start candidate.
pub fn detect_starts(lines: &[Line], config: &SegmenterConfig) -> Vec<StartCandidate> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(line_index, line)| {
            let number = parse_question_number(&line.text, config)?;
            let is_bold = has_bold_leading_digit(line, config);
            trace!(
                "start candidate: line {} number {} bold {}",
                line_index,
                number,
                is_bold
            );
            Some(StartCandidate {
                line_index,
                number,
                is_bold,
            })
        })
        .collect()
}

/// Extract the question number from `text` using the start pattern.
///
/// Returns `None` when the pattern does not match or the captured digits do
/// not fit a `u32`.
pub fn parse_question_number(text: &str, config: &SegmenterConfig) -> Option<u32> {
    let caps = config.start_pattern.captures(text)?;
    caps.get(1)?.as_str().trim().parse().ok()
}

/// True if any digit among the first `bold_window` glyphs uses a bold font.
pub fn has_bold_leading_digit(line: &Line, config: &SegmenterConfig) -> bool {
    line.chars
        .iter()
        .take(config.bold_window)
        .filter(|ch| ch.text.trim().chars().next().is_some_and(|c| c.is_ascii_digit()))
        .any(|ch| config.is_bold_font(&ch.font_name))
}
