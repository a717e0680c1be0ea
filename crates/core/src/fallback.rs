//! Last-resort segmentation of an unstructured transcript.
//!
//! Used only when no page produced a block from glyph geometry. The text is
//! split immediately before every line matching the fallback anchor; the
//! resulting fragments carry no page, box, or figures.

use crate::config::SegmenterConfig;
use crate::types::QuestionBlock;

/// Join per-page transcripts the way the fallback expects them.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Split `text` into minimal blocks at anchored lines.
///
/// Text before the first anchor becomes a block without a number.
pub fn split_transcript(text: &str, config: &SegmenterConfig) -> Vec<QuestionBlock> {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut cuts: Vec<usize> = Vec::new();
    let mut offset = 0;
    for line in text.split('\n') {
        if config.fallback_pattern.is_match(line) {
            cuts.push(offset);
        }
        offset += line.len() + 1;
    }

    let mut bounds = Vec::with_capacity(cuts.len() + 2);
    bounds.push(0);
    bounds.extend(cuts.iter().copied().filter(|&c| c > 0));
    bounds.push(text.len());

    bounds
        .windows(2)
        .filter_map(|w| {
            let fragment = text[w[0]..w[1]].trim();
            if fragment.is_empty() {
                return None;
            }
            Some(QuestionBlock {
                number: anchor_number(fragment, config),
                text: fragment.to_string(),
                page: None,
                bounding_box: None,
                figures: Vec::new(),
            })
        })
        .collect()
}

fn anchor_number(fragment: &str, config: &SegmenterConfig) -> Option<u32> {
    let first_line = fragment.lines().next()?;
    let caps = config.fallback_pattern.captures(first_line)?;
    caps.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_numbered_lines() {
        let config = SegmenterConfig::default();
        let blocks = split_transcript("1. First\nmore\n2. Second\n", &config);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].number, Some(1));
        assert_eq!(blocks[0].text, "1. First\nmore");
        assert_eq!(blocks[1].number, Some(2));
        assert_eq!(blocks[1].text, "2. Second");
        assert!(blocks.iter().all(|b| b.page.is_none() && b.bounding_box.is_none()));
    }

    #[test]
    fn test_preamble_kept_without_number() {
        let config = SegmenterConfig::default();
        let blocks = split_transcript("Physics Paper\n\n  3. Only question", &config);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].number, None);
        assert_eq!(blocks[0].text, "Physics Paper");
        assert_eq!(blocks[1].number, Some(3));
    }

    #[test]
    fn test_paren_numbers_do_not_split() {
        let config = SegmenterConfig::default();
        let blocks = split_transcript("1. Q\n1) a\n2) b", &config);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "1. Q\n1) a\n2) b");
    }

    #[test]
    fn test_empty_and_blank_text() {
        let config = SegmenterConfig::default();
        assert!(split_transcript("", &config).is_empty());
        assert!(split_transcript("\n\n  \n", &config).is_empty());
    }

    #[test]
    fn test_crlf_normalised() {
        let config = SegmenterConfig::default();
        let blocks = split_transcript("1. a\r\n2. b\r\n", &config);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "1. a");
    }

    #[test]
    fn test_join_pages_uses_blank_line() {
        assert_eq!(join_pages(["a", "b"]), "a\n\nb");
        assert_eq!(join_pages(Vec::<String>::new()), "");
    }

    #[test]
    fn test_multibyte_text_cut_on_char_boundaries() {
        let config = SegmenterConfig::default();
        let blocks = split_transcript("Énoncé\n1. Quelle réponse ?\n2. Deuxième", &config);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1].text, "1. Quelle réponse ?");
    }
}
