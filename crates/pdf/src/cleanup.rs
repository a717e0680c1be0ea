use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

const LIGATURES: [(char, &str); 7] = [
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

/// Plain-letter spelling of a typographic ligature.
pub fn expand_ligature(c: char) -> Option<&'static str> {
    LIGATURES
        .iter()
        .find(|(lig, _)| *lig == c)
        .map(|(_, plain)| *plain)
}

/// Text of a single decoded glyph: ligatures expanded, NFC applied.
pub fn glyph_text(c: char) -> String {
    match expand_ligature(c) {
        Some(plain) => plain.to_string(),
        None => std::iter::once(c).nfc().collect(),
    }
}

/// Clean up a page transcript.
///
/// Applies Unicode NFC, ligature expansion, removal of the replacement
/// character and collapsing of long space runs. Line structure is kept so
/// numbered lines stay at line starts.
pub fn clean_transcript(text: &str) -> String {
    let mut result: String = text.nfc().collect();

    if result.chars().any(|c| expand_ligature(c).is_some()) {
        result = result
            .chars()
            .map(|c| match expand_ligature(c) {
                Some(plain) => plain.to_string(),
                None => c.to_string(),
            })
            .collect();
    }

    result = result.replace('\u{FFFD}', "");

    static RE_SPACES: OnceLock<Regex> = OnceLock::new();
    let re_spaces = RE_SPACES.get_or_init(|| Regex::new(r"[ \t]{3,}").unwrap());
    result = re_spaces.replace_all(&result, "  ").to_string();

    result
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
