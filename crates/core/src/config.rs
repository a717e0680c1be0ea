//! Segmentation settings.
//!
//! [`ConfigFile`] is the serialisable form read from TOML; it is validated
//! into a [`SegmenterConfig`] with compiled patterns before any page is
//! processed.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Font-name substrings that conventionally mark a bold weight.
pub const DEFAULT_BOLD_HINTS: &[&str] = &[
    "Bold", "BD", "Black", "Heavy", "bold", "BOLD", "Bd", "SemiBold",
];

/// Leading glyphs of a line inspected for bold digits.
pub const DEFAULT_BOLD_WINDOW: usize = 6;

/// "N." or "N)" at line start; group 1 is the question number.
pub const DEFAULT_START_PATTERN: &str = r"^\s*(\d+)[\.\)]";

/// Bare "N." anchor used to split the unstructured transcript.
pub const DEFAULT_FALLBACK_PATTERN: &str = r"^\s*(\d+)\s*\.";

pub const DEFAULT_LINE_QUANTUM: f64 = 1.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {field} pattern: {source}")]
    Pattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("The {0} pattern must have a capture group for the question number")]
    MissingNumberGroup(&'static str),
    #[error("bold_hints must not contain an empty hint")]
    EmptyBoldHint,
    #[error("bold_window must be at least 1")]
    ZeroBoldWindow,
    #[error("line_quantum must be a positive number, got {0}")]
    InvalidLineQuantum(f64),
    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Settings as written in a configuration file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub bold_hints: Vec<String>,
    pub bold_window: usize,
    pub start_pattern: String,
    pub fallback_pattern: String,
    pub line_quantum: f64,
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile {
            bold_hints: DEFAULT_BOLD_HINTS.iter().map(|h| h.to_string()).collect(),
            bold_window: DEFAULT_BOLD_WINDOW,
            start_pattern: DEFAULT_START_PATTERN.to_string(),
            fallback_pattern: DEFAULT_FALLBACK_PATTERN.to_string(),
            line_quantum: DEFAULT_LINE_QUANTUM,
        }
    }
}

impl ConfigFile {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }
}

/// Validated settings handed to the segmentation pipeline.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    pub bold_hints: Vec<String>,
    pub bold_window: usize,
    pub start_pattern: Regex,
    pub fallback_pattern: Regex,
    pub line_quantum: f64,
}

impl SegmenterConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        SegmenterConfig::try_from(ConfigFile::from_toml_str(input)?)
    }

    /// True if `font_name` contains any configured boldness hint.
    pub fn is_bold_font(&self, font_name: &str) -> bool {
        !font_name.is_empty() && self.bold_hints.iter().any(|h| font_name.contains(h.as_str()))
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        SegmenterConfig {
            bold_hints: DEFAULT_BOLD_HINTS.iter().map(|h| h.to_string()).collect(),
            bold_window: DEFAULT_BOLD_WINDOW,
            start_pattern: Regex::new(DEFAULT_START_PATTERN).unwrap(),
            fallback_pattern: Regex::new(DEFAULT_FALLBACK_PATTERN).unwrap(),
            line_quantum: DEFAULT_LINE_QUANTUM,
        }
    }
}

impl TryFrom<ConfigFile> for SegmenterConfig {
    type Error = ConfigError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        if file.bold_hints.iter().any(|h| h.is_empty()) {
            return Err(ConfigError::EmptyBoldHint);
        }
        if file.bold_window == 0 {
            return Err(ConfigError::ZeroBoldWindow);
        }
        if !(file.line_quantum.is_finite() && file.line_quantum > 0.0) {
            return Err(ConfigError::InvalidLineQuantum(file.line_quantum));
        }

        Ok(SegmenterConfig {
            bold_hints: file.bold_hints,
            bold_window: file.bold_window,
            start_pattern: compile_numbered("start", &file.start_pattern)?,
            fallback_pattern: compile_numbered("fallback", &file.fallback_pattern)?,
            line_quantum: file.line_quantum,
        })
    }
}

fn compile_numbered(field: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    let re = Regex::new(pattern).map_err(|source| ConfigError::Pattern { field, source })?;
    // captures_len counts the implicit whole-match group.
    if re.captures_len() < 2 {
        return Err(ConfigError::MissingNumberGroup(field));
    }
    Ok(re)
}
