use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize, Serializer};

/// Axis-aligned rectangle in page coordinates with a top-left origin.
///
/// `top` grows downwards, so for a well-formed box `top <= bottom` and
/// `left <= right`. Serialized as the tuple `(left, top, right, bottom)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64, f64, f64)", into = "(f64, f64, f64, f64)")]
pub struct BBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        BBox {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// True when `other` lies entirely inside (or on the edge of) `self`.
    pub fn contains(&self, other: &BBox) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }
}

impl From<(f64, f64, f64, f64)> for BBox {
    fn from((left, top, right, bottom): (f64, f64, f64, f64)) -> Self {
        BBox::new(left, top, right, bottom)
    }
}

impl From<BBox> for (f64, f64, f64, f64) {
    fn from(b: BBox) -> Self {
        (b.left, b.top, b.right, b.bottom)
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.1}, {:.1}, {:.1}, {:.1})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// A single positioned glyph as reported by the PDF decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub text: String,
    pub bbox: BBox,
    pub font_name: String,
    pub font_size: f64,
}

/// A row of characters sharing the same quantised vertical position.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Member characters ordered left to right.
    pub chars: Vec<Character>,
    pub text: String,
    pub bbox: BBox,
}

/// A line that looks like the start of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartCandidate {
    pub line_index: usize,
    pub number: u32,
    pub is_bold: bool,
}

/// Half-open range of line indices `[start, end)` forming one question block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub start: usize,
    pub end: usize,
}

/// Bounding box of an embedded image as placed on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRegion {
    /// Resource name of the image on its page (e.g. `Im0`).
    pub name: String,
    pub bbox: BBox,
}

/// Uniquely identifies one extracted figure within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FigureKey {
    pub page: usize,
    /// Index of the block among the blocks of its page.
    pub block: usize,
    /// Index of the region in the page's region enumeration.
    pub region: usize,
}

impl FigureKey {
    /// Deterministic PNG file name for this key.
    pub fn file_name(&self) -> String {
        format!("p{}_q{}_img{}.png", self.page, self.block, self.region)
    }
}

/// A raster image cropped from a page region and attached to one block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub path: PathBuf,
    pub region_index: usize,
    /// Box of the source region; may overhang the owning block's box.
    pub region: BBox,
}

/// One reconstructed question: its text, location and figures.
///
/// Blocks produced by the transcript fallback carry no page, box, or
/// figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBlock {
    pub number: Option<u32>,
    pub text: String,
    pub page: Option<usize>,
    pub bounding_box: Option<BBox>,
    #[serde(serialize_with = "serialize_figure_paths")]
    pub figures: Vec<Figure>,
}

fn serialize_figure_paths<S>(figures: &[Figure], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(figures.iter().map(|f| &f.path))
}
