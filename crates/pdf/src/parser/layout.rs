//! Content-stream interpretation: positioned glyphs, image placements and
//! the reading-order transcript of a page.
//!
//! Every function here is a pure transformation over operators supplied by
//! a [`PdfBackend`]; the backend owns all I/O.
//!
//! # Pipeline
//!
//! ```text
//! content ops  ->  PageLayout { glyphs, spans, images }
//!   (per page)       extract_page
//!
//! spans  ->  TextLine[]  ->  transcript
//!             group_spans_into_lines
//! ```
//!
//! Glyph and image boxes are reported with a top-left origin: `top` grows
//! downwards from the MediaBox's upper edge. Spans stay in PDF user space
//! (baseline `y` grows upwards) since they only feed the transcript.

use std::collections::HashMap;

use log::{debug, trace};
use quizpdf_core::types::{BBox, Character, ImageRegion};

use super::backend::{
    get_number_from_value, BackendFontInfo, MediaBox, PageId, PdfBackend, PdfValue,
};
use crate::cleanup::{clean_transcript, glyph_text};
use crate::PdfError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single run of text at a specific position on the page.
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub font_name: String,
}

/// A horizontal line of text assembled from one or more [`TextSpan`]s that
/// share (approximately) the same baseline.
#[derive(Debug, Clone, Default)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub y: f32,
    pub x: f32,
}

impl TextLine {
    /// Concatenate all span texts with a single space separator.
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything the interpreter recovered from one page.
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub media_box: MediaBox,
    /// One entry per shown glyph, in content-stream order.
    pub glyphs: Vec<Character>,
    pub spans: Vec<TextSpan>,
    /// One entry per `Do` of an Image XObject, in content-stream order.
    pub images: Vec<ImageRegion>,
}

impl PageLayout {
    /// Reading-order text of the page, one line per visual line.
    pub fn transcript(&self) -> String {
        let lines = group_spans_into_lines(self.spans.clone());
        let raw = lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n");
        clean_transcript(&raw)
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Two spans whose baselines differ by less than this are treated as
/// belonging to the same line.
const Y_TOLERANCE: f32 = 1.0;

/// Approximate glyph width as a fraction of font size when the font does not
/// declare widths.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Minimum gap (in points) between adjacent spans before we insert a space.
const MIN_WORD_GAP: f32 = 1.5;

/// Font sizes closer than this are the same size for span merging.
const FONT_SIZE_TOLERANCE: f32 = 0.5;

/// A `TJ` displacement wider than this fraction of an estimated glyph is a
/// word gap.
const TJ_SPACE_FACTOR: f32 = 0.3;

// ---------------------------------------------------------------------------
// CJK / spaceless-script helper
// ---------------------------------------------------------------------------

/// Returns `true` if `c` belongs to a script that does not use inter-word
/// spaces (CJK Unified Ideographs, Hiragana, Katakana, Hangul, Thai, etc.).
pub fn is_spaceless_script_char(c: char) -> bool {
    let cp = c as u32;
    matches!(
        cp,
        // CJK Unified Ideographs and extensions A/B
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2A6DF
        // CJK Compatibility Ideographs
        | 0xF900..=0xFAFF
        // Hiragana, Katakana, Katakana Phonetic Extensions
        | 0x3040..=0x30FF
        | 0x31F0..=0x31FF
        // Hangul Syllables, Jamo, Compatibility Jamo
        | 0xAC00..=0xD7AF
        | 0x1100..=0x11FF
        | 0x3130..=0x318F
        // CJK Symbols and Punctuation
        | 0x3000..=0x303F
        // Fullwidth Forms
        | 0xFF00..=0xFFEF
        // Thai, Lao, Tibetan, Myanmar, Khmer
        | 0x0E00..=0x0EFF
        | 0x0F00..=0x0FFF
        | 0x1000..=0x109F
        | 0x1780..=0x17FF
    )
}

// ---------------------------------------------------------------------------
// Internal: matrices
// ---------------------------------------------------------------------------

/// Affine matrix [a, b, c, d, e, f] in PDF row-vector convention.
type Matrix = [f32; 6];

const IDENTITY_MATRIX: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Apply `first`, then `then`.
fn multiply(first: &Matrix, then: &Matrix) -> Matrix {
    [
        first[0] * then[0] + first[1] * then[2],
        first[0] * then[1] + first[1] * then[3],
        first[2] * then[0] + first[3] * then[2],
        first[2] * then[1] + first[3] * then[3],
        first[4] * then[0] + first[5] * then[2] + then[4],
        first[4] * then[1] + first[5] * then[3] + then[5],
    ]
}

fn apply(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (x * m[0] + y * m[2] + m[4], x * m[1] + y * m[3] + m[5])
}

fn matrix_from(operands: &[PdfValue]) -> Option<Matrix> {
    let vals: Vec<f32> = operands
        .iter()
        .take(6)
        .filter_map(get_number_from_value)
        .collect();
    match vals[..] {
        [a, b, c, d, e, f] => Some([a, b, c, d, e, f]),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Internal: PDF text-state machine
// ---------------------------------------------------------------------------

/// Text parameters tracked while walking a page's content stream.
#[derive(Debug, Clone)]
struct TextState {
    /// Current font resource name (the `/F1`-style key, not the full name).
    font_key: Vec<u8>,
    /// Index into the page's font list, when the key resolved.
    font_index: Option<usize>,
    /// Resolved base-font name for the current font.
    font_name: String,
    font_size: f32,
    text_matrix: Matrix,
    /// Text line matrix -- set by BT and updated by Td/TD/T*/Tm.
    line_matrix: Matrix,
    /// Horizontal scaling factor (percent / 100).
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_index: None,
            font_name: String::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    /// Text rendering matrix without the font-size term.
    fn rendering_matrix(&self, ctm: &Matrix) -> Matrix {
        multiply(&self.text_matrix, ctm)
    }

    /// Current glyph origin in user space.
    fn origin(&self, ctm: &Matrix) -> (f32, f32) {
        apply(&self.rendering_matrix(ctm), 0.0, self.text_rise)
    }

    /// Font size as rendered in user space.
    fn effective_font_size(&self, ctm: &Matrix) -> f32 {
        let m = self.rendering_matrix(ctm);
        (self.font_size * (m[2].powi(2) + m[3].powi(2)).sqrt()).abs()
    }

    /// Advance the text matrix horizontally by `dx` text-space units.
    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Multiply the text line matrix by a translation (used by Td / TD).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }
}

/// Handle the `Tf` (set font) operator.
fn handle_tf(operands: &[PdfValue], fonts: &[BackendFontInfo], state: &mut TextState) {
    if operands.len() < 2 {
        return;
    }
    let key = match &operands[0] {
        PdfValue::Name(n) => n.clone(),
        PdfValue::Str(s) => s.clone(),
        _ => return,
    };
    state.font_size = get_number_from_value(&operands[1]).unwrap_or(0.0);
    state.font_index = fonts.iter().position(|info| info.name == key);
    state.font_name = state
        .font_index
        .and_then(|i| fonts[i].base_font.clone())
        .unwrap_or_else(|| String::from_utf8_lossy(&key).into_owned());
    state.font_key = key;
}

/// Handle the `Tm` (set text matrix) operator.
fn handle_tm(operands: &[PdfValue], state: &mut TextState) {
    if let Some(m) = matrix_from(operands) {
        state.text_matrix = m;
        state.line_matrix = m;
    }
}

/// Glyph advance in em for one character code.
fn glyph_width_em(font: Option<&BackendFontInfo>, code: Option<u32>) -> f32 {
    code.and_then(|c| font?.width_of(c))
        .map(|w| w / 1000.0)
        .unwrap_or(APPROX_CHAR_WIDTH_RATIO)
}

/// Box of a glyph running from `x0` to `x1` on baseline `y`, flipped to a
/// top-left origin.
fn glyph_box(media_box: &MediaBox, x0: f32, x1: f32, y: f32, size: f32) -> BBox {
    let bottom = (media_box.top - y) as f64;
    BBox::new(
        (x0.min(x1) - media_box.left) as f64,
        bottom - size as f64,
        (x0.max(x1) - media_box.left) as f64,
        bottom,
    )
}

// ---------------------------------------------------------------------------
// Internal: interpreter
// ---------------------------------------------------------------------------

struct Interpreter<'a> {
    backend: &'a dyn PdfBackend,
    page_id: PageId,
    fonts: Vec<BackendFontInfo>,
    image_names: Vec<Vec<u8>>,
    /// Current transformation matrix.
    ctm: Matrix,
    /// CTMs saved by `q`. Only the CTM participates in save/restore.
    saved: Vec<Matrix>,
    text: TextState,
    layout: PageLayout,
}

impl Interpreter<'_> {
    /// Decode `operand`, emit one glyph per character and advance the text
    /// position. Returns the decoded text.
    fn show_glyphs(&mut self, operand: &PdfValue) -> String {
        let PdfValue::Str(bytes) = operand else {
            return String::new();
        };
        let mut text = self
            .backend
            .decode_text(self.page_id, &self.text.font_key, bytes);
        if text.is_empty() {
            text = super::backend::decode_text_simple(bytes);
        }

        // Single-byte encodings map each byte to one character; anything
        // else has no usable code for width lookup.
        let single_byte = bytes.len() == text.chars().count();
        let font = self.text.font_index.and_then(|i| self.fonts.get(i));
        let size = self.text.effective_font_size(&self.ctm);
        let state = &mut self.text;

        for (i, ch) in text.chars().enumerate() {
            let code = single_byte.then(|| bytes[i] as u32);
            let width = glyph_width_em(font, code) * state.font_size * state.horiz_scale;

            let m = state.rendering_matrix(&self.ctm);
            let (x0, y0) = apply(&m, 0.0, state.text_rise);
            let (x1, _) = apply(&m, width, state.text_rise);
            self.layout.glyphs.push(Character {
                text: glyph_text(ch),
                bbox: glyph_box(&self.layout.media_box, x0, x1, y0, size),
                font_name: state.font_name.clone(),
                font_size: size as f64,
            });

            let mut advance = width + state.char_spacing * state.horiz_scale;
            if ch == ' ' {
                advance += state.word_spacing * state.horiz_scale;
            }
            state.advance_x(advance);
        }

        text
    }

    /// Shared by `Tj`, `'`, and `"`: glyphs plus one span.
    fn show_string(&mut self, operand: &PdfValue) {
        let (x, y) = self.text.origin(&self.ctm);
        let text = self.show_glyphs(operand);
        if text.is_empty() {
            return;
        }
        let (end_x, _) = self.text.origin(&self.ctm);
        self.push_span(text, x, y, end_x - x);
    }

    /// Process a `TJ` array: elements are either strings to render or numeric
    /// kerning adjustments (in thousandths of a unit of text space). The
    /// whole array becomes one span.
    fn show_array(&mut self, arr: &[PdfValue]) {
        let mut buf = String::new();
        let (span_x, span_y) = self.text.origin(&self.ctm);

        for elem in arr {
            if let PdfValue::Str(_) = elem {
                buf.push_str(&self.show_glyphs(elem));
                continue;
            }
            let Some(adj) = get_number_from_value(elem) else {
                continue;
            };

            // Negative adjustments move right.
            let dx = -adj / 1000.0 * self.text.font_size * self.text.horiz_scale;
            let threshold = self.text.font_size
                * APPROX_CHAR_WIDTH_RATIO
                * self.text.horiz_scale
                * TJ_SPACE_FACTOR;

            if dx > threshold && !buf.is_empty() && !buf.ends_with(' ') {
                self.push_gap_glyph(dx);
                buf.push(' ');
            }
            self.text.advance_x(dx);
        }

        let text = buf.trim_end();
        if text.is_empty() {
            return;
        }
        let (end_x, _) = self.text.origin(&self.ctm);
        self.push_span(text.to_string(), span_x, span_y, end_x - span_x);
    }

    /// Synthetic space glyph covering a `TJ` word gap of `dx` text units.
    fn push_gap_glyph(&mut self, dx: f32) {
        let m = self.text.rendering_matrix(&self.ctm);
        let (x0, y0) = apply(&m, 0.0, self.text.text_rise);
        let (x1, _) = apply(&m, dx, self.text.text_rise);
        let size = self.text.effective_font_size(&self.ctm);
        self.layout.glyphs.push(Character {
            text: " ".to_string(),
            bbox: glyph_box(&self.layout.media_box, x0, x1, y0, size),
            font_name: self.text.font_name.clone(),
            font_size: size as f64,
        });
    }

    fn push_span(&mut self, text: String, x: f32, y: f32, width: f32) {
        self.layout.spans.push(TextSpan {
            text,
            x,
            y,
            width: width.abs(),
            font_size: self.text.effective_font_size(&self.ctm),
            font_name: self.text.font_name.clone(),
        });
    }

    /// `Do`: record the unit square mapped through the CTM when `name` is an
    /// Image XObject. Form XObjects are not descended into.
    fn paint_xobject(&mut self, name: &[u8]) {
        if !self.image_names.iter().any(|n| n == name) {
            trace!("skipping non-image XObject {}", String::from_utf8_lossy(name));
            return;
        }

        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
            .map(|(x, y)| apply(&self.ctm, x, y));
        let min_x = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max);

        let mb = &self.layout.media_box;
        let bbox = BBox::new(
            (min_x - mb.left) as f64,
            (mb.top - max_y) as f64,
            (max_x - mb.left) as f64,
            (mb.top - min_y) as f64,
        );
        self.layout.images.push(ImageRegion {
            name: String::from_utf8_lossy(name).into_owned(),
            bbox,
        });
    }
}

// ---------------------------------------------------------------------------
// Public API: page extraction
// ---------------------------------------------------------------------------

/// Walk a single page's content stream and collect its glyphs, text spans
/// and image placements.
///
/// Handles the operators:
///
/// | Operator | Action |
/// |----------|--------|
/// | `q` / `Q` | Save / restore the CTM |
/// | `cm`     | Concatenate a matrix onto the CTM |
/// | `Do`     | Paint an XObject (images become regions) |
/// | `BT`     | Begin text object -- reset matrices |
/// | `Tf`     | Set font and size |
/// | `Tm`     | Set text matrix directly |
/// | `Td`     | Translate text position |
/// | `TD`     | Translate and set leading |
/// | `T*`     | Move to start of next line |
/// | `TL` `Tc` `Tw` `Tz` `Ts` | Leading, spacing, scaling, rise |
/// | `Tj`     | Show a string |
/// | `TJ`     | Show strings with kerning adjustments |
/// | `'`      | Move to next line and show string |
/// | `"`      | Set spacing, move to next line and show string |
pub fn extract_page(backend: &dyn PdfBackend, page_id: PageId) -> Result<PageLayout, PdfError> {
    let media_box = backend.media_box(page_id)?;
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;

    let mut it = Interpreter {
        backend,
        page_id,
        fonts: backend.page_fonts(page_id).unwrap_or_default(),
        image_names: backend.page_images(page_id).unwrap_or_default(),
        ctm: IDENTITY_MATRIX,
        saved: Vec::new(),
        text: TextState::default(),
        layout: PageLayout {
            media_box,
            glyphs: Vec::new(),
            spans: Vec::new(),
            images: Vec::new(),
        },
    };

    for op in &ops {
        let operands = op.operands.as_slice();
        let number = |i: usize| operands.get(i).and_then(get_number_from_value);

        match op.operator.as_str() {
            // -- Graphics state -------------------------------------------
            "q" => it.saved.push(it.ctm),
            "Q" => {
                if let Some(ctm) = it.saved.pop() {
                    it.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix_from(operands) {
                    it.ctm = multiply(&m, &it.ctm);
                }
            }
            "Do" => {
                if let Some(PdfValue::Name(name)) = operands.first() {
                    it.paint_xobject(name);
                }
            }

            // -- Text objects and positioning -----------------------------
            "BT" => {
                it.text.text_matrix = IDENTITY_MATRIX;
                it.text.line_matrix = IDENTITY_MATRIX;
            }
            "Tf" => handle_tf(operands, &it.fonts, &mut it.text),
            "Tm" => handle_tm(operands, &mut it.text),
            "Td" => {
                if let (Some(tx), Some(ty)) = (number(0), number(1)) {
                    it.text.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (number(0), number(1)) {
                    it.text.leading = -ty;
                    it.text.translate_line(tx, ty);
                }
            }
            "T*" => {
                let leading = it.text.leading;
                it.text.translate_line(0.0, -leading);
            }
            "TL" => it.text.leading = number(0).unwrap_or(it.text.leading),
            "Tc" => it.text.char_spacing = number(0).unwrap_or(it.text.char_spacing),
            "Tw" => it.text.word_spacing = number(0).unwrap_or(it.text.word_spacing),
            "Tz" => {
                if let Some(v) = number(0) {
                    it.text.horiz_scale = v / 100.0;
                }
            }
            "Ts" => it.text.text_rise = number(0).unwrap_or(it.text.text_rise),

            // -- Show text ------------------------------------------------
            "Tj" => {
                if let Some(first) = operands.first() {
                    it.show_string(first);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = operands.first() {
                    it.show_array(arr);
                }
            }
            "'" => {
                let leading = it.text.leading;
                it.text.translate_line(0.0, -leading);
                if let Some(first) = operands.first() {
                    it.show_string(first);
                }
            }
            "\"" => {
                if operands.len() >= 3 {
                    it.text.word_spacing = number(0).unwrap_or(it.text.word_spacing);
                    it.text.char_spacing = number(1).unwrap_or(it.text.char_spacing);
                    let leading = it.text.leading;
                    it.text.translate_line(0.0, -leading);
                    it.show_string(&operands[2]);
                }
            }

            _ => {}
        }
    }

    debug!(
        "page {:?}: {} glyphs, {} image placements",
        page_id,
        it.layout.glyphs.len(),
        it.layout.images.len()
    );
    Ok(it.layout)
}

// ---------------------------------------------------------------------------
// Public API: span -> line grouping
// ---------------------------------------------------------------------------

/// Group a flat list of [`TextSpan`]s into [`TextLine`]s.
///
/// Spans whose baselines are within [`Y_TOLERANCE`] points of each other
/// are placed on the same line. Lines come out top of page first.
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    if spans.is_empty() {
        return Vec::new();
    }

    // Sort by Y descending (top of page first), then X ascending.
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y = spans[0].y;

    for span in spans {
        if (span.y - current_y).abs() > Y_TOLERANCE && !current.is_empty() {
            lines.push(assemble_line(std::mem::take(&mut current)));
            current_y = span.y;
        }
        current.push(span);
    }

    if !current.is_empty() {
        lines.push(assemble_line(current));
    }

    lines
}

/// Build a [`TextLine`] from a set of spans known to share the same Y.
///
/// Spans are sorted left-to-right. When a gap between consecutive spans
/// exceeds [`MIN_WORD_GAP`] points and neither boundary character is a
/// spaceless-script character, an inter-word space is added.
fn assemble_line(mut spans: Vec<TextSpan>) -> TextLine {
    spans.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut merged: Vec<TextSpan> = Vec::with_capacity(spans.len());

    for span in spans {
        if let Some(prev) = merged.last_mut() {
            let gap = span.x - (prev.x + prev.width);
            let same_font = prev.font_name == span.font_name
                && (prev.font_size - span.font_size).abs() < FONT_SIZE_TOLERANCE;

            if same_font && gap > -prev.font_size && gap < prev.font_size * 2.0 {
                if gap >= MIN_WORD_GAP && !boundary_is_spaceless(prev, &span) {
                    prev.text.push(' ');
                }
                prev.text.push_str(&span.text);
                prev.width = (span.x + span.width) - prev.x;
                continue;
            }
        }

        merged.push(span);
    }

    TextLine {
        y: merged.first().map(|s| s.y).unwrap_or(0.0),
        x: merged.first().map(|s| s.x).unwrap_or(0.0),
        spans: merged,
    }
}

/// Check whether the boundary between two adjacent spans is between
/// spaceless-script characters (no space needed).
fn boundary_is_spaceless(prev: &TextSpan, next: &TextSpan) -> bool {
    match (prev.text.chars().next_back(), next.text.chars().next()) {
        (Some(l), Some(f)) => is_spaceless_script_char(l) && is_spaceless_script_char(f),
        _ => false,
    }
}

/// Font-size histogram of a page, keyed in hundredths of a point.
pub fn font_size_histogram(glyphs: &[Character]) -> Vec<(f64, usize)> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for g in glyphs {
        *counts.entry((g.font_size * 100.0).round() as i64).or_insert(0) += 1;
    }
    let mut histogram: Vec<(f64, usize)> = counts
        .into_iter()
        .map(|(k, v)| (k as f64 / 100.0, v))
        .collect();
    histogram.sort_by(|a, b| b.0.total_cmp(&a.0));
    histogram
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
