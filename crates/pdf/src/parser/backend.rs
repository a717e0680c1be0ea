use std::collections::BTreeMap;

use lopdf::{self, content::Content};

use crate::PdfError;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Font information extracted from a page's resource dictionary.
#[derive(Debug, Clone, Default)]
pub struct BackendFontInfo {
    /// The font name key as it appears in the resource dictionary (e.g. `b"F1"`).
    pub name: Vec<u8>,
    /// Base font name from the font dictionary, if present.
    pub base_font: Option<String>,
    /// Encoding entry from the font dictionary, if present.
    pub encoding: Option<String>,
    /// Character code of the first entry in `widths`.
    pub first_char: u32,
    /// Glyph advances in thousandths of a text-space unit.
    pub widths: Vec<f32>,
}

impl BackendFontInfo {
    /// Advance for character `code` in thousandths of an em, if the font
    /// declares one.
    pub fn width_of(&self, code: u32) -> Option<f32> {
        let index = code.checked_sub(self.first_char)? as usize;
        self.widths.get(index).copied().filter(|w| *w > 0.0)
    }
}

/// Page rectangle in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl MediaBox {
    /// US Letter, used by tests and mocks.
    pub const LETTER: MediaBox = MediaBox {
        left: 0.0,
        bottom: 0.0,
        right: 612.0,
        top: 792.0,
    };

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }
}

/// A simplified, lopdf-independent representation of a PDF value.
///
/// This enum decouples higher-level logic from the concrete `lopdf::Object`
/// type so that the content interpreter can work with pure data.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(PageId),
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Extract an `f32` from a [`PdfValue`], accepting both `Integer` and `Real`.
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Convert a `lopdf::Object` into a [`PdfValue`].
///
/// Stream dictionaries are converted but the raw stream bytes are discarded.
pub fn convert_object(obj: &lopdf::Object) -> PdfValue {
    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        lopdf::Object::Dictionary(dict) => PdfValue::Dict(
            dict.iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Stream(stream) => PdfValue::Dict(
            stream
                .dict
                .iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Reference(id) => PdfValue::Reference(*id),
    }
}

/// Best-effort decoding of raw PDF string bytes into a Rust `String`.
///
/// UTF-16BE with a BOM is decoded as such, valid UTF-8 is returned as-is,
/// and anything else is read as Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let code_units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&code_units);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Abstraction over a PDF parsing backend (currently backed by `lopdf`).
///
/// The content interpreter only talks to this trait, so it can be tested
/// against pre-decoded operator lists.
pub trait PdfBackend {
    /// Return a mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Page rectangle, inherited from the page tree when the page has none.
    fn media_box(&self, page: PageId) -> Result<MediaBox, PdfError>;

    /// Return font information for every font referenced by the given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, PdfError>;

    /// Resource names of the page's Image XObjects, in dictionary order.
    fn page_images(&self, page: PageId) -> Result<Vec<Vec<u8>>, PdfError>;

    /// Return the raw (possibly compressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    /// Decode raw content-stream bytes into a sequence of [`ContentOp`]s.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Decode raw string bytes found in a text-showing operator, using any
    /// font-specific encoding information the backend can find.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] implementation backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    /// Total number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Extract string entries of the trailer's Info dictionary.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();

        let Some(info) = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|obj| self.resolve_dict(obj))
        else {
            return meta;
        };

        let keys: [&[u8]; 3] = [b"Title", b"Author", b"Creator"];
        for key in keys {
            let value = match info.get(key) {
                Ok(lopdf::Object::String(bytes, _)) => decode_text_simple(bytes),
                Ok(lopdf::Object::Name(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
                _ => continue,
            };
            meta.insert(String::from_utf8_lossy(key).into_owned(), value);
        }

        meta
    }

    /// The stream of the Image XObject named `name` on `page`.
    pub fn image_stream(&self, page: PageId, name: &[u8]) -> Result<&lopdf::Stream, PdfError> {
        let not_found = || PdfError::ImageNotFound(String::from_utf8_lossy(name).into_owned());

        let xobjects = self.xobject_dict(page)?.ok_or_else(not_found)?;
        let obj = xobjects.get(name).map_err(|_| not_found())?;
        match self.resolve(obj) {
            lopdf::Object::Stream(stream) if is_image(stream) => Ok(stream),
            _ => Err(not_found()),
        }
    }

    // -- private helpers ----------------------------------------------------

    fn page_dict(&self, page: PageId) -> Result<&lopdf::Dictionary, PdfError> {
        self.doc
            .get_object(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page object: {}", e)))?
            .as_dict()
            .map_err(|e| PdfError::Parse(format!("page object is not a dictionary: {}", e)))
    }

    /// Look up `key` on `dict`, walking up the page tree through `Parent`.
    fn inherited<'a>(&'a self, dict: &'a lopdf::Dictionary, key: &[u8]) -> Option<&'a lopdf::Object> {
        if let Ok(obj) = dict.get(key) {
            return Some(obj);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent_dict = self.doc.get_object(parent).ok()?.as_dict().ok()?;
        self.inherited(parent_dict, key)
    }

    /// Follow a single level of indirection.
    fn resolve<'a>(&'a self, obj: &'a lopdf::Object) -> &'a lopdf::Object {
        match obj {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            _ => obj,
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a lopdf::Object) -> Option<&'a lopdf::Dictionary> {
        self.resolve(obj).as_dict().ok()
    }

    fn number(&self, obj: &lopdf::Object) -> Option<f32> {
        match self.resolve(obj) {
            lopdf::Object::Integer(i) => Some(*i as f32),
            lopdf::Object::Real(f) => Some(*f),
            _ => None,
        }
    }

    fn xobject_dict(&self, page: PageId) -> Result<Option<&lopdf::Dictionary>, PdfError> {
        let page_dict = self.page_dict(page)?;
        Ok(self
            .inherited(page_dict, b"Resources")
            .and_then(|obj| self.resolve_dict(obj))
            .and_then(|resources| resources.get(b"XObject").ok())
            .and_then(|obj| self.resolve_dict(obj)))
    }

    fn font_widths(&self, dict: &lopdf::Dictionary) -> (u32, Vec<f32>) {
        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| self.number(o))
            .map(|n| n.max(0.0) as u32)
            .unwrap_or(0);

        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|o| self.resolve(o).as_array().ok())
            .map(|arr| arr.iter().map(|w| self.number(w).unwrap_or(0.0)).collect())
            .unwrap_or_default();

        (first_char, widths)
    }

    /// Look up the encoding name for a font on a page.
    fn font_encoding_name(&self, page: PageId, font_name: &[u8]) -> Option<String> {
        let fonts = self.doc.get_page_fonts(page).ok()?;
        let font_dict = fonts.get(font_name)?;
        match font_dict.get(b"Encoding").ok()? {
            lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }
    }
}

fn is_image(stream: &lopdf::Stream) -> bool {
    stream
        .dict
        .get(b"Subtype")
        .ok()
        .and_then(|o| o.as_name().ok())
        .is_some_and(|n| n == b"Image")
}

fn name_string(obj: &lopdf::Object) -> Option<String> {
    obj.as_name()
        .ok()
        .map(|n| String::from_utf8_lossy(n).into_owned())
}

// ---------------------------------------------------------------------------
// PdfBackend implementation for LopdfBackend
// ---------------------------------------------------------------------------

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn media_box(&self, page: PageId) -> Result<MediaBox, PdfError> {
        let page_dict = self.page_dict(page)?;
        let arr = self
            .inherited(page_dict, b"MediaBox")
            .and_then(|obj| self.resolve(obj).as_array().ok())
            .ok_or_else(|| PdfError::Parse("MediaBox not found for page".into()))?;

        let nums: Vec<f32> = arr.iter().filter_map(|o| self.number(o)).collect();
        if nums.len() != 4 {
            return Err(PdfError::Parse(format!(
                "MediaBox has {} numeric elements, expected 4",
                nums.len()
            )));
        }

        // Corners may be given in any order.
        Ok(MediaBox {
            left: nums[0].min(nums[2]),
            bottom: nums[1].min(nums[3]),
            right: nums[0].max(nums[2]),
            top: nums[1].max(nums[3]),
        })
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, PdfError> {
        let fonts_map = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {}", e)))?;

        Ok(fonts_map
            .iter()
            .map(|(name, dict)| {
                let (first_char, widths) = self.font_widths(dict);
                BackendFontInfo {
                    name: name.clone(),
                    base_font: dict.get(b"BaseFont").ok().and_then(name_string),
                    encoding: dict.get(b"Encoding").ok().and_then(name_string),
                    first_char,
                    widths,
                }
            })
            .collect())
    }

    fn page_images(&self, page: PageId) -> Result<Vec<Vec<u8>>, PdfError> {
        let Some(xobjects) = self.xobject_dict(page)? else {
            return Ok(Vec::new());
        };

        Ok(xobjects
            .iter()
            .filter(|(_, obj)| matches!(self.resolve(obj), lopdf::Object::Stream(s) if is_image(s)))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
        if let Some(enc_name) = self.font_encoding_name(page, font_name) {
            // Identity-H / Identity-V fonts typically use 2-byte CID codes.
            if enc_name.contains("Identity") && bytes.len() >= 2 && bytes.len().is_multiple_of(2) {
                let code_units: Vec<u16> = bytes
                    .chunks(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                let decoded = String::from_utf16_lossy(&code_units);
                if !decoded.is_empty() && !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                    return decoded;
                }
            }
        }

        decode_text_simple(bytes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
