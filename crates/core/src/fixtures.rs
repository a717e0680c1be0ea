//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::source::{DocumentSource, FigureStore, PageSource};
use crate::types::{BBox, Character, FigureKey, ImageRegion};

pub fn region(name: &str, left: f64, top: f64, right: f64, bottom: f64) -> ImageRegion {
    ImageRegion {
        name: name.to_string(),
        bbox: BBox::new(left, top, right, bottom),
    }
}

/// Glyphs for one line of text starting at x = 72. Leading digits use
/// `digit_font`, everything else Helvetica.
pub fn text_chars(text: &str, top: f64, digit_font: &str) -> Vec<Character> {
    let mut leading = true;
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            leading = leading && (c.is_ascii_digit() || c.is_whitespace());
            let left = 72.0 + i as f64 * 6.0;
            Character {
                text: c.to_string(),
                bbox: BBox::new(left, top, left + 6.0, top + 12.0),
                font_name: if leading { digit_font } else { "Helvetica" }.to_string(),
                font_size: 12.0,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub number: usize,
    pub chars: Vec<Character>,
    pub regions: Vec<ImageRegion>,
    pub failing: HashSet<String>,
}

impl FakePage {
    pub fn new(number: usize) -> Self {
        FakePage {
            number,
            ..FakePage::default()
        }
    }

    pub fn with_regions(mut self, regions: Vec<ImageRegion>) -> Self {
        self.regions = regions;
        self
    }

    /// Append a line of text at `top`.
    pub fn line(mut self, text: &str, top: f64, digit_font: &str) -> Self {
        self.chars.extend(text_chars(text, top, digit_font));
        self
    }

    pub fn failing_crop(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Transcript in the shape a decoder would produce.
    fn text(&self) -> String {
        crate::lines::group_lines(&self.chars, 1.0)
            .into_iter()
            .map(|l| l.text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl PageSource for FakePage {
    /// The "raster" is just the region name.
    type Raster = String;
    type Error = String;

    fn number(&self) -> usize {
        self.number
    }

    fn characters(&self) -> &[Character] {
        &self.chars
    }

    fn image_regions(&self) -> &[ImageRegion] {
        &self.regions
    }

    fn crop(&self, region: &ImageRegion) -> Result<String, String> {
        if self.failing.contains(&region.name) {
            return Err(format!("cannot decode {}", region.name));
        }
        Ok(region.name.clone())
    }
}

#[derive(Debug, Default)]
pub struct FakeDocument {
    pub pages: BTreeMap<usize, FakePage>,
    /// Pages whose decoding fails in both `load_page` and `page_text`.
    pub broken: HashSet<usize>,
    /// Transcript overrides; pages not listed use their glyph text.
    pub texts: BTreeMap<usize, String>,
}

impl FakeDocument {
    pub fn new(pages: Vec<FakePage>) -> Self {
        FakeDocument {
            pages: pages.into_iter().map(|p| (p.number, p)).collect(),
            ..FakeDocument::default()
        }
    }

    pub fn broken_page(mut self, number: usize) -> Self {
        self.pages.entry(number).or_insert_with(|| FakePage::new(number));
        self.broken.insert(number);
        self
    }

    pub fn with_text(mut self, number: usize, text: &str) -> Self {
        self.texts.insert(number, text.to_string());
        self
    }
}

impl DocumentSource for FakeDocument {
    type Raster = String;
    type Page<'a> = FakePage;
    type Error = String;

    fn page_numbers(&self) -> Vec<usize> {
        self.pages.keys().copied().collect()
    }

    fn load_page(&self, number: usize) -> Result<FakePage, String> {
        if self.broken.contains(&number) {
            return Err(format!("page {} is corrupt", number));
        }
        self.pages
            .get(&number)
            .cloned()
            .ok_or_else(|| format!("no page {}", number))
    }

    fn page_text(&self, number: usize) -> Result<String, String> {
        if self.broken.contains(&number) {
            return Err(format!("page {} is corrupt", number));
        }
        if let Some(text) = self.texts.get(&number) {
            return Ok(text.clone());
        }
        self.pages
            .get(&number)
            .map(FakePage::text)
            .ok_or_else(|| format!("no page {}", number))
    }
}

/// Records persisted keys and returns `mem/<file name>` paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub persisted: Vec<(FigureKey, String)>,
    pub fail: bool,
}

impl FigureStore<String> for MemoryStore {
    type Error = String;

    fn persist(&mut self, key: &FigureKey, raster: &String) -> Result<PathBuf, String> {
        if self.fail {
            return Err("disk full".to_string());
        }
        if self.persisted.iter().any(|(k, _)| k == key) {
            return Err(format!("duplicate key {:?}", key));
        }
        self.persisted.push((*key, raster.clone()));
        Ok(PathBuf::from("mem").join(key.file_name()))
    }
}
