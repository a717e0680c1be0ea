use serde::{Deserialize, Serialize};

/// Resolution used when turning image regions into rasters.
pub const DEFAULT_DPI: u32 = 200;

/// How cropped figures are rasterised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterOptions {
    /// Output resolution in dots per inch. `None` keeps the embedded image's
    /// native pixel size.
    pub dpi: Option<u32>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        RasterOptions {
            dpi: Some(DEFAULT_DPI),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub page_count: usize,
}
