use image::imageops::FilterType;
use image::DynamicImage;
use log::debug;
use quizpdf_core::types::BBox;

use crate::types::RasterOptions;
use crate::PdfError;

// ---------------------------------------------------------------------------
// Pure types for raw image handling
// ---------------------------------------------------------------------------

/// Parsed color space from a PDF image stream dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Palette image: `base_channels` bytes per palette entry.
    Indexed { base_channels: u8, palette: Vec<u8> },
}

/// Parsed image metadata from a PDF stream dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawImageMeta {
    width: u32,
    height: u32,
    bits_per_component: u8,
    channels: u8,
    color_space: ColorSpace,
}

impl RawImageMeta {
    /// Expected raw byte count for this image's pixel data.
    /// Accounts for sub-byte pixel packing with per-row byte alignment.
    fn expected_byte_count(&self) -> usize {
        self.bytes_per_row() * self.height as usize
    }

    fn bytes_per_row(&self) -> usize {
        let bits_per_row =
            self.width as usize * self.channels as usize * self.bits_per_component as usize;
        bits_per_row.div_ceil(8)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Decode an Image XObject and scale it to the size of `region` at the
/// configured resolution.
pub fn rasterize(
    stream: &lopdf::Stream,
    region: &BBox,
    options: &RasterOptions,
) -> Result<DynamicImage, PdfError> {
    let decoded = decode_image(stream)?;
    Ok(resample(decoded, region, options.dpi))
}

/// Decode the pixels of an Image XObject.
///
/// JPEG (`DCTDecode`) data goes straight to the JPEG decoder, CCITT Group 4
/// fax data through `fax`, and everything else is decompressed and read as
/// raw samples described by the stream dictionary.
pub fn decode_image(stream: &lopdf::Stream) -> Result<DynamicImage, PdfError> {
    let filter = extract_filter_name(&stream.dict);

    match filter.as_deref() {
        Some("DCTDecode") => {
            return Ok(image::load_from_memory_with_format(
                &stream.content,
                image::ImageFormat::Jpeg,
            )?);
        }
        Some("JPXDecode") => {
            return Err(PdfError::UnsupportedImage(
                "JPEG 2000 images are not supported".to_string(),
            ));
        }
        Some("CCITTFaxDecode") => {
            return decode_ccitt(&stream.dict, &stream.content).ok_or_else(|| {
                PdfError::UnsupportedImage("undecodable CCITT fax image".to_string())
            });
        }
        _ => {}
    }

    let bytes = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Ok(image::load_from_memory_with_format(
            &bytes,
            image::ImageFormat::Png,
        )?);
    }

    let meta = extract_image_meta(&stream.dict).ok_or_else(|| {
        PdfError::UnsupportedImage(format!(
            "unsupported image dictionary (filter {})",
            filter.as_deref().unwrap_or("none")
        ))
    })?;

    raw_to_image(&meta, &bytes).ok_or_else(|| {
        PdfError::UnsupportedImage(format!(
            "expected {} bytes of samples, found {}",
            meta.expected_byte_count(),
            bytes.len()
        ))
    })
}

/// Scale `image` to `region` rendered at `dpi` dots per inch. With no DPI the
/// decoded image keeps its native pixel size.
pub fn resample(image: DynamicImage, region: &BBox, dpi: Option<u32>) -> DynamicImage {
    let Some(dpi) = dpi else {
        return image;
    };

    let (width, height) = target_size(region, dpi);
    if (width, height) == (image.width(), image.height()) {
        return image;
    }

    debug!(
        "resampling {}x{} image to {}x{} at {} dpi",
        image.width(),
        image.height(),
        width,
        height,
        dpi
    );
    image.resize_exact(width, height, FilterType::Triangle)
}

/// Pixel size of `region` (in points) rendered at `dpi`, never below 1x1.
pub fn target_size(region: &BBox, dpi: u32) -> (u32, u32) {
    let scale = dpi as f64 / 72.0;
    let px = |points: f64| ((points.abs() * scale).round() as u32).max(1);
    (px(region.width()), px(region.height()))
}

// ---------------------------------------------------------------------------
// Pure image conversion functions
// ---------------------------------------------------------------------------

/// Parse image metadata from a PDF stream dictionary.
fn extract_image_meta(dict: &lopdf::Dictionary) -> Option<RawImageMeta> {
    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

    let bits_per_component = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|obj| obj.as_i64().ok())
        .map(|v| v as u8)
        .unwrap_or(8);

    let color_space = parse_color_space(dict.get(b"ColorSpace").ok()?)?;
    let channels = match color_space {
        ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
        ColorSpace::Rgb => 3,
        ColorSpace::Cmyk => 4,
    };

    Some(RawImageMeta {
        width,
        height,
        bits_per_component,
        channels,
        color_space,
    })
}

fn device_space(name: &[u8]) -> Option<ColorSpace> {
    match name {
        b"DeviceRGB" | b"CalRGB" => Some(ColorSpace::Rgb),
        b"DeviceGray" | b"CalGray" => Some(ColorSpace::Gray),
        b"DeviceCMYK" => Some(ColorSpace::Cmyk),
        _ => None,
    }
}

/// Accepts a device color space name or `[/Indexed base hival lookup]` with
/// an inline lookup string.
fn parse_color_space(obj: &lopdf::Object) -> Option<ColorSpace> {
    match obj {
        lopdf::Object::Name(name) => device_space(name),
        lopdf::Object::Array(arr) => match arr.as_slice() {
            [lopdf::Object::Name(kind), base, _hival, lopdf::Object::String(lookup, _)]
                if kind == b"Indexed" =>
            {
                let base_channels = match base.as_name().ok().and_then(device_space)? {
                    ColorSpace::Gray => 1,
                    ColorSpace::Rgb => 3,
                    ColorSpace::Cmyk => 4,
                    ColorSpace::Indexed { .. } => return None,
                };
                Some(ColorSpace::Indexed {
                    base_channels,
                    palette: lookup.clone(),
                })
            }
            [lopdf::Object::Name(kind), ..] => device_space(kind),
            _ => None,
        },
        _ => None,
    }
}

/// Build an image from raw samples.
fn raw_to_image(meta: &RawImageMeta, raw_bytes: &[u8]) -> Option<DynamicImage> {
    if meta.width == 0 || meta.height == 0 || raw_bytes.len() < meta.expected_byte_count() {
        return None;
    }
    let raw_bytes = &raw_bytes[..meta.expected_byte_count()];

    let samples = match meta.bits_per_component {
        8 => raw_bytes.to_vec(),
        16 => raw_bytes.iter().step_by(2).copied().collect(),
        1 | 2 | 4 => {
            let scale = !matches!(meta.color_space, ColorSpace::Indexed { .. });
            expand_sub_byte_pixels(raw_bytes, meta, scale)
        }
        _ => return None,
    };

    match &meta.color_space {
        ColorSpace::Gray => {
            let img = image::GrayImage::from_raw(meta.width, meta.height, samples)?;
            Some(DynamicImage::ImageLuma8(img))
        }
        ColorSpace::Rgb => {
            let img = image::RgbImage::from_raw(meta.width, meta.height, samples)?;
            Some(DynamicImage::ImageRgb8(img))
        }
        ColorSpace::Cmyk => {
            let img = image::RgbImage::from_raw(meta.width, meta.height, cmyk_to_rgb(&samples))?;
            Some(DynamicImage::ImageRgb8(img))
        }
        ColorSpace::Indexed {
            base_channels,
            palette,
        } => {
            let rgb = apply_palette(&samples, *base_channels, palette);
            let img = image::RgbImage::from_raw(meta.width, meta.height, rgb)?;
            Some(DynamicImage::ImageRgb8(img))
        }
    }
}

/// Expand sub-byte packed pixels (1-bit, 2-bit, 4-bit) to one byte per
/// component, scaled to 0..=255 unless the values are palette indices.
fn expand_sub_byte_pixels(raw_bytes: &[u8], meta: &RawImageMeta, scale: bool) -> Vec<u8> {
    let pixels_per_row = meta.width as usize * meta.channels as usize;
    let bytes_per_row = meta.bytes_per_row();
    let bpc = meta.bits_per_component;
    let max_val = (1u16 << bpc) - 1;

    let mut result = Vec::with_capacity(pixels_per_row * meta.height as usize);

    for row in raw_bytes.chunks_exact(bytes_per_row) {
        let mut pixel_count = 0;

        for &byte in row {
            let pixels_in_byte = 8 / bpc as usize;
            for i in 0..pixels_in_byte {
                if pixel_count >= pixels_per_row {
                    break;
                }
                let shift = 8 - bpc * (i as u8 + 1);
                let val = (byte >> shift) & (max_val as u8);
                if scale {
                    result.push((val as u16 * 255 / max_val) as u8);
                } else {
                    result.push(val);
                }
                pixel_count += 1;
            }
        }
    }

    result
}

/// Convert CMYK pixel bytes to RGB.
fn cmyk_to_rgb(cmyk_bytes: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(cmyk_bytes.len() / 4 * 3);
    for pixel in cmyk_bytes.chunks_exact(4) {
        let (c, m, y, k) = (
            pixel[0] as u16,
            pixel[1] as u16,
            pixel[2] as u16,
            pixel[3] as u16,
        );
        let r = 255u16.saturating_sub((c + k).min(255)) as u8;
        let g = 255u16.saturating_sub((m + k).min(255)) as u8;
        let b = 255u16.saturating_sub((y + k).min(255)) as u8;
        rgb.extend_from_slice(&[r, g, b]);
    }
    rgb
}

/// Look palette indices up as RGB triples. Out-of-range indices are black.
fn apply_palette(indices: &[u8], base_channels: u8, palette: &[u8]) -> Vec<u8> {
    let n = base_channels as usize;
    let mut rgb = Vec::with_capacity(indices.len() * 3);
    for &index in indices {
        let start = index as usize * n;
        let entry = palette.get(start..start + n).unwrap_or(&[]);
        let pixel = match (n, entry) {
            (1, [g]) => [*g, *g, *g],
            (3, [r, g, b]) => [*r, *g, *b],
            (4, cmyk) if cmyk.len() == 4 => {
                let converted = cmyk_to_rgb(cmyk);
                [converted[0], converted[1], converted[2]]
            }
            _ => [0, 0, 0],
        };
        rgb.extend_from_slice(&pixel);
    }
    rgb
}

/// Decode CCITT Group 4 fax data. Black runs become black pixels.
fn decode_ccitt(dict: &lopdf::Dictionary, raw_bytes: &[u8]) -> Option<DynamicImage> {
    let decode_parms = extract_decode_parms(dict)?;

    let width = decode_parms.get(b"Columns").ok()?.as_i64().ok()? as u16;
    let height = decode_parms
        .get(b"Rows")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .map(|v| v as u16);

    let k = decode_parms
        .get(b"K")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0);

    if k >= 0 {
        return None;
    }

    let bytes_per_row = (width as usize).div_ceil(8);
    let mut rows: Vec<Vec<u8>> = Vec::new();

    fax::decoder::decode_g4(raw_bytes.iter().copied(), width, height, |transitions| {
        let mut row = pack_row_bits(transitions, width);
        row.resize(bytes_per_row, 0);
        rows.push(row);
    })?;

    if rows.is_empty() {
        return None;
    }

    let row_count = rows.len() as u32;
    // Set bits mark black runs; invert so they read as dark gray levels.
    let pixel_data: Vec<u8> = rows.into_iter().flatten().map(|b| !b).collect();

    let meta = RawImageMeta {
        width: width as u32,
        height: row_count,
        bits_per_component: 1,
        channels: 1,
        color_space: ColorSpace::Gray,
    };

    raw_to_image(&meta, &pixel_data)
}

/// Extract the DecodeParms dictionary from a stream dictionary.
fn extract_decode_parms(dict: &lopdf::Dictionary) -> Option<&lopdf::Dictionary> {
    let obj = dict.get(b"DecodeParms").ok()?;
    match obj {
        lopdf::Object::Dictionary(d) => Some(d),
        lopdf::Object::Array(arr) => arr.first().and_then(|o| o.as_dict().ok()),
        _ => None,
    }
}

/// Convert fax transition positions into a packed 1-bit byte array.
fn pack_row_bits(transitions: &[u16], width: u16) -> Vec<u8> {
    let bytes_per_row = (width as usize).div_ceil(8);
    let mut row = vec![0u8; bytes_per_row];

    let mut set_black_run = |start: u16, end: u16| {
        for col in start..end.min(width) {
            let byte_idx = col as usize / 8;
            let bit_idx = 7 - (col as usize % 8);
            row[byte_idx] |= 1 << bit_idx;
        }
    };

    let mut is_black = false;
    let mut prev_pos: u16 = 0;

    for &pos in transitions {
        if is_black {
            set_black_run(prev_pos, pos);
        }
        prev_pos = pos;
        is_black = !is_black;
    }

    if is_black {
        set_black_run(prev_pos, width);
    }

    row
}

/// Extract the last filter name from a stream dictionary. With a filter
/// chain the last entry is the one that produces the image samples.
fn extract_filter_name(dict: &lopdf::Dictionary) -> Option<String> {
    let filter_obj = dict.get(b"Filter").ok()?;
    match filter_obj {
        lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        lopdf::Object::Array(arr) => arr.last().and_then(|o| match o {
            lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
