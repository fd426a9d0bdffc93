//! Watch regions, their snapshot encoding, and single-frame matching.
//!
//! A [`WatchImage`] pairs a rectangle of the rendered frame with the
//! encoded pixels expected there. The encoding is a PNG (8-bit RGBA) wrapped
//! in a base64 data URL, the same form a canvas snapshot takes, so fixtures
//! produced by the calibration tool compare by plain string equality.

use std::io::Cursor;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::emulator::Emulator;
use crate::error::HarnessError;

/// Prefix of every encoded snapshot.
pub const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// A rectangle of the rendered frame. The origin may lie outside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub sx: i32,
    pub sy: i32,
    pub sw: u32,
    pub sh: u32,
}

impl Region {
    /// A region with non-zero width and height.
    pub fn new(sx: i32, sy: i32, sw: u32, sh: u32) -> Result<Region, HarnessError> {
        if sw == 0 || sh == 0 {
            return Err(HarnessError::InvalidRegion(format!(
                "region {sw}x{sh} at ({sx},{sy}) is empty"
            )));
        }
        Ok(Region { sx, sy, sw, sh })
    }

    /// Byte length of the region as 8-bit RGBA.
    pub fn rgba_len(&self) -> usize {
        self.sw as usize * self.sh as usize * 4
    }
}

/// A region plus the encoded snapshot expected in it.
///
/// Immutable once constructed; serialized as
/// `{"sx":..,"sy":..,"sw":..,"sh":..,"imageData":"data:image/png;base64,.."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWatchImage")]
pub struct WatchImage {
    #[serde(flatten)]
    region: Region,
    #[serde(rename = "imageData")]
    image_data: String,
}

#[derive(Deserialize)]
struct RawWatchImage {
    sx: i32,
    sy: i32,
    sw: u32,
    sh: u32,
    #[serde(rename = "imageData")]
    image_data: String,
}

impl TryFrom<RawWatchImage> for WatchImage {
    type Error = HarnessError;

    fn try_from(raw: RawWatchImage) -> Result<Self, Self::Error> {
        WatchImage::new(Region::new(raw.sx, raw.sy, raw.sw, raw.sh)?, raw.image_data)
    }
}

impl WatchImage {
    /// Pair a region with an already-encoded snapshot.
    pub fn new(region: Region, image_data: impl Into<String>) -> Result<Self, HarnessError> {
        let image_data = image_data.into();
        if !image_data.starts_with(DATA_URL_PREFIX) {
            return Err(HarnessError::Encoding(format!(
                "image data must start with {DATA_URL_PREFIX:?}"
            )));
        }
        Ok(Self { region, image_data })
    }

    /// Snapshot `region` of the emulator's current frame.
    pub fn capture(emulator: &dyn Emulator, region: Region) -> Result<Self, HarnessError> {
        let pixels = emulator.read_pixels(&region)?;
        let image_data = encode_rgba(region.sw, region.sh, &pixels)?;
        Ok(Self { region, image_data })
    }

    /// Load a fixture written by the calibration tool.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), HarnessError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn image_data(&self) -> &str {
        &self.image_data
    }

    /// Decode the stored snapshot back into pixels.
    pub fn decode(&self) -> Result<DecodedImage, HarnessError> {
        decode_data_url(&self.image_data)
    }
}

/// Pixels recovered from an encoded snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// 8-bit RGBA, row-major.
    pub rgba: Vec<u8>,
}

/// Encode 8-bit RGBA pixels as a PNG data URL.
///
/// The output is a pure function of the input.
pub fn encode_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<String, HarnessError> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(HarnessError::InvalidRegion(format!(
            "pixel buffer is {} bytes, expected {expected} for {width}x{height}",
            rgba.len()
        )));
    }

    let mut png_bytes = Vec::new();
    let mut encoder = png::Encoder::new(&mut png_bytes, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder
        .write_header()
        .map_err(|e| HarnessError::Encoding(format!("png header: {e}")))?;
    writer
        .write_image_data(rgba)
        .map_err(|e| HarnessError::Encoding(format!("png data: {e}")))?;
    writer
        .finish()
        .map_err(|e| HarnessError::Encoding(format!("png finish: {e}")))?;

    Ok(format!("{DATA_URL_PREFIX}{}", B64.encode(&png_bytes)))
}

/// Decode a PNG data URL into 8-bit RGBA pixels.
pub fn decode_data_url(data_url: &str) -> Result<DecodedImage, HarnessError> {
    let payload = data_url.strip_prefix(DATA_URL_PREFIX).ok_or_else(|| {
        HarnessError::Encoding(format!("image data must start with {DATA_URL_PREFIX:?}"))
    })?;
    let png_bytes = B64
        .decode(payload)
        .map_err(|e| HarnessError::Encoding(format!("base64: {e}")))?;

    let mut decoder = png::Decoder::new(Cursor::new(png_bytes));
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder
        .read_info()
        .map_err(|e| HarnessError::Encoding(format!("png header: {e}")))?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| HarnessError::Encoding(format!("png data: {e}")))?;
    buf.truncate(info.buffer_size());

    let rgba = match info.color_type {
        png::ColorType::Rgba => buf,
        png::ColorType::Rgb => buf
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 0xFF])
            .collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|px| [px[0], px[0], px[0], px[1]])
            .collect(),
        png::ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g, 0xFF]).collect(),
        png::ColorType::Indexed => {
            return Err(HarnessError::Encoding(
                "indexed png was not expanded".to_string(),
            ))
        }
    };

    Ok(DecodedImage {
        width: info.width,
        height: info.height,
        rgba,
    })
}

/// Whether the emulator's current frame shows `image` in its region.
///
/// Exact comparison of encodings: a mismatch means "not yet", never an error.
pub fn matches(emulator: &dyn Emulator, image: &WatchImage) -> Result<bool, HarnessError> {
    let region = image.region();
    let pixels = emulator.read_pixels(&region)?;
    let current = encode_rgba(region.sw, region.sh, &pixels)?;
    let matched = current == image.image_data;
    trace!(?region, matched, "compared watch region");
    Ok(matched)
}
