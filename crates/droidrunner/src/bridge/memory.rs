//! In-memory RGBA screen buffer

use image::{imageops, DynamicImage, ImageFormat, RgbaImage};
use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;

use super::{Argb, RawImage};
use crate::error::{BridgeError, BridgeResult};

/// A decoded screen capture held entirely in memory
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryImage {
    buffer: RgbaImage,
}

impl MemoryImage {
    pub fn new(buffer: RgbaImage) -> Self {
        Self { buffer }
    }

    /// Decode an encoded image (PNG, JPEG, ...) into RGBA
    pub fn decode(bytes: &[u8]) -> BridgeResult<Self> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::new(img.to_rgba8()))
    }

    pub fn into_inner(self) -> RgbaImage {
        self.buffer
    }

    fn parse_format(format: &str) -> BridgeResult<ImageFormat> {
        ImageFormat::from_extension(format.trim_start_matches('.'))
            .ok_or_else(|| BridgeError::Unsupported(format!("Unknown image format: {}", format)))
    }

    fn encode(&self, format: ImageFormat) -> BridgeResult<Vec<u8>> {
        let img = DynamicImage::ImageRgba8(self.buffer.clone());
        // JPEG has no alpha channel
        let img = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
            _ => img,
        };

        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format)?;
        Ok(buffer)
    }
}

impl From<RgbaImage> for MemoryImage {
    fn from(buffer: RgbaImage) -> Self {
        Self::new(buffer)
    }
}

impl RawImage for MemoryImage {
    fn width(&self) -> u32 {
        self.buffer.width()
    }

    fn height(&self) -> u32 {
        self.buffer.height()
    }

    fn pixel(&self, x: u32, y: u32) -> BridgeResult<u32> {
        self.buffer
            .get_pixel_checked(x, y)
            .map(|px| Argb::from(*px).to_packed())
            .ok_or_else(|| {
                BridgeError::OutOfBounds(format!(
                    "pixel ({}, {}) outside {}x{} image",
                    x,
                    y,
                    self.width(),
                    self.height()
                ))
            })
    }

    fn sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> BridgeResult<Self> {
        let fits_x = x.checked_add(width).is_some_and(|r| r <= self.width());
        let fits_y = y.checked_add(height).is_some_and(|b| b <= self.height());
        if !fits_x || !fits_y {
            return Err(BridgeError::OutOfBounds(format!(
                "region {}x{}+{}+{} outside {}x{} image",
                width,
                height,
                x,
                y,
                self.width(),
                self.height()
            )));
        }

        let cropped = imageops::crop_imm(&self.buffer, x, y, width, height).to_image();
        Ok(Self::new(cropped))
    }

    fn to_rgba(&self) -> BridgeResult<Cow<'_, RgbaImage>> {
        Ok(Cow::Borrowed(&self.buffer))
    }

    fn convert_to_bytes(&self, format: &str) -> BridgeResult<Vec<u8>> {
        self.encode(Self::parse_format(format)?)
    }

    fn write_to_file(&self, path: &Path, format: Option<&str>) -> BridgeResult<()> {
        let format = match format {
            Some(f) => Self::parse_format(f)?,
            // No extension and no format: PNG
            None => ImageFormat::from_path(path).unwrap_or(ImageFormat::Png),
        };
        let bytes = self.encode(format)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
