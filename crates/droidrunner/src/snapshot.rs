//! Image handle over a captured screen buffer

use std::path::Path;

use crate::bridge::{Argb, RawImage};
use crate::error::{Error, Result};

/// A screen capture taken from a [`Device`](crate::Device).
///
/// The buffer may be absent when the device refused to produce a frame;
/// every operation then fails with [`Error::ImageInvalid`].
#[derive(Debug, Clone)]
pub struct Snapshot<I: RawImage> {
    image: Option<I>,
}

impl<I: RawImage> Snapshot<I> {
    pub fn new(image: Option<I>) -> Self {
        Self { image }
    }

    pub fn is_valid(&self) -> bool {
        self.image.is_some()
    }

    fn image(&self) -> Result<&I> {
        self.image
            .as_ref()
            .ok_or_else(|| Error::ImageInvalid("Image is not valid".to_string()))
    }

    /// Borrow the backend buffer, if any
    pub fn raw(&self) -> Option<&I> {
        self.image.as_ref()
    }

    pub fn width(&self) -> Result<u32> {
        Ok(self.image()?.width())
    }

    pub fn height(&self) -> Result<u32> {
        Ok(self.image()?.height())
    }

    /// Encode the buffer in `format` (`png`, `jpg`, `bmp`, ...)
    pub fn convert_to_bytes(&self, format: &str) -> Result<Vec<u8>> {
        self.image()?
            .convert_to_bytes(format)
            .map_err(Error::image)
    }

    /// Packed `0xAARRGGBB` pixel value
    pub fn get_raw_pixel_int(&self, x: u32, y: u32) -> Result<u32> {
        self.image()?.pixel(x, y).map_err(Error::image)
    }

    pub fn get_raw_pixel(&self, x: u32, y: u32) -> Result<Argb> {
        self.get_raw_pixel_int(x, y).map(Argb::from_packed)
    }

    pub fn get_sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Self> {
        self.image()?
            .sub_image(x, y, width, height)
            .map(|img| Self::new(Some(img)))
            .map_err(Error::image)
    }

    /// Approximate equality: true iff at least `percent` (0.0 to 1.0) of the
    /// pixels have the same colour. Images of different size never match.
    pub fn same_as(&self, other: &Snapshot<I>, percent: f64) -> Result<bool> {
        let mine = self.image()?.to_rgba().map_err(Error::image)?;
        let theirs = other.image()?.to_rgba().map_err(Error::image)?;

        if mine.dimensions() != theirs.dimensions() {
            return Ok(false);
        }

        let (width, height) = mine.dimensions();
        let differing = mine
            .pixels()
            .zip(theirs.pixels())
            .filter(|(a, b)| a != b)
            .count();

        let total = width as f64 * height as f64;
        let diff_percent = if total == 0.0 {
            0.0
        } else {
            differing as f64 / total
        };
        Ok(percent <= 1.0 - diff_percent)
    }

    /// Write the buffer to `path`, inferring the format from the extension
    /// when `format` is `None`
    pub fn write_to_file(&self, path: impl AsRef<Path>, format: Option<&str>) -> Result<()> {
        self.image()?
            .write_to_file(path.as_ref(), format)
            .map_err(Error::image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MemoryImage;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn solid(width: u32, height: u32, px: [u8; 4]) -> Snapshot<MemoryImage> {
        Snapshot::new(Some(MemoryImage::new(RgbaImage::from_pixel(
            width,
            height,
            Rgba(px),
        ))))
    }

    #[test]
    fn test_identical_images_match_exactly() {
        let a = solid(10, 10, [10, 20, 30, 255]);
        let b = solid(10, 10, [10, 20, 30, 255]);
        assert!(a.same_as(&b, 1.0).unwrap());
    }

    #[test]
    fn test_one_changed_pixel() {
        let a = solid(10, 10, [10, 20, 30, 255]);
        let mut buffer = RgbaImage::from_pixel(10, 10, Rgba([10, 20, 30, 255]));
        buffer.put_pixel(4, 7, Rgba([10, 20, 31, 255]));
        let b = Snapshot::new(Some(MemoryImage::new(buffer)));

        assert!(!a.same_as(&b, 1.0).unwrap());
        assert!(a.same_as(&b, 0.99).unwrap());
        assert!(!a.same_as(&b, 0.995).unwrap());
        assert!(a.same_as(&b, 0.0).unwrap());
    }

    #[test]
    fn test_alpha_difference_counts() {
        let a = solid(2, 2, [0, 0, 0, 255]);
        let b = solid(2, 2, [0, 0, 0, 0]);
        assert!(!a.same_as(&b, 0.5).unwrap());
        assert!(a.same_as(&b, 0.0).unwrap());
    }

    #[test]
    fn test_different_sizes_never_match() {
        let a = solid(10, 10, [0, 0, 0, 255]);
        let wider = solid(11, 10, [0, 0, 0, 255]);
        let taller = solid(10, 9, [0, 0, 0, 255]);
        for percent in [0.0, 0.5, 1.0] {
            assert!(!a.same_as(&wider, percent).unwrap());
            assert!(!a.same_as(&taller, percent).unwrap());
        }
    }

    #[test]
    fn test_absent_image_is_invalid() {
        let empty: Snapshot<MemoryImage> = Snapshot::new(None);
        let full = solid(1, 1, [0, 0, 0, 255]);

        assert!(matches!(empty.width(), Err(Error::ImageInvalid(_))));
        assert!(matches!(empty.convert_to_bytes("png"), Err(Error::ImageInvalid(_))));
        assert!(matches!(empty.get_raw_pixel(0, 0), Err(Error::ImageInvalid(_))));
        assert!(matches!(empty.get_sub_image(0, 0, 1, 1), Err(Error::ImageInvalid(_))));
        assert!(matches!(empty.write_to_file("x.png", None), Err(Error::ImageInvalid(_))));
        assert!(matches!(empty.same_as(&full, 0.0), Err(Error::ImageInvalid(_))));
        assert!(matches!(full.same_as(&empty, 0.0), Err(Error::ImageInvalid(_))));
    }

    #[test]
    fn test_raw_pixel_channels() {
        let snap = solid(2, 2, [0xFF, 0x10, 0x20, 0x80]);
        assert_eq!(snap.get_raw_pixel_int(1, 1).unwrap(), 0x80FF_1020);

        let px = snap.get_raw_pixel(0, 0).unwrap();
        assert_eq!((px.a, px.r, px.g, px.b), (0x80, 0xFF, 0x10, 0x20));

        assert!(matches!(
            snap.get_raw_pixel(2, 0),
            Err(Error::ImageOperationFailed(_))
        ));
    }

    #[test]
    fn test_sub_image_and_file_output() {
        let mut buffer = RgbaImage::from_pixel(6, 6, Rgba([0, 0, 0, 255]));
        buffer.put_pixel(3, 3, Rgba([255, 255, 255, 255]));
        let snap = Snapshot::new(Some(MemoryImage::new(buffer)));

        let sub = snap.get_sub_image(2, 2, 2, 2).unwrap();
        assert_eq!(sub.get_raw_pixel_int(1, 1).unwrap(), 0xFFFF_FFFF);
        assert_eq!(sub.get_raw_pixel_int(0, 0).unwrap(), 0xFF00_0000);

        let dir = tempdir().unwrap();
        let path = dir.path().join("crop.png");
        sub.write_to_file(&path, None).unwrap();
        let reread = Snapshot::new(Some(MemoryImage::decode(&std::fs::read(&path).unwrap()).unwrap()));
        assert!(sub.same_as(&reread, 1.0).unwrap());
    }

    #[test]
    fn test_bare_file_name_writes_png() {
        let snap = solid(3, 2, [1, 2, 3, 255]);
        let dir = tempdir().unwrap();
        let path = dir.path().join("shot");
        snap.write_to_file(&path, None).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
        let reread = Snapshot::new(Some(MemoryImage::decode(&bytes).unwrap()));
        assert!(snap.same_as(&reread, 1.0).unwrap());
    }
}
