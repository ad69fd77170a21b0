//! Decoding of still images into raw rgb samples

use std::path::Path;

use tracing::info;

use crate::backend::drm::Error;
use crate::utils::{Buffer, Size};

/// A decoded image as interleaved 8-bit rgb samples
///
/// Rows are stored top to bottom without padding, so `pixels` holds
/// `width * height * 3` bytes for a well formed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    size: Size<u32, Buffer>,
    channels: u8,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Number of samples per pixel
    pub const CHANNELS: usize = 3;

    /// Wrap already decoded rgb samples
    pub fn from_rgb8(size: impl Into<Size<u32, Buffer>>, pixels: Vec<u8>) -> Self {
        DecodedImage {
            size: size.into(),
            channels: Self::CHANNELS as u8,
            pixels,
        }
    }

    /// Decode the image at `path`, converting it to rgb
    ///
    /// Alpha and extra channels are dropped, grayscale is expanded.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| Error::ImageLoad {
            path: path.to_owned(),
            source,
        })?;
        let channels = image.color().channel_count();
        let rgb = image.into_rgb8();
        let size = Size::new(rgb.width(), rgb.height());

        info!("Image loaded: {}, {} channels", size, channels);
        Ok(DecodedImage {
            size,
            channels,
            pixels: rgb.into_raw(),
        })
    }

    /// Size in pixels
    pub fn size(&self) -> Size<u32, Buffer> {
        self.size
    }

    /// Channel count of the encoded source, before conversion to rgb
    pub fn source_channels(&self) -> u8 {
        self.channels
    }

    /// Raw rgb samples
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Sample the pixel at `(x, y)` as `(r, g, b)`
    #[inline]
    pub fn rgb(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.size.w || y >= self.size.h {
            return None;
        }
        let idx = (y as usize * self.size.w as usize + x as usize) * Self::CHANNELS;
        match self.pixels.get(idx..idx + Self::CHANNELS) {
            Some(&[r, g, b]) => Some((r, g, b)),
            _ => None,
        }
    }
}
