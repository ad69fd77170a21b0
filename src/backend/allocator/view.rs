use std::fmt;

use crate::utils::{Physical, Point, Rectangle, Size};

/// Bytes per pixel of an xrgb8888 buffer
pub const BYTES_PER_PIXEL: usize = 4;

/// Mutable view of a linear xrgb8888 pixel buffer
///
/// Pixels are 32-bit little-endian cells, rows are `pitch` bytes apart.
/// The pitch may exceed `width * 4`; the padding bytes at the end of each row
/// are never touched by pixel accessors.
pub struct PixelView<'a> {
    data: &'a mut [u8],
    size: Size<u32, Physical>,
    pitch: u32,
}

impl<'a> fmt::Debug for PixelView<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelView")
            .field("size", &self.size)
            .field("pitch", &self.pitch)
            .field("len", &self.data.len())
            .finish()
    }
}

impl<'a> PixelView<'a> {
    /// Wrap `data` as a buffer of `size` pixels with rows `pitch` bytes apart
    ///
    /// Returns `None` if a row does not fit into `pitch` or `data` is too
    /// short to hold every row.
    pub fn new(data: &'a mut [u8], size: Size<u32, Physical>, pitch: u32) -> Option<PixelView<'a>> {
        let row = (size.w as usize).checked_mul(BYTES_PER_PIXEL)?;
        if (pitch as usize) < row {
            return None;
        }
        let needed = (pitch as usize).checked_mul(size.h as usize)?;
        if data.len() < needed {
            return None;
        }
        Some(PixelView { data, size, pitch })
    }

    /// Size in pixels
    pub fn size(&self) -> Size<u32, Physical> {
        self.size
    }

    /// Length of a row in bytes
    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    /// Raw bytes of the buffer, including row padding
    pub fn as_bytes(&self) -> &[u8] {
        self.data
    }

    /// Set every byte of the buffer, padding included, to zero
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    #[inline]
    fn offset(&self, loc: Point<u32, Physical>) -> Option<usize> {
        if !Rectangle::from_size(self.size).contains(loc) {
            return None;
        }
        Some(loc.y as usize * self.pitch as usize + loc.x as usize * BYTES_PER_PIXEL)
    }

    /// Read the pixel at `(x, y)`, `None` if outside the buffer
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u32> {
        let offset = self.offset(Point::new(x, y))?;
        let cell: [u8; BYTES_PER_PIXEL] = self.data[offset..offset + BYTES_PER_PIXEL].try_into().ok()?;
        Some(u32::from_le_bytes(cell))
    }

    /// Write the pixel at `(x, y)`
    ///
    /// Writes outside the buffer are ignored, returns whether the pixel was written.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: u32) -> bool {
        match self.offset(Point::new(x, y)) {
            Some(offset) => {
                self.data[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&value.to_le_bytes());
                true
            }
            None => false,
        }
    }

    /// Pixel cells of row `y`, without padding
    pub fn row_mut(&mut self, y: u32) -> Option<&mut [u8]> {
        let start = self.offset(Point::new(0, y))?;
        let end = start + self.size.w as usize * BYTES_PER_PIXEL;
        Some(&mut self.data[start..end])
    }
}
