//! Strip framebuffer format shared by the screen and the pixel bridge.
//!
//! Row-major, 1 bit per pixel, MSB = leftmost pixel, each row padded to a
//! whole byte. A set bit is `BinaryColor::On` (ink).

use embedded_graphics::primitives::Rectangle;

/// Bytes per row for a region `width` pixels wide
pub fn stride_for(width: u32) -> usize {
    (width as usize).div_ceil(8)
}

/// One dirty rectangle handed to the flush target
///
/// Borrowed from the screen for the duration of a single flush call.
#[derive(Clone, Copy, Debug)]
pub struct FramebufferRegion<'a> {
    /// Panel coordinates covered by `data`
    pub area: Rectangle,
    /// Packed pixels, [`stride_for`]`(area.size.width)` bytes per row
    pub data: &'a [u8],
}

impl<'a> FramebufferRegion<'a> {
    pub fn new(area: Rectangle, data: &'a [u8]) -> Self {
        Self { area, data }
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        stride_for(self.area.size.width)
    }

    /// Bytes `data` must hold
    pub fn required_len(&self) -> usize {
        self.stride() * self.area.size.height as usize
    }

    /// Whether the pixel at region-local (x, y) is inked
    ///
    /// Coordinates must lie inside the region and `data` must be at least
    /// [`Self::required_len`] bytes.
    pub fn is_on(&self, x: u32, y: u32) -> bool {
        let byte = self.data[y as usize * self.stride() + x as usize / 8];
        byte & (0x80 >> (x % 8)) != 0
    }
}
