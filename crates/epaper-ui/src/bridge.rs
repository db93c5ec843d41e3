//! Pixel bridge: strip framebuffer -> panel RAM layout.
//!
//! The panel wants byte-aligned windows, MSB-first, in its own polarity.
//! Dirty rectangles can start and end mid-byte, so the bridge widens the
//! window to byte boundaries and fills the extra bits from the driver's
//! mirror of panel RAM. Pixels outside the rectangle are written back
//! unchanged.

extern crate alloc;

use alloc::vec::Vec;

use embedded_graphics::primitives::Rectangle;

use crate::config::Polarity;
use crate::eink::{Dimensions, Region};
use crate::framebuffer::FramebufferRegion;

/// Contract violations detected while bridging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// Rectangle is empty or extends past the panel
    OutOfBounds { area: Rectangle },
    /// Source data shorter than the rectangle needs
    SourceTooSmall { required: usize, provided: usize },
}

/// Repacks strip regions into panel windows
///
/// Owns a scratch buffer that is reused between flushes.
#[derive(Debug)]
pub struct PixelBridge {
    polarity: Polarity,
    scratch: Vec<u8>,
}

impl PixelBridge {
    pub fn new(polarity: Polarity) -> Self {
        Self {
            polarity,
            scratch: Vec::new(),
        }
    }

    /// Packed window produced by the last successful [`Self::pack`]
    pub fn bytes(&self) -> &[u8] {
        &self.scratch
    }

    /// Convert `source` into a byte-aligned window of panel RAM
    ///
    /// `panel` is the driver's mirror (`dims.buffer_size()` bytes). Returns
    /// the window whose bytes are then available through [`Self::bytes`].
    pub fn pack(
        &mut self,
        source: &FramebufferRegion<'_>,
        dims: &Dimensions,
        panel: &[u8],
    ) -> Result<Region, BridgeError> {
        let window = window_for(&source.area, dims)?;

        let required = source.required_len();
        if source.data.len() < required {
            return Err(BridgeError::SourceTooSmall {
                required,
                provided: source.data.len(),
            });
        }

        let panel_stride = dims.stride();
        let window_stride = window.stride();
        let x_byte = window.x as usize / 8;

        self.scratch.clear();
        for row in 0..window.h as usize {
            let start = (window.y as usize + row) * panel_stride + x_byte;
            self.scratch
                .extend_from_slice(&panel[start..start + window_stride]);
        }

        let offset = source.area.top_left.x as u32 - u32::from(window.x);
        if offset == 0 {
            self.pack_aligned(source, window_stride);
        } else {
            self.pack_shifted(source, window_stride, offset);
        }

        Ok(window)
    }

    /// Whole source bytes map onto whole window bytes; only the tail byte
    /// of each row needs masking
    fn pack_aligned(&mut self, source: &FramebufferRegion<'_>, window_stride: usize) {
        let width = source.area.size.width;
        let src_stride = source.stride();
        let tail_bits = width % 8;
        let tail_mask = if tail_bits == 0 {
            0xFF
        } else {
            0xFFu8 << (8 - tail_bits)
        };

        for (row, src) in source
            .data
            .chunks(src_stride)
            .take(source.area.size.height as usize)
            .enumerate()
        {
            let dst = &mut self.scratch[row * window_stride..(row + 1) * window_stride];
            for (i, &ink) in src.iter().enumerate() {
                let mask = if i + 1 == src_stride { tail_mask } else { 0xFF };
                let bits = to_panel(ink, self.polarity);
                dst[i] = (dst[i] & !mask) | (bits & mask);
            }
        }
    }

    /// Rectangle starts mid-byte: copy pixel by pixel
    fn pack_shifted(&mut self, source: &FramebufferRegion<'_>, window_stride: usize, offset: u32) {
        let size = source.area.size;
        for y in 0..size.height {
            let row = &mut self.scratch[y as usize * window_stride..(y as usize + 1) * window_stride];
            for x in 0..size.width {
                let dst_x = (offset + x) as usize;
                let mask = 0x80u8 >> (dst_x % 8);
                let white = match self.polarity {
                    Polarity::InkIsZero => !source.is_on(x, y),
                    Polarity::InkIsOne => source.is_on(x, y),
                };
                if white {
                    row[dst_x / 8] |= mask;
                } else {
                    row[dst_x / 8] &= !mask;
                }
            }
        }
    }
}

/// Map eight inked bits to panel RAM bits
fn to_panel(ink: u8, polarity: Polarity) -> u8 {
    match polarity {
        Polarity::InkIsZero => !ink,
        Polarity::InkIsOne => ink,
    }
}

/// Byte-aligned panel window covering `area`
fn window_for(area: &Rectangle, dims: &Dimensions) -> Result<Region, BridgeError> {
    let x = i64::from(area.top_left.x);
    let y = i64::from(area.top_left.y);
    let w = i64::from(area.size.width);
    let h = i64::from(area.size.height);

    if w == 0 || h == 0 || x < 0 || y < 0 {
        return Err(BridgeError::OutOfBounds { area: *area });
    }
    if x + w > i64::from(dims.cols) || y + h > i64::from(dims.rows) {
        return Err(BridgeError::OutOfBounds { area: *area });
    }

    let x_start = x & !7;
    let x_end = (x + w + 7) & !7;
    Ok(Region::new(
        x_start as u16,
        y as u16,
        (x_end - x_start) as u16,
        h as u16,
    ))
}
