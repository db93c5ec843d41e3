//! Retained screen with an invalidation list, rendered in strips.
//!
//! The application marks areas dirty with [`Screen::invalidate`]. On
//! [`Screen::render`] the list is merged, each area is redrawn through a
//! [`StripCanvas`] at most `buffer_lines` rows at a time, and every strip is
//! handed to a [`FlushTarget`]. The strip buffer is reused, so the target
//! must call [`FlushDone::release`] before returning.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::eink::RefreshMode;
use crate::error::RenderError;
use crate::framebuffer::{stride_for, FramebufferRegion};

/// Invalid areas kept before the whole screen is marked dirty instead
pub const MAX_INVALID_AREAS: usize = 32;

/// Receiver of rendered strips
pub trait FlushTarget {
    type Error;

    /// Push one strip to the panel
    ///
    /// Must call `done.release()` on every path, including errors, once the
    /// strip data is no longer needed.
    fn flush(
        &mut self,
        region: &FramebufferRegion<'_>,
        done: &mut FlushDone,
    ) -> Result<RefreshMode, Self::Error>;

    /// Whether rendering may continue after `error`
    fn is_recoverable(_error: &Self::Error) -> bool {
        false
    }
}

/// "Buffer ready" signal for one flush
#[derive(Debug, Default)]
pub struct FlushDone {
    released: bool,
}

impl FlushDone {
    pub fn new() -> Self {
        Self::default()
    }

    /// The strip buffer may be reused
    pub fn release(&mut self) {
        self.released = true;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

/// Outcome of one render pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Strips handed to the flush target
    pub flushes: u32,
    /// Strips that ended in a full refresh
    pub full_refreshes: u32,
    /// Strips that reported a recoverable hardware fault
    pub hardware_faults: u32,
}

/// Graphics-layer state: geometry, dirty areas and the strip buffer
#[derive(Debug)]
pub struct Screen {
    size: Size,
    buffer_lines: u16,
    areas: Vec<Rectangle>,
    strip: Vec<u8>,
}

impl Screen {
    pub fn new(size: Size, buffer_lines: u16) -> Self {
        let lines = buffer_lines.max(1);
        Self {
            size,
            buffer_lines: lines,
            areas: Vec::new(),
            strip: vec![0; stride_for(size.width) * lines as usize],
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn buffer_lines(&self) -> u16 {
        self.buffer_lines
    }

    fn bounds(&self) -> Rectangle {
        Rectangle::new(Point::zero(), self.size)
    }

    /// Mark `area` for redraw
    ///
    /// The area is clipped to the screen; areas already covered are dropped.
    pub fn invalidate(&mut self, area: Rectangle) {
        let area = clip(&area, self.size);
        if area.is_zero_sized() {
            return;
        }
        if self.areas.iter().any(|existing| covers(existing, &area)) {
            return;
        }
        if self.areas.len() >= MAX_INVALID_AREAS {
            log::debug!("UI: invalidation list full, redrawing whole screen");
            self.invalidate_all();
            return;
        }
        self.areas.push(area);
    }

    /// Mark the whole screen for redraw
    pub fn invalidate_all(&mut self) {
        self.areas.clear();
        self.areas.push(self.bounds());
    }

    pub fn is_dirty(&self) -> bool {
        !self.areas.is_empty()
    }

    pub fn dirty_areas(&self) -> &[Rectangle] {
        &self.areas
    }

    /// Redraw every dirty area and flush it strip by strip
    ///
    /// `scene` draws the whole screen; each call only lands inside the
    /// current strip. Recoverable flush errors are counted in the summary and
    /// rendering continues. On any other error the unfinished areas stay
    /// dirty.
    pub fn render<S, T>(
        &mut self,
        mut scene: S,
        target: &mut T,
    ) -> Result<RenderSummary, RenderError<T::Error>>
    where
        S: FnMut(&mut StripCanvas<'_>) -> Result<(), Infallible>,
        T: FlushTarget,
    {
        let mut summary = RenderSummary::default();
        if self.areas.is_empty() {
            return Ok(summary);
        }

        join_areas(&mut self.areas);
        let areas = core::mem::take(&mut self.areas);

        for (index, area) in areas.iter().enumerate() {
            let result = self.render_area(area, &mut scene, target, &mut summary);
            if let Err(err) = result {
                self.areas.extend_from_slice(&areas[index..]);
                return Err(err);
            }
        }

        Ok(summary)
    }

    fn render_area<S, T>(
        &mut self,
        area: &Rectangle,
        scene: &mut S,
        target: &mut T,
        summary: &mut RenderSummary,
    ) -> Result<(), RenderError<T::Error>>
    where
        S: FnMut(&mut StripCanvas<'_>) -> Result<(), Infallible>,
        T: FlushTarget,
    {
        let stride = stride_for(area.size.width);
        let mut row = 0;
        while row < area.size.height {
            let lines = (area.size.height - row).min(u32::from(self.buffer_lines));
            let strip = Rectangle::new(
                area.top_left + Point::new(0, row as i32),
                Size::new(area.size.width, lines),
            );
            let len = stride * lines as usize;

            let data = &mut self.strip[..len];
            data.fill(0);
            let mut canvas = StripCanvas {
                screen: self.size,
                area: strip,
                stride,
                data,
            };
            match scene(&mut canvas) {
                Ok(()) => {}
                Err(never) => match never {},
            }

            let region = FramebufferRegion::new(strip, &self.strip[..len]);
            let mut done = FlushDone::new();
            let result = target.flush(&region, &mut done);
            if !done.is_released() {
                return Err(RenderError::BufferNotReleased);
            }

            summary.flushes += 1;
            match result {
                Ok(RefreshMode::Full) => summary.full_refreshes += 1,
                Ok(RefreshMode::Partial) => {}
                Err(err) if T::is_recoverable(&err) => {
                    summary.hardware_faults += 1;
                    log::warn!(
                        "UI: flush of {}x{} at ({}, {}) hit a hardware fault",
                        strip.size.width,
                        strip.size.height,
                        strip.top_left.x,
                        strip.top_left.y
                    );
                }
                Err(err) => return Err(RenderError::Flush(err)),
            }

            row += lines;
        }
        Ok(())
    }
}

/// Draw target for one strip of the screen
///
/// Reports the full screen size so scenes can lay out in screen
/// coordinates; pixels outside the strip are discarded.
pub struct StripCanvas<'a> {
    screen: Size,
    area: Rectangle,
    stride: usize,
    data: &'a mut [u8],
}

impl StripCanvas<'_> {
    /// Screen area this strip covers
    pub fn area(&self) -> Rectangle {
        self.area
    }

    fn index(&self, point: Point) -> Option<(usize, u8)> {
        let x = point.x - self.area.top_left.x;
        let y = point.y - self.area.top_left.y;
        if x < 0 || y < 0 || x as u32 >= self.area.size.width || y as u32 >= self.area.size.height {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        Some((y * self.stride + x / 8, 0x80 >> (x % 8)))
    }
}

impl OriginDimensions for StripCanvas<'_> {
    fn size(&self) -> Size {
        self.screen
    }
}

impl DrawTarget for StripCanvas<'_> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some((index, mask)) = self.index(point) {
                if color.is_on() {
                    self.data[index] |= mask;
                } else {
                    self.data[index] &= !mask;
                }
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.data.fill(if color.is_on() { 0xFF } else { 0x00 });
        Ok(())
    }
}

/// Whether `outer` fully contains `inner`
fn covers(outer: &Rectangle, inner: &Rectangle) -> bool {
    match inner.bottom_right() {
        Some(corner) => outer.contains(inner.top_left) && outer.contains(corner),
        None => true,
    }
}

/// Intersect `area` with a screen of `size`
///
/// Done in i64 so rectangles whose far corner overflows i32 still clip.
fn clip(area: &Rectangle, size: Size) -> Rectangle {
    let x0 = i64::from(area.top_left.x).max(0);
    let y0 = i64::from(area.top_left.y).max(0);
    let x1 = (i64::from(area.top_left.x) + i64::from(area.size.width)).min(i64::from(size.width));
    let y1 = (i64::from(area.top_left.y) + i64::from(area.size.height)).min(i64::from(size.height));
    if x1 <= x0 || y1 <= y0 {
        return Rectangle::zero();
    }
    // Bounded by the screen size, which fits in i32/u32
    Rectangle::new(
        Point::new(x0 as i32, y0 as i32),
        Size::new((x1 - x0) as u32, (y1 - y0) as u32),
    )
}

fn pixel_count(area: &Rectangle) -> u64 {
    u64::from(area.size.width) * u64::from(area.size.height)
}

/// Smallest rectangle containing both
fn envelope(a: &Rectangle, b: &Rectangle) -> Rectangle {
    let (Some(a_end), Some(b_end)) = (a.bottom_right(), b.bottom_right()) else {
        return if a.is_zero_sized() { *b } else { *a };
    };
    Rectangle::with_corners(
        a.top_left.component_min(b.top_left),
        a_end.component_max(b_end),
    )
}

/// Merge pairs whose envelope is no larger than the two areas together
fn join_areas(areas: &mut Vec<Rectangle>) {
    'restart: loop {
        for i in 0..areas.len() {
            for j in (i + 1)..areas.len() {
                let joined = envelope(&areas[i], &areas[j]);
                if pixel_count(&joined) <= pixel_count(&areas[i]) + pixel_count(&areas[j]) {
                    areas[i] = joined;
                    areas.swap_remove(j);
                    continue 'restart;
                }
            }
        }
        break;
    }
}
