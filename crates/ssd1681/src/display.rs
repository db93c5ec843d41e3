//! Core display operations

use embedded_hal::delay::DelayNs;

use crate::command::*;
use crate::config::{Config, Dimensions};
use crate::error::Error;
use crate::interface::DisplayInterface;

type DisplayResult<I> = core::result::Result<(), Error<I>>;

/// Data entry mode used for every window: X increment, Y increment
const DATA_ENTRY_X_INC_Y_INC: u8 = 0x03;

/// Region specification for window updates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    /// X coordinate in pixels (multiple of 8)
    pub x: u16,
    /// Y coordinate in pixels
    pub y: u16,
    /// Width in pixels (multiple of 8)
    pub w: u16,
    /// Height in pixels
    pub h: u16,
}

impl Region {
    /// Create a new region
    #[allow(clippy::many_single_char_names)]
    pub fn new(x: u16, y: u16, w: u16, h: u16) -> Self {
        Self { x, y, w, h }
    }

    /// Bytes per row of this region
    pub fn stride(&self) -> usize {
        self.w as usize / 8
    }

    /// Calculate the buffer size in bytes for this region
    pub fn buffer_size(&self) -> usize {
        self.stride() * self.h as usize
    }
}

/// Refresh waveform selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshMode {
    /// Differential update of the written window (fast, accumulates ghosting)
    Partial,
    /// Full-waveform redraw of the whole panel (slow, clears ghosting)
    #[default]
    Full,
}

/// Core display driver for SSD1681
///
/// Keeps a mirror of the panel RAM in `buffer` (1 = white, 0 = black,
/// MSB = leftmost pixel). All writes go through the mirror first so that
/// callers can read back what the panel shows and so that full refreshes can
/// resend the complete image.
pub struct Display<I, B>
where
    I: DisplayInterface,
{
    /// Hardware interface
    interface: I,
    /// Display configuration
    config: Config,
    /// Mirror of the panel image
    buffer: B,
    /// Whether the analog rails are powered
    is_display_on: bool,
}

impl<I, B> Display<I, B>
where
    I: DisplayInterface,
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    /// Create a new Display instance
    ///
    /// # Errors
    ///
    /// Returns `Error::BufferTooSmall` if `buffer` cannot hold the panel.
    pub fn new(interface: I, config: Config, buffer: B) -> Result<Self, Error<I>> {
        let required = config.dimensions.buffer_size();
        let provided = buffer.as_ref().len();
        if provided < required {
            return Err(Error::BufferTooSmall { required, provided });
        }
        Ok(Self {
            interface,
            config,
            buffer,
            is_display_on: false,
        })
    }

    /// Perform hardware reset, software reset, and initialization
    ///
    /// Both RAM planes and the mirror are cleared to white.
    pub fn reset<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.interface.reset(delay);
        self.send_command(SOFT_RESET)?;
        self.wait_until_idle(delay)?;
        self.is_display_on = false;
        self.init(delay)
    }

    /// Initialize the controller with configuration
    fn init<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        // Driver output control
        let rows = self.config.dimensions.rows;
        self.send_command(DRIVER_OUTPUT_CONTROL)?;
        self.send_data(&[
            ((rows - 1) % 256) as u8,
            ((rows - 1) / 256) as u8,
            self.config.gate_scanning,
        ])?;

        // Border waveform
        self.send_command(BORDER_WAVEFORM)?;
        self.send_data(&[self.config.border_waveform])?;

        // Temperature sensor
        self.send_command(TEMP_SENSOR_CONTROL)?;
        self.send_data(&[self.config.temp_sensor_control])?;

        self.clear_ram(delay)
    }

    /// Clear both RAM planes and the mirror to white
    fn clear_ram<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.set_ram_area(0, 0, self.config.dimensions.cols, self.config.dimensions.rows)?;

        self.send_command(AUTO_WRITE_BW_RAM)?;
        self.send_data(&[AUTO_WRITE_WHITE])?;
        self.wait_until_idle(delay)?;

        self.send_command(AUTO_WRITE_RED_RAM)?;
        self.send_data(&[AUTO_WRITE_WHITE])?;
        self.wait_until_idle(delay)?;

        let size = self.config.dimensions.buffer_size();
        self.buffer.as_mut()[..size].fill(0xFF);
        Ok(())
    }

    /// Copy packed window data into the mirror without touching the panel
    ///
    /// `data` is row-major with `region.stride()` bytes per row.
    pub fn stage(&mut self, region: Region, data: &[u8]) -> DisplayResult<I> {
        self.check_area(region)?;
        let required = region.buffer_size();
        if data.len() < required {
            return Err(Error::BufferTooSmall {
                required,
                provided: data.len(),
            });
        }

        let stride = self.config.dimensions.stride();
        let region_stride = region.stride();
        let x_byte = region.x as usize / 8;
        let buffer = self.buffer.as_mut();
        for (row, src) in data[..required].chunks_exact(region_stride).enumerate() {
            let start = (region.y as usize + row) * stride + x_byte;
            buffer[start..start + region_stride].copy_from_slice(src);
        }
        Ok(())
    }

    /// Write the mirrored window into BW RAM and start a partial refresh
    ///
    /// Returns as soon as the refresh is triggered; poll [`Self::is_busy`]
    /// and call [`Self::sync_previous`] once it clears.
    pub fn begin_partial_update(&mut self, region: Region, turn_off: bool) -> DisplayResult<I> {
        self.set_ram_area(region.x, region.y, region.w, region.h)?;
        self.send_command(WRITE_RAM_BW)?;
        self.send_window(region)?;
        self.start_refresh(RefreshMode::Partial, turn_off)
    }

    /// Copy the mirrored window into RED RAM
    ///
    /// The controller compares RED (previous) against BW (next) during a
    /// partial refresh, so the window must be resynced after each one.
    pub fn sync_previous(&mut self, region: Region) -> DisplayResult<I> {
        self.set_ram_area(region.x, region.y, region.w, region.h)?;
        self.send_command(WRITE_RAM_RED)?;
        self.send_window(region)
    }

    /// Write the whole mirror into both RAM planes and start a full refresh
    pub fn begin_full_update(&mut self, turn_off: bool) -> DisplayResult<I> {
        let size = self.config.dimensions.buffer_size();
        self.set_ram_area(0, 0, self.config.dimensions.cols, self.config.dimensions.rows)?;

        self.send_command(WRITE_RAM_BW)?;
        self.interface
            .send_data(&self.buffer.as_ref()[..size])
            .map_err(Error::Interface)?;

        self.send_command(WRITE_RAM_RED)?;
        self.interface
            .send_data(&self.buffer.as_ref()[..size])
            .map_err(Error::Interface)?;

        self.start_refresh(RefreshMode::Full, turn_off)
    }

    /// Blocking full refresh of the mirrored image
    pub fn full_refresh<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.begin_full_update(false)?;
        self.wait_until_idle(delay)
    }

    /// Trigger the update sequence without waiting for completion
    fn start_refresh(&mut self, mode: RefreshMode, turn_off: bool) -> DisplayResult<I> {
        self.send_command(DISPLAY_UPDATE_CTRL1)?;
        let ctrl1 = match mode {
            RefreshMode::Full => CTRL1_BYPASS_RED,
            RefreshMode::Partial => CTRL1_NORMAL,
        };
        self.send_data(&[ctrl1])?;

        let mut display_mode: u8 = match mode {
            RefreshMode::Full => self.config.display_update_ctrl2_full,
            RefreshMode::Partial => self.config.display_update_ctrl2_partial,
        };

        if !self.is_display_on {
            display_mode |= self.config.display_update_power_on;
        }

        if turn_off {
            display_mode |= self.config.display_update_power_off;
            self.is_display_on = false;
        } else {
            self.is_display_on = true;
        }

        self.send_command(DISPLAY_UPDATE_CTRL2)?;
        self.send_data(&[display_mode])?;

        self.send_command(MASTER_ACTIVATION)?;
        log::debug!("EPD: refresh {:?} ctrl2=0x{:02X}", mode, display_mode);

        Ok(())
    }

    /// Sample the BUSY line
    pub fn is_busy(&mut self) -> Result<bool, Error<I>> {
        self.interface.is_busy().map_err(Error::Interface)
    }

    /// Block on the interface's bounded busy wait
    pub fn wait_until_idle<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.interface.busy_wait(delay).map_err(Error::Interface)
    }

    /// Start the power-down sequence without waiting for BUSY
    ///
    /// Returns `false` when the rails are already off and nothing was sent.
    /// RAM content is kept; the next refresh powers the panel back up.
    pub fn begin_power_off(&mut self) -> Result<bool, Error<I>> {
        if !self.is_display_on {
            return Ok(false);
        }

        self.send_command(DISPLAY_UPDATE_CTRL2)?;
        self.send_data(&[self.config.display_update_power_off])?;
        self.send_command(MASTER_ACTIVATION)?;
        self.is_display_on = false;
        Ok(true)
    }

    /// Switch the analog rails and oscillator off, blocking until idle
    pub fn power_off<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        if self.begin_power_off()? {
            self.wait_until_idle(delay)?;
        }
        Ok(())
    }

    /// Whether the analog rails are currently on
    pub fn is_powered(&self) -> bool {
        self.is_display_on
    }

    /// Mirror of the panel image
    pub fn buffer(&self) -> &[u8] {
        &self.buffer.as_ref()[..self.config.dimensions.buffer_size()]
    }

    /// Get display dimensions
    pub fn dimensions(&self) -> &Dimensions {
        &self.config.dimensions
    }

    /// Access the hardware interface
    pub fn interface(&self) -> &I {
        &self.interface
    }

    /// Stream the mirrored rows of `region` to the RAM plane selected last
    fn send_window(&mut self, region: Region) -> DisplayResult<I> {
        let stride = self.config.dimensions.stride();
        let x_byte = region.x as usize / 8;
        let region_stride = region.stride();
        for row in region.y as usize..(region.y + region.h) as usize {
            let start = row * stride + x_byte;
            self.interface
                .send_data(&self.buffer.as_ref()[start..start + region_stride])
                .map_err(Error::Interface)?;
        }
        Ok(())
    }

    /// Reject empty, out-of-panel, or unaligned windows
    #[allow(clippy::many_single_char_names)]
    fn check_area(&self, region: Region) -> DisplayResult<I> {
        let Region { x, y, w, h } = region;
        let dims = self.config.dimensions;
        if w == 0 || h == 0 {
            return Err(Error::InvalidRamArea { x, y, w, h });
        }
        if x.saturating_add(w) > dims.cols || y.saturating_add(h) > dims.rows {
            return Err(Error::InvalidRamArea { x, y, w, h });
        }
        if x % 8 != 0 || w % 8 != 0 {
            return Err(Error::InvalidRamArea { x, y, w, h });
        }
        Ok(())
    }

    /// Set RAM window and address counters
    ///
    /// X is addressed in bytes on this controller, Y in lines.
    #[allow(clippy::many_single_char_names)]
    fn set_ram_area(&mut self, x: u16, y: u16, w: u16, h: u16) -> DisplayResult<I> {
        self.check_area(Region::new(x, y, w, h))?;

        self.send_command(DATA_ENTRY_MODE)?;
        self.send_data(&[DATA_ENTRY_X_INC_Y_INC])?;

        let x_start = (x / 8) as u8;
        let x_end = ((x + w - 1) / 8) as u8;
        self.send_command(SET_RAM_X_RANGE)?;
        self.send_data(&[x_start, x_end])?;

        let y_start = y;
        let y_end = y + h - 1;
        self.send_command(SET_RAM_Y_RANGE)?;
        self.send_data(&[
            (y_start % 256) as u8,
            (y_start / 256) as u8,
            (y_end % 256) as u8,
            (y_end / 256) as u8,
        ])?;

        self.send_command(SET_RAM_X_COUNTER)?;
        self.send_data(&[x_start])?;

        self.send_command(SET_RAM_Y_COUNTER)?;
        self.send_data(&[(y_start % 256) as u8, (y_start / 256) as u8])?;

        Ok(())
    }

    /// Send a command to the display controller
    fn send_command(&mut self, cmd: u8) -> DisplayResult<I> {
        self.interface.send_command(cmd).map_err(Error::Interface)
    }

    /// Send data to the display controller
    fn send_data(&mut self, data: &[u8]) -> DisplayResult<I> {
        self.interface.send_data(data).map_err(Error::Interface)
    }
}
