//! Display configuration types and builder

pub use crate::error::{BuilderError, MAX_GATE_OUTPUTS, MAX_SOURCE_OUTPUTS};

/// Display dimensions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    /// Number of rows (height in pixels, corresponds to gate outputs)
    pub rows: u16,
    /// Number of columns (width in pixels, corresponds to source outputs)
    pub cols: u16,
}

impl Dimensions {
    /// Create new dimensions with validation
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::InvalidDimensions` if:
    /// - rows > MAX_GATE_OUTPUTS
    /// - cols > MAX_SOURCE_OUTPUTS
    /// - cols % 8 != 0 (must be byte-aligned for memory)
    pub fn new(rows: u16, cols: u16) -> Result<Self, BuilderError> {
        if rows == 0 || rows > MAX_GATE_OUTPUTS {
            return Err(BuilderError::InvalidDimensions { rows, cols });
        }
        if cols == 0 || cols > MAX_SOURCE_OUTPUTS || cols % 8 != 0 {
            return Err(BuilderError::InvalidDimensions { rows, cols });
        }
        Ok(Self { rows, cols })
    }

    /// Bytes per panel row
    pub fn stride(&self) -> usize {
        self.cols as usize / 8
    }

    /// Calculate required buffer size in bytes
    pub fn buffer_size(&self) -> usize {
        self.rows as usize * self.stride()
    }
}

/// Display configuration
///
/// This struct holds all configurable parameters for the SSD1681 controller.
/// Use `Builder` to create a Config.
#[derive(Clone, Debug)]
pub struct Config {
    /// Display dimensions
    pub dimensions: Dimensions,
    /// Gate scanning direction byte (third byte of driver output control)
    pub gate_scanning: u8,
    /// Border waveform setting
    pub border_waveform: u8,
    /// Temperature sensor control
    pub temp_sensor_control: u8,
    /// Display update control 2 sequence for a full refresh
    pub display_update_ctrl2_full: u8,
    /// Display update control 2 sequence for a partial refresh
    pub display_update_ctrl2_partial: u8,
    /// Bits OR-ed into control 2 when the analog rails are off
    pub display_update_power_on: u8,
    /// Bits OR-ed into control 2 to switch the analog rails off afterwards
    pub display_update_power_off: u8,
}

/// Builder for constructing display configuration
///
/// # Example
///
/// ```
/// use ssd1681::{Builder, Dimensions};
///
/// let config = Builder::new()
///     .dimensions(Dimensions::new(200, 200).unwrap())
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.dimensions.buffer_size(), 5000);
/// ```
pub struct Builder {
    /// Display dimensions (required)
    dimensions: Option<Dimensions>,
    gate_scanning: u8,
    border_waveform: u8,
    temp_sensor_control: u8,
    display_update_ctrl2_full: u8,
    display_update_ctrl2_partial: u8,
    display_update_power_on: u8,
    display_update_power_off: u8,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            dimensions: None,
            // Gate scan G0 -> G199
            gate_scanning: 0x00,
            // Follow LUT, VSS border
            border_waveform: 0x05,
            // Internal temperature sensor
            temp_sensor_control: 0x80,
            // TEMP_LOAD | LUT_LOAD | DISPLAY_START (mode 1)
            display_update_ctrl2_full: 0x34,
            // TEMP_LOAD | LUT_LOAD | MODE_2 | DISPLAY_START
            display_update_ctrl2_partial: 0x3C,
            // CLOCK_ON | ANALOG_ON
            display_update_power_on: 0xC0,
            // ANALOG_OFF | CLOCK_OFF
            display_update_power_off: 0x03,
        }
    }
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set display dimensions (required)
    pub fn dimensions(mut self, dims: Dimensions) -> Self {
        self.dimensions = Some(dims);
        self
    }

    /// Set gate scanning direction
    pub fn gate_scanning(mut self, value: u8) -> Self {
        self.gate_scanning = value;
        self
    }

    /// Set border waveform
    pub fn border_waveform(mut self, value: u8) -> Self {
        self.border_waveform = value;
        self
    }

    /// Set temperature sensor control
    pub fn temp_sensor_control(mut self, value: u8) -> Self {
        self.temp_sensor_control = value;
        self
    }

    /// Set control 2 sequence used for full refreshes
    pub fn display_update_ctrl2_full(mut self, value: u8) -> Self {
        self.display_update_ctrl2_full = value;
        self
    }

    /// Set control 2 sequence used for partial refreshes
    pub fn display_update_ctrl2_partial(mut self, value: u8) -> Self {
        self.display_update_ctrl2_partial = value;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::MissingDimensions` if dimensions were not set
    pub fn build(self) -> Result<Config, BuilderError> {
        Ok(Config {
            dimensions: self.dimensions.ok_or(BuilderError::MissingDimensions)?,
            gate_scanning: self.gate_scanning,
            border_waveform: self.border_waveform,
            temp_sensor_control: self.temp_sensor_control,
            display_update_ctrl2_full: self.display_update_ctrl2_full,
            display_update_ctrl2_partial: self.display_update_ctrl2_partial,
            display_update_power_on: self.display_update_power_on,
            display_update_power_off: self.display_update_power_off,
        })
    }
}
