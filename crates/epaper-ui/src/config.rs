//! Subsystem configuration and builder
//!
//! Everything that used to be a compile-time constant for the WeAct 1.54"
//! module (pin map, panel geometry, refresh threshold) is carried here so the
//! same pipeline can target other panels and boards.

use crate::eink::{self, Dimensions};
use crate::error::ConfigError;

/// Native panel width in pixels
pub const DEFAULT_WIDTH: u16 = 200;
/// Native panel height in pixels
pub const DEFAULT_HEIGHT: u16 = 200;
/// Partial refreshes allowed before a full refresh is forced
///
/// Counted per flush, not per UI cycle: two widgets updating together
/// reach the threshold after 25 cycles.
pub const DEFAULT_MAX_PARTIAL_UPDATES: u32 = 50;
/// Scanlines per strip buffer
pub const DEFAULT_BUFFER_LINES: u16 = 10;
/// Upper bound for one busy wait
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 10_000;
/// Interval between BUSY samples
pub const DEFAULT_BUSY_POLL_MS: u32 = 1;

/// GPIO numbers wiring the panel to the microcontroller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinMap {
    /// Chip select (active low)
    pub cs: u8,
    /// Data/command (low = command, high = data)
    pub dc: u8,
    /// Reset (active low)
    pub rst: u8,
    /// Busy (high = panel updating)
    pub busy: u8,
    /// SPI clock
    pub sck: u8,
    /// SPI data out
    pub mosi: u8,
}

impl Default for PinMap {
    /// ESP32 wiring from the WeAct Studio reference design
    fn default() -> Self {
        Self {
            cs: 5,
            dc: 16,
            rst: 17,
            busy: 4,
            sck: 18,
            mosi: 23,
        }
    }
}

/// How ink maps onto panel RAM bits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Polarity {
    /// 0 = black, 1 = white (SSD1681 native)
    #[default]
    InkIsZero,
    /// 1 = black, 0 = white
    InkIsOne,
}

/// Subsystem configuration
///
/// Use [`Config::builder`] to create one.
#[derive(Clone, Debug)]
pub struct Config {
    /// Panel wiring
    pub pins: PinMap,
    /// Panel geometry
    pub dimensions: Dimensions,
    /// Partial refreshes allowed between full refreshes
    pub max_partial_updates: u32,
    /// Scanlines per strip buffer
    pub buffer_lines: u16,
    /// Upper bound for waiting on BUSY after a refresh
    pub busy_timeout_ms: u32,
    /// Interval between BUSY samples
    pub busy_poll_ms: u32,
    /// Switch the analog rails off after every flush
    pub power_off_after_flush: bool,
    /// Force a full refresh when the panel sat idle longer than this
    pub full_refresh_after_idle_ms: Option<u64>,
    /// Ink polarity of the panel RAM
    pub polarity: Polarity,
}

impl Config {
    /// Start from the defaults for the 200x200 WeAct module
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Size of one strip buffer in bytes
    pub fn strip_buffer_size(&self) -> usize {
        self.dimensions.stride() * self.buffer_lines as usize
    }

    /// Driver configuration matching this panel
    pub fn driver_config(&self) -> Result<eink::DriverConfig, ConfigError> {
        Ok(eink::Builder::new().dimensions(self.dimensions).build()?)
    }
}

/// Builder for [`Config`]
///
/// # Example
///
/// ```
/// use epaper_ui::Config;
///
/// let config = Config::builder()
///     .max_partial_updates(20)
///     .buffer_lines(25)
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.strip_buffer_size(), 25 * 25);
/// ```
#[derive(Clone, Debug)]
pub struct Builder {
    pins: PinMap,
    rows: u16,
    cols: u16,
    max_partial_updates: u32,
    buffer_lines: u16,
    busy_timeout_ms: u32,
    busy_poll_ms: u32,
    power_off_after_flush: bool,
    full_refresh_after_idle_ms: Option<u64>,
    polarity: Polarity,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            pins: PinMap::default(),
            rows: DEFAULT_HEIGHT,
            cols: DEFAULT_WIDTH,
            max_partial_updates: DEFAULT_MAX_PARTIAL_UPDATES,
            buffer_lines: DEFAULT_BUFFER_LINES,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            busy_poll_ms: DEFAULT_BUSY_POLL_MS,
            power_off_after_flush: true,
            full_refresh_after_idle_ms: None,
            polarity: Polarity::default(),
        }
    }
}

impl Builder {
    /// Set the pin map
    pub fn pins(mut self, pins: PinMap) -> Self {
        self.pins = pins;
        self
    }

    /// Set panel geometry (rows = gates, cols = sources)
    pub fn dimensions(mut self, rows: u16, cols: u16) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    /// Set the partial refresh threshold
    pub fn max_partial_updates(mut self, count: u32) -> Self {
        self.max_partial_updates = count;
        self
    }

    /// Set strip buffer height in scanlines
    pub fn buffer_lines(mut self, lines: u16) -> Self {
        self.buffer_lines = lines;
        self
    }

    /// Set the busy-wait bound
    pub fn busy_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.busy_timeout_ms = timeout_ms;
        self
    }

    /// Set the busy polling interval
    pub fn busy_poll_ms(mut self, poll_ms: u32) -> Self {
        self.busy_poll_ms = poll_ms;
        self
    }

    /// Power the panel down after each flush
    pub fn power_off_after_flush(mut self, enabled: bool) -> Self {
        self.power_off_after_flush = enabled;
        self
    }

    /// Force a full refresh after this much idle time
    pub fn full_refresh_after_idle_ms(mut self, idle_ms: Option<u64>) -> Self {
        self.full_refresh_after_idle_ms = idle_ms;
        self
    }

    /// Set ink polarity
    pub fn polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Dimensions`] if the driver rejects the geometry
    /// - [`ConfigError::InvalidBufferLines`] if lines is 0 or exceeds rows
    /// - [`ConfigError::InvalidBusyPoll`] if the poll interval is 0 or longer than the timeout
    pub fn build(self) -> Result<Config, ConfigError> {
        let dimensions = Dimensions::new(self.rows, self.cols)?;

        if self.buffer_lines == 0 || self.buffer_lines > dimensions.rows {
            return Err(ConfigError::InvalidBufferLines {
                lines: self.buffer_lines,
                rows: dimensions.rows,
            });
        }
        if self.busy_poll_ms == 0 || self.busy_poll_ms > self.busy_timeout_ms {
            return Err(ConfigError::InvalidBusyPoll {
                poll_ms: self.busy_poll_ms,
                timeout_ms: self.busy_timeout_ms,
            });
        }

        Ok(Config {
            pins: self.pins,
            dimensions,
            max_partial_updates: self.max_partial_updates,
            buffer_lines: self.buffer_lines,
            busy_timeout_ms: self.busy_timeout_ms,
            busy_poll_ms: self.busy_poll_ms,
            power_off_after_flush: self.power_off_after_flush,
            full_refresh_after_idle_ms: self.full_refresh_after_idle_ms,
            polarity: self.polarity,
        })
    }
}
