//! Error types for the flush pipeline
//!
//! - [`Error`] - everything the subsystem surfaces to the application
//! - [`ConfigError`] - rejected configuration values
//! - [`RenderError`] - failures of a screen render pass

use embedded_graphics::primitives::Rectangle;

use crate::bridge::BridgeError;
use crate::eink::{BuilderError, DisplayInterface, EinkError};

/// Errors raised by the flush pipeline
///
/// Generic over the interface type so hardware errors keep their concrete type.
#[derive(Debug)]
pub enum Error<I: DisplayInterface> {
    /// A flush rectangle lies (partly) outside the panel or is empty
    ///
    /// Contract violation by the caller; nothing was written.
    OutOfBoundsRegion {
        /// The rejected rectangle
        area: Rectangle,
    },
    /// The source bits are shorter than the rectangle requires
    SourceTooSmall {
        /// Bytes required for the rectangle
        required: usize,
        /// Bytes supplied
        provided: usize,
    },
    /// The panel kept BUSY asserted past the configured bound
    ///
    /// The flush still completed on the software side.
    HardwareTimeout {
        /// Milliseconds spent waiting
        waited_ms: u64,
    },
    /// The driver could not be brought up
    InitializationFailure(EinkError<I>),
    /// Configuration rejected at build time
    Config(ConfigError),
    /// Driver error during a flush or refresh
    Driver(EinkError<I>),
}

impl<I: DisplayInterface> Error<I> {
    /// Whether the render loop can carry on after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::HardwareTimeout { .. })
    }
}

impl<I: DisplayInterface> From<EinkError<I>> for Error<I> {
    fn from(err: EinkError<I>) -> Self {
        Error::Driver(err)
    }
}

impl<I: DisplayInterface> From<BridgeError> for Error<I> {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::OutOfBounds { area } => Error::OutOfBoundsRegion { area },
            BridgeError::SourceTooSmall { required, provided } => {
                Error::SourceTooSmall { required, provided }
            }
        }
    }
}

impl<I: DisplayInterface> From<ConfigError> for Error<I> {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl<I: DisplayInterface> core::fmt::Display for Error<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::OutOfBoundsRegion { area } => write!(
                f,
                "Region out of bounds: x={} y={} w={} h={}",
                area.top_left.x, area.top_left.y, area.size.width, area.size.height
            ),
            Error::SourceTooSmall { required, provided } => write!(
                f,
                "Source buffer too small: required {required} bytes, provided {provided}"
            ),
            Error::HardwareTimeout { waited_ms } => {
                write!(f, "Display busy timeout after {waited_ms} ms")
            }
            Error::InitializationFailure(e) => write!(f, "Display init failed: {e}"),
            Error::Config(e) => write!(f, "Invalid configuration: {e}"),
            Error::Driver(e) => write!(f, "Display driver error: {e}"),
        }
    }
}

impl<I: DisplayInterface + core::fmt::Debug> core::error::Error for Error<I> {}

/// Errors that can occur when building configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Panel dimensions rejected by the driver
    Dimensions(BuilderError),
    /// Strip buffer must hold between one line and the full panel height
    InvalidBufferLines {
        /// Requested lines
        lines: u16,
        /// Panel rows
        rows: u16,
    },
    /// Busy polling interval must be non-zero and not exceed the timeout
    InvalidBusyPoll {
        /// Requested poll interval
        poll_ms: u32,
        /// Configured timeout
        timeout_ms: u32,
    },
}

impl From<BuilderError> for ConfigError {
    fn from(err: BuilderError) -> Self {
        ConfigError::Dimensions(err)
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::Dimensions(e) => write!(f, "{e}"),
            ConfigError::InvalidBufferLines { lines, rows } => {
                write!(f, "Invalid buffer lines {lines} (panel has {rows} rows)")
            }
            ConfigError::InvalidBusyPoll {
                poll_ms,
                timeout_ms,
            } => write!(
                f,
                "Invalid busy poll interval {poll_ms} ms (timeout {timeout_ms} ms)"
            ),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Failure of a [`Screen::render`](crate::screen::Screen::render) pass
#[derive(Debug)]
pub enum RenderError<E> {
    /// The flush target reported an unrecoverable error
    Flush(E),
    /// The flush target returned without releasing the strip buffer
    BufferNotReleased,
}

impl<E: core::fmt::Display> core::fmt::Display for RenderError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RenderError::Flush(e) => write!(f, "Flush failed: {e}"),
            RenderError::BufferNotReleased => write!(f, "Flush target kept the strip buffer"),
        }
    }
}

impl<E: core::fmt::Debug + core::fmt::Display> core::error::Error for RenderError<E> {}
