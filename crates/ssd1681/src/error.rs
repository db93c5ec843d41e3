//! Driver errors
//!
//! [`BuilderError`] is returned while assembling a [`Config`](crate::Config);
//! [`Error`] by everything that talks to the controller. Bus and pin failures
//! arrive wrapped as [`Error::Interface`].
//!
//! ```
//! use ssd1681::{Builder, BuilderError, Dimensions};
//!
//! assert!(matches!(Builder::new().build(), Err(BuilderError::MissingDimensions)));
//! // 296-gate glass does not fit this controller's 200 gates
//! assert!(Dimensions::new(296, 128).is_err());
//! ```

use crate::interface::DisplayInterface;

/// Maximum gate outputs (rows) supported by SSD1681 controller
pub const MAX_GATE_OUTPUTS: u16 = 200;

/// Maximum source outputs (columns) supported by SSD1681 controller
pub const MAX_SOURCE_OUTPUTS: u16 = 200;

/// Controller-level failure
///
/// Keeps the interface's own error type so callers can match on it.
#[derive(Debug)]
pub enum Error<I: DisplayInterface> {
    /// SPI/GPIO failure, or BUSY never released during a blocking wait
    Interface(I::Error),
    /// Panel geometry outside 1..=200 rows, 8..=200 columns in steps of 8
    InvalidDimensions { rows: u16, cols: u16 },
    /// Mirror or window data shorter than needed
    BufferTooSmall { required: usize, provided: usize },
    /// RAM window is empty, outside the panel, or not byte-aligned
    InvalidRamArea {
        /// X coordinate in pixels
        x: u16,
        /// Y coordinate in pixels
        y: u16,
        /// Width in pixels
        w: u16,
        /// Height in pixels
        h: u16,
    },
}

impl<I: DisplayInterface> core::fmt::Display for Error<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Interface(e) => write!(f, "Interface error: {e:?}"),
            Error::InvalidDimensions { rows, cols } => {
                write!(f, "Invalid dimensions: {rows}x{cols}")
            }
            Error::BufferTooSmall { required, provided } => {
                write!(
                    f,
                    "Buffer too small: required {required} bytes, provided {provided}"
                )
            }
            Error::InvalidRamArea { x, y, w, h } => {
                write!(f, "Invalid RAM area: x={x} y={y} w={w} h={h}")
            }
        }
    }
}

impl<I: DisplayInterface + core::fmt::Debug> core::error::Error for Error<I> {}

/// Rejected [`Builder`](crate::config::Builder) input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderError {
    /// [`Builder::dimensions`](crate::config::Builder::dimensions) was never called
    MissingDimensions,
    /// See [`Dimensions::new`](crate::config::Dimensions::new)
    InvalidDimensions { rows: u16, cols: u16 },
}

impl core::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BuilderError::MissingDimensions => write!(f, "Panel dimensions not set"),
            BuilderError::InvalidDimensions { rows, cols } => write!(
                f,
                "Invalid dimensions {rows}x{cols} (max {MAX_GATE_OUTPUTS}x{MAX_SOURCE_OUTPUTS}, cols must be multiple of 8)"
            ),
        }
    }
}

impl core::error::Error for BuilderError {}
