//! SSD1681 E-Paper Display Driver
//!
//! A driver for the SSD1681 e-paper display controller (200x200 panels such as
//! the GDEH0154D67), keeping a mirror of panel RAM for read-modify-write and
//! read-back.
//!
//! ## Features
//!
//! - `no_std` compatible
//! - `embedded-hal` v1.0 support
//! - Windowed partial refresh with previous-image resync
//! - Full refresh from the mirrored image
//! - Non-blocking refresh start with a separate busy query, plus a bounded
//!   blocking busy wait
//!
//! ## Usage
//!
//! ```rust,no_run
//! use core::convert::Infallible;
//! use embedded_hal::delay::DelayNs;
//! use embedded_hal::digital::{InputPin, OutputPin};
//! use embedded_hal::spi::{Operation, SpiDevice};
//! use ssd1681::{Builder, Dimensions, Display, Interface, Region};
//!
//! # struct MockSpi;
//! # impl embedded_hal::spi::ErrorType for MockSpi { type Error = Infallible; }
//! # impl SpiDevice for MockSpi {
//! #     fn transaction(
//! #         &mut self,
//! #         _operations: &mut [Operation<'_, u8>],
//! #     ) -> Result<(), Self::Error> {
//! #         Ok(())
//! #     }
//! # }
//! # struct MockPin;
//! # impl embedded_hal::digital::ErrorType for MockPin { type Error = Infallible; }
//! # impl OutputPin for MockPin {
//! #     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl InputPin for MockPin {
//! #     fn is_high(&mut self) -> Result<bool, Self::Error> { Ok(false) }
//! #     fn is_low(&mut self) -> Result<bool, Self::Error> { Ok(true) }
//! # }
//! # struct MockDelay;
//! # impl DelayNs for MockDelay { fn delay_ns(&mut self, _ns: u32) {} }
//! # let spi = MockSpi;
//! # let dc = MockPin;
//! # let rst = MockPin;
//! # let busy = MockPin;
//! # let mut delay = MockDelay;
//! let interface = Interface::new(spi, dc, rst, busy);
//! let dims = match Dimensions::new(200, 200) {
//!     Ok(dims) => dims,
//!     Err(_) => return,
//! };
//! let config = match Builder::new().dimensions(dims).build() {
//!     Ok(config) => config,
//!     Err(_) => return,
//! };
//!
//! let mut display = match Display::new(interface, config, [0u8; 5000]) {
//!     Ok(display) => display,
//!     Err(_) => return,
//! };
//! let _ = display.reset(&mut delay);
//! let _ = display.stage(Region::new(0, 0, 8, 1), &[0x00]);
//! let _ = display.full_refresh(&mut delay);
//! ```

#![no_std]

#[cfg(test)]
extern crate alloc;

/// SSD1681 command definitions
pub mod command;
/// Display configuration types and builder
pub mod config;
/// Core display operations
pub mod display;
/// Error types for the driver
pub mod error;
/// Hardware interface abstraction
pub mod interface;

pub use config::{Builder, Config, Dimensions, MAX_GATE_OUTPUTS, MAX_SOURCE_OUTPUTS};
pub use display::{Display, RefreshMode, Region};
pub use error::{BuilderError, Error};
pub use interface::InterfaceError;
pub use interface::{DEFAULT_BUSY_TIMEOUT_MS, DisplayInterface, Interface};
