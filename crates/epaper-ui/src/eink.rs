//! E-ink display driver wrapper
//!
//! Re-exports the SSD1681 driver under the names the rest of the crate and
//! the firmware use, keeping both decoupled from driver specifics.

/// E-ink display handle with a heap-allocated panel mirror
pub type EinkDisplay<Interface> = ssd1681::Display<Interface, alloc::vec::Vec<u8>>;

/// E-ink interface handle
pub type EinkInterface<SPI, DC, RST, BUSY> = ssd1681::Interface<SPI, DC, RST, BUSY>;

/// Display refresh modes
pub use ssd1681::RefreshMode;
/// Byte-aligned panel window
pub use ssd1681::Region;

/// Driver configuration builder and result
pub use ssd1681::{Builder, Config as DriverConfig};

/// Display dimensions
pub use ssd1681::Dimensions;

/// Display interface trait
pub use ssd1681::DisplayInterface;

/// Re-export ssd1681 errors
pub use ssd1681::{BuilderError, Error as EinkError, InterfaceError};

/// Re-export the driver crate (only for advanced usage)
pub use ssd1681;
