//! Bus and pin plumbing
//!
//! The controller sits on 4-wire SPI: SCK and MOSI, chip select owned by the
//! [`SpiDevice`], plus DC (low = command), RST (active low) and BUSY (high
//! while the controller works).
//!
//! ```rust,ignore
//! use ssd1681::Interface;
//!
//! let mut interface = Interface::new(spi_device, dc_pin, rst_pin, busy_pin)
//!     .with_busy_timeout_ms(5_000);
//!
//! interface.send_command(0x12)?; // Soft reset
//! interface.busy_wait(&mut delay)?;
//! ```

use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

/// Default upper bound for a single busy wait, in milliseconds
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 10_000;

/// Byte-level access to the controller
///
/// [`Interface`] implements it over embedded-hal; tests substitute recorders.
pub trait DisplayInterface {
    type Error: Debug;

    /// Send a command byte to the controller (DC low)
    ///
    /// # Errors
    ///
    /// Returns an error if SPI communication or GPIO fails.
    fn send_command(&mut self, command: u8) -> Result<(), Self::Error>;

    /// Send data bytes to the controller (DC high)
    ///
    /// Consecutive calls continue the same RAM write; the controller
    /// auto-increments its address counter.
    ///
    /// # Errors
    ///
    /// Returns an error if SPI communication or GPIO fails.
    fn send_data(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Pulse RST low for at least 10 ms and give the controller 10 ms to wake
    fn reset<D: DelayNs>(&mut self, delay: &mut D);

    /// Sample the BUSY line once
    ///
    /// # Errors
    ///
    /// Returns an error if the GPIO read fails.
    fn is_busy(&mut self) -> Result<bool, Self::Error>;

    /// Block until BUSY drops
    ///
    /// # Errors
    ///
    /// Fails once the implementation's bound passes; [`Interface`] reports
    /// [`InterfaceError::Timeout`].
    fn busy_wait<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error>;
}

/// Failure of [`Interface`]
#[derive(Debug)]
pub enum InterfaceError<SpiErr, PinErr> {
    Spi(SpiErr),
    Pin(PinErr),
    /// BUSY outlasted the configured bound
    Timeout,
}

impl<SpiErr: Debug, PinErr: Debug> core::fmt::Display for InterfaceError<SpiErr, PinErr> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InterfaceError::Spi(e) => write!(f, "SPI error: {e:?}"),
            InterfaceError::Pin(e) => write!(f, "Pin error: {e:?}"),
            InterfaceError::Timeout => write!(f, "BUSY did not clear in time"),
        }
    }
}

impl<SpiErr: Debug, PinErr: Debug> core::error::Error for InterfaceError<SpiErr, PinErr> {}

/// [`DisplayInterface`] over an embedded-hal [`SpiDevice`] and three pins
///
/// DC, RST and BUSY must share one pin error type.
pub struct Interface<SPI, DC, RST, BUSY> {
    spi: SPI,
    dc: DC,
    rst: RST,
    busy: BUSY,
    /// Upper bound for [`DisplayInterface::busy_wait`]
    busy_timeout_ms: u32,
}

impl<SPI, DC, RST, BUSY> Interface<SPI, DC, RST, BUSY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
{
    /// Busy waits are bounded by [`DEFAULT_BUSY_TIMEOUT_MS`] until overridden
    pub fn new(spi: SPI, dc: DC, rst: RST, busy: BUSY) -> Self {
        Self {
            spi,
            dc,
            rst,
            busy,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    /// Override the busy-wait bound
    pub fn with_busy_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.busy_timeout_ms = timeout_ms;
        self
    }
}

impl<SPI, DC, RST, BUSY, PinErr> DisplayInterface for Interface<SPI, DC, RST, BUSY>
where
    SPI: SpiDevice,
    SPI::Error: Debug,
    DC: OutputPin<Error = PinErr>,
    RST: OutputPin<Error = PinErr>,
    BUSY: InputPin<Error = PinErr>,
    PinErr: Debug,
{
    type Error = InterfaceError<SPI::Error, PinErr>;

    fn send_command(&mut self, command: u8) -> Result<(), Self::Error> {
        self.dc.set_low().map_err(InterfaceError::Pin)?;
        self.spi.write(&[command]).map_err(InterfaceError::Spi)?;
        Ok(())
    }

    fn send_data(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.dc.set_high().map_err(InterfaceError::Pin)?;
        self.spi.write(data).map_err(InterfaceError::Spi)?;
        Ok(())
    }

    fn reset<D: DelayNs>(&mut self, delay: &mut D) {
        // Reset sequence: LOW -> wait 10ms -> HIGH -> wait 10ms
        let _ = self.rst.set_low();
        delay.delay_ms(10);
        let _ = self.rst.set_high();
        delay.delay_ms(10);
    }

    fn is_busy(&mut self) -> Result<bool, Self::Error> {
        self.busy.is_high().map_err(InterfaceError::Pin)
    }

    fn busy_wait<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error> {
        let mut waited_ms = 0u32;

        loop {
            match self.busy.is_high() {
                Ok(true) => {
                    if waited_ms >= self.busy_timeout_ms {
                        log::warn!("EPD: busy line still high after {} ms", waited_ms);
                        return Err(InterfaceError::Timeout);
                    }
                    delay.delay_ms(1);
                    waited_ms += 1;
                }
                Ok(false) => return Ok(()),
                Err(e) => return Err(InterfaceError::Pin(e)),
            }
        }
    }
}
