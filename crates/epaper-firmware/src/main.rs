use std::sync::Arc;
use std::time::Duration;

use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::Text;
use esp_idf_svc::hal::{
    delay::FreeRtos,
    gpio::{AnyIOPin, PinDriver},
    peripherals::Peripherals,
    spi::{config::Config as SpiConfig, SpiDeviceDriver, SpiDriver, SpiDriverConfig},
    units::Hertz,
};
use esp_idf_svc::sys::EspError;
use esp_idf_svc::systime::EspSystemTime;

use epaper_ui::eink::EinkInterface;
use epaper_ui::{Clock, Config, EinkSubsystem, FullRefreshRequest, StripCanvas};

const SPI_BAUDRATE_HZ: u32 = 4_000_000;
const UPDATE_INTERVAL_MS: u32 = 2_000;
/// Ask for a full refresh this often even while the screen keeps changing
const FULL_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

const UPTIME_AREA: Rectangle = Rectangle::new(Point::new(10, 60), Size::new(180, 24));
const BAR_AREA: Rectangle = Rectangle::new(Point::new(10, 120), Size::new(180, 20));

/// Milliseconds since boot from the ESP-IDF system timer
struct UptimeClock;

impl Clock for UptimeClock {
    fn now_ms(&self) -> u64 {
        EspSystemTime.now().as_millis() as u64
    }
}

/// Values shown by the demo screen
struct DemoState {
    uptime_secs: u64,
    progress: u32,
}

fn draw_scene(canvas: &mut StripCanvas<'_>, state: &DemoState) -> Result<(), core::convert::Infallible> {
    let title = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
    let small = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

    Text::new("E-Paper", Point::new(10, 30), title).draw(canvas)?;

    let uptime = format!(
        "{:02}:{:02}:{:02}",
        state.uptime_secs / 3600,
        state.uptime_secs / 60 % 60,
        state.uptime_secs % 60
    );
    Text::new("uptime", UPTIME_AREA.top_left + Point::new(0, 8), small).draw(canvas)?;
    Text::new(&uptime, UPTIME_AREA.top_left + Point::new(60, 18), title).draw(canvas)?;

    BAR_AREA
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 2))
        .draw(canvas)?;
    let filled = (BAR_AREA.size.width - 8) * state.progress / 100;
    Rectangle::new(BAR_AREA.top_left + Point::new(4, 4), Size::new(filled, BAR_AREA.size.height - 8))
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(canvas)?;

    Text::new("SSD1681 200x200", Point::new(10, 185), small).draw(canvas)?;
    Ok(())
}

fn main() -> Result<(), EspError> {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let config = match Config::builder()
        .busy_poll_ms(5)
        .full_refresh_after_idle_ms(Some(10 * 60 * 1000))
        .build()
    {
        Ok(config) => config,
        Err(err) => {
            log::error!("Invalid display configuration: {}", err);
            return Ok(());
        }
    };
    let pins = config.pins;
    log::info!(
        "Panel pins: CS={} DC={} RST={} BUSY={} SCK={} MOSI={}",
        pins.cs,
        pins.dc,
        pins.rst,
        pins.busy,
        pins.sck,
        pins.mosi
    );

    let peripherals = Peripherals::take()?;

    // SAFETY: each GPIO number is claimed exactly once, here
    let (sck, mosi, cs, dc, rst, busy) = unsafe {
        (
            AnyIOPin::new(i32::from(pins.sck)),
            AnyIOPin::new(i32::from(pins.mosi)),
            AnyIOPin::new(i32::from(pins.cs)),
            AnyIOPin::new(i32::from(pins.dc)),
            AnyIOPin::new(i32::from(pins.rst)),
            AnyIOPin::new(i32::from(pins.busy)),
        )
    };

    let spi = SpiDriver::new(
        peripherals.spi2,
        sck,
        mosi,
        None::<AnyIOPin>,
        &SpiDriverConfig::default(),
    )?;
    let spi_config = SpiConfig::default()
        .baudrate(Hertz(SPI_BAUDRATE_HZ))
        .data_mode(embedded_hal::spi::MODE_0);
    let spi_device = SpiDeviceDriver::new(&spi, Some(cs), &spi_config)?;

    let dc = PinDriver::output(dc)?;
    let rst = PinDriver::output(rst)?;
    let busy = PinDriver::input(busy)?;

    let interface = EinkInterface::new(spi_device, dc, rst, busy)
        .with_busy_timeout_ms(config.busy_timeout_ms);
    let mut eink = match EinkSubsystem::init(config, interface, FreeRtos, UptimeClock) {
        Ok(eink) => eink,
        Err(err) => {
            log::error!("Display init failed: {}", err);
            return Ok(());
        }
    };

    let full_refresh: Arc<FullRefreshRequest> = eink.full_refresh_request();
    let mut last_full_request = EspSystemTime.now();
    let mut state = DemoState {
        uptime_secs: 0,
        progress: 0,
    };

    log::info!("Starting update loop");
    loop {
        let now = EspSystemTime.now();
        state.uptime_secs = now.as_secs();
        state.progress = (state.progress + 5) % 105;

        if now - last_full_request >= FULL_REFRESH_INTERVAL {
            full_refresh.request();
            last_full_request = now;
        }

        eink.display().invalidate(UPTIME_AREA);
        eink.display().invalidate(BAR_AREA);
        match eink.render(|canvas| draw_scene(canvas, &state)) {
            Ok(summary) => log::info!(
                "Rendered {} flushes ({} full, {} timed out), {} partials since full refresh",
                summary.flushes,
                summary.full_refreshes,
                summary.hardware_faults,
                eink.partial_count()
            ),
            Err(err) => log::error!("Render failed: {}", err),
        }

        FreeRtos::delay_ms(UPDATE_INTERVAL_MS);
    }
}
