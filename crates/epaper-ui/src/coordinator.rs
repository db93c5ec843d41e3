//! Flush coordinator: strip in, panel refresh out.
//!
//! Per strip: bridge the bits into panel layout, ask the refresh policy for
//! the mode, stage the window in the driver mirror, start the refresh and
//! wait for BUSY with a bounded poll. A timed-out refresh is reported but
//! never retried.

use embedded_hal::delay::DelayNs;

use crate::bridge::PixelBridge;
use crate::clock::Clock;
use crate::config::Config;
use crate::eink::{DisplayInterface, EinkDisplay, RefreshMode, Region};
use crate::error::Error;
use crate::framebuffer::FramebufferRegion;
use crate::policy::RefreshPolicy;
use crate::screen::{FlushDone, FlushTarget};

/// Sequences bridge, policy and driver for every flush
pub struct FlushCoordinator<I, D, C>
where
    I: DisplayInterface,
{
    display: EinkDisplay<I>,
    bridge: PixelBridge,
    policy: RefreshPolicy,
    delay: D,
    clock: C,
    busy_timeout_ms: u32,
    busy_poll_ms: u32,
    power_off_after_flush: bool,
    full_refresh_after_idle_ms: Option<u64>,
    last_flush_ms: Option<u64>,
    hardware_faults: u32,
}

impl<I, D, C> FlushCoordinator<I, D, C>
where
    I: DisplayInterface,
    D: DelayNs,
    C: Clock,
{
    /// Wrap an initialized driver
    pub fn new(display: EinkDisplay<I>, config: &Config, delay: D, clock: C) -> Self {
        Self {
            display,
            bridge: PixelBridge::new(config.polarity),
            policy: RefreshPolicy::new(config.max_partial_updates),
            delay,
            clock,
            busy_timeout_ms: config.busy_timeout_ms,
            busy_poll_ms: config.busy_poll_ms,
            power_off_after_flush: config.power_off_after_flush,
            full_refresh_after_idle_ms: config.full_refresh_after_idle_ms,
            last_flush_ms: None,
            hardware_faults: 0,
        }
    }

    /// Push one strip to the panel
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfBoundsRegion`] / [`Error::SourceTooSmall`] before
    ///   anything is written or counted
    /// - [`Error::HardwareTimeout`] if BUSY outlasts the configured bound
    /// - [`Error::Driver`] on interface failures
    pub fn flush_region(&mut self, region: &FramebufferRegion<'_>) -> Result<RefreshMode, Error<I>> {
        let dims = *self.display.dimensions();
        let window = self.bridge.pack(region, &dims, self.display.buffer())?;

        if self.idle_expired() {
            log::info!("UI: panel idle, forcing full refresh");
            self.policy.force_full_refresh();
        }
        let mode = self.policy.next_mode();
        log::debug!(
            "UI: flush x={} y={} w={} h={} -> {:?}",
            region.area.top_left.x,
            region.area.top_left.y,
            region.area.size.width,
            region.area.size.height,
            mode
        );

        let result = self.submit(window, mode);
        self.last_flush_ms = Some(self.clock.now_ms());
        result.map(|()| mode)
    }

    fn submit(&mut self, window: Region, mode: RefreshMode) -> Result<(), Error<I>> {
        self.display.stage(window, self.bridge.bytes())?;
        let turn_off = self.power_off_after_flush;
        match mode {
            RefreshMode::Partial => {
                self.display.begin_partial_update(window, turn_off)?;
                self.wait_for_panel()?;
                self.display.sync_previous(window)?;
            }
            RefreshMode::Full => {
                self.display.begin_full_update(turn_off)?;
                self.wait_for_panel()?;
            }
        }
        Ok(())
    }

    /// Full refresh of the current image right now, outside the cadence
    ///
    /// The partial counter is reset even if the wait times out.
    pub fn refresh_now(&mut self) -> Result<(), Error<I>> {
        log::info!(
            "UI: full refresh on demand after {} partials",
            self.policy.partial_count()
        );
        self.display.begin_full_update(self.power_off_after_flush)?;
        self.policy.note_full_refresh();
        let result = self.wait_for_panel();
        self.last_flush_ms = Some(self.clock.now_ms());
        result
    }

    /// Make the next flush a full refresh
    pub fn force_full_refresh(&mut self) {
        log::info!("UI: full refresh scheduled");
        self.policy.force_full_refresh();
    }

    /// Switch the panel's analog rails off
    ///
    /// A stuck BUSY during power-down counts as a hardware fault like any
    /// other refresh wait.
    pub fn power_off(&mut self) -> Result<(), Error<I>> {
        if !self.display.begin_power_off()? {
            return Ok(());
        }
        log::debug!("EPD: powering down");
        self.wait_for_panel()
    }

    fn idle_expired(&self) -> bool {
        match (self.full_refresh_after_idle_ms, self.last_flush_ms) {
            (Some(limit), Some(last)) => self.clock.now_ms().saturating_sub(last) > limit,
            _ => false,
        }
    }

    /// Poll BUSY until it clears or the timeout passes
    ///
    /// Bounded by both the clock and the number of polls, so a stalled clock
    /// cannot hang the loop.
    fn wait_for_panel(&mut self) -> Result<(), Error<I>> {
        let start = self.clock.now_ms();
        let timeout = u64::from(self.busy_timeout_ms);
        let mut polled_ms: u64 = 0;
        loop {
            if !self.display.is_busy()? {
                return Ok(());
            }
            let waited = self.clock.now_ms().saturating_sub(start).max(polled_ms);
            if waited >= timeout {
                self.hardware_faults += 1;
                log::warn!("EPD: BUSY still high after {} ms, giving up", waited);
                return Err(Error::HardwareTimeout { waited_ms: waited });
            }
            self.delay.delay_ms(self.busy_poll_ms);
            polled_ms += u64::from(self.busy_poll_ms);
        }
    }

    /// Partial refreshes since the last full one
    pub fn partial_count(&self) -> u32 {
        self.policy.partial_count()
    }

    /// Flushes or refreshes that ended in a busy timeout
    pub fn hardware_faults(&self) -> u32 {
        self.hardware_faults
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut RefreshPolicy {
        &mut self.policy
    }

    pub fn display(&self) -> &EinkDisplay<I> {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut EinkDisplay<I> {
        &mut self.display
    }
}

impl<I, D, C> FlushTarget for FlushCoordinator<I, D, C>
where
    I: DisplayInterface,
    D: DelayNs,
    C: Clock,
{
    type Error = Error<I>;

    fn flush(
        &mut self,
        region: &FramebufferRegion<'_>,
        done: &mut FlushDone,
    ) -> Result<RefreshMode, Self::Error> {
        let result = self.flush_region(region);
        done.release();
        result
    }

    fn is_recoverable(error: &Self::Error) -> bool {
        error.is_recoverable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssd1681::command::WRITE_RAM_RED;
    use crate::mock_panel::{MockPanel, SimTime};
    use alloc::vec;
    use embedded_graphics::prelude::*;
    use embedded_graphics::primitives::Rectangle;

    type TestCoordinator = FlushCoordinator<MockPanel, SimTime, SimTime>;

    fn setup(config: &Config, panel: &MockPanel, time: &SimTime) -> TestCoordinator {
        let driver_config = config.driver_config().unwrap();
        let mut display = EinkDisplay::new(panel.clone(), driver_config, vec![0xFF; 5000]).unwrap();
        display.reset(&mut time.clone()).unwrap();
        panel.clear_log();
        FlushCoordinator::new(display, config, time.clone(), time.clone())
    }

    fn rect(x: i32, y: i32, w: u32, h: u32) -> Rectangle {
        Rectangle::new(Point::new(x, y), Size::new(w, h))
    }

    #[test]
    fn out_of_bounds_region_is_not_counted() {
        let config = Config::builder().build().unwrap();
        let panel = MockPanel::new(200, 200);
        let time = SimTime::new();
        let mut coordinator = setup(&config, &panel, &time);

        let data = [0u8; 10];
        let region = FramebufferRegion::new(rect(195, 0, 10, 5), &data);
        let mut done = FlushDone::new();
        let result = coordinator.flush(&region, &mut done);

        assert!(matches!(result, Err(Error::OutOfBoundsRegion { .. })));
        assert!(done.is_released());
        assert_eq!(coordinator.partial_count(), 0);
        assert!(panel.state().commands.is_empty());
    }

    #[test]
    fn partial_flush_resyncs_previous_image() {
        let config = Config::builder().build().unwrap();
        let panel = MockPanel::new(200, 200);
        let time = SimTime::new();
        let mut coordinator = setup(&config, &panel, &time);

        let data = [0xFF; 2];
        let region = FramebufferRegion::new(rect(8, 0, 8, 2), &data);
        let mode = coordinator.flush_region(&region).unwrap();

        assert_eq!(mode, RefreshMode::Partial);
        let state = panel.state();
        assert_eq!(state.bw_ram[1], 0x00);
        assert_eq!(state.red_ram[1], 0x00);
        assert_eq!(state.red_ram[25 + 1], 0x00);
        assert_eq!(state.commands.last(), Some(&WRITE_RAM_RED));
    }

    #[test]
    fn power_off_bits_follow_config() {
        let panel = MockPanel::new(200, 200);
        let time = SimTime::new();
        let data = [0u8; 1];
        let region = FramebufferRegion::new(rect(0, 0, 8, 1), &data);

        let config = Config::builder().build().unwrap();
        let mut coordinator = setup(&config, &panel, &time);
        coordinator.flush_region(&region).unwrap();
        assert_eq!(panel.state().activations, vec![0xC0 | 0x3C | 0x03]);

        let config = Config::builder().power_off_after_flush(false).build().unwrap();
        let mut coordinator = setup(&config, &panel, &time);
        coordinator.flush_region(&region).unwrap();
        coordinator.flush_region(&region).unwrap();
        assert_eq!(panel.state().activations, vec![0xC0 | 0x3C, 0x3C]);
    }

    #[test]
    fn idle_period_forces_full_refresh() {
        let config = Config::builder()
            .full_refresh_after_idle_ms(Some(60_000))
            .build()
            .unwrap();
        let panel = MockPanel::new(200, 200);
        let time = SimTime::new();
        let mut coordinator = setup(&config, &panel, &time);
        let data = [0u8; 1];
        let region = FramebufferRegion::new(rect(0, 0, 8, 1), &data);

        assert_eq!(coordinator.flush_region(&region).unwrap(), RefreshMode::Partial);
        time.advance_ms(30_000);
        assert_eq!(coordinator.flush_region(&region).unwrap(), RefreshMode::Partial);
        time.advance_ms(60_001);
        assert_eq!(coordinator.flush_region(&region).unwrap(), RefreshMode::Full);
        assert_eq!(coordinator.partial_count(), 0);
    }

    #[test]
    fn busy_wait_polls_until_clear() {
        let config = Config::builder().busy_poll_ms(5).build().unwrap();
        let panel = MockPanel::new(200, 200).with_busy_polls(4);
        let time = SimTime::new();
        let mut coordinator = setup(&config, &panel, &time);
        let start = time.now_ms();
        let data = [0u8; 1];
        let region = FramebufferRegion::new(rect(0, 0, 8, 1), &data);

        coordinator.flush_region(&region).unwrap();
        assert_eq!(time.now_ms() - start, 20);
        assert_eq!(coordinator.hardware_faults(), 0);
    }

    #[test]
    fn refresh_now_resets_counter() {
        let config = Config::builder().build().unwrap();
        let panel = MockPanel::new(200, 200);
        let time = SimTime::new();
        let mut coordinator = setup(&config, &panel, &time);
        let data = [0u8; 1];
        let region = FramebufferRegion::new(rect(0, 0, 8, 1), &data);
        for _ in 0..3 {
            coordinator.flush_region(&region).unwrap();
        }
        panel.clear_log();

        coordinator.refresh_now().unwrap();
        assert_eq!(coordinator.partial_count(), 0);
        // Previous flush powered down, so the rails come back up first
        assert_eq!(panel.state().activations, vec![0xC0 | 0x34 | 0x03]);
        assert_eq!(panel.state().full_refreshes(), 1);
    }

    #[test]
    fn power_off_timeout_is_a_hardware_fault() {
        let config = Config::builder()
            .power_off_after_flush(false)
            .busy_timeout_ms(200)
            .busy_poll_ms(10)
            .build()
            .unwrap();
        let panel = MockPanel::new(200, 200);
        let time = SimTime::new();
        let mut coordinator = setup(&config, &panel, &time);
        coordinator.refresh_now().unwrap();

        panel.set_stuck_busy(true);
        let start = time.now_ms();
        let result = coordinator.power_off();

        assert!(matches!(result, Err(Error::HardwareTimeout { waited_ms: 200 })));
        assert!(result.unwrap_err().is_recoverable());
        assert_eq!(coordinator.hardware_faults(), 1);
        assert_eq!(time.now_ms() - start, 200);
        assert!(!coordinator.display().is_powered());

        // Rails are already recorded as off, so a second call is a no-op
        assert!(coordinator.power_off().is_ok());
        assert_eq!(coordinator.hardware_faults(), 1);
    }
}
