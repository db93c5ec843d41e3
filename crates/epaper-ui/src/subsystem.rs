//! Public entry point: one handle owning the screen and the panel.

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec;
use core::convert::Infallible;

use embedded_graphics::geometry::Size;
use embedded_hal::delay::DelayNs;

use crate::clock::Clock;
use crate::config::Config;
use crate::coordinator::FlushCoordinator;
use crate::eink::{DisplayInterface, EinkDisplay};
use crate::error::{Error, RenderError};
use crate::policy::FullRefreshRequest;
use crate::screen::{RenderSummary, Screen, StripCanvas};

/// E-paper subsystem handle returned by [`EinkSubsystem::init`]
pub struct EinkSubsystem<I, D, C>
where
    I: DisplayInterface,
{
    screen: Screen,
    coordinator: FlushCoordinator<I, D, C>,
}

impl<I, D, C> EinkSubsystem<I, D, C>
where
    I: DisplayInterface,
    D: DelayNs,
    C: Clock,
{
    /// Reset and clear the panel, then prepare the first full redraw
    ///
    /// The first flush after init is always a full refresh.
    ///
    /// # Errors
    ///
    /// [`Error::InitializationFailure`] if the driver cannot be brought up,
    /// [`Error::Config`] if the panel geometry is rejected.
    pub fn init(config: Config, interface: I, mut delay: D, clock: C) -> Result<Self, Error<I>> {
        log::info!(
            "UI: e-paper {}x{}, {} partial refreshes between full ones",
            config.dimensions.cols,
            config.dimensions.rows,
            config.max_partial_updates
        );

        let driver_config = config.driver_config()?;
        let mirror = vec![0xFF; config.dimensions.buffer_size()];
        let mut display = EinkDisplay::new(interface, driver_config, mirror)
            .map_err(Error::InitializationFailure)?;
        display.reset(&mut delay).map_err(|e| {
            log::error!("EPD: init failed: {}", e);
            Error::InitializationFailure(e)
        })?;

        let mut screen = Screen::new(
            Size::new(
                u32::from(config.dimensions.cols),
                u32::from(config.dimensions.rows),
            ),
            config.buffer_lines,
        );
        screen.invalidate_all();

        let mut coordinator = FlushCoordinator::new(display, &config, delay, clock);
        coordinator.policy_mut().force_full_refresh();

        log::info!("EPD: ready");
        Ok(Self {
            screen,
            coordinator,
        })
    }

    /// Screen handle for invalidating areas
    pub fn display(&mut self) -> &mut Screen {
        &mut self.screen
    }

    /// Redraw everything invalidated since the last render
    ///
    /// Busy timeouts are counted in the summary and do not stop the pass.
    pub fn render<S>(&mut self, scene: S) -> Result<RenderSummary, RenderError<Error<I>>>
    where
        S: FnMut(&mut StripCanvas<'_>) -> Result<(), Infallible>,
    {
        self.screen.render(scene, &mut self.coordinator)
    }

    /// Make the next flush a full refresh
    pub fn force_full_refresh(&mut self) {
        self.coordinator.force_full_refresh();
    }

    /// Flag that timers or interrupt handlers can set to request a full refresh
    pub fn full_refresh_request(&self) -> Arc<FullRefreshRequest> {
        self.coordinator.policy().request_handle()
    }

    /// Full refresh of the current image, blocking
    pub fn refresh_now(&mut self) -> Result<(), Error<I>> {
        self.coordinator.refresh_now()
    }

    /// Power the panel down; the next flush powers it back up
    pub fn power_off(&mut self) -> Result<(), Error<I>> {
        self.coordinator.power_off()
    }

    pub fn partial_count(&self) -> u32 {
        self.coordinator.partial_count()
    }

    pub fn hardware_faults(&self) -> u32 {
        self.coordinator.hardware_faults()
    }

    pub fn coordinator(&self) -> &FlushCoordinator<I, D, C> {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut FlushCoordinator<I, D, C> {
        &mut self.coordinator
    }
}
