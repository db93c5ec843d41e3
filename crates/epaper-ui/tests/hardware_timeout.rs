use core::convert::Infallible;

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use epaper_ui::mock_panel::{MockPanel, SimTime};
use epaper_ui::{
    Clock, Config, EinkSubsystem, Error, FlushDone, FlushTarget, FramebufferRegion, RefreshMode,
    StripCanvas,
};

fn blank(_: &mut StripCanvas<'_>) -> Result<(), Infallible> {
    Ok(())
}

fn setup(timeout_ms: u32) -> (EinkSubsystem<MockPanel, SimTime, SimTime>, MockPanel, SimTime) {
    let panel = MockPanel::new(200, 200);
    let time = SimTime::new();
    let config = Config::builder()
        .busy_timeout_ms(timeout_ms)
        .busy_poll_ms(10)
        .build()
        .unwrap();
    let mut eink = EinkSubsystem::init(config, panel.clone(), time.clone(), time.clone()).unwrap();
    eink.render(blank).unwrap();
    (eink, panel, time)
}

#[test]
fn stuck_busy_reports_one_timeout_per_flush() {
    let (mut eink, panel, time) = setup(500);
    panel.set_stuck_busy(true);

    eink.display()
        .invalidate(Rectangle::new(Point::new(0, 0), Size::new(8, 8)));
    eink.display()
        .invalidate(Rectangle::new(Point::new(100, 100), Size::new(8, 8)));
    let start = time.now_ms();
    let summary = eink.render(blank).unwrap();

    assert_eq!(summary.flushes, 2);
    assert_eq!(summary.hardware_faults, 2);
    assert_eq!(eink.hardware_faults(), 2);
    assert!(!eink.display().is_dirty());
    let waited = time.now_ms() - start;
    assert!((1_000..1_100).contains(&waited), "waited {waited} ms");
}

#[test]
fn timeout_still_releases_buffer_and_counts_flush() {
    let (mut eink, panel, _time) = setup(200);
    let before = eink.partial_count();
    panel.set_stuck_busy(true);

    let data = [0xFF; 1];
    let region = FramebufferRegion::new(Rectangle::new(Point::new(16, 16), Size::new(8, 1)), &data);
    let mut done = FlushDone::new();
    let result = eink.coordinator_mut().flush(&region, &mut done);

    match result {
        Err(Error::HardwareTimeout { waited_ms }) => assert!(waited_ms >= 200),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(done.is_released());
    assert_eq!(eink.partial_count(), before + 1);
    // Nothing is retried after giving up
    assert_eq!(panel.state().activations.len(), 21);
}

#[test]
fn panel_recovers_after_busy_clears() {
    let (mut eink, panel, _time) = setup(200);
    panel.set_stuck_busy(true);
    eink.display()
        .invalidate(Rectangle::new(Point::new(0, 0), Size::new(8, 8)));
    assert_eq!(eink.render(blank).unwrap().hardware_faults, 1);

    panel.set_stuck_busy(false);
    eink.display()
        .invalidate(Rectangle::new(Point::new(0, 0), Size::new(8, 8)));
    let summary = eink.render(blank).unwrap();
    assert_eq!(summary.hardware_faults, 0);
    assert_eq!(summary.flushes, 1);
    assert_eq!(eink.hardware_faults(), 1);
}

#[test]
fn refresh_now_timeout_still_resets_counter() {
    let (mut eink, panel, _time) = setup(200);
    assert!(eink.partial_count() > 0);
    panel.set_stuck_busy(true);

    assert!(matches!(
        eink.refresh_now(),
        Err(Error::HardwareTimeout { .. })
    ));
    assert_eq!(eink.partial_count(), 0);
    assert!(eink.refresh_now().unwrap_err().is_recoverable());
}

#[test]
fn forced_full_is_consumed_even_when_it_times_out() {
    let (mut eink, panel, _time) = setup(200);
    panel.set_stuck_busy(true);
    eink.force_full_refresh();

    let data = [0u8; 1];
    let region = FramebufferRegion::new(Rectangle::new(Point::new(0, 0), Size::new(8, 1)), &data);
    let mut done = FlushDone::new();
    assert!(eink.coordinator_mut().flush(&region, &mut done).is_err());

    panel.set_stuck_busy(false);
    let mut done = FlushDone::new();
    assert_eq!(
        eink.coordinator_mut().flush(&region, &mut done).unwrap(),
        RefreshMode::Partial
    );
}
