use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use epaper_ui::mock_panel::{MockPanel, SimTime};
use epaper_ui::{Config, EinkSubsystem, RenderSummary, StripCanvas};

type Subsystem = EinkSubsystem<MockPanel, SimTime, SimTime>;

fn setup(max_partial_updates: u32) -> (Subsystem, MockPanel) {
    let panel = MockPanel::new(200, 200);
    let time = SimTime::new();
    let config = Config::builder()
        .max_partial_updates(max_partial_updates)
        .build()
        .unwrap();
    let mut eink = EinkSubsystem::init(config, panel.clone(), time.clone(), time).unwrap();

    // Power-on baseline, then start counting from zero
    eink.render(scene).unwrap();
    eink.refresh_now().unwrap();
    assert_eq!(eink.partial_count(), 0);
    panel.clear_log();
    (eink, panel)
}

fn scene(canvas: &mut StripCanvas<'_>) -> Result<(), Infallible> {
    Rectangle::new(Point::new(10, 10), Size::new(20, 4))
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(canvas)
}

fn widget(index: i32) -> Rectangle {
    Rectangle::new(Point::new(8 + index * 100, 40), Size::new(16, 8))
}

fn cycle(eink: &mut Subsystem, widgets: i32) -> RenderSummary {
    for index in 0..widgets {
        eink.display().invalidate(widget(index));
    }
    eink.render(scene).unwrap()
}

#[test]
fn fifty_partials_then_full_then_partial() {
    let (mut eink, panel) = setup(50);

    let summaries: Vec<_> = (0..52).map(|_| cycle(&mut eink, 1)).collect();

    assert!(summaries.iter().all(|s| s.flushes == 1));
    assert!(summaries[..50].iter().all(|s| s.full_refreshes == 0));
    assert_eq!(summaries[50].full_refreshes, 1);
    assert_eq!(summaries[51].full_refreshes, 0);
    assert_eq!(eink.partial_count(), 1);

    let state = panel.state();
    assert_eq!(state.partial_refreshes(), 51);
    assert_eq!(state.full_refreshes(), 1);
}

#[test]
fn two_widgets_spend_the_budget_twice_as_fast() {
    let (mut eink, _panel) = setup(50);

    for _ in 0..25 {
        let summary = cycle(&mut eink, 2);
        assert_eq!(summary.flushes, 2);
        assert_eq!(summary.full_refreshes, 0);
    }
    assert_eq!(eink.partial_count(), 50);

    let summary = cycle(&mut eink, 2);
    assert_eq!(summary.full_refreshes, 1);
    assert_eq!(eink.partial_count(), 1);
}

#[test]
fn full_refresh_period_is_budget_plus_one() {
    for max in [0u32, 2, 5] {
        let (mut eink, panel) = setup(max);
        let flushes = 23u32;
        let fulls: u32 = (0..flushes).map(|_| cycle(&mut eink, 1).full_refreshes).sum();
        assert_eq!(fulls, flushes / (max + 1), "max={max}");
        assert_eq!(panel.state().full_refreshes(), fulls as usize);
    }
}

#[test]
fn forced_refresh_wins_over_counter() {
    let (mut eink, _panel) = setup(50);
    for _ in 0..3 {
        cycle(&mut eink, 1);
    }

    eink.force_full_refresh();
    assert_eq!(eink.partial_count(), 0);
    assert_eq!(cycle(&mut eink, 1).full_refreshes, 1);
    assert_eq!(cycle(&mut eink, 1).full_refreshes, 0);
    assert_eq!(eink.partial_count(), 1);
}

#[test]
fn interrupt_request_is_served_by_next_flush() {
    let (mut eink, _panel) = setup(50);
    let request = eink.full_refresh_request();
    cycle(&mut eink, 1);

    request.request();
    assert_eq!(cycle(&mut eink, 1).full_refreshes, 1);
    assert!(!request.is_pending());
    assert_eq!(cycle(&mut eink, 1).full_refreshes, 0);
}

#[test]
fn refresh_now_is_synchronous_and_resets_counter() {
    let (mut eink, panel) = setup(50);
    for _ in 0..7 {
        cycle(&mut eink, 1);
    }
    panel.clear_log();

    eink.refresh_now().unwrap();
    assert_eq!(eink.partial_count(), 0);
    assert_eq!(panel.state().full_refreshes(), 1);
    assert!(!eink.display().is_dirty());
}
