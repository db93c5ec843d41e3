use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle, Rectangle, Triangle};
use epaper_ui::mock_panel::{MockPanel, SimTime};
use epaper_ui::{Config, EinkSubsystem, Polarity};

const SIZE: u32 = 200;

/// Whole-screen reference drawn with the same primitives
struct Reference {
    pixels: Vec<BinaryColor>,
}

impl Reference {
    fn new() -> Self {
        Self {
            pixels: vec![BinaryColor::Off; (SIZE * SIZE) as usize],
        }
    }

    fn is_on(&self, x: u32, y: u32) -> bool {
        self.pixels[(y * SIZE + x) as usize].is_on()
    }
}

impl OriginDimensions for Reference {
    fn size(&self) -> Size {
        Size::new(SIZE, SIZE)
    }
}

impl DrawTarget for Reference {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 && (point.x as u32) < SIZE && (point.y as u32) < SIZE {
                self.pixels[(point.y as u32 * SIZE + point.x as u32) as usize] = color;
            }
        }
        Ok(())
    }
}

fn first_scene<D: DrawTarget<Color = BinaryColor>>(target: &mut D) -> Result<(), D::Error> {
    Rectangle::new(Point::new(13, 7), Size::new(30, 11))
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(target)?;
    Circle::new(Point::new(101, 57), 37)
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 3))
        .draw(target)?;
    Line::new(Point::new(0, 199), Point::new(199, 120))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(target)
}

fn second_scene<D: DrawTarget<Color = BinaryColor>>(target: &mut D) -> Result<(), D::Error> {
    Triangle::new(Point::new(5, 5), Point::new(60, 20), Point::new(20, 70))
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(target)?;
    Rectangle::new(Point::new(150, 150), Size::new(50, 50))
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(target)
}

fn panel_white(ram: &[u8], x: u32, y: u32) -> bool {
    ram[(y * SIZE / 8 + x / 8) as usize] & (0x80 >> (x % 8)) != 0
}

#[test]
fn whole_screen_matches_reference() {
    let panel = MockPanel::new(200, 200);
    let time = SimTime::new();
    let config = Config::builder().build().unwrap();
    let mut eink = EinkSubsystem::init(config, panel.clone(), time.clone(), time).unwrap();

    eink.render(|canvas| first_scene(canvas)).unwrap();

    let mut reference = Reference::new();
    first_scene(&mut reference).unwrap();

    let mirror = eink.coordinator().display().buffer();
    let state = panel.state();
    for y in 0..SIZE {
        for x in 0..SIZE {
            let ink = reference.is_on(x, y);
            assert_eq!(panel_white(mirror, x, y), !ink, "mirror at ({x}, {y})");
            assert_eq!(panel_white(&state.bw_ram, x, y), !ink, "panel at ({x}, {y})");
        }
    }
}

#[test]
fn unaligned_area_leaves_surroundings_untouched() {
    let panel = MockPanel::new(200, 200);
    let time = SimTime::new();
    let config = Config::builder().build().unwrap();
    let mut eink = EinkSubsystem::init(config, panel.clone(), time.clone(), time).unwrap();
    eink.render(|canvas| first_scene(canvas)).unwrap();

    let dirty = Rectangle::new(Point::new(11, 3), Size::new(37, 29));
    eink.display().invalidate(dirty);
    let summary = eink.render(|canvas| second_scene(canvas)).unwrap();
    assert_eq!(summary.flushes, 3);

    let mut before = Reference::new();
    first_scene(&mut before).unwrap();
    let mut after = Reference::new();
    second_scene(&mut after).unwrap();

    let mirror = eink.coordinator().display().buffer();
    let state = panel.state();
    for y in 0..SIZE {
        for x in 0..SIZE {
            let inside = dirty.contains(Point::new(x as i32, y as i32));
            let ink = if inside {
                after.is_on(x, y)
            } else {
                before.is_on(x, y)
            };
            assert_eq!(panel_white(mirror, x, y), !ink, "mirror at ({x}, {y})");
            assert_eq!(panel_white(&state.bw_ram, x, y), !ink, "panel at ({x}, {y})");
        }
    }
    // Partial refreshes keep the previous-image plane in step
    assert_eq!(state.red_ram, state.bw_ram);
}

#[test]
fn ink_is_one_polarity_stores_ink_as_set_bits() {
    let panel = MockPanel::new(200, 200);
    let time = SimTime::new();
    let config = Config::builder()
        .polarity(Polarity::InkIsOne)
        .build()
        .unwrap();
    let mut eink = EinkSubsystem::init(config, panel.clone(), time.clone(), time).unwrap();
    eink.render(|canvas| first_scene(canvas)).unwrap();

    let mut reference = Reference::new();
    first_scene(&mut reference).unwrap();
    let mirror = eink.coordinator().display().buffer();
    for y in 0..SIZE {
        for x in 0..SIZE {
            assert_eq!(panel_white(mirror, x, y), reference.is_on(x, y));
        }
    }
}
