//! # Tuning Dial
//!
//! Canvas widget that draws the cents dial: colored zone arcs, the tick
//! scale and a needle. All geometry comes from `tuner_core::gauge`.

use iced::alignment::Horizontal;
use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{mouse, Color, Element, Pixels, Point, Rectangle, Renderer, Theme};
use tuner_core::gauge::{self, ColorZone};

/// Angular step, in degrees, between polyline points of an arc.
const ARC_STEP_DEG: f32 = 2.0;

pub fn zone_color(zone: ColorZone) -> Color {
    match zone {
        ColorZone::Green => Color::from_rgb8(0x34, 0xDB, 0x98),
        ColorZone::Yellow => Color::from_rgb8(0xFF, 0xC3, 0x00),
        ColorZone::Red => Color::from_rgb8(0xFF, 0x33, 0x33),
    }
}

/// Dial showing how far the current pitch is from its note.
pub struct Gauge {
    /// Current cents offset (None if no pitch detected)
    cents: Option<f32>,
}

impl Gauge {
    pub fn new(cents: Option<f32>) -> Self {
        Self { cents }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fixed(240.0)),
        )
        .into()
    }
}

fn point(cx: f32, cy: f32, radius: f32, angle: f32) -> Point {
    let (x, y) = gauge::polar_to_cartesian(cx, cy, radius, angle);
    Point::new(x, y)
}

impl<Message> canvas::Program<Message> for Gauge {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let radius = (bounds.width / 2.0).min(bounds.height * 0.6) * 0.85;
        let cx = bounds.width / 2.0;
        let cy = bounds.height * 0.58;

        // Colored zones
        for arc in gauge::color_arcs() {
            let path = Path::new(|builder| {
                builder.move_to(point(cx, cy, radius, arc.start_angle));
                let mut angle = arc.start_angle + ARC_STEP_DEG;
                while angle < arc.end_angle {
                    builder.line_to(point(cx, cy, radius, angle));
                    angle += ARC_STEP_DEG;
                }
                builder.line_to(point(cx, cy, radius, arc.end_angle));
            });
            frame.stroke(
                &path,
                Stroke::default()
                    .with_width(10.0)
                    .with_color(zone_color(arc.zone)),
            );
        }

        // Tick scale
        for tick in gauge::tick_marks() {
            let length = if tick.major { 16.0 } else { 8.0 };
            let outer = radius - 10.0;
            let line = Path::line(
                point(cx, cy, outer, tick.angle),
                point(cx, cy, outer - length, tick.angle),
            );
            frame.stroke(
                &line,
                Stroke::default()
                    .with_width(if tick.major { 2.0 } else { 1.0 })
                    .with_color(Color::from_rgb8(0xC0, 0xC0, 0xC0)),
            );

            if tick.major {
                frame.fill_text(canvas::Text {
                    content: tick.cents.to_string(),
                    position: point(cx, cy, outer - length - 14.0, tick.angle),
                    color: Color::from_rgb8(0xA0, 0xA0, 0xA0),
                    size: Pixels(12.0),
                    horizontal_alignment: Horizontal::Center,
                    vertical_alignment: iced::alignment::Vertical::Center,
                    ..canvas::Text::default()
                });
            }
        }

        // Needle
        if let Some(cents) = self.cents {
            let needle = Path::line(
                Point::new(cx, cy),
                point(cx, cy, radius * 0.9, gauge::cents_to_angle(cents)),
            );
            frame.stroke(
                &needle,
                Stroke::default()
                    .with_width(3.0)
                    .with_color(zone_color(gauge::cents_to_color_zone(cents))),
            );
        }

        let hub = Path::circle(Point::new(cx, cy), 6.0);
        frame.fill(&hub, Color::WHITE);

        vec![frame.into_geometry()]
    }
}
