//! # Gauge Geometry
//!
//! Pure geometry for the tuning dial: cents offsets become needle angles,
//! color zones and tick marks. Angles are in degrees with 0° pointing straight
//! up and positive angles turning clockwise.

/// Needle angle at the left end of the dial (-50 cents).
pub const ANGLE_MIN: f32 = -135.0;
/// Needle angle at the right end of the dial (+50 cents).
pub const ANGLE_MAX: f32 = 135.0;

pub const CENTS_MIN: f32 = -50.0;
pub const CENTS_MAX: f32 = 50.0;

/// Largest absolute offset drawn in the green zone.
pub const GREEN_THRESHOLD: f32 = 5.0;
/// Largest absolute offset drawn in the yellow zone.
pub const YELLOW_THRESHOLD: f32 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorZone {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Flat,
    Sharp,
    InTune,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Flat => "Flat",
            Direction::Sharp => "Sharp",
            Direction::InTune => "In tune",
        }
    }
}

/// Maps a cents offset to the needle angle, clamping to the dial range.
pub fn cents_to_angle(cents: f32) -> f32 {
    cents.clamp(CENTS_MIN, CENTS_MAX) / CENTS_MAX * ANGLE_MAX
}

pub fn cents_to_color_zone(cents: f32) -> ColorZone {
    let abs = cents.abs();
    if abs <= GREEN_THRESHOLD {
        ColorZone::Green
    } else if abs <= YELLOW_THRESHOLD {
        ColorZone::Yellow
    } else {
        ColorZone::Red
    }
}

pub fn cents_to_direction(cents: f32) -> Direction {
    if cents.abs() <= GREEN_THRESHOLD {
        Direction::InTune
    } else if cents < 0.0 {
        Direction::Flat
    } else {
        Direction::Sharp
    }
}

/// Converts a dial angle to cartesian coordinates around `(cx, cy)`.
///
/// Screen coordinates: y grows downwards, so 0° lands above the center.
pub fn polar_to_cartesian(cx: f32, cy: f32, radius: f32, angle_deg: f32) -> (f32, f32) {
    let rad = (angle_deg - 90.0).to_radians();
    (cx + radius * rad.cos(), cy + radius * rad.sin())
}

/// One tick on the dial scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickMark {
    pub cents: i32,
    pub angle: f32,
    pub major: bool,
}

/// Ticks every 5 cents from -50 to +50; majors at -50, -25, 0, 25 and 50.
pub fn tick_marks() -> Vec<TickMark> {
    (-50..=50)
        .step_by(5)
        .map(|cents| TickMark {
            cents,
            angle: cents_to_angle(cents as f32),
            major: cents % 25 == 0,
        })
        .collect()
}

/// Angular span of one colored arc segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSegment {
    pub start_angle: f32,
    pub end_angle: f32,
    pub zone: ColorZone,
}

/// The five dial segments, left to right: red, yellow, green, yellow, red.
pub fn color_arcs() -> [ArcSegment; 5] {
    let green_start = cents_to_angle(-GREEN_THRESHOLD);
    let green_end = cents_to_angle(GREEN_THRESHOLD);
    let yellow_start = cents_to_angle(-YELLOW_THRESHOLD);
    let yellow_end = cents_to_angle(YELLOW_THRESHOLD);

    let segment = |start_angle, end_angle, zone| ArcSegment {
        start_angle,
        end_angle,
        zone,
    };
    [
        segment(ANGLE_MIN, yellow_start, ColorZone::Red),
        segment(yellow_start, green_start, ColorZone::Yellow),
        segment(green_start, green_end, ColorZone::Green),
        segment(green_end, yellow_end, ColorZone::Yellow),
        segment(yellow_end, ANGLE_MAX, ColorZone::Red),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_angle_mapping_is_linear_and_clamped() {
        assert_eq!(cents_to_angle(0.0), 0.0);
        assert_eq!(cents_to_angle(-50.0), -135.0);
        assert_eq!(cents_to_angle(50.0), 135.0);
        assert_eq!(cents_to_angle(-80.0), -135.0);
        assert_eq!(cents_to_angle(200.0), 135.0);
        assert_abs_diff_eq!(cents_to_angle(25.0), 67.5, epsilon = 1e-4);
    }

    #[test]
    fn test_color_zones() {
        assert_eq!(cents_to_color_zone(0.0), ColorZone::Green);
        assert_eq!(cents_to_color_zone(5.0), ColorZone::Green);
        assert_eq!(cents_to_color_zone(-5.0), ColorZone::Green);
        assert_eq!(cents_to_color_zone(6.0), ColorZone::Yellow);
        assert_eq!(cents_to_color_zone(-15.0), ColorZone::Yellow);
        assert_eq!(cents_to_color_zone(16.0), ColorZone::Red);
        assert_eq!(cents_to_color_zone(-50.0), ColorZone::Red);
    }

    #[test]
    fn test_direction() {
        assert_eq!(cents_to_direction(0.0), Direction::InTune);
        assert_eq!(cents_to_direction(4.0), Direction::InTune);
        assert_eq!(cents_to_direction(-12.0), Direction::Flat);
        assert_eq!(cents_to_direction(12.0), Direction::Sharp);
    }

    #[test]
    fn test_polar_orientation() {
        let (x, y) = polar_to_cartesian(150.0, 170.0, 100.0, 0.0);
        assert_abs_diff_eq!(x, 150.0, epsilon = 1e-3);
        assert_abs_diff_eq!(y, 70.0, epsilon = 1e-3);

        let (x, y) = polar_to_cartesian(150.0, 170.0, 100.0, 90.0);
        assert_abs_diff_eq!(x, 250.0, epsilon = 1e-3);
        assert_abs_diff_eq!(y, 170.0, epsilon = 1e-3);

        let (x, _) = polar_to_cartesian(150.0, 170.0, 100.0, -90.0);
        assert_abs_diff_eq!(x, 50.0, epsilon = 1e-3);
    }

    #[test]
    fn test_tick_marks() {
        let ticks = tick_marks();
        assert_eq!(ticks.len(), 21);
        let majors: Vec<i32> = ticks.iter().filter(|t| t.major).map(|t| t.cents).collect();
        assert_eq!(majors, vec![-50, -25, 0, 25, 50]);
        assert!(ticks.iter().all(|t| t.angle.is_finite()));
    }

    #[test]
    fn test_color_arcs_cover_dial() {
        let arcs = color_arcs();
        assert_eq!(arcs[0].start_angle, ANGLE_MIN);
        assert_eq!(arcs[4].end_angle, ANGLE_MAX);
        for pair in arcs.windows(2) {
            assert_eq!(pair[0].end_angle, pair[1].start_angle);
        }
        assert_eq!(arcs[2].zone, ColorZone::Green);
    }
}
