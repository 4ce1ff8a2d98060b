//! Piecewise linear colour gradients for the charts and maps.

use plotters::style::RGBColor;

pub const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
pub const OVERLAY_LINE: RGBColor = RGBColor(60, 60, 60);

#[derive(Debug, Clone, Copy)]
pub struct Gradient {
    stops: &'static [(f64, (u8, u8, u8))],
}

/// Diverging blue to red, for temperature.
pub const COOLWARM: Gradient = Gradient {
    stops: &[
        (0.0, (59, 76, 192)),
        (0.25, (141, 176, 254)),
        (0.5, (221, 221, 221)),
        (0.75, (244, 154, 123)),
        (1.0, (180, 4, 38)),
    ],
};

/// Sequential dark blue to yellow, for wind speed.
pub const PLASMA: Gradient = Gradient {
    stops: &[
        (0.0, (13, 8, 135)),
        (0.25, (126, 3, 168)),
        (0.5, (204, 71, 120)),
        (0.75, (248, 149, 64)),
        (1.0, (240, 249, 33)),
    ],
};

impl Gradient {
    /// Colour at `t`, clamped to `[0, 1]`. `NaN` maps to the middle.
    pub fn at(&self, t: f64) -> RGBColor {
        let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
        let upper = self
            .stops
            .iter()
            .position(|(pos, _)| *pos >= t)
            .unwrap_or(self.stops.len() - 1);
        if upper == 0 {
            let (r, g, b) = self.stops[0].1;
            return RGBColor(r, g, b);
        }
        let (p0, c0) = self.stops[upper - 1];
        let (p1, c1) = self.stops[upper];
        let f = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;
        RGBColor(mix(c0.0, c1.0), mix(c0.1, c1.1), mix(c0.2, c1.2))
    }

    /// Colour of `value` relative to `[min, max]`.
    pub fn scaled(&self, value: f64, min: f64, max: f64) -> RGBColor {
        self.at(normalize(value, min, max))
    }
}

/// Position of `value` inside `[min, max]`; 0.5 for an empty range.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        (value - min) / (max - min)
    } else {
        0.5
    }
}
