//! Resolves the configured color into the two shades the clock draws with.

use crate::Color;
use crate::config::Hsv;

/// Full color for the ball and paddles, dim color for divider and digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub full: Color,
    pub dim: Color,
}

impl Palette {
    /// Hue and saturation pick the full color. The HSV value is not baked
    /// in here: it drives panel brightness instead, so it isn't applied
    /// twice.
    pub fn resolve(color: Hsv, dim: f64) -> Self {
        let full = Color::from_hsv(color.hue, color.saturation, 100.0);
        Self {
            full,
            dim: full.scale(dim),
        }
    }
}
