//! Compositor: turns a simulation frame into pixels.
//!
//! Each tick is painted from scratch into a 32x16 sketch, back to front:
//! center divider, the four clock digits, both paddles, the ball. The
//! sketch is then copied into the sink and presented.

use crate::display::{self, DisplaySink};
use crate::font;
use crate::sim::{
    ARENA_HEIGHT, ARENA_WIDTH, CENTER_COLUMN, DisplayFrame, PADDLE_HEIGHT, PADDLE_WIDTH, Side,
};
use crate::Color;
use image::RgbImage;

/// Left edge of each digit: hour tens, hour ones, minute tens, minute ones.
const DIGIT_COLUMNS: [u32; 4] = [8, 12, 18, 22];
const DIGIT_ROW: u32 = 1;

pub struct Compositor {
    sketch: RgbImage,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    pub fn new() -> Self {
        Self {
            sketch: RgbImage::new(ARENA_WIDTH as u32, ARENA_HEIGHT as u32),
        }
    }

    /// Paint `frame` and present it.
    ///
    /// When the clock is powered off nothing reaches the sink; the caller
    /// keeps ticking so the match continues underneath.
    pub fn render(&mut self, frame: &DisplayFrame, powered: bool, sink: &mut dyn DisplaySink) {
        if !powered {
            return;
        }
        self.paint(frame);
        display::show_image(sink, &self.sketch);
    }

    fn paint(&mut self, frame: &DisplayFrame) {
        let DisplayFrame {
            palette,
            digits,
            paddles,
            ball,
        } = frame;

        self.clear();

        for y in 0..ARENA_HEIGHT {
            self.plot(CENTER_COLUMN, y, palette.dim);
        }

        for (ch, column) in digits.iter().zip(DIGIT_COLUMNS) {
            for (dx, dy) in font::lit_pixels(*ch) {
                self.plot((column + dx) as i32, (DIGIT_ROW + dy) as i32, palette.dim);
            }
        }

        for (side, top) in Side::BOTH.into_iter().zip(paddles) {
            let left = side.draw_column();
            for y in *top..*top + PADDLE_HEIGHT {
                for x in left..left + PADDLE_WIDTH {
                    self.plot(x, y, palette.full);
                }
            }
        }

        if let Some((x, y)) = *ball {
            self.plot(x, y, palette.full);
        }
    }

    fn clear(&mut self) {
        for pixel in self.sketch.pixels_mut() {
            *pixel = Color::BLACK.into();
        }
    }

    /// Set one sketch pixel, skipping anything off the arena. The ball can
    /// sit one column outside it on the tick a point is scored.
    fn plot(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x < self.sketch.width() && y < self.sketch.height() {
            self.sketch.put_pixel(x, y, color.into());
        }
    }
}
