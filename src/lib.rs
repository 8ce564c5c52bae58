//! Pong clock for RGB LED matrix panels.
//!
//! Two autonomous paddles play an endless game of Pong while the current
//! time is drawn behind them. Whenever a minute rolls over, one paddle
//! deliberately misses so the point lands on the side of the clock that
//! just changed. Raw frames pushed over UDP can temporarily take over the
//! panel; the clock comes back on its own once they stop.
//!
//! This module holds the pieces shared by everything else:
//! - Panel geometry
//! - The `Color` type and its conversions
//! - Matrix initialization with our hardware defaults
//! - Shutdown signal wiring
//!
//! ## Threads
//! - **Engine thread**: runs the simulation tick loop ([`engine`])
//! - **Listener thread**: receives external frames ([`listener`])
//! - **Render thread** (hardware only): owns the LED matrix ([`matrix`])
//! - **Control server** (tokio/axum): remote on/off and color ([`server`])

pub mod arbiter;
pub mod config;
pub mod display;
pub mod engine;
pub mod font;
pub mod listener;
#[cfg(feature = "hardware")]
pub mod matrix;
pub mod palette;
pub mod render;
pub mod server;
pub mod sim;

use std::sync::Arc;
use tokio::sync::Notify;

// ── Panel configuration ────────────────────────────────────────────

/// Physical layout of the LED panels.
///
/// A single 32x16 panel is the smallest arena the clock needs. Larger
/// setups chain panels horizontally (`chain_length`) and stack parallel
/// chains vertically (`parallel`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelConfig {
    pub rows: u32,
    pub cols: u32,
    pub chain_length: u32,
    pub parallel: u32,
}

impl PanelConfig {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            chain_length: 1,
            parallel: 1,
        }
    }

    /// Total addressable width in pixels.
    pub fn width(&self) -> u32 {
        self.cols * self.chain_length.max(1)
    }

    /// Total addressable height in pixels.
    pub fn height(&self) -> u32 {
        self.rows * self.parallel.max(1)
    }

    /// Total number of pixels across all panels.
    pub fn pixel_count(&self) -> u32 {
        self.width() * self.height()
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::new(16, 32)
    }
}

// ── Color ──────────────────────────────────────────────────────────

/// Our own color type, decoupled from the hardware crate.
///
/// This lets us test color logic without needing `rpi-led-matrix`.
/// At the hardware boundary, we convert via `Into<LedColor>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color from hue (degrees), saturation and value (both 0-100).
    ///
    /// Hue wraps at 360; saturation and value are clamped.
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Self {
        let h = hue.rem_euclid(360.0);
        let s = (saturation / 100.0).clamp(0.0, 1.0);
        let v = (value / 100.0).clamp(0.0, 1.0);

        let chroma = v * s;
        let sector = h / 60.0;
        let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
        let m = v - chroma;

        let (r, g, b) = match sector as u32 {
            0 => (chroma, x, 0.0),   // Red → Yellow
            1 => (x, chroma, 0.0),   // Yellow → Green
            2 => (0.0, chroma, x),   // Green → Cyan
            3 => (0.0, x, chroma),   // Cyan → Blue
            4 => (x, 0.0, chroma),   // Blue → Magenta
            _ => (chroma, 0.0, x),   // Magenta → Red
        };

        let channel = |c: f64| ((c + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::new(channel(r), channel(g), channel(b))
    }

    /// Apply brightness scaling (0-100) to this color.
    pub fn apply_brightness(self, brightness: u8) -> Self {
        if brightness >= 100 {
            return self;
        }
        Self {
            r: ((self.r as u16 * brightness as u16) / 100) as u8,
            g: ((self.g as u16 * brightness as u16) / 100) as u8,
            b: ((self.b as u16 * brightness as u16) / 100) as u8,
        }
    }

    /// Scale every channel by `fraction`, truncating toward zero.
    pub fn scale(self, fraction: f64) -> Self {
        let f = fraction.clamp(0.0, 1.0);
        let channel = |c: u8| (c as f64 * f) as u8;
        Self::new(channel(self.r), channel(self.g), channel(self.b))
    }

    pub fn is_black(self) -> bool {
        self == Self::BLACK
    }
}

impl From<image::Rgb<u8>> for Color {
    fn from(p: image::Rgb<u8>) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

impl From<Color> for image::Rgb<u8> {
    fn from(c: Color) -> Self {
        image::Rgb([c.r, c.g, c.b])
    }
}

/// Convert our Color to the hardware crate's LedColor at the boundary.
#[cfg(feature = "hardware")]
impl From<Color> for rpi_led_matrix::LedColor {
    fn from(c: Color) -> Self {
        rpi_led_matrix::LedColor {
            red: c.r,
            green: c.g,
            blue: c.b,
        }
    }
}

// ── Matrix initialization ──────────────────────────────────────────

/// Create a matrix configured from the persisted clock configuration.
///
/// Fails when the GPIO is unavailable (e.g. not running as root) or the
/// options are rejected by the C library.
#[cfg(feature = "hardware")]
pub fn create_matrix(
    config: &config::ClockConfig,
) -> Result<rpi_led_matrix::LedMatrix, Box<dyn std::error::Error>> {
    use rpi_led_matrix::{LedMatrix, LedMatrixOptions, LedRuntimeOptions};

    let panel = config.panel();
    let mut options = LedMatrixOptions::new();
    options.set_rows(panel.rows);
    options.set_cols(panel.cols);
    options.set_chain_length(panel.chain_length);
    options.set_parallel(panel.parallel);
    options.set_hardware_mapping(&config.hardware_mapping);
    options.set_refresh_rate(config.show_refresh_rate);
    options.set_inverse_colors(config.inverse_colors);
    options.set_hardware_pulsing(!config.disable_hardware_pulsing);

    options.set_pwm_bits(8)?;
    options.set_pwm_lsb_nanoseconds(130);

    let mut rt_options = LedRuntimeOptions::new();
    rt_options.set_gpio_slowdown(2); // Pi Zero 2 W requires slowdown=2

    let matrix = LedMatrix::new(Some(options), Some(rt_options))?;

    Ok(matrix)
}

// ── Shutdown ───────────────────────────────────────────────────────

/// Set up a Ctrl+C / SIGTERM handler that wakes whoever awaits the
/// returned `Notify`.
///
/// `Notify` stores a permit when nobody is waiting yet, so a signal that
/// arrives before the server starts awaiting is not lost.
pub fn setup_signal_handler() -> Result<Arc<Notify>, ctrlc::Error> {
    let shutdown = Arc::new(Notify::new());
    let s = shutdown.clone();

    ctrlc::set_handler(move || {
        s.notify_one();
    })?;

    Ok(shutdown)
}

// ── Tests ──────────────────────────────────────────────────────────
