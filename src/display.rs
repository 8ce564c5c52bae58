//! The display sink: whatever ends up showing pixels.
//!
//! On the Pi this is [`crate::matrix::MatrixSink`], which forwards frames
//! to the render thread. Tests use a recording sink instead.
//!
//! The sink is shared between the engine thread and the frame listener,
//! but only one of them writes at a time; the stop/acknowledge handshake
//! in [`crate::engine`] guarantees it, so the mutex is never contended.

use crate::Color;
use image::RgbImage;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub trait DisplaySink: Send {
    /// Addressable `(width, height)` in pixels.
    fn bounds(&self) -> (u32, u32);

    /// Write one pixel to the back buffer. Out-of-bounds writes are ignored.
    fn set_pixel(&mut self, x: u32, y: u32, color: Color);

    /// Show the back buffer.
    fn present(&mut self);

    /// Panel brightness, 0-100.
    fn set_brightness(&mut self, brightness: u8);
}

pub type SharedSink = Arc<Mutex<dyn DisplaySink>>;

pub fn shared<S: DisplaySink + 'static>(sink: S) -> SharedSink {
    Arc::new(Mutex::new(sink))
}

/// Lock the sink. A writer that panicked mid-frame leaves at worst a torn
/// frame behind, which the next present overwrites.
pub fn lock(sink: &SharedSink) -> MutexGuard<'_, dyn DisplaySink + 'static> {
    sink.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fill every addressable pixel with `color`.
pub fn fill(sink: &mut dyn DisplaySink, color: Color) {
    let (width, height) = sink.bounds();
    for y in 0..height {
        for x in 0..width {
            sink.set_pixel(x, y, color);
        }
    }
}

/// Copy an image into the sink's top-left corner and present it.
///
/// Pixels outside the image are blanked; pixels outside the sink are
/// dropped.
pub fn show_image(sink: &mut dyn DisplaySink, img: &RgbImage) {
    let (width, height) = sink.bounds();
    for y in 0..height {
        for x in 0..width {
            let color = img
                .get_pixel_checked(x, y)
                .map(|p| Color::from(*p))
                .unwrap_or(Color::BLACK);
            sink.set_pixel(x, y, color);
        }
    }
    sink.present();
}
