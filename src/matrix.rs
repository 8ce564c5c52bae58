//! Render thread: owns the LED matrix and shows frames sent to it.
//!
//! The `rpi-led-matrix` C library is not thread-safe, so the matrix lives
//! on one dedicated thread for the life of the process. Everyone else
//! draws into a [`MatrixSink`], whose `present` ships the finished back
//! buffer to that thread as a [`RenderCommand`].
//!
//! ## Rust concepts
//! - `std::sync::mpsc` channels for thread communication
//! - A one-shot channel to report whether initialization worked
//! - `impl Trait for` a type that wraps a channel sender

use crate::config::ClockConfig;
use crate::display::DisplaySink;
use crate::{Color, create_matrix};
use image::RgbImage;
use rpi_led_matrix::LedCanvas;
use std::error::Error;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

pub const RENDER_THREAD: &str = "led-render";

// ── Commands ─────────────────────────────────────────────────────────

pub enum RenderCommand {
    /// Show a complete frame, scaled by the current brightness.
    ShowFrame(RgbImage),
    /// Panel brightness, 0-100. Applies from the next frame on.
    SetBrightness(u8),
    /// Clear the panel and exit the thread.
    Shutdown,
}

// ── Sink ─────────────────────────────────────────────────────────────

/// Back buffer in front of the render thread.
pub struct MatrixSink {
    back: RgbImage,
    tx: Sender<RenderCommand>,
}

impl MatrixSink {
    pub fn new(width: u32, height: u32, tx: Sender<RenderCommand>) -> Self {
        Self {
            back: RgbImage::new(width, height),
            tx,
        }
    }

    fn send(&self, cmd: RenderCommand) {
        if self.tx.send(cmd).is_err() {
            tracing::warn!("Render thread gone, dropping command");
        }
    }
}

impl DisplaySink for MatrixSink {
    fn bounds(&self) -> (u32, u32) {
        self.back.dimensions()
    }

    fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x < self.back.width() && y < self.back.height() {
            self.back.put_pixel(x, y, color.into());
        }
    }

    fn present(&mut self) {
        self.send(RenderCommand::ShowFrame(self.back.clone()));
    }

    fn set_brightness(&mut self, brightness: u8) {
        self.send(RenderCommand::SetBrightness(brightness.min(100)));
    }
}

// ── Render thread ────────────────────────────────────────────────────

/// Start the render thread and wait until it has the matrix.
///
/// Matrix setup runs on the render thread itself, since the matrix may
/// never leave it; the outcome comes back over a one-shot channel.
pub fn spawn(
    config: &ClockConfig,
) -> Result<(Sender<RenderCommand>, JoinHandle<()>), Box<dyn Error>> {
    let (tx, rx) = mpsc::channel();
    let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
    let config = config.clone();

    let handle = thread::Builder::new()
        .name(RENDER_THREAD.to_string())
        .spawn(move || render_loop(rx, &config, ready_tx))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok((tx, handle)),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err("render thread exited during startup".into()),
    }
}

fn render_loop(rx: Receiver<RenderCommand>, config: &ClockConfig, ready: Sender<Result<(), String>>) {
    let matrix = match create_matrix(config) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("Failed to initialize LED matrix: {}", e);
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut canvas = matrix.offscreen_canvas();
    let mut brightness = config.color.value.min(100);

    tracing::info!("Render thread started, waiting for frames...");

    // The loop ends on Shutdown or when every sender is gone.
    while let Ok(cmd) = rx.recv() {
        match cmd {
            RenderCommand::ShowFrame(img) => {
                draw_frame(&mut canvas, &img, brightness);
                canvas = matrix.swap(canvas);
            }
            RenderCommand::SetBrightness(value) => {
                tracing::debug!("Brightness {} -> {}", brightness, value);
                brightness = value;
            }
            RenderCommand::Shutdown => break,
        }
    }

    canvas.clear();
    let _ = matrix.swap(canvas);
    tracing::info!("Render thread stopped");
}

fn draw_frame(canvas: &mut LedCanvas, img: &RgbImage, brightness: u8) {
    for (x, y, pixel) in img.enumerate_pixels() {
        let c = Color::from(*pixel).apply_brightness(brightness);
        canvas.set(x as i32, y as i32, &c.into());
    }
}
