//! Decides who owns the display: the Pong engine or external frames.
//!
//! ```text
//!            first valid frame
//!  Simulation ─────────────────▶ External ──┐ more frames
//!      ▲                            │  ◀────┘ (timer reset)
//!      └────────────────────────────┘
//!          idle period with no frames
//! ```
//!
//! All transitions, power changes included, run under one mutex, and any
//! transition that takes the display away from the engine stops it with
//! the handshake in [`crate::engine`] first. That keeps the display at a
//! single writer at any moment.

use crate::config::SharedConfig;
use crate::display::{self, SharedSink};
use crate::engine::{EngineContext, EngineHandle};
use crate::listener;
use crate::sim::{SimSnapshot, Simulation, TimeSource};
use crate::Color;
use image::RgbImage;
use serde::Serialize;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Panel brightness while external frames are shown.
pub const EXTERNAL_BRIGHTNESS: u8 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// The engine owns the display.
    Simulation,
    /// Network frames own the display.
    External,
}

/// Snapshot of the whole clock for the status endpoint.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct ClockStatus {
    pub mode: Mode,
    pub power: bool,
    pub brightness: u8,
    pub hue: f64,
    pub saturation: f64,
    pub dim: f64,
    pub simulation: SimSnapshot,
    pub version: String,
}

struct Arbitration {
    mode: Mode,
    engine: Option<EngineHandle>,
    /// A match paused by power-off, resumed by power-on.
    parked: Option<Simulation>,
    last_external_frame: Option<Instant>,
    /// Set by [`Controller::shutdown`]; nothing starts or draws afterwards.
    shutting_down: bool,
}

pub struct Controller {
    ctx: EngineContext,
    state: Mutex<Arbitration>,
    /// Mirror of `state.mode`, readable without waiting out a handshake.
    external: AtomicBool,
}

impl Controller {
    /// A powered-on controller in simulation mode. Call [`Controller::start`]
    /// to launch the engine.
    pub fn new(config: SharedConfig, sink: SharedSink, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            ctx: EngineContext {
                config,
                sink,
                clock,
                powered: Arc::new(AtomicBool::new(true)),
                status: Arc::new(Mutex::new(SimSnapshot::default())),
            },
            state: Mutex::new(Arbitration {
                mode: Mode::Simulation,
                engine: None,
                parked: None,
                last_external_frame: None,
                shutting_down: false,
            }),
            external: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SharedConfig {
        &self.ctx.config
    }

    pub fn mode(&self) -> Mode {
        if self.external.load(Ordering::SeqCst) {
            Mode::External
        } else {
            Mode::Simulation
        }
    }

    pub fn is_powered(&self) -> bool {
        self.ctx.is_powered()
    }

    /// Launch the engine if the clock should be running and isn't.
    pub fn start(&self) -> io::Result<()> {
        let mut state = self.lock_state();
        self.resume_engine(&mut state)
    }

    /// Decode a datagram and, if it's a valid image, show it.
    ///
    /// A bad datagram changes nothing: no takeover, no timer reset.
    pub fn handle_datagram(&self, data: &[u8]) -> image::ImageResult<()> {
        let img = listener::decode_frame(data)?;
        self.show_external(&img);
        Ok(())
    }

    /// Put an external frame on the display, taking it over from the engine
    /// first if needed.
    pub fn show_external(&self, img: &RgbImage) {
        let mut state = self.lock_state();
        if state.shutting_down {
            return;
        }

        if state.mode == Mode::Simulation {
            tracing::info!("External frames arriving, suspending the clock");
            if let Some(engine) = state.engine.take() {
                engine.stop();
            }
            state.parked = None;
            self.set_mode(&mut state, Mode::External);
            display::lock(&self.ctx.sink).set_brightness(EXTERNAL_BRIGHTNESS);
        }

        state.last_external_frame = Some(Instant::now());
        display::show_image(&mut *display::lock(&self.ctx.sink), img);
    }

    /// Time left before an idle revert, or `None` outside external mode.
    pub fn idle_remaining(&self, idle: Duration) -> Option<Duration> {
        let state = self.lock_state();
        match (state.mode, state.last_external_frame) {
            (Mode::External, Some(last)) => Some(idle.saturating_sub(last.elapsed())),
            (Mode::External, None) => Some(Duration::ZERO),
            (Mode::Simulation, _) => None,
        }
    }

    /// Hand the display back to a brand-new match if no external frame has
    /// arrived for `idle`. Returns whether a revert happened.
    pub fn revert_if_idle(&self, idle: Duration) -> bool {
        let mut state = self.lock_state();
        if state.mode != Mode::External || state.shutting_down {
            return false;
        }
        if state.last_external_frame.is_some_and(|last| last.elapsed() < idle) {
            return false;
        }

        tracing::info!("No external frames for {:?}, resuming the clock", idle);
        self.set_mode(&mut state, Mode::Simulation);
        state.last_external_frame = None;
        state.parked = None;

        if !self.is_powered() {
            self.blank();
        }
        if let Err(e) = self.resume_engine(&mut state) {
            tracing::error!("Could not restart the clock engine: {}", e);
        }
        true
    }

    /// Turn the clock on or off.
    ///
    /// Off stops the engine and keeps its match; on picks that match back
    /// up from a fresh point, so no stale hold or miss survives the gap.
    /// While external frames own the display only the flag changes.
    pub fn set_power(&self, on: bool) -> io::Result<()> {
        let mut state = self.lock_state();
        if self.ctx.powered.swap(on, Ordering::SeqCst) == on {
            return Ok(());
        }
        tracing::info!("Power {}", if on { "on" } else { "off" });

        if state.mode == Mode::External || state.shutting_down {
            return Ok(());
        }

        if on {
            self.resume_engine(&mut state)
        } else {
            if let Some(engine) = state.engine.take() {
                state.parked = Some(engine.stop());
            }
            self.blank();
            Ok(())
        }
    }

    /// Stop the engine for good and blank the display.
    pub fn shutdown(&self) {
        let mut state = self.lock_state();
        state.shutting_down = true;
        if let Some(engine) = state.engine.take() {
            state.parked = Some(engine.stop());
        }
        self.blank();
    }

    pub fn status(&self) -> ClockStatus {
        let mode = self.mode();
        let config = self.ctx.config.snapshot();
        ClockStatus {
            mode,
            power: self.is_powered(),
            brightness: config.color.value,
            hue: config.color.hue,
            saturation: config.color.saturation,
            dim: config.dim,
            simulation: self.ctx.snapshot(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Start the engine on the parked match, or a fresh one, if we're in
    /// simulation mode, powered, and not already running.
    fn resume_engine(&self, state: &mut Arbitration) -> io::Result<()> {
        if state.mode != Mode::Simulation
            || state.shutting_down
            || !self.is_powered()
            || state.engine.is_some()
        {
            return Ok(());
        }
        let sim = match state.parked.take() {
            Some(mut sim) => {
                sim.restart_point();
                sim
            }
            None => Simulation::new(),
        };
        state.engine = Some(EngineHandle::spawn(self.ctx.clone(), sim)?);
        Ok(())
    }

    fn set_mode(&self, state: &mut Arbitration, mode: Mode) {
        state.mode = mode;
        self.external.store(mode == Mode::External, Ordering::SeqCst);
    }

    /// Only called with the engine stopped.
    fn blank(&self) {
        let mut sink = display::lock(&self.ctx.sink);
        display::fill(&mut *sink, Color::BLACK);
        sink.present();
    }

    fn lock_state(&self) -> MutexGuard<'_, Arbitration> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Some(engine) = self.lock_state().engine.take() {
            engine.stop();
        }
    }
}
