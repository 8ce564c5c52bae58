//! Engine thread: ticks the simulation and draws every frame.
//!
//! The thread is stopped with a two-step handshake. The controller sends
//! a stop request and then blocks until the engine acknowledges it; only
//! after that may anyone else write to the sink. The engine notices a
//! request only while waiting out the tick delay, so a tick is never cut
//! short halfway through drawing.
//!
//! ## Rust concepts
//! - `mpsc::Receiver::recv_timeout` doubles as the tick delay and the
//!   stop check
//! - `JoinHandle<T>` hands the simulation back to whoever stops the thread

use crate::config::SharedConfig;
use crate::display::{self, SharedSink};
use crate::render::Compositor;
use crate::sim::{SimSnapshot, Simulation, TimeSource};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

pub const ENGINE_THREAD: &str = "pong-engine";

/// Everything the engine reads from outside its own thread.
#[derive(Clone)]
pub struct EngineContext {
    pub config: SharedConfig,
    pub sink: SharedSink,
    pub clock: Arc<dyn TimeSource>,
    /// While false the match keeps running but nothing is drawn.
    pub powered: Arc<AtomicBool>,
    /// Latest state of the match, for status reporting.
    pub status: Arc<Mutex<SimSnapshot>>,
}

impl EngineContext {
    pub fn is_powered(&self) -> bool {
        self.powered.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> SimSnapshot {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, sim: &Simulation) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = sim.snapshot();
    }
}

/// A running engine thread.
pub struct EngineHandle {
    stop_tx: Sender<()>,
    stopped_rx: Receiver<()>,
    thread: JoinHandle<Simulation>,
}

impl EngineHandle {
    /// Start ticking `sim` on a new thread.
    pub fn spawn(ctx: EngineContext, sim: Simulation) -> io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let (stopped_tx, stopped_rx) = mpsc::channel();

        ctx.publish(&sim);
        let thread = thread::Builder::new()
            .name(ENGINE_THREAD.to_string())
            .spawn(move || run(ctx, sim, stop_rx, stopped_tx))?;

        Ok(Self {
            stop_tx,
            stopped_rx,
            thread,
        })
    }

    /// Ask the engine to stop and block until it has.
    ///
    /// Returns the simulation as it was on the last tick. Once this
    /// returns, the engine will never touch the sink again.
    pub fn stop(self) -> Simulation {
        // Either of these fails only if the thread is already gone, in
        // which case the join below reports why.
        let _ = self.stop_tx.send(());
        let _ = self.stopped_rx.recv();

        match self.thread.join() {
            Ok(sim) => sim,
            Err(_) => {
                tracing::error!("Engine thread panicked; starting a new match");
                Simulation::new()
            }
        }
    }
}

fn run(
    ctx: EngineContext,
    mut sim: Simulation,
    stop_rx: Receiver<()>,
    stopped_tx: Sender<()>,
) -> Simulation {
    let mut compositor = Compositor::new();
    // Starts unset so the first powered tick always writes the configured
    // brightness; a revert from external frames relies on that.
    let mut applied_brightness: Option<u8> = None;

    tracing::debug!("Engine started at tick {}", sim.ticks());

    loop {
        let config = ctx.config.snapshot();
        let frame = sim.tick(ctx.clock.now(), &config);
        let powered = ctx.is_powered();

        {
            let mut sink = display::lock(&ctx.sink);
            if powered && applied_brightness != Some(config.color.value) {
                sink.set_brightness(config.color.value);
                applied_brightness = Some(config.color.value);
            }
            compositor.render(&frame, powered, &mut *sink);
        }
        ctx.publish(&sim);

        match stop_rx.recv_timeout(config.tick_interval()) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if ctx.is_powered() {
        display::lock(&ctx.sink).present();
    }
    let _ = stopped_tx.send(());

    tracing::debug!("Engine stopped at tick {}", sim.ticks());
    sim
}
