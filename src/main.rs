//! Pong clock for RGB LED matrix panels.
//!
//! Plays Pong on the panel with the time drawn behind the court, accepts
//! raw PPM frames over UDP, and serves a small HTTP API for power and
//! color.
//!
//! ## Architecture
//! - **Render thread** (std::thread): owns the LED matrix
//! - **Engine thread** (std::thread): ticks the match and draws it
//! - **Frame listener** (std::thread): UDP frames and the idle revert
//! - **HTTP server** (tokio/axum): control API
//!
//! ## Rust concepts
//! - `#[tokio::main]` async entry point
//! - `axum::serve(..).with_graceful_shutdown(..)` driven by a `Notify`
//! - `std::process::exit` with a status code
//!
//! ## Usage
//! ```sh
//! sudo ./target/release/pong-clock --config /etc/pong-clock.json --port 8080
//! ```

#[cfg(not(feature = "hardware"))]
fn main() {
    eprintln!("This binary requires the 'hardware' feature (rpi-led-matrix).");
    eprintln!("Build with: cargo build --release");
    eprintln!("Tests can run without it: cargo test --no-default-features");
    std::process::exit(1);
}

#[cfg(feature = "hardware")]
fn main() {
    std::process::exit(hardware_main());
}

#[cfg(feature = "hardware")]
#[tokio::main(flavor = "current_thread")]
async fn hardware_main() -> i32 {
    use clap::Parser;
    use pong_clock::arbiter::Controller;
    use pong_clock::config::{ClockConfig, SharedConfig};
    use pong_clock::matrix::{self, MatrixSink, RenderCommand};
    use pong_clock::server::{self, AppState};
    use pong_clock::sim::LocalClock;
    use pong_clock::{display, listener, setup_signal_handler};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tracing_subscriber::EnvFilter;

    /// LED matrix Pong clock
    #[derive(Parser)]
    #[command(name = "pong-clock")]
    #[command(about = "Pong clock for an RGB LED matrix, with UDP frame takeover")]
    #[command(version)]
    struct Args {
        /// Path to the JSON configuration file
        #[arg(long, default_value = "config.json")]
        config: PathBuf,

        /// Port for the HTTP control API
        #[arg(long, default_value = "8080")]
        port: u16,
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false) // journald
        .compact()
        .init();

    let args = Args::parse();
    let config = ClockConfig::load_or_default(&args.config);
    let panel = config.panel();

    tracing::info!("Pong clock v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Panel: {}x{}", panel.width(), panel.height());
    tracing::info!("Config: {}", args.config.display());

    let shutdown = match setup_signal_handler() {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Could not install signal handler: {}", e);
            return 1;
        }
    };

    let (render_tx, render_handle) = match matrix::spawn(&config) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("LED matrix unavailable: {}", e);
            return 1;
        }
    };

    let sink = display::shared(MatrixSink::new(panel.width(), panel.height(), render_tx.clone()));
    let frame_port = config.frame_port;
    let config = SharedConfig::new(config);
    let controller = Arc::new(Controller::new(config.clone(), sink, Arc::new(LocalClock)));

    if let Err(e) = controller.start() {
        tracing::error!("Could not start the clock engine: {}", e);
        return 1;
    }

    // Without the socket the clock still runs; it just can't be taken over.
    if let Err(e) = listener::bind(frame_port).and_then(|s| listener::spawn(s, controller.clone())) {
        tracing::error!("Frame listener on UDP {} unavailable: {}", frame_port, e);
    }

    let app = server::create_router(AppState {
        controller: controller.clone(),
    });

    let addr = format!("0.0.0.0:{}", args.port);
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("API Documentation: http://localhost:{}/docs", args.port);

    match tokio::net::TcpListener::bind(&addr).await {
        Ok(tcp) => {
            let signal = shutdown.clone();
            if let Err(e) = axum::serve(tcp, app)
                .with_graceful_shutdown(async move { signal.notified().await })
                .await
            {
                tracing::error!("Server error: {}", e);
            }
        }
        Err(e) => {
            // The clock itself doesn't need the API, so keep running until
            // we're told to stop.
            tracing::error!("Could not bind {}: {}", addr, e);
            shutdown.notified().await;
        }
    }

    tracing::info!("Shutting down");
    let stopper = controller.clone();
    if tokio::task::spawn_blocking(move || stopper.shutdown()).await.is_err() {
        tracing::error!("Engine shutdown panicked");
    }

    if let Err(e) = config.snapshot().save(&args.config) {
        tracing::error!("Could not save {}: {}", args.config.display(), e);
    }

    let _ = render_tx.send(RenderCommand::Shutdown);
    let _ = tokio::task::spawn_blocking(move || render_handle.join()).await;

    0
}
