//! UDP listener for raw frames.
//!
//! Every datagram is one complete PPM image. Valid frames go to the
//! [`Controller`], which takes the display over from the clock. The same
//! thread also drives the idle revert: its socket read timeout is set to
//! whatever is left of the idle period, so a quiet socket wakes it up just
//! in time to hand the display back.

use crate::arbiter::Controller;
use image::{ImageFormat, ImageResult, RgbImage};
use std::io::{self, ErrorKind};
use std::net::{Ipv4Addr, UdpSocket};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const LISTENER_THREAD: &str = "frame-listener";

/// Largest possible UDP payload.
pub const MAX_DATAGRAM: usize = 65_535;

/// Decode one datagram as a PPM (P3 or P6) image.
pub fn decode_frame(data: &[u8]) -> ImageResult<RgbImage> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Pnm)?;
    Ok(img.to_rgb8())
}

/// Bind the frame socket on all interfaces.
pub fn bind(port: u16) -> io::Result<UdpSocket> {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
}

/// Run the listener on its own thread until the socket fails.
pub fn spawn(socket: UdpSocket, controller: Arc<Controller>) -> io::Result<JoinHandle<()>> {
    if let Ok(addr) = socket.local_addr() {
        tracing::info!("Listening for frames on udp://{}", addr);
    }
    thread::Builder::new()
        .name(LISTENER_THREAD.to_string())
        .spawn(move || run(socket, controller))
}

fn run(socket: UdpSocket, controller: Arc<Controller>) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut frames: u64 = 0;

    loop {
        let idle = controller.config().snapshot().idle_revert();

        // A zero timeout means "block forever" to the socket, so clamp it.
        let timeout = controller
            .idle_remaining(idle)
            .map(|left| left.max(Duration::from_millis(1)));
        if let Err(e) = socket.set_read_timeout(timeout) {
            tracing::error!("Could not set frame socket timeout: {}", e);
            return;
        }

        match socket.recv_from(&mut buf) {
            Ok((len, from)) => match controller.handle_datagram(&buf[..len]) {
                Ok(()) => {
                    frames += 1;
                    tracing::trace!("Frame {} from {} ({} bytes)", frames, from, len);
                }
                Err(e) => tracing::warn!("Dropping bad frame from {}: {}", from, e),
            },
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => {
                tracing::error!("Frame socket failed: {}", e);
                return;
            }
        }

        controller.revert_if_idle(idle);
    }
}
