//! Loopback UDP transport for the published control surface.
//!
//! Each datagram carries one command: `toggle`, `preset <id>`, `record start`
//! or `record stop`. Commands are forwarded to whatever surface the registry
//! currently publishes, so a listener can outlive any single overlay.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};
use trailcast_core::{ControlCommand, ControlRegistry};

use crate::error::{Error, Result};

const MAX_DATAGRAM: usize = 512;
const RECV_TIMEOUT: Duration = Duration::from_millis(200);

pub fn parse_command(datagram: &str) -> Option<ControlCommand> {
    let mut words = datagram.split_whitespace();
    let command = match (words.next()?, words.next()) {
        ("toggle", None) => ControlCommand::ToggleActive,
        ("preset", Some(id)) => ControlCommand::ApplyPreset(id.to_string()),
        ("record", Some("start")) => ControlCommand::StartRecording,
        ("record", Some("stop")) => ControlCommand::StopRecording,
        _ => return None,
    };
    words.next().is_none().then_some(command)
}

fn dispatch(registry: &ControlRegistry, command: ControlCommand) {
    let Some(surface) = registry.current() else {
        debug!(?command, "no control surface published; command dropped");
        return;
    };
    match command {
        ControlCommand::ToggleActive => surface.toggle_active(),
        ControlCommand::ApplyPreset(id) => surface.apply_preset(&id),
        ControlCommand::StartRecording => surface.start_recording(),
        ControlCommand::StopRecording => surface.stop_recording(),
    }
}

#[derive(Debug)]
pub struct ControlListener {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ControlListener {
    /// Bind `127.0.0.1:port` (0 picks a free port) and start forwarding.
    pub fn bind(port: u16, registry: ControlRegistry) -> Result<Self> {
        let requested = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let bind_err = |source| Error::Bind {
            addr: requested.to_string(),
            source,
        };
        let socket = UdpSocket::bind(requested).map_err(bind_err)?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;
        let addr = socket.local_addr()?;

        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::Builder::new().name("control-listener".into()).spawn({
            let stop = Arc::clone(&stop);
            move || serve(socket, registry, stop)
        })?;
        info!(%addr, "control listener ready");
        Ok(Self {
            addr,
            stop,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("control listener thread panicked");
            }
        }
    }
}

impl Drop for ControlListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve(socket: UdpSocket, registry: ControlRegistry, stop: Arc<AtomicBool>) {
    let mut buf = [0u8; MAX_DATAGRAM];
    while !stop.load(Ordering::SeqCst) {
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                continue
            }
            Err(err) => {
                warn!("control listener receive failed: {err}");
                continue;
            }
        };
        let text = String::from_utf8_lossy(&buf[..len]);
        match parse_command(&text) {
            Some(command) => {
                debug!(%peer, ?command, "control command received");
                dispatch(&registry, command);
            }
            None => warn!(%peer, datagram = %text.trim(), "unrecognised control datagram"),
        }
    }
    debug!("control listener stopped");
}
