//! Byte-stream sources: a file or device, or a listening TCP port.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::path::Path;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{info, warn};
use zbridge_core::error::{BridgeError, Result};
use zbridge_core::shutdown::ShutdownSignal;
use zbridge_zmq::ByteStream;

use crate::supervisor::{Supervisor, UnitOutcome};

/// Open `path` read+write and run one session over it.
pub fn serve_file(
    supervisor: &Supervisor,
    path: &Path,
    shutdown: &ShutdownSignal,
) -> Result<Vec<UnitOutcome>> {
    let stream = ByteStream::open(path).map_err(|e| {
        warn!(path = %path.display(), error = %e, "[SUPERVISOR] cannot open byte stream");
        BridgeError::Io(e)
    })?;
    info!(path = %path.display(), "[SUPERVISOR] serving file");
    supervisor.run_session(&stream, shutdown)
}

/// Listening socket on `0.0.0.0:port` with address reuse.
pub fn bind_listener(port: u16) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddr::from(([0, 0, 0, 0], port)).into())?;
    // Sessions are served one at a time
    socket.listen(1)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

/// Accept connections on `port`, one session each, until shutdown.
pub fn serve_tcp(supervisor: &Supervisor, port: u16, shutdown: &ShutdownSignal) -> Result<u64> {
    let listener = bind_listener(port)?;
    info!(port, "[SUPERVISOR] listening");
    serve_listener(supervisor, &listener, shutdown)
}

/// Accept loop over a non-blocking listener; returns the number of
/// sessions served.
pub fn serve_listener(
    supervisor: &Supervisor,
    listener: &TcpListener,
    shutdown: &ShutdownSignal,
) -> Result<u64> {
    let tick = supervisor.config().shutdown_tick;
    let mut sessions = 0;

    while !shutdown.is_triggered() {
        let (conn, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                shutdown.wait_timeout(tick);
                continue;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        conn.set_nonblocking(false)?;
        conn.set_nodelay(true)?;
        info!(%peer, "[SUPERVISOR] connection accepted");

        let stream = ByteStream::from_fd(conn);
        match supervisor.run_session(&stream, shutdown) {
            Ok(_) => sessions += 1,
            Err(BridgeError::Cancelled) => break,
            Err(e) => return Err(e),
        }
        info!(%peer, "[SUPERVISOR] connection closed");
    }

    Ok(sessions)
}
