//! Peer hangup detection for sessions that never read their byte stream.
//!
//! A subscribe-only session only writes to the stream, so a peer closing a
//! quiet connection would go unnoticed until a write happened to fail. The
//! watch polls the descriptor without blocking and drains whatever arrived;
//! a zero-length read means the peer is gone.
//!
//! Only sockets are watched. A regular file or device is always readable and
//! its content belongs to whoever else reads it.

use std::time::Duration;

use socket2::SockRef;
use tracing::{debug, trace};
use zbridge_core::endpoint::{Endpoint, Multiplexer};
use zbridge_core::error::{BridgeError, Result};
use zbridge_zmq::{ByteStream, ZmqEndpoint, ZmqPoller};

/// Reads per check, so a chatty peer cannot hold the supervisor.
const MAX_DRAIN_READS: usize = 16;

pub struct HangupWatch {
    stream: ZmqEndpoint,
    poller: ZmqPoller,
    read_buffer_size: usize,
    discarded: u64,
}

impl HangupWatch {
    /// Watch a duplicate of `stream`, or `None` if it is not a socket.
    pub fn new(stream: &ByteStream, read_buffer_size: usize) -> Result<Option<Self>> {
        if SockRef::from(stream).r#type().is_err() {
            trace!(?stream, "[SUPERVISOR] byte stream is not a socket, not watched");
            return Ok(None);
        }

        Ok(Some(Self {
            stream: ZmqEndpoint::from(stream.try_clone()?),
            poller: ZmqPoller::new(),
            read_buffer_size: read_buffer_size.max(1),
            discarded: 0,
        }))
    }

    /// Drain pending input without blocking; `true` once the peer is gone.
    pub fn hung_up(&mut self) -> bool {
        for _ in 0..MAX_DRAIN_READS {
            match self.poller.wait([&self.stream], Some(Duration::ZERO)) {
                Ok([true]) => {}
                Ok([false]) => return false,
                Err(e) => {
                    debug!(error = %e, "[SUPERVISOR] cannot poll byte stream");
                    return true;
                }
            }

            match self.stream.read(self.read_buffer_size) {
                Ok(chunk) => {
                    self.discarded += chunk.len() as u64;
                    trace!(bytes = chunk.len(), "[SUPERVISOR] discarded unread input");
                }
                Err(BridgeError::EndOfStream) => return true,
                Err(e) => {
                    debug!(error = %e, "[SUPERVISOR] byte stream failed");
                    return true;
                }
            }
        }
        false
    }

    /// Bytes read and thrown away while watching.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}
