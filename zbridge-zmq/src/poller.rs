//! Readiness multiplexing with `zmq_poll`.
//!
//! libzmq sockets and plain descriptors are polled together in one call, so
//! a loop can wait on a byte stream and a message socket at the same time.

use std::time::Duration;

use tracing::trace;
use zbridge_core::endpoint::Multiplexer;
use zbridge_core::error::{BridgeError, Result};

use crate::endpoint::ZmqEndpoint;

#[derive(Debug, Default, Clone, Copy)]
pub struct ZmqPoller;

impl ZmqPoller {
    pub fn new() -> Self {
        Self
    }
}

/// Milliseconds for `zmq_poll`, rounded up; `-1` waits forever.
fn poll_timeout(timeout: Option<Duration>) -> i64 {
    match timeout {
        Some(timeout) => {
            let ms = timeout.as_micros().saturating_add(999) / 1000;
            i64::try_from(ms).unwrap_or(i64::MAX)
        }
        None => -1,
    }
}

impl Multiplexer<ZmqEndpoint> for ZmqPoller {
    fn wait<const N: usize>(
        &mut self,
        endpoints: [&ZmqEndpoint; N],
        timeout: Option<Duration>,
    ) -> Result<[bool; N]> {
        let mut items = endpoints
            .iter()
            .map(|endpoint| endpoint.poll_item())
            .collect::<Result<Vec<_>>>()?;

        match zmq::poll(&mut items, poll_timeout(timeout)) {
            Ok(_) => {}
            // A signal landed; report nothing ready and let the caller
            // look at its shutdown flag
            Err(zmq::Error::EINTR) => {
                trace!("[POLL] interrupted");
                return Ok([false; N]);
            }
            Err(e) => return Err(BridgeError::transport(e)),
        }

        let mut ready = [false; N];
        for (slot, item) in ready.iter_mut().zip(&items) {
            *slot = item.is_readable();
        }
        Ok(ready)
    }
}
