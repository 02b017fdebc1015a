//! Forwarding loops.
//!
//! - [`PubSubBridge`]: one direction, source to sink, every frame of a chunk
//!   written before the next read.
//! - [`ReqRepBridge`]: both directions of a request/reply transaction with
//!   liveness tracking.
//!
//! Both loops are generic over [`Endpoint`](crate::endpoint::Endpoint) and
//! [`Multiplexer`](crate::endpoint::Multiplexer) and expose `step()` for
//! single iterations next to `run()` for the full loop.

pub mod pubsub;
pub mod reqrep;

pub use pubsub::{ForwardStats, PubSubBridge};
pub use reqrep::{PendingReply, ReqRepBridge, ReqRepState, ReqRepStats};

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted endpoints for driving the loops without real I/O.

    use std::collections::VecDeque;
    use std::thread;
    use std::time::Duration;

    use bytes::Bytes;

    use crate::endpoint::{Endpoint, EndpointKind, Multiplexer};
    use crate::error::{BridgeError, Result};
    use crate::role::SocketRole;

    #[derive(Debug)]
    pub struct MockEndpoint {
        kind: EndpointKind,
        inbound: VecDeque<Bytes>,
        pub written: Vec<Bytes>,
        pub restarts: u32,
        /// Report readiness once drained so the next read hits end-of-stream
        pub eof_when_drained: bool,
        pub fail_writes: bool,
        pub fail_restart: bool,
    }

    impl MockEndpoint {
        pub fn stream() -> Self {
            Self::with_kind(EndpointKind::ByteStream)
        }

        pub fn socket(role: SocketRole) -> Self {
            Self::with_kind(EndpointKind::Messaging(role))
        }

        fn with_kind(kind: EndpointKind) -> Self {
            Self {
                kind,
                inbound: VecDeque::new(),
                written: Vec::new(),
                restarts: 0,
                eof_when_drained: false,
                fail_writes: false,
                fail_restart: false,
            }
        }

        pub fn push(&mut self, unit: &'static [u8]) -> &mut Self {
            self.inbound.push_back(Bytes::from_static(unit));
            self
        }

        pub fn readable(&self) -> bool {
            !self.inbound.is_empty() || self.eof_when_drained
        }

        pub fn written_str(&self) -> Vec<&[u8]> {
            self.written.iter().map(|b| b.as_ref()).collect()
        }
    }

    impl Endpoint for MockEndpoint {
        fn kind(&self) -> EndpointKind {
            self.kind
        }

        fn read(&mut self, max_len: usize) -> Result<Bytes> {
            let mut unit = self.inbound.pop_front().ok_or(BridgeError::EndOfStream)?;
            unit.truncate(max_len);
            Ok(unit)
        }

        fn write_all(&mut self, data: &[u8]) -> Result<usize> {
            if self.fail_writes {
                return Err(BridgeError::transport("scripted write failure"));
            }
            self.written.push(Bytes::copy_from_slice(data));
            Ok(data.len())
        }

        fn restart(&mut self) -> Result<()> {
            let EndpointKind::Messaging(role) = self.kind else {
                return Err(BridgeError::RestartUnsupported);
            };
            if self.fail_restart {
                return Err(BridgeError::RestartExhausted { role, attempts: 3 });
            }
            // A reopened socket has no queued messages
            self.inbound.clear();
            self.restarts += 1;
            Ok(())
        }
    }

    /// Readiness straight from the scripted queues; sleeps through timeouts.
    #[derive(Debug, Default)]
    pub struct MockMultiplexer {
        pub waits: u32,
        pub idle_wakeups: u32,
    }

    impl Multiplexer<MockEndpoint> for MockMultiplexer {
        fn wait<const N: usize>(
            &mut self,
            endpoints: [&MockEndpoint; N],
            timeout: Option<Duration>,
        ) -> Result<[bool; N]> {
            self.waits += 1;
            let ready = endpoints.map(MockEndpoint::readable);
            if !ready.iter().any(|r| *r) {
                self.idle_wakeups += 1;
                thread::sleep(timeout.unwrap_or(Duration::ZERO));
            }
            Ok(ready)
        }
    }
}
