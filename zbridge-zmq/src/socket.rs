//! libzmq message socket with role-specific options and in-place restart.
//!
//! # Lifecycle
//!
//! ```text
//! open() ──▶ create + options + bind/connect ──▶ read/write
//!                    ▲                              │
//!                    └──── restart(): close, backoff, reopen
//! ```
//!
//! Options applied on every open:
//! - SUB subscribes to everything
//! - REQ is relaxed and correlated, so a new request can follow an
//!   abandoned one
//! - linger is zero, so closing never blocks a restart

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};
use zbridge_core::address::{AttachList, AttachMode};
use zbridge_core::error::{BridgeError, Result};
use zbridge_core::retry::{RetryError, RetryPolicy};
use zbridge_core::role::SocketRole;

/// Message socket bound to one role and one attach list for its lifetime.
pub struct MessageSocket {
    context: zmq::Context,
    role: SocketRole,
    attach: AttachList,
    socket: Option<zmq::Socket>,
    restart_policy: RetryPolicy,
    restarts: u32,
}

impl MessageSocket {
    /// Create the socket and attach it to every entry of `attach`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the socket cannot be created,
    /// configured, bound or connected.
    pub fn open(context: &zmq::Context, role: SocketRole, attach: AttachList) -> Result<Self> {
        let mut socket = Self {
            context: context.clone(),
            role,
            attach,
            socket: None,
            restart_policy: RetryPolicy::default(),
            restarts: 0,
        };
        socket.socket = Some(socket.create()?);
        debug!(role = %role, attach = %socket.attach, "[ZMQ] socket open");
        Ok(socket)
    }

    pub fn with_restart_policy(mut self, policy: RetryPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    fn create(&self) -> Result<zmq::Socket> {
        let socket = self
            .context
            .socket(socket_type(self.role))
            .map_err(BridgeError::transport)?;

        socket.set_linger(0).map_err(BridgeError::transport)?;
        match self.role {
            SocketRole::Subscriber => socket.set_subscribe(b"").map_err(BridgeError::transport)?,
            SocketRole::Requester => {
                socket.set_req_relaxed(true).map_err(BridgeError::transport)?;
                socket.set_req_correlate(true).map_err(BridgeError::transport)?;
            }
            SocketRole::Publisher | SocketRole::Replier => {}
        }

        for entry in self.attach.entries() {
            let attached = match entry.mode {
                AttachMode::Bind => socket.bind(&entry.endpoint),
                AttachMode::Connect => socket.connect(&entry.endpoint),
            };
            attached.map_err(|e| BridgeError::transport(format!("{entry}: {e}")))?;
        }

        Ok(socket)
    }

    fn live(&self) -> Result<&zmq::Socket> {
        self.socket
            .as_ref()
            .ok_or_else(|| BridgeError::transport(format!("{} socket is closed", self.role)))
    }

    /// Receive one message, all parts concatenated, truncated to `max_len`.
    ///
    /// An empty message is reported as [`BridgeError::EndOfStream`].
    pub fn recv(&mut self, max_len: usize) -> Result<Bytes> {
        let parts = self.live()?.recv_multipart(0).map_err(BridgeError::transport)?;

        let total: usize = parts.iter().map(Vec::len).sum();
        if total == 0 {
            debug!(role = %self.role, parts = parts.len(), "[ZMQ] empty message");
            return Err(BridgeError::EndOfStream);
        }
        let mut message = BytesMut::with_capacity(total.min(max_len));
        for part in &parts {
            message.extend_from_slice(part);
        }
        if total > max_len {
            warn!(
                role = %self.role,
                len = total,
                max_len,
                "[ZMQ] message larger than read buffer, truncated"
            );
            message.truncate(max_len);
        }

        trace!(role = %self.role, parts = parts.len(), len = message.len(), "[ZMQ] recv");
        Ok(message.freeze())
    }

    /// Send `data` as a single-part message.
    pub fn send(&mut self, data: &[u8]) -> Result<usize> {
        self.live()?.send(data, 0).map_err(BridgeError::transport)?;
        trace!(role = %self.role, len = data.len(), "[ZMQ] send");
        Ok(data.len())
    }

    /// Close and reopen with the same role and attach list.
    ///
    /// Each attempt waits the policy's backoff first, giving the transport
    /// time to release bound addresses.
    ///
    /// # Errors
    ///
    /// [`BridgeError::RestartExhausted`] once every attempt has failed; the
    /// socket stays closed in that case.
    pub fn restart(&mut self) -> Result<()> {
        self.close();

        let policy = self.restart_policy;
        let reopened = policy.retry(|attempt| {
            debug!(role = %self.role, attempt, "[ZMQ] reopening socket");
            self.create()
        });

        match reopened {
            Ok(socket) => {
                self.socket = Some(socket);
                self.restarts += 1;
                debug!(role = %self.role, restarts = self.restarts, "[ZMQ] socket restarted");
                Ok(())
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!(role = %self.role, attempts, error = %last, "[ZMQ] restart failed");
                Err(BridgeError::RestartExhausted {
                    role: self.role,
                    attempts,
                })
            }
            Err(RetryError::Cancelled) => Err(BridgeError::Cancelled),
        }
    }

    /// Drop the underlying socket; unsent messages are discarded.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!(role = %self.role, "[ZMQ] socket closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub(crate) fn poll_item(&self, events: zmq::PollEvents) -> Result<zmq::PollItem<'_>> {
        Ok(self.live()?.as_poll_item(events))
    }

    pub fn role(&self) -> SocketRole {
        self.role
    }

    pub fn attach(&self) -> &AttachList {
        &self.attach
    }

    /// Successful restarts since open.
    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

impl std::fmt::Debug for MessageSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSocket")
            .field("role", &self.role)
            .field("attach", &self.attach.to_string())
            .field("open", &self.is_open())
            .field("restarts", &self.restarts)
            .finish()
    }
}

fn socket_type(role: SocketRole) -> zmq::SocketType {
    match role {
        SocketRole::Publisher => zmq::PUB,
        SocketRole::Subscriber => zmq::SUB,
        SocketRole::Requester => zmq::REQ,
        SocketRole::Replier => zmq::REP,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn attach(s: &str, role: SocketRole) -> AttachList {
        AttachList::parse(s, role).unwrap()
    }

    #[test]
    fn test_req_rep_over_inproc() {
        let ctx = zmq::Context::new();
        let mut rep = MessageSocket::open(
            &ctx,
            SocketRole::Replier,
            attach("inproc://reqrep", SocketRole::Replier),
        )
        .unwrap();
        let mut req = MessageSocket::open(
            &ctx,
            SocketRole::Requester,
            attach("inproc://reqrep", SocketRole::Requester),
        )
        .unwrap();

        req.send(b"hello").unwrap();
        assert_eq!(rep.recv(1024).unwrap(), Bytes::from_static(b"hello"));
        rep.send(b"world").unwrap();
        assert_eq!(req.recv(1024).unwrap(), Bytes::from_static(b"world"));
    }

    #[test]
    fn test_multipart_concatenated_and_truncated() {
        let ctx = zmq::Context::new();
        let mut rep = MessageSocket::open(
            &ctx,
            SocketRole::Replier,
            attach("inproc://multipart", SocketRole::Replier),
        )
        .unwrap();

        let raw = ctx.socket(zmq::REQ).unwrap();
        raw.connect("inproc://multipart").unwrap();
        raw.send_multipart([&b"abc"[..], &b"defg"[..]], 0).unwrap();

        assert_eq!(rep.recv(5).unwrap(), Bytes::from_static(b"abcde"));
    }

    #[test]
    fn test_empty_message_is_end_of_stream() {
        let ctx = zmq::Context::new();
        let mut rep = MessageSocket::open(
            &ctx,
            SocketRole::Replier,
            attach("inproc://empty", SocketRole::Replier),
        )
        .unwrap();

        let raw = ctx.socket(zmq::REQ).unwrap();
        raw.connect("inproc://empty").unwrap();
        raw.send(&b""[..], 0).unwrap();

        assert!(matches!(rep.recv(1024), Err(BridgeError::EndOfStream)));
    }

    #[test]
    fn test_relaxed_requester_sends_twice() {
        let ctx = zmq::Context::new();
        let _rep = MessageSocket::open(
            &ctx,
            SocketRole::Replier,
            attach("inproc://relaxed", SocketRole::Replier),
        )
        .unwrap();
        let mut req = MessageSocket::open(
            &ctx,
            SocketRole::Requester,
            attach("inproc://relaxed", SocketRole::Requester),
        )
        .unwrap();

        req.send(b"first").unwrap();
        req.send(b"second").unwrap();
    }

    #[test]
    fn test_restart_rebinds_same_address() {
        let ctx = zmq::Context::new();
        let mut rep = MessageSocket::open(
            &ctx,
            SocketRole::Replier,
            attach("inproc://restart", SocketRole::Replier),
        )
        .unwrap()
        .with_restart_policy(RetryPolicy::fixed(20, Duration::from_millis(5)));

        rep.restart().unwrap();
        assert!(rep.is_open());
        assert_eq!(rep.restarts(), 1);

        let mut req = MessageSocket::open(
            &ctx,
            SocketRole::Requester,
            attach("inproc://restart", SocketRole::Requester),
        )
        .unwrap();
        req.send(b"after restart").unwrap();
        assert_eq!(rep.recv(1024).unwrap(), Bytes::from_static(b"after restart"));
    }

    #[test]
    fn test_restart_exhausted_when_address_taken() {
        let ctx = zmq::Context::new();
        let mut first = MessageSocket::open(
            &ctx,
            SocketRole::Publisher,
            attach("inproc://taken", SocketRole::Publisher),
        )
        .unwrap();
        first.close();

        // Someone else grabs the address while the socket is down; the
        // close is asynchronous, so wait for the address to come free
        let mut squatter = None;
        for _ in 0..200 {
            let taken = attach("inproc://taken", SocketRole::Publisher);
            if let Ok(socket) = MessageSocket::open(&ctx, SocketRole::Publisher, taken) {
                squatter = Some(socket);
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(squatter.is_some(), "address never released");

        let mut first = first.with_restart_policy(RetryPolicy::fixed(2, Duration::from_millis(1)));
        let err = first.restart().unwrap_err();
        assert!(matches!(
            err,
            BridgeError::RestartExhausted {
                role: SocketRole::Publisher,
                attempts: 2
            }
        ));
        assert!(!first.is_open());
    }

    #[test]
    fn test_closed_socket_reports_transport_error() {
        let ctx = zmq::Context::new();
        let mut publisher = MessageSocket::open(
            &ctx,
            SocketRole::Publisher,
            attach("inproc://closed", SocketRole::Publisher),
        )
        .unwrap();
        publisher.close();
        assert!(matches!(publisher.send(b"x"), Err(BridgeError::Transport(_))));
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let ctx = zmq::Context::new();
        let result = MessageSocket::open(
            &ctx,
            SocketRole::Subscriber,
            attach("tcp://127.0.0.1:not-a-port", SocketRole::Subscriber),
        );
        assert!(matches!(result, Err(BridgeError::Transport(_))));
    }
}
