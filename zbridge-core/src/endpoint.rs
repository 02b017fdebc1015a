//! Endpoint abstraction shared by every bridge loop.
//!
//! A byte-stream side (file descriptor, accepted TCP connection) and a
//! messaging side (PUB/SUB/REQ/REP socket) are both driven through
//! [`Endpoint`]: read one unit, write one unit with write-all semantics.
//! Readiness across endpoints comes from a [`Multiplexer`], so loops never
//! block in `read` when they still have other work to watch.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{BridgeError, Result};
use crate::role::SocketRole;

/// Capability tag of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Raw descriptor: short reads are normal, nothing is delimited
    ByteStream,
    /// Message socket of a given role: whole messages in, whole messages out
    Messaging(SocketRole),
}

impl EndpointKind {
    pub const fn is_messaging(&self) -> bool {
        matches!(self, Self::Messaging(_))
    }

    pub const fn role(&self) -> Option<SocketRole> {
        match self {
            Self::ByteStream => None,
            Self::Messaging(role) => Some(*role),
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByteStream => f.write_str("byte-stream"),
            Self::Messaging(role) => write!(f, "{role} socket"),
        }
    }
}

/// Unified read/write contract.
///
/// Both operations may block. Any error, and a zero-length read, ends the
/// owning loop.
pub trait Endpoint: Send {
    fn kind(&self) -> EndpointKind;

    /// Read one unit of at most `max_len` bytes.
    ///
    /// Byte streams return whatever is available; messaging sockets return one
    /// message with all of its parts concatenated. End-of-stream is reported as
    /// [`BridgeError::EndOfStream`], never as an empty buffer.
    fn read(&mut self, max_len: usize) -> Result<Bytes>;

    /// Write all of `data` as one unit; returns the number of bytes written.
    fn write_all(&mut self, data: &[u8]) -> Result<usize>;

    /// Close and reopen with the same role and address.
    fn restart(&mut self) -> Result<()> {
        Err(BridgeError::RestartUnsupported)
    }
}

/// Readiness wait across several endpoints of the same type.
pub trait Multiplexer<E: Endpoint> {
    /// Wait until at least one endpoint is readable or `timeout` elapses.
    ///
    /// `None` waits indefinitely. Returns per-endpoint readability in the
    /// order given; all `false` means the timeout elapsed.
    fn wait<const N: usize>(
        &mut self,
        endpoints: [&E; N],
        timeout: Option<Duration>,
    ) -> Result<[bool; N]>;
}
