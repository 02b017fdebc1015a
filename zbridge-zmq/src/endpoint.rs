//! Concrete endpoints driven by the bridge loops.

use std::os::fd::AsRawFd;

use bytes::Bytes;
use zbridge_core::endpoint::{Endpoint, EndpointKind};
use zbridge_core::error::{BridgeError, Result};

use crate::socket::MessageSocket;
use crate::stream::ByteStream;

/// Either side of a bridge: a raw byte stream or a message socket.
#[derive(Debug)]
pub enum ZmqEndpoint {
    Stream(ByteStream),
    Socket(MessageSocket),
}

impl ZmqEndpoint {
    /// Readiness registration for `zmq_poll`.
    pub(crate) fn poll_item(&self) -> Result<zmq::PollItem<'_>> {
        match self {
            Self::Stream(stream) => Ok(zmq::PollItem::from_fd(stream.as_raw_fd(), zmq::POLLIN)),
            Self::Socket(socket) => socket.poll_item(zmq::POLLIN),
        }
    }

    pub fn as_socket(&self) -> Option<&MessageSocket> {
        match self {
            Self::Socket(socket) => Some(socket),
            Self::Stream(_) => None,
        }
    }
}

impl From<ByteStream> for ZmqEndpoint {
    fn from(stream: ByteStream) -> Self {
        Self::Stream(stream)
    }
}

impl From<MessageSocket> for ZmqEndpoint {
    fn from(socket: MessageSocket) -> Self {
        Self::Socket(socket)
    }
}

impl Endpoint for ZmqEndpoint {
    fn kind(&self) -> EndpointKind {
        match self {
            Self::Stream(_) => EndpointKind::ByteStream,
            Self::Socket(socket) => EndpointKind::Messaging(socket.role()),
        }
    }

    fn read(&mut self, max_len: usize) -> Result<Bytes> {
        match self {
            Self::Stream(stream) => stream.read_chunk(max_len),
            Self::Socket(socket) => socket.recv(max_len),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<usize> {
        match self {
            Self::Stream(stream) => stream.write_chunk(data),
            Self::Socket(socket) => socket.send(data),
        }
    }

    fn restart(&mut self) -> Result<()> {
        match self {
            Self::Socket(socket) => socket.restart(),
            Self::Stream(_) => Err(BridgeError::RestartUnsupported),
        }
    }
}
