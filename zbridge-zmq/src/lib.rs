//! # zbridge ZMQ
//!
//! Concrete endpoints for the zbridge loops:
//! - [`MessageSocket`]: libzmq PUB/SUB/REQ/REP socket with role options,
//!   attach lists and in-place restart
//! - [`ByteStream`]: blocking byte stream over any owned descriptor
//! - [`ZmqEndpoint`]: either of the above behind the core `Endpoint` trait
//! - [`ZmqPoller`]: `zmq_poll` over sockets and descriptors together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zbridge_core::address::AttachList;
//! use zbridge_core::bridge::PubSubBridge;
//! use zbridge_core::framer::FramerKind;
//! use zbridge_core::role::SocketRole;
//! use zbridge_core::segmenter::FrameSegmenter;
//! use zbridge_core::shutdown::Shutdown;
//! use zbridge_zmq::{ByteStream, Context, MessageSocket, ZmqEndpoint, ZmqPoller};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = Context::new();
//!     let serial = ByteStream::open("/dev/ttyUSB0")?;
//!     let publisher = MessageSocket::open(
//!         &ctx,
//!         SocketRole::Publisher,
//!         AttachList::parse("tcp://*:43031", SocketRole::Publisher)?,
//!     )?;
//!
//!     let (_trigger, shutdown) = Shutdown::pair();
//!     let mut bridge = PubSubBridge::new(
//!         ZmqEndpoint::from(serial),
//!         ZmqEndpoint::from(publisher),
//!         FrameSegmenter::new(FramerKind::Sbp),
//!         ZmqPoller::new(),
//!     );
//!     bridge.run(&shutdown)?;
//!     Ok(())
//! }
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod endpoint;
pub mod poller;
pub mod socket;
pub mod stream;

pub use endpoint::ZmqEndpoint;
pub use poller::ZmqPoller;
pub use socket::MessageSocket;
pub use stream::ByteStream;

/// Re-exported so callers share one context type with this crate.
pub use zmq::Context;
