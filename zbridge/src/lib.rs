//! # zbridge
//!
//! Bridges a byte stream (serial device, file, TCP connection) to ZeroMQ
//! message sockets.
//!
//! ## Architecture
//!
//! - **`zbridge-core`**: framers, segmenter, endpoint traits, bridge loops,
//!   configuration (transport-agnostic, tested with in-memory endpoints)
//! - **`zbridge-zmq`**: libzmq sockets, raw byte streams, `zmq_poll`
//! - **`zbridge`**: session supervision, byte-stream sources, signals and
//!   the `zmq_adapter` binary (this crate)
//!
//! ## Modes
//!
//! - **pub/sub**: byte stream to PUB, SUB to byte stream; independent
//!   threads, either direction optional
//! - **req**: byte-stream requests go out through a REQ socket
//! - **rep**: requests arriving on a REP socket are answered by the byte
//!   stream; a late reply resets the REP socket
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zbridge::prelude::*;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let config = BridgeConfig::builder()
//!     .with_publish("tcp://*:43031")
//!     .with_subscribe("tcp://127.0.0.1:43030")
//!     .with_file("/dev/ttyUSB0")
//!     .with_framer(FramerKind::Sbp)
//!     .build()?;
//!
//! let (trigger, shutdown) = Shutdown::pair();
//! let _signals = zbridge::signals::install(trigger)?;
//! Supervisor::new(config).run(&shutdown)?;
//! # Ok(())
//! # }
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod dev_tracing;
pub mod hangup;
pub mod signals;
pub mod source;
pub mod supervisor;

pub use supervisor::{Supervisor, Unit, UnitOutcome, UnitStats};

// Re-export the building blocks for direct use
pub use zbridge_core as core;
pub use zbridge_zmq as transport;

pub mod prelude {
    pub use crate::supervisor::{Supervisor, Unit, UnitOutcome, UnitStats};
    pub use zbridge_core::prelude::*;
    pub use zbridge_zmq::{ByteStream, MessageSocket, ZmqEndpoint, ZmqPoller};
}
