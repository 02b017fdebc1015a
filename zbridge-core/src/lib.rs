//! zbridge Core
//!
//! Transport-agnostic building blocks of the byte-stream to message-socket
//! bridge:
//! - Frame segmentation over pluggable framers (`framer`, `segmenter`)
//! - Endpoint and readiness traits (`endpoint`)
//! - Forwarding loops for pub/sub and req/rep (`bridge`)
//! - Configuration, attach addresses and socket roles (`config`, `address`, `role`)
//! - Restart retry policy and shutdown broadcast (`retry`, `shutdown`)
//! - Error types (`error`)

#![cfg_attr(not(test), deny(unsafe_code))]
// Allow some pedantic lints that are intentional in this crate
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]
pub mod address;
pub mod bridge;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod framer;
pub mod retry;
pub mod role;
pub mod segmenter;
pub mod shutdown;

// Keep it minimal to avoid API lock-in.
pub mod prelude {
    pub use crate::address::{Attach, AttachList, AttachMode};
    pub use crate::bridge::{ForwardStats, PubSubBridge, ReqRepBridge, ReqRepState, ReqRepStats};
    pub use crate::config::{BridgeConfig, ByteStreamSource, Mode};
    pub use crate::endpoint::{Endpoint, EndpointKind, Multiplexer};
    pub use crate::error::{BridgeError, ConfigError, Result};
    pub use crate::framer::{Framer, FramerKind};
    pub use crate::retry::RetryPolicy;
    pub use crate::role::SocketRole;
    pub use crate::segmenter::FrameSegmenter;
    pub use crate::shutdown::{Shutdown, ShutdownSignal, ShutdownTrigger};
}
