//! Bridge configuration.
//!
//! A [`BridgeConfig`] is built once at startup, validated, and then shared
//! read-only by every concurrency unit. Invalid combinations are rejected
//! before any endpoint is constructed.
//!
//! # Examples
//!
//! ```
//! use zbridge_core::config::{BridgeConfig, Mode};
//! use zbridge_core::framer::FramerKind;
//! use std::time::Duration;
//!
//! let config = BridgeConfig::builder()
//!     .with_publish("tcp://*:43031")
//!     .with_subscribe("tcp://127.0.0.1:43030")
//!     .with_file("/dev/ttyUSB0")
//!     .with_framer(FramerKind::Sbp)
//!     .build()
//!     .unwrap();
//!
//! assert!(matches!(config.mode, Mode::PubSub { .. }));
//! assert_eq!(config.reply_timeout, Duration::from_secs(10));
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::address::AttachList;
use crate::error::ConfigError;
use crate::framer::FramerKind;
use crate::retry::RetryPolicy;
use crate::role::SocketRole;

/// Reply timeout before a REP socket is reset.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest unit read from an endpoint in one call.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 65536;

/// Upper bound on any wait, so units observe shutdown promptly.
pub const DEFAULT_SHUTDOWN_TICK: Duration = Duration::from_millis(100);

/// Where the byte stream comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteStreamSource {
    /// File or character device, opened read+write
    File(PathBuf),
    /// Listening TCP port; one connection is served at a time
    TcpListen(u16),
}

/// Messaging mode with resolved attach lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Independent publish and/or subscribe directions
    PubSub {
        publish: Option<AttachList>,
        subscribe: Option<AttachList>,
    },
    /// Requests read from the byte stream go out through a REQ socket
    Request(AttachList),
    /// Requests arriving on a REP socket are answered by the byte stream
    Reply(AttachList),
}

impl Mode {
    /// Socket roles this mode opens.
    pub fn roles(&self) -> Vec<SocketRole> {
        match self {
            Self::PubSub { publish, subscribe } => {
                let mut roles = Vec::with_capacity(2);
                if publish.is_some() {
                    roles.push(SocketRole::Publisher);
                }
                if subscribe.is_some() {
                    roles.push(SocketRole::Subscriber);
                }
                roles
            }
            Self::Request(_) => vec![SocketRole::Requester],
            Self::Reply(_) => vec![SocketRole::Replier],
        }
    }
}

/// Validated, immutable bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub mode: Mode,
    pub source: ByteStreamSource,
    /// Framer applied on the byte-stream to message-socket path
    pub framer: FramerKind,
    /// Reply timeout; only used when a REP socket is being protected
    pub reply_timeout: Duration,
    pub read_buffer_size: usize,
    /// Policy used to reopen a messaging socket after a liveness violation
    pub restart_policy: RetryPolicy,
    pub shutdown_tick: Duration,
    pub debug: bool,
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }
}

/// Builder collecting raw options before validation.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    publish: Option<String>,
    subscribe: Option<String>,
    request: Option<String>,
    reply: Option<String>,
    file: Option<PathBuf>,
    tcp_listen: Option<u16>,
    framer: FramerKind,
    reply_timeout: Option<Duration>,
    read_buffer_size: Option<usize>,
    restart_policy: Option<RetryPolicy>,
    shutdown_tick: Option<Duration>,
    debug: bool,
}

impl BridgeConfigBuilder {
    /// PUB socket address (sink for byte-stream data).
    pub fn with_publish(mut self, addr: impl Into<String>) -> Self {
        self.publish = Some(addr.into());
        self
    }

    /// SUB socket address (source of byte-stream data).
    pub fn with_subscribe(mut self, addr: impl Into<String>) -> Self {
        self.subscribe = Some(addr.into());
        self
    }

    /// REQ socket address.
    pub fn with_request(mut self, addr: impl Into<String>) -> Self {
        self.request = Some(addr.into());
        self
    }

    /// REP socket address.
    pub fn with_reply(mut self, addr: impl Into<String>) -> Self {
        self.reply = Some(addr.into());
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn with_tcp_listen(mut self, port: u16) -> Self {
        self.tcp_listen = Some(port);
        self
    }

    pub fn with_framer(mut self, framer: FramerKind) -> Self {
        self.framer = framer;
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = Some(size);
        self
    }

    pub fn with_restart_policy(mut self, policy: RetryPolicy) -> Self {
        self.restart_policy = Some(policy);
        self
    }

    pub fn with_shutdown_tick(mut self, tick: Duration) -> Self {
        self.shutdown_tick = Some(tick);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<BridgeConfig, ConfigError> {
        let source = match (self.file, self.tcp_listen) {
            (Some(path), None) => ByteStreamSource::File(path),
            (None, Some(port)) => ByteStreamSource::TcpListen(port),
            (Some(_), Some(_)) => {
                return Err(ConfigError::ConflictingModes(
                    "--file and --tcp-l are mutually exclusive".to_string(),
                ))
            }
            (None, None) => return Err(ConfigError::NoByteStream),
        };

        let pubsub = self.publish.is_some() || self.subscribe.is_some();
        let mode = match (pubsub, self.request, self.reply) {
            (false, None, None) => return Err(ConfigError::NoSocketRole),
            (_, Some(_), Some(_)) => {
                return Err(ConfigError::ConflictingModes(
                    "--req and --rep may not be combined".to_string(),
                ))
            }
            (true, Some(_), None) | (true, None, Some(_)) => {
                return Err(ConfigError::ConflictingModes(
                    "--req/--rep may not be combined with --pub/--sub".to_string(),
                ))
            }
            (false, Some(addr), None) => {
                Mode::Request(AttachList::parse(&addr, SocketRole::Requester)?)
            }
            (false, None, Some(addr)) => {
                Mode::Reply(AttachList::parse(&addr, SocketRole::Replier)?)
            }
            (true, None, None) => Mode::PubSub {
                publish: self
                    .publish
                    .map(|addr| AttachList::parse(&addr, SocketRole::Publisher))
                    .transpose()?,
                subscribe: self
                    .subscribe
                    .map(|addr| AttachList::parse(&addr, SocketRole::Subscriber))
                    .transpose()?,
            },
        };

        let reply_timeout = self.reply_timeout.unwrap_or(DEFAULT_REPLY_TIMEOUT);
        if reply_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "reply timeout must be positive".to_string(),
            ));
        }

        Ok(BridgeConfig {
            mode,
            source,
            framer: self.framer,
            reply_timeout,
            read_buffer_size: self
                .read_buffer_size
                .unwrap_or(DEFAULT_READ_BUFFER_SIZE)
                .max(1),
            restart_policy: self.restart_policy.unwrap_or_default(),
            shutdown_tick: self.shutdown_tick.unwrap_or(DEFAULT_SHUTDOWN_TICK),
            debug: self.debug,
        })
    }
}
