/// zbridge Error Types
///
/// Error handling shared by every bridge loop and endpoint implementation.

use std::io;
use thiserror::Error;

use crate::address::AddressError;
use crate::role::SocketRole;

/// Main error type for bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// IO error on a byte-stream endpoint
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The endpoint reported end-of-stream (zero-length read)
    #[error("End of stream")]
    EndOfStream,

    /// Message transport failure (send/recv/poll/open on a messaging socket)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A messaging socket could not be reopened within its retry budget
    #[error("Restart of {role} socket failed after {attempts} attempts")]
    RestartExhausted { role: SocketRole, attempts: u32 },

    /// Restart was requested on an endpoint that cannot be restarted
    #[error("Endpoint does not support restart")]
    RestartUnsupported,

    /// The shutdown broadcast fired while the operation was in progress
    #[error("Cancelled by shutdown")]
    Cancelled,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Create a transport error from any displayable cause
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self::Transport(cause.to_string())
    }

    /// Check if this error is a plain end-of-stream
    #[must_use]
    pub const fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    /// Check if this error should end the owning loop.
    ///
    /// Everything except cancellation is fatal to the concurrency unit that
    /// observed it; cancellation is a clean exit.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// Configuration errors, detected once at startup before any endpoint exists.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no byte-stream source selected (use --file or --tcp-l)")]
    NoByteStream,

    #[error("ZMQ address(es) not specified")]
    NoSocketRole,

    #[error("conflicting socket modes: {0}")]
    ConflictingModes(String),

    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("invalid framer: {0}")]
    UnknownFramer(String),

    #[error("invalid reply timeout: {0}")]
    InvalidTimeout(String),
}
