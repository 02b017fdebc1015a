//! Socket roles used on the messaging side of a bridge.
//!
//! Only the four roles the bridge actually drives are modelled. Each role
//! carries its default attach direction: publishers and repliers bind,
//! subscribers and requesters connect.

use std::fmt;

/// Messaging socket role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketRole {
    /// PUB socket: sink for data read from the byte stream
    Publisher,

    /// SUB socket: source of data written to the byte stream
    Subscriber,

    /// REQ socket: forwards requests issued on the byte stream
    Requester,

    /// REP socket: accepts requests that the byte stream answers
    Replier,
}

impl SocketRole {
    /// Get the role as its ZeroMQ socket type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publisher => "PUB",
            Self::Subscriber => "SUB",
            Self::Requester => "REQ",
            Self::Replier => "REP",
        }
    }

    /// Whether an un-prefixed address should be bound rather than connected.
    pub const fn is_serverish(&self) -> bool {
        matches!(self, Self::Publisher | Self::Replier)
    }
}

impl fmt::Display for SocketRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(SocketRole::Publisher.to_string(), "PUB");
        assert_eq!(SocketRole::Subscriber.to_string(), "SUB");
        assert_eq!(SocketRole::Requester.to_string(), "REQ");
        assert_eq!(SocketRole::Replier.to_string(), "REP");
    }

    #[test]
    fn test_default_attach_direction() {
        assert!(SocketRole::Publisher.is_serverish());
        assert!(SocketRole::Replier.is_serverish());
        assert!(!SocketRole::Subscriber.is_serverish());
        assert!(!SocketRole::Requester.is_serverish());
    }
}
