//! Attach addresses for messaging sockets.
//!
//! An attach string is a comma-separated list of transport endpoints. Each
//! entry may carry a `@` prefix (bind) or a `>` prefix (connect); entries
//! without a prefix use the default direction of the socket role.
//!
//! ```
//! use zbridge_core::address::{AttachList, AttachMode};
//! use zbridge_core::role::SocketRole;
//!
//! let list = AttachList::parse("tcp://*:5555,>ipc:///tmp/up.sock", SocketRole::Publisher).unwrap();
//! assert_eq!(list.entries()[0].mode, AttachMode::Bind);
//! assert_eq!(list.entries()[1].mode, AttachMode::Connect);
//! ```

use std::fmt;

use crate::role::SocketRole;

/// Transports accepted in an attach string.
const SCHEMES: &[&str] = &["tcp://", "ipc://", "inproc://", "pgm://", "epgm://"];

/// Whether an entry is bound or connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachMode {
    Bind,
    Connect,
}

/// One endpoint of an attach list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attach {
    pub mode: AttachMode,
    /// Transport endpoint without the bind/connect prefix, e.g. `tcp://*:5555`
    pub endpoint: String,
}

impl fmt::Display for Attach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            AttachMode::Bind => write!(f, "@{}", self.endpoint),
            AttachMode::Connect => write!(f, ">{}", self.endpoint),
        }
    }
}

/// Parsed, validated attach string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachList {
    entries: Vec<Attach>,
}

impl AttachList {
    /// Parse an attach string, resolving un-prefixed entries against `role`.
    pub fn parse(s: &str, role: SocketRole) -> Result<Self, AddressError> {
        let default_mode = if role.is_serverish() {
            AttachMode::Bind
        } else {
            AttachMode::Connect
        };

        let mut entries = Vec::new();
        for raw in s.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let (mode, endpoint) = if let Some(rest) = raw.strip_prefix('@') {
                (AttachMode::Bind, rest)
            } else if let Some(rest) = raw.strip_prefix('>') {
                (AttachMode::Connect, rest)
            } else {
                (default_mode, raw)
            };

            let Some(scheme) = SCHEMES.iter().find(|scheme| endpoint.starts_with(*scheme)) else {
                return Err(AddressError::InvalidScheme(endpoint.to_string()));
            };
            if endpoint.len() == scheme.len() {
                return Err(AddressError::MissingTarget(endpoint.to_string()));
            }

            entries.push(Attach {
                mode,
                endpoint: endpoint.to_string(),
            });
        }

        if entries.is_empty() {
            return Err(AddressError::Empty);
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[Attach] {
        &self.entries
    }
}

impl fmt::Display for AttachList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

/// Errors that can occur when parsing attach strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid scheme in endpoint: {0} (expected tcp://, ipc://, inproc://, pgm:// or epgm://)")]
    InvalidScheme(String),

    #[error("Endpoint has no target: {0}")]
    MissingTarget(String),

    #[error("Empty attach string")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_for_publisher() {
        let list = AttachList::parse("tcp://*:43031", SocketRole::Publisher).unwrap();
        assert_eq!(list.entries().len(), 1);
        assert_eq!(list.entries()[0].mode, AttachMode::Bind);
        assert_eq!(list.entries()[0].endpoint, "tcp://*:43031");
    }

    #[test]
    fn test_default_connect_for_subscriber() {
        let list = AttachList::parse("tcp://127.0.0.1:43030", SocketRole::Subscriber).unwrap();
        assert_eq!(list.entries()[0].mode, AttachMode::Connect);
    }

    #[test]
    fn test_prefix_overrides_role() {
        let list = AttachList::parse(">tcp://10.0.0.1:5555", SocketRole::Replier).unwrap();
        assert_eq!(list.entries()[0].mode, AttachMode::Connect);

        let list = AttachList::parse("@ipc:///tmp/req.sock", SocketRole::Requester).unwrap();
        assert_eq!(list.entries()[0].mode, AttachMode::Bind);
    }

    #[test]
    fn test_multiple_entries() {
        let list =
            AttachList::parse("@tcp://*:1, >inproc://peer", SocketRole::Subscriber).unwrap();
        assert_eq!(list.entries().len(), 2);
        assert_eq!(list.to_string(), "@tcp://*:1,>inproc://peer");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = AttachList::parse("http://127.0.0.1:5555", SocketRole::Publisher);
        assert!(matches!(result, Err(AddressError::InvalidScheme(_))));
    }

    #[test]
    fn test_missing_target() {
        let result = AttachList::parse("inproc://", SocketRole::Publisher);
        assert!(matches!(result, Err(AddressError::MissingTarget(_))));
    }

    #[test]
    fn test_empty() {
        assert_eq!(
            AttachList::parse(" , ", SocketRole::Publisher),
            Err(AddressError::Empty)
        );
    }
}
