//! Pluggable framing protocols.
//!
//! A [`Framer`] is fed arbitrary byte slices and reports how many bytes it
//! consumed and, at most once per call, a complete frame. It owns whatever
//! partial state it needs between calls.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::ConfigError;

pub mod length_prefixed;
pub mod sbp;

pub use length_prefixed::LengthPrefixedFramer;
pub use sbp::SbpFramer;

/// Incremental frame decoder.
///
/// Contract for a non-empty `input`:
/// - the returned count is in `1..=input.len()`;
/// - at most one frame is returned per call;
/// - every byte counted as consumed is either part of the returned frame, part
///   of retained partial state, or deliberately discarded while
///   resynchronising.
pub trait Framer: Send {
    /// Feed `input`; returns `(consumed, frame)`.
    fn process(&mut self, input: &[u8]) -> (usize, Option<Bytes>);

    /// Protocol name used in logs.
    fn name(&self) -> &'static str;
}

/// Framer selection, as given on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FramerKind {
    /// Pass bytes through unsegmented
    #[default]
    None,
    /// Swift Binary Protocol
    Sbp,
    /// One length byte followed by the payload
    LengthPrefixed,
}

impl FramerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Sbp => "sbp",
            Self::LengthPrefixed => "length-prefixed",
        }
    }

    /// Build a fresh framer for this kind, or `None` for pass-through.
    pub fn build(&self) -> Option<Box<dyn Framer>> {
        match self {
            Self::None => None,
            Self::Sbp => Some(Box::new(SbpFramer::new())),
            Self::LengthPrefixed => Some(Box::new(LengthPrefixedFramer::new())),
        }
    }
}

impl FromStr for FramerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "sbp" => Ok(Self::Sbp),
            "length-prefixed" | "lp" => Ok(Self::LengthPrefixed),
            _ => Err(ConfigError::UnknownFramer(s.to_string())),
        }
    }
}

impl fmt::Display for FramerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
