//! Swift Binary Protocol framer.
//!
//! Wire layout (little endian):
//!
//! ```text
//! +----------+----------+--------+--------+-------------+---------+
//! | preamble | msg type | sender | length |   payload   |   crc   |
//! |   0x55   |   u16    |  u16   |   u8   | length bytes|   u16   |
//! +----------+----------+--------+--------+-------------+---------+
//! ```
//!
//! The CRC is CRC-16/XMODEM over msg type, sender, length and payload.
//! Emitted frames are complete wire frames, preamble through CRC, so they can
//! be forwarded as-is. Bytes outside a frame are skipped while hunting for the
//! preamble. A candidate with a bad CRC is dropped and the bytes after its
//! preamble are searched again, so a corrupted length cannot swallow the
//! frames that follow.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{trace, warn};

use super::Framer;

pub const PREAMBLE: u8 = 0x55;

/// Preamble + msg type + sender + length
pub const HEADER_LEN: usize = 6;

pub const CRC_LEN: usize = 2;

/// Largest possible wire frame
pub const MAX_FRAME_LEN: usize = HEADER_LEN + u8::MAX as usize + CRC_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Preamble,
    Header,
    Body,
}

/// Stateful SBP decoder.
pub struct SbpFramer {
    state: State,
    staging: BytesMut,
    frame_len: usize,
    /// Bytes of a dropped candidate still to be searched, ahead of new input
    rescan: BytesMut,
    crc_errors: u64,
}

impl Default for SbpFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl SbpFramer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Preamble,
            staging: BytesMut::with_capacity(MAX_FRAME_LEN),
            frame_len: 0,
            rescan: BytesMut::new(),
            crc_errors: 0,
        }
    }

    /// Number of candidate frames dropped because of a CRC mismatch.
    pub const fn crc_errors(&self) -> u64 {
        self.crc_errors
    }

    fn finish(&mut self) -> Option<Bytes> {
        self.state = State::Preamble;

        let body = &self.staging[1..self.frame_len - CRC_LEN];
        let expected = u16::from_le_bytes([
            self.staging[self.frame_len - 2],
            self.staging[self.frame_len - 1],
        ]);
        let actual = crc16(body);

        if actual != expected {
            self.crc_errors += 1;
            warn!(expected, actual, "[SBP] CRC mismatch, dropping frame");
            // Everything after the false preamble goes back to the search
            let tail = self.staging.split_off(1);
            self.staging.clear();
            self.rescan.unsplit(tail);
            return None;
        }

        trace!(len = self.frame_len, "[SBP] frame complete");
        Some(self.staging.split().freeze())
    }

    /// Run the held-back bytes through the decoder until one frame comes
    /// out or nothing is left to search.
    fn drain_rescan(&mut self) -> Option<Bytes> {
        while !self.rescan.is_empty() {
            let backlog = self.rescan.split();
            let (used, frame) = self.scan(&backlog);
            // A nested mismatch refilled `rescan`; the unsearched rest follows it
            self.rescan.extend_from_slice(&backlog[used..]);
            if frame.is_some() {
                return frame;
            }
        }
        None
    }

    /// Decode from `input`, stopping after a frame or a CRC mismatch.
    fn scan(&mut self, input: &[u8]) -> (usize, Option<Bytes>) {
        let mut pos = 0;

        while pos < input.len() {
            match self.state {
                State::Preamble => {
                    // Skip to the next preamble byte
                    match input[pos..].iter().position(|&b| b == PREAMBLE) {
                        Some(offset) => {
                            pos += offset + 1;
                            self.staging.clear();
                            self.staging.put_u8(PREAMBLE);
                            self.state = State::Header;
                        }
                        None => return (input.len(), None),
                    }
                }
                State::Header => {
                    let take = (HEADER_LEN - self.staging.len()).min(input.len() - pos);
                    self.staging.extend_from_slice(&input[pos..pos + take]);
                    pos += take;

                    if self.staging.len() == HEADER_LEN {
                        let payload_len = self.staging[HEADER_LEN - 1] as usize;
                        self.frame_len = HEADER_LEN + payload_len + CRC_LEN;
                        self.state = State::Body;
                    }
                }
                State::Body => {
                    let take = (self.frame_len - self.staging.len()).min(input.len() - pos);
                    self.staging.extend_from_slice(&input[pos..pos + take]);
                    pos += take;

                    if self.staging.len() == self.frame_len {
                        return (pos, self.finish());
                    }
                }
            }
        }

        (pos, None)
    }
}

impl Framer for SbpFramer {
    fn process(&mut self, input: &[u8]) -> (usize, Option<Bytes>) {
        let Some(&next) = input.first() else {
            return (0, None);
        };
        if self.rescan.is_empty() {
            return self.scan(input);
        }

        // Held-back bytes come first; take one new byte per call so every call
        // consumes input
        self.rescan.put_u8(next);
        (1, self.drain_rescan())
    }

    fn name(&self) -> &'static str {
        "sbp"
    }
}

/// CRC-16/XMODEM (poly 0x1021, init 0, no reflection).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Encode one SBP frame. Payloads longer than 255 bytes are truncated.
pub fn encode(msg_type: u16, sender: u16, payload: &[u8]) -> Bytes {
    let payload = &payload[..payload.len().min(u8::MAX as usize)];
    let mut out = BytesMut::with_capacity(HEADER_LEN + payload.len() + CRC_LEN);
    out.put_u8(PREAMBLE);
    out.put_u16_le(msg_type);
    out.put_u16_le(sender);
    out.put_u8(payload.len() as u8);
    out.extend_from_slice(payload);
    let crc = crc16(&out[1..]);
    out.put_u16_le(crc);
    out.freeze()
}
