//! Minimal length-prefixed framer: one length byte, then that many payload
//! bytes. Emits the payload without its prefix.

use bytes::{Bytes, BytesMut};

use super::Framer;

#[derive(Debug, Default)]
pub struct LengthPrefixedFramer {
    expected: Option<usize>,
    staging: BytesMut,
}

impl LengthPrefixedFramer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Framer for LengthPrefixedFramer {
    fn process(&mut self, input: &[u8]) -> (usize, Option<Bytes>) {
        if input.is_empty() {
            return (0, None);
        }

        let mut pos = 0;
        let expected = match self.expected {
            Some(len) => len,
            None => {
                pos = 1;
                let len = input[0] as usize;
                if len == 0 {
                    return (pos, Some(Bytes::new()));
                }
                self.expected = Some(len);
                len
            }
        };

        let take = (expected - self.staging.len()).min(input.len() - pos);
        self.staging.extend_from_slice(&input[pos..pos + take]);
        pos += take;

        if self.staging.len() < expected {
            return (pos, None);
        }

        self.expected = None;
        (pos, Some(self.staging.split().freeze()))
    }

    fn name(&self) -> &'static str {
        "length-prefixed"
    }
}
