//! Frame segmentation over a pluggable [`Framer`].
//!
//! The segmenter is the only place that talks to a framer. It enforces the
//! forward-progress contract (every call on non-empty input consumes at least
//! one byte and never more than it was given) and degrades to the identity
//! function when no framer is configured.

use bytes::Bytes;
use tracing::error;

use crate::framer::{Framer, FramerKind};

/// Result of one segmentation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Input bytes accounted for by this step
    pub consumed: usize,
    /// Frame completed by this step, if any
    pub frame: Option<Bytes>,
}

/// Stateful segmenter owned by exactly one bridge loop.
pub struct FrameSegmenter {
    framer: Option<Box<dyn Framer>>,
}

impl FrameSegmenter {
    /// Build a segmenter with a fresh framer of the given kind.
    pub fn new(kind: FramerKind) -> Self {
        Self {
            framer: kind.build(),
        }
    }

    /// Identity segmenter: every chunk is one frame.
    pub fn passthrough() -> Self {
        Self { framer: None }
    }

    pub fn with_framer(framer: Box<dyn Framer>) -> Self {
        Self {
            framer: Some(framer),
        }
    }

    /// Framer name for logs.
    pub fn name(&self) -> &'static str {
        self.framer.as_ref().map_or("none", |framer| framer.name())
    }

    /// Feed `buffer` and report what was consumed and completed.
    pub fn process(&mut self, buffer: &Bytes) -> Segment {
        if buffer.is_empty() {
            return Segment {
                consumed: 0,
                frame: None,
            };
        }

        let Some(framer) = self.framer.as_mut() else {
            return Segment {
                consumed: buffer.len(),
                frame: Some(buffer.clone()),
            };
        };

        let (consumed, frame) = framer.process(buffer);
        let clamped = consumed.clamp(1, buffer.len());
        if clamped != consumed {
            error!(
                framer = framer.name(),
                consumed,
                available = buffer.len(),
                "[SEGMENTER] framer broke the consumed-bytes contract"
            );
        }

        Segment {
            consumed: clamped,
            frame,
        }
    }

    /// Iterate over every frame completed by `chunk`, in order.
    ///
    /// Partial trailing data stays in the framer for the next chunk.
    pub fn frames(&mut self, chunk: Bytes) -> Frames<'_> {
        Frames {
            segmenter: self,
            rest: chunk,
        }
    }
}

impl std::fmt::Debug for FrameSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSegmenter")
            .field("framer", &self.name())
            .finish()
    }
}

/// Iterator returned by [`FrameSegmenter::frames`].
pub struct Frames<'a> {
    segmenter: &'a mut FrameSegmenter,
    rest: Bytes,
}

impl Frames<'_> {
    /// Bytes of the chunk not yet fed to the framer.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

impl Iterator for Frames<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        while !self.rest.is_empty() {
            let segment = self.segmenter.process(&self.rest);
            let _ = self.rest.split_to(segment.consumed);
            if segment.frame.is_some() {
                return segment.frame;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::sbp;

    /// Framer that claims to consume nothing, to exercise the clamp.
    struct Stuck;

    impl Framer for Stuck {
        fn process(&mut self, _input: &[u8]) -> (usize, Option<Bytes>) {
            (0, None)
        }

        fn name(&self) -> &'static str {
            "stuck"
        }
    }

    /// Framer that over-reports consumption.
    struct Greedy;

    impl Framer for Greedy {
        fn process(&mut self, input: &[u8]) -> (usize, Option<Bytes>) {
            (input.len() + 10, None)
        }

        fn name(&self) -> &'static str {
            "greedy"
        }
    }

    fn chunked(data: &[u8], size: usize) -> Vec<Bytes> {
        data.chunks(size).map(Bytes::copy_from_slice).collect()
    }

    #[test]
    fn test_passthrough_is_identity() {
        let mut seg = FrameSegmenter::passthrough();
        let chunk = Bytes::from_static(b"raw bytes");
        let segment = seg.process(&chunk);
        assert_eq!(segment.consumed, chunk.len());
        assert_eq!(segment.frame, Some(chunk));
    }

    #[test]
    fn test_empty_input() {
        let mut seg = FrameSegmenter::new(FramerKind::Sbp);
        let segment = seg.process(&Bytes::new());
        assert_eq!(segment.consumed, 0);
        assert!(segment.frame.is_none());
    }

    #[test]
    fn test_forward_progress_clamped() {
        let mut seg = FrameSegmenter::with_framer(Box::new(Stuck));
        let segment = seg.process(&Bytes::from_static(b"abc"));
        assert_eq!(segment.consumed, 1);

        let mut seg = FrameSegmenter::with_framer(Box::new(Greedy));
        let segment = seg.process(&Bytes::from_static(b"abc"));
        assert_eq!(segment.consumed, 3);

        // The iterator terminates even with a misbehaving framer
        let mut seg = FrameSegmenter::with_framer(Box::new(Stuck));
        assert_eq!(seg.frames(Bytes::from_static(b"abcdef")).count(), 0);
    }

    #[test]
    fn test_consumed_within_bounds_for_every_chunking() {
        let mut stream = Vec::new();
        for i in 0..6u8 {
            stream.extend_from_slice(&sbp::encode(u16::from(i), 7, &vec![i; usize::from(i) * 3]));
            stream.extend_from_slice(&[0xAA, i]);
        }

        for size in 1..=stream.len() {
            let mut seg = FrameSegmenter::new(FramerKind::Sbp);
            for chunk in chunked(&stream, size) {
                let mut rest = chunk;
                while !rest.is_empty() {
                    let segment = seg.process(&rest);
                    assert!(segment.consumed >= 1);
                    assert!(segment.consumed <= rest.len());
                    let _ = rest.split_to(segment.consumed);
                }
            }
        }
    }

    #[test]
    fn test_sbp_segmentation_preserves_bytes() {
        let frames: Vec<Bytes> = (0..8u16)
            .map(|i| sbp::encode(0x100 + i, 0x4242, &vec![i as u8; (i as usize * 17) % 60]))
            .collect();
        let stream: Vec<u8> = frames.iter().flat_map(|f| f.iter().copied()).collect();

        for size in [1, 2, 3, 5, 8, 13, 64, stream.len()] {
            let mut seg = FrameSegmenter::new(FramerKind::Sbp);
            let mut out = Vec::new();
            for chunk in chunked(&stream, size) {
                out.extend(seg.frames(chunk));
            }
            assert_eq!(out, frames, "chunk size {size}");
        }
    }

    #[test]
    fn test_length_prefixed_scenario() {
        let mut seg = FrameSegmenter::new(FramerKind::LengthPrefixed);
        let frames: Vec<Bytes> = seg.frames(Bytes::from_static(b"\x03ABC\x02XY")).collect();
        assert_eq!(
            frames,
            vec![Bytes::from_static(b"ABC"), Bytes::from_static(b"XY")]
        );
    }

    #[test]
    fn test_partial_frame_survives_between_chunks() {
        let mut seg = FrameSegmenter::new(FramerKind::LengthPrefixed);
        assert_eq!(seg.frames(Bytes::from_static(b"\x04AB")).count(), 0);
        let frames: Vec<Bytes> = seg.frames(Bytes::from_static(b"CD\x01E")).collect();
        assert_eq!(
            frames,
            vec![Bytes::from_static(b"ABCD"), Bytes::from_static(b"E")]
        );
    }

    #[test]
    fn test_passthrough_concatenation() {
        let input = b"the quick brown fox jumps over the lazy dog";
        for size in 1..input.len() {
            let mut seg = FrameSegmenter::passthrough();
            let mut out = Vec::new();
            for chunk in chunked(input, size) {
                for frame in seg.frames(chunk.clone()) {
                    assert_eq!(frame, chunk);
                    out.extend_from_slice(&frame);
                }
            }
            assert_eq!(out, input);
        }
    }
}
