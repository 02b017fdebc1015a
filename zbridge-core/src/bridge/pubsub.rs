//! Unidirectional forwarding loop.
//!
//! Reads a chunk from the source, splits it into frames (or passes it whole)
//! and writes every frame to the sink before the next read. The loop has a
//! single "forwarding" state and ends on the first read or write failure;
//! retrying is never done mid-message.

use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::config::{DEFAULT_READ_BUFFER_SIZE, DEFAULT_SHUTDOWN_TICK};
use crate::endpoint::{Endpoint, Multiplexer};
use crate::error::{BridgeError, Result};
use crate::segmenter::FrameSegmenter;
use crate::shutdown::ShutdownSignal;

/// Counters kept by a forwarding loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ForwardStats {
    /// Source reads that returned data
    pub reads: u64,
    /// Frames written to the sink
    pub frames: u64,
    /// Bytes written to the sink
    pub bytes: u64,
}

pub struct PubSubBridge<E, M> {
    label: &'static str,
    source: E,
    sink: E,
    segmenter: FrameSegmenter,
    multiplexer: M,
    read_buffer_size: usize,
    tick: Duration,
    stats: ForwardStats,
}

impl<E, M> PubSubBridge<E, M>
where
    E: Endpoint,
    M: Multiplexer<E>,
{
    pub fn new(source: E, sink: E, segmenter: FrameSegmenter, multiplexer: M) -> Self {
        Self {
            label: "FWD",
            source,
            sink,
            segmenter,
            multiplexer,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            tick: DEFAULT_SHUTDOWN_TICK,
            stats: ForwardStats::default(),
        }
    }

    /// Tag used in log lines, e.g. `PUB` or `SUB`.
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// One iteration: wait up to one tick for the source, then forward one
    /// chunk. Returns the number of frames written, or `None` if the source
    /// was not ready.
    pub fn step(&mut self) -> Result<Option<usize>> {
        let [ready] = self.multiplexer.wait([&self.source], Some(self.tick))?;
        if !ready {
            return Ok(None);
        }

        let chunk = self.source.read(self.read_buffer_size)?;
        if chunk.is_empty() {
            return Err(BridgeError::EndOfStream);
        }
        trace!(bytes = chunk.len(), "[{}] read", self.label);
        self.stats.reads += 1;

        let mut written_frames = 0;
        for frame in self.segmenter.frames(chunk) {
            let written = self.sink.write_all(&frame)?;
            if written != frame.len() {
                warn!(
                    written,
                    frame_len = frame.len(),
                    "[{}] short write, frame truncated",
                    self.label
                );
            }
            trace!(bytes = written, "[{}] wrote frame", self.label);
            written_frames += 1;
            self.stats.frames += 1;
            self.stats.bytes += written as u64;
        }

        Ok(Some(written_frames))
    }

    /// Forward until a read or write fails or shutdown fires.
    ///
    /// Shutdown returns `Ok` with the final counters; any endpoint failure is
    /// returned as the error that ended the loop.
    pub fn run(&mut self, shutdown: &ShutdownSignal) -> Result<ForwardStats> {
        debug!(
            framer = self.segmenter.name(),
            source = %self.source.kind(),
            sink = %self.sink.kind(),
            "[{}] io loop begin",
            self.label
        );

        let result = loop {
            if shutdown.is_triggered() {
                break Ok(self.stats);
            }
            if let Err(e) = self.step() {
                break Err(e);
            }
        };

        info!(
            reads = self.stats.reads,
            frames = self.stats.frames,
            bytes = self.stats.bytes,
            "[{}] io loop end",
            self.label
        );
        result
    }

    pub fn stats(&self) -> ForwardStats {
        self.stats
    }

    pub fn source(&self) -> &E {
        &self.source
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    /// Give the endpoints back, e.g. to close them explicitly.
    pub fn into_endpoints(self) -> (E, E) {
        (self.source, self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::mock::{MockEndpoint, MockMultiplexer};
    use crate::framer::FramerKind;
    use crate::role::SocketRole;
    use crate::shutdown::Shutdown;

    fn publish_bridge(
        source: MockEndpoint,
        framer: FramerKind,
    ) -> PubSubBridge<MockEndpoint, MockMultiplexer> {
        PubSubBridge::new(
            source,
            MockEndpoint::socket(SocketRole::Publisher),
            FrameSegmenter::new(framer),
            MockMultiplexer::default(),
        )
        .with_label("PUB")
        .with_tick(Duration::from_millis(1))
    }

    #[test]
    fn test_unframed_reads_map_one_to_one() {
        let mut source = MockEndpoint::stream();
        source.push(b"first").push(b"second chunk").push(b"3");
        source.eof_when_drained = true;

        let mut bridge = publish_bridge(source, FramerKind::None);
        let (_trigger, shutdown) = Shutdown::pair();
        let err = bridge.run(&shutdown).unwrap_err();

        assert!(err.is_end_of_stream());
        assert_eq!(
            bridge.sink().written_str(),
            vec![&b"first"[..], &b"second chunk"[..], &b"3"[..]]
        );
        assert_eq!(
            bridge.stats(),
            ForwardStats {
                reads: 3,
                frames: 3,
                bytes: 18
            }
        );
    }

    #[test]
    fn test_length_prefixed_chunk_yields_two_writes() {
        let mut source = MockEndpoint::stream();
        source.push(b"\x03ABC\x02XY");

        let mut bridge = publish_bridge(source, FramerKind::LengthPrefixed);
        assert_eq!(bridge.step().unwrap(), Some(2));
        assert_eq!(bridge.sink().written_str(), vec![&b"ABC"[..], &b"XY"[..]]);
    }

    #[test]
    fn test_partial_frame_waits_for_next_read() {
        let mut source = MockEndpoint::stream();
        source.push(b"\x05HE").push(b"LLO\x01");

        let mut bridge = publish_bridge(source, FramerKind::LengthPrefixed);
        assert_eq!(bridge.step().unwrap(), Some(0));
        assert!(bridge.sink().written.is_empty());
        assert_eq!(bridge.step().unwrap(), Some(1));
        assert_eq!(bridge.sink().written_str(), vec![&b"HELLO"[..]]);
    }

    #[test]
    fn test_idle_source_is_not_read() {
        let mut bridge = publish_bridge(MockEndpoint::stream(), FramerKind::None);
        assert_eq!(bridge.step().unwrap(), None);
        assert_eq!(bridge.stats().reads, 0);
    }

    #[test]
    fn test_write_failure_ends_loop() {
        let mut source = MockEndpoint::stream();
        source.push(b"one").push(b"two");

        let mut sink = MockEndpoint::socket(SocketRole::Publisher);
        sink.fail_writes = true;

        let mut bridge = PubSubBridge::new(
            source,
            sink,
            FrameSegmenter::passthrough(),
            MockMultiplexer::default(),
        );
        let (_trigger, shutdown) = Shutdown::pair();
        let err = bridge.run(&shutdown).unwrap_err();

        assert!(matches!(err, BridgeError::Transport(_)));
        // The second chunk is never read
        assert_eq!(bridge.stats().reads, 1);
    }

    #[test]
    fn test_subscribe_direction_is_byte_for_byte() {
        let mut source = MockEndpoint::socket(SocketRole::Subscriber);
        source.push(b"\x03ABC\x02XY");

        let mut bridge = PubSubBridge::new(
            source,
            MockEndpoint::stream(),
            FrameSegmenter::passthrough(),
            MockMultiplexer::default(),
        );
        bridge.step().unwrap();
        assert_eq!(bridge.sink().written_str(), vec![&b"\x03ABC\x02XY"[..]]);
    }

    #[test]
    fn test_empty_unit_ends_loop() {
        let mut source = MockEndpoint::socket(SocketRole::Subscriber);
        source.push(b"before").push(b"").push(b"after");

        let mut bridge = PubSubBridge::new(
            source,
            MockEndpoint::stream(),
            FrameSegmenter::passthrough(),
            MockMultiplexer::default(),
        );
        let (_trigger, shutdown) = Shutdown::pair();
        let err = bridge.run(&shutdown).unwrap_err();

        assert!(err.is_end_of_stream());
        assert_eq!(bridge.sink().written_str(), vec![&b"before"[..]]);
        assert_eq!(bridge.stats().reads, 1);
    }

    #[test]
    fn test_shutdown_stops_loop() {
        let mut source = MockEndpoint::stream();
        source.push(b"never read");

        let mut bridge = publish_bridge(source, FramerKind::None);
        let (trigger, shutdown) = Shutdown::pair();
        trigger.fire();

        let stats = bridge.run(&shutdown).unwrap();
        assert_eq!(stats, ForwardStats::default());
        assert!(bridge.sink().written.is_empty());
    }
}
