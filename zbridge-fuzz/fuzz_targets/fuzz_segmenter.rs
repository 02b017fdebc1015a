#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use zbridge_core::framer::{sbp, FramerKind};
use zbridge_core::segmenter::FrameSegmenter;

fuzz_target!(|data: &[u8]| {
    // First byte picks the chunk size, the rest is the stream
    let Some((&split, stream)) = data.split_first() else {
        return;
    };
    let chunk_size = usize::from(split).max(1);

    for kind in [FramerKind::Sbp, FramerKind::LengthPrefixed, FramerKind::None] {
        let mut segmenter = FrameSegmenter::new(kind);
        let mut emitted = 0usize;

        for chunk in stream.chunks(chunk_size) {
            let mut rest = Bytes::copy_from_slice(chunk);
            while !rest.is_empty() {
                let segment = segmenter.process(&rest);
                assert!(segment.consumed >= 1 && segment.consumed <= rest.len());
                let _ = rest.split_to(segment.consumed);

                if let Some(frame) = segment.frame {
                    emitted += frame.len();
                    check_frame(kind, &frame);
                }
            }
        }

        // Frames never hold more than the stream (length prefixes are dropped)
        assert!(emitted <= stream.len());
    }
});

fn check_frame(kind: FramerKind, frame: &[u8]) {
    match kind {
        FramerKind::Sbp => {
            assert_eq!(frame[0], sbp::PREAMBLE);
            assert!(frame.len() >= sbp::HEADER_LEN + sbp::CRC_LEN);
            let payload_len = usize::from(frame[sbp::HEADER_LEN - 1]);
            assert_eq!(frame.len(), sbp::HEADER_LEN + payload_len + sbp::CRC_LEN);

            let crc_at = frame.len() - sbp::CRC_LEN;
            let crc = u16::from_le_bytes([frame[crc_at], frame[crc_at + 1]]);
            assert_eq!(crc, sbp::crc16(&frame[1..crc_at]));
        }
        FramerKind::LengthPrefixed => assert!(frame.len() <= usize::from(u8::MAX)),
        FramerKind::None => assert!(!frame.is_empty()),
    }
}
