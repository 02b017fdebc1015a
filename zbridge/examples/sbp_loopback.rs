//! SBP loopback demo
//!
//! Feeds SBP frames, cut into odd-sized writes with line noise in between,
//! into a socketpair that stands in for a serial port. The bridge publishes
//! each reassembled frame on an inproc PUB socket and a subscriber prints it.
//!
//! Run with: `RUST_LOG=debug cargo run --example sbp_loopback`

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;

use zbridge::core::config::BridgeConfig;
use zbridge::core::framer::{sbp, FramerKind};
use zbridge::core::shutdown::Shutdown;
use zbridge::transport::ByteStream;
use zbridge::Supervisor;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    zbridge::dev_tracing::init_tracing();

    let ctx = zmq::Context::new();
    let config = BridgeConfig::builder()
        .with_publish("inproc://sbp-loopback")
        .with_file("/dev/null")
        .with_framer(FramerKind::Sbp)
        .build()?;
    let supervisor = Supervisor::new(config).with_context(ctx.clone());

    let (local, mut serial) = UnixStream::pair()?;
    let (_trigger, shutdown) = Shutdown::pair();
    let session = thread::spawn(move || {
        let stream = ByteStream::from_fd(local);
        supervisor.run_session(&stream, &shutdown)
    });

    let sub = ctx.socket(zmq::SUB)?;
    sub.set_subscribe(b"")?;
    sub.connect("inproc://sbp-loopback")?;
    thread::sleep(Duration::from_millis(100));

    let mut wire = Vec::new();
    for (i, text) in ["hello", "from", "the", "serial", "port"].iter().enumerate() {
        wire.extend_from_slice(&[0x00, 0xFF]);
        wire.extend_from_slice(&sbp::encode(0x0400 + i as u16, 0x2222, text.as_bytes()));
    }
    for chunk in wire.chunks(7) {
        serial.write_all(chunk)?;
    }

    for _ in 0..5 {
        let frame = sub.recv_bytes(0)?;
        let payload = &frame[sbp::HEADER_LEN..frame.len() - sbp::CRC_LEN];
        println!(
            "msg type {:#06x}: {}",
            u16::from_le_bytes([frame[1], frame[2]]),
            String::from_utf8_lossy(payload)
        );
    }

    drop(serial);
    for outcome in session.join().map_err(|_| "session panicked")?? {
        println!("{}: {:?}", outcome.unit, outcome.result);
    }
    Ok(())
}
