//! Session latency benchmarks: round-trip time through a running bridge
//!
//! A REQ peer talks to the bridge's REP socket over inproc; the byte-stream
//! side is a socketpair whose far end echoes every request back.
//! Measures: bridge overhead per request/reply transaction.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use zbridge::core::config::BridgeConfig;
use zbridge::core::shutdown::Shutdown;
use zbridge::transport::ByteStream;
use zbridge::Supervisor;

const MESSAGE_SIZES: &[usize] = &[16, 64, 255];

fn echo(mut remote: UnixStream, size: usize) {
    let mut buf = vec![0u8; size];
    while remote.read_exact(&mut buf).is_ok() {
        if remote.write_all(&buf).is_err() {
            break;
        }
    }
}

fn reply_mode_round_trip(c: &mut Criterion) {
    zbridge::dev_tracing::init_tracing();
    let mut group = c.benchmark_group("session/rep/round_trip");
    group.measurement_time(Duration::from_secs(10));

    for &size in MESSAGE_SIZES {
        let endpoint = format!("inproc://bench-rep-{size}");
        let ctx = zmq::Context::new();
        let config = BridgeConfig::builder()
            .with_reply(format!("@{endpoint}"))
            .with_tcp_listen(0)
            .with_shutdown_tick(Duration::from_millis(10))
            .build()
            .unwrap();
        let supervisor = Supervisor::new(config).with_context(ctx.clone());

        let (local, remote) = UnixStream::pair().unwrap();
        let echo_thread = thread::spawn(move || echo(remote, size));

        let (trigger, shutdown) = Shutdown::pair();
        let session = thread::spawn(move || {
            let stream = ByteStream::from_fd(local);
            supervisor.run_session(&stream, &shutdown)
        });

        let req = ctx.socket(zmq::REQ).unwrap();
        req.connect(&endpoint).unwrap();
        let payload = vec![0xA5u8; size];

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                req.send(black_box(&payload), 0).unwrap();
                black_box(req.recv_bytes(0).unwrap())
            });
        });

        drop(req);
        trigger.fire();
        let _ = session.join();
        let _ = echo_thread.join();
    }

    group.finish();
}

criterion_group!(benches, reply_mode_round_trip);
criterion_main!(benches);
