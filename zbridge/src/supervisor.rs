//! Session supervision.
//!
//! A session is one byte stream (an opened device, an accepted connection)
//! bridged to the configured message sockets. Every independent direction
//! runs as its own named thread with its own clone of the descriptor:
//!
//! ```text
//!                 ┌──────────────┐
//!   byte stream ──┤ zbridge-pub  ├──▶ PUB socket
//!        ▲        └──────────────┘
//!        │        ┌──────────────┐
//!        └────────┤ zbridge-sub  │◀── SUB socket
//!                 └──────────────┘
//! ```
//!
//! Request/reply runs both directions in a single `zbridge-reqrep` thread.
//! A unit failure ends only that unit, except that losing the byte stream
//! ends the whole session. A session with no unit reading the stream watches
//! it for a peer hangup instead.

use std::fmt;
use std::io;
use std::thread::{self, JoinHandle};

use flume::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info};
use zbridge_core::address::AttachList;
use zbridge_core::bridge::{ForwardStats, PubSubBridge, ReqRepBridge, ReqRepStats};
use zbridge_core::config::{BridgeConfig, ByteStreamSource, Mode};
use zbridge_core::error::{BridgeError, Result};
use zbridge_core::retry::RetryError;
use zbridge_core::role::SocketRole;
use zbridge_core::segmenter::FrameSegmenter;
use zbridge_core::shutdown::{Shutdown, ShutdownSignal, ShutdownTrigger};
use zbridge_zmq::{ByteStream, Context, MessageSocket, ZmqEndpoint, ZmqPoller};

use crate::hangup::HangupWatch;
use crate::source;

/// Concurrency unit of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Byte stream to PUB socket
    Publish,
    /// SUB socket to byte stream
    Subscribe,
    /// Request/reply in both directions
    ReqRep,
}

impl Unit {
    pub fn thread_name(&self) -> &'static str {
        match self {
            Self::Publish => "zbridge-pub",
            Self::Subscribe => "zbridge-sub",
            Self::ReqRep => "zbridge-reqrep",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.thread_name())
    }
}

/// Final counters of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStats {
    Forward(ForwardStats),
    ReqRep(ReqRepStats),
}

/// How a unit ended.
#[derive(Debug)]
pub struct UnitOutcome {
    pub unit: Unit,
    pub result: Result<UnitStats>,
}

impl UnitOutcome {
    /// Whether the shared byte stream is gone, so no unit has work left.
    fn ends_session(&self) -> bool {
        matches!(
            self.result,
            Err(BridgeError::EndOfStream | BridgeError::Io(_))
        )
    }
}

/// A unit with its sockets open, ready to be moved onto its thread.
enum Prepared {
    Forward(Unit, PubSubBridge<ZmqEndpoint, ZmqPoller>),
    ReqRep(ReqRepBridge<ZmqEndpoint, ZmqPoller>),
}

impl Prepared {
    fn unit(&self) -> Unit {
        match self {
            Self::Forward(unit, _) => *unit,
            Self::ReqRep(_) => Unit::ReqRep,
        }
    }

    fn reads_stream(&self) -> bool {
        !matches!(self, Self::Forward(Unit::Subscribe, _))
    }
}

/// Owns the configuration and the messaging context shared by every session.
pub struct Supervisor {
    config: BridgeConfig,
    context: Context,
}

impl Supervisor {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            context: Context::new(),
        }
    }

    /// Use an existing context, e.g. to reach `inproc://` peers.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Serve the configured byte-stream source until it is exhausted or
    /// shutdown fires.
    pub fn run(&self, shutdown: &ShutdownSignal) -> Result<()> {
        match &self.config.source {
            ByteStreamSource::File(path) => source::serve_file(self, path, shutdown).map(|_| ()),
            ByteStreamSource::TcpListen(port) => {
                source::serve_tcp(self, *port, shutdown).map(|_| ())
            }
        }
    }

    /// Bridge `stream` to the configured sockets until every unit has ended.
    ///
    /// Sockets are opened before any unit starts; a failed open leaves
    /// nothing running.
    pub fn run_session(
        &self,
        stream: &ByteStream,
        shutdown: &ShutdownSignal,
    ) -> Result<Vec<UnitOutcome>> {
        let prepared = self.prepare(stream, shutdown)?;
        let hangup = if prepared.iter().any(Prepared::reads_stream) {
            None
        } else {
            HangupWatch::new(stream, self.config.read_buffer_size)?
        };

        let (session_trigger, session) = Shutdown::pair();
        let (done_tx, done_rx) = flume::unbounded();
        let mut handles = Vec::with_capacity(prepared.len());
        for unit in prepared {
            handles.push(spawn_unit(unit, session.clone(), done_tx.clone())?);
        }
        drop(done_tx);
        info!(units = handles.len(), "[SUPERVISOR] session started");

        let outcomes = self.collect(&done_rx, session_trigger, hangup, shutdown);

        for handle in handles {
            if handle.join().is_err() {
                error!("[SUPERVISOR] unit panicked");
            }
        }
        info!(units = outcomes.len(), "[SUPERVISOR] session ended");
        Ok(outcomes)
    }

    fn prepare(&self, stream: &ByteStream, shutdown: &ShutdownSignal) -> Result<Vec<Prepared>> {
        let config = &self.config;
        let mut units = Vec::with_capacity(2);

        match &config.mode {
            Mode::PubSub { publish, subscribe } => {
                if let Some(attach) = publish {
                    let socket = self.open_socket(SocketRole::Publisher, attach, shutdown)?;
                    let bridge = PubSubBridge::new(
                        ZmqEndpoint::from(stream.try_clone()?),
                        ZmqEndpoint::from(socket),
                        FrameSegmenter::new(config.framer),
                        ZmqPoller::new(),
                    )
                    .with_label("PUB")
                    .with_read_buffer_size(config.read_buffer_size)
                    .with_tick(config.shutdown_tick);
                    units.push(Prepared::Forward(Unit::Publish, bridge));
                }
                if let Some(attach) = subscribe {
                    let socket = self.open_socket(SocketRole::Subscriber, attach, shutdown)?;
                    // Messages are already delimited; never framed
                    let bridge = PubSubBridge::new(
                        ZmqEndpoint::from(socket),
                        ZmqEndpoint::from(stream.try_clone()?),
                        FrameSegmenter::passthrough(),
                        ZmqPoller::new(),
                    )
                    .with_label("SUB")
                    .with_read_buffer_size(config.read_buffer_size)
                    .with_tick(config.shutdown_tick);
                    units.push(Prepared::Forward(Unit::Subscribe, bridge));
                }
            }
            Mode::Request(attach) => {
                let socket = self.open_socket(SocketRole::Requester, attach, shutdown)?;
                let bridge = self.reqrep(
                    ZmqEndpoint::from(stream.try_clone()?),
                    ZmqEndpoint::from(socket),
                );
                units.push(Prepared::ReqRep(bridge));
            }
            Mode::Reply(attach) => {
                let socket = self.open_socket(SocketRole::Replier, attach, shutdown)?;
                let bridge = self.reqrep(
                    ZmqEndpoint::from(socket),
                    ZmqEndpoint::from(stream.try_clone()?),
                );
                units.push(Prepared::ReqRep(bridge));
            }
        }

        Ok(units)
    }

    fn reqrep(
        &self,
        client: ZmqEndpoint,
        server: ZmqEndpoint,
    ) -> ReqRepBridge<ZmqEndpoint, ZmqPoller> {
        ReqRepBridge::new(client, server, ZmqPoller::new(), self.config.framer)
            .with_reply_timeout(self.config.reply_timeout)
            .with_read_buffer_size(self.config.read_buffer_size)
            .with_tick(self.config.shutdown_tick)
    }

    /// Open with the restart policy, since a previous session's socket may
    /// still hold the address for a moment.
    fn open_socket(
        &self,
        role: SocketRole,
        attach: &AttachList,
        shutdown: &ShutdownSignal,
    ) -> Result<MessageSocket> {
        let policy = self.config.restart_policy;
        let opened = policy.retry_until(shutdown, |attempt| {
            debug!(role = %role, attempt, "[SUPERVISOR] opening socket");
            MessageSocket::open(&self.context, role, attach.clone())
        });

        match opened {
            Ok(socket) => Ok(socket.with_restart_policy(policy)),
            Err(RetryError::Exhausted { last, .. }) => {
                error!(role = %role, attach = %attach, error = %last, "[SUPERVISOR] cannot open socket");
                Err(last)
            }
            Err(RetryError::Cancelled) => Err(BridgeError::Cancelled),
        }
    }

    fn collect(
        &self,
        done: &Receiver<UnitOutcome>,
        session_trigger: ShutdownTrigger,
        mut hangup: Option<HangupWatch>,
        shutdown: &ShutdownSignal,
    ) -> Vec<UnitOutcome> {
        let mut session_trigger = Some(session_trigger);
        let mut outcomes = Vec::new();

        loop {
            match done.recv_timeout(self.config.shutdown_tick) {
                Ok(outcome) => {
                    log_outcome(&outcome);
                    if outcome.ends_session() {
                        if let Some(trigger) = session_trigger.take() {
                            debug!("[SUPERVISOR] byte stream gone, stopping remaining units");
                            trigger.fire();
                        }
                    }
                    outcomes.push(outcome);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if hangup.as_mut().is_some_and(HangupWatch::hung_up) {
                hangup = None;
                if let Some(trigger) = session_trigger.take() {
                    info!("[SUPERVISOR] peer hung up, stopping units");
                    trigger.fire();
                }
            }

            if shutdown.is_triggered() {
                if let Some(trigger) = session_trigger.take() {
                    debug!("[SUPERVISOR] shutdown requested, stopping units");
                    trigger.fire();
                }
            }
        }

        outcomes
    }
}

fn spawn_unit(
    prepared: Prepared,
    session: ShutdownSignal,
    done: Sender<UnitOutcome>,
) -> io::Result<JoinHandle<()>> {
    let unit = prepared.unit();
    thread::Builder::new()
        .name(unit.thread_name().to_string())
        .spawn(move || {
            let result = match prepared {
                Prepared::Forward(_, mut bridge) => bridge.run(&session).map(UnitStats::Forward),
                Prepared::ReqRep(mut bridge) => bridge.run(&session).map(UnitStats::ReqRep),
            };
            let _ = done.send(UnitOutcome { unit, result });
        })
}

fn log_outcome(outcome: &UnitOutcome) {
    match &outcome.result {
        Ok(stats) => info!(unit = %outcome.unit, ?stats, "[SUPERVISOR] unit stopped"),
        Err(BridgeError::EndOfStream) => {
            info!(unit = %outcome.unit, "[SUPERVISOR] byte stream closed");
        }
        Err(e) => error!(unit = %outcome.unit, error = %e, "[SUPERVISOR] unit failed"),
    }
}
