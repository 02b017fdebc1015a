//! Request/reply transaction loop.
//!
//! The bridge sits between a **client** (issues requests, receives replies)
//! and a **server** (receives forwarded requests, produces replies). One
//! request may be outstanding at a time:
//!
//! ```text
//!            client ready / forward request
//!   ┌──────┐ ─────────────────────────────▶ ┌────────────────┐
//!   │ IDLE │                                │ AWAITING_REPLY │
//!   └──────┘ ◀───────────────────────────── └────────────────┘
//!            server ready / forward reply
//!            reply timeout / restart client socket
//!            second request / restart server socket
//! ```
//!
//! Liveness tracking is only active when the client is a message socket
//! (REP mode): a peer behind a REP socket can only be freed by resetting it.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::config::{DEFAULT_READ_BUFFER_SIZE, DEFAULT_REPLY_TIMEOUT, DEFAULT_SHUTDOWN_TICK};
use crate::endpoint::{Endpoint, Multiplexer};
use crate::error::{BridgeError, Result};
use crate::framer::FramerKind;
use crate::segmenter::FrameSegmenter;
use crate::shutdown::ShutdownSignal;

/// Outstanding request, stamped when it was forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReply {
    since: Instant,
}

impl PendingReply {
    fn now() -> Self {
        Self {
            since: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.since.elapsed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReqRepState {
    Idle,
    AwaitingReply(PendingReply),
}

impl ReqRepState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReqRepStats {
    /// Requests forwarded client to server
    pub requests: u64,
    /// Replies forwarded server to client
    pub replies: u64,
    /// Successful socket restarts
    pub restarts: u64,
    /// Replies that never arrived in time
    pub timeouts: u64,
    /// Units read and thrown away (unsolicited replies, trailing bytes)
    pub dropped: u64,
}

enum Transfer {
    Forwarded,
    Incomplete,
}

pub struct ReqRepBridge<E, M> {
    client: E,
    server: E,
    request_segmenter: FrameSegmenter,
    reply_segmenter: FrameSegmenter,
    multiplexer: M,
    state: ReqRepState,
    reply_timeout: Duration,
    read_buffer_size: usize,
    tick: Duration,
    stats: ReqRepStats,
}

impl<E, M> ReqRepBridge<E, M>
where
    E: Endpoint,
    M: Multiplexer<E>,
{
    /// Build a bridge in `IDLE`; `framer` applies to whichever side is a byte
    /// stream.
    pub fn new(client: E, server: E, multiplexer: M, framer: FramerKind) -> Self {
        let segmenter_for = |endpoint: &E| {
            if endpoint.kind().is_messaging() {
                FrameSegmenter::passthrough()
            } else {
                FrameSegmenter::new(framer)
            }
        };
        let request_segmenter = segmenter_for(&client);
        let reply_segmenter = segmenter_for(&server);

        Self {
            client,
            server,
            request_segmenter,
            reply_segmenter,
            multiplexer,
            state: ReqRepState::Idle,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            tick: DEFAULT_SHUTDOWN_TICK,
            stats: ReqRepStats::default(),
        }
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
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

    /// Whether a late reply resets the client socket.
    pub fn tracks_liveness(&self) -> bool {
        self.client.kind().is_messaging()
    }

    /// One wait on both endpoints followed by the transitions it triggers.
    pub fn step(&mut self) -> Result<()> {
        let timeout = self.next_wait();
        let [client_ready, server_ready] = self
            .multiplexer
            .wait([&self.client, &self.server], Some(timeout))?;

        if !client_ready && !server_ready {
            return self.check_reply_timeout();
        }

        // Reply path first: a reply and the next request may share a wakeup

        if server_ready {
            self.on_server_ready()?;
        }
        if client_ready {
            self.on_client_ready()?;
        }
        Ok(())
    }

    /// Drive the state machine until an endpoint fails or shutdown fires.
    pub fn run(&mut self, shutdown: &ShutdownSignal) -> Result<ReqRepStats> {
        debug!(
            client = %self.client.kind(),
            server = %self.server.kind(),
            liveness = self.tracks_liveness(),
            reply_timeout_ms = self.reply_timeout.as_millis() as u64,
            "[REQREP] io loop begin"
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
            requests = self.stats.requests,
            replies = self.stats.replies,
            restarts = self.stats.restarts,
            timeouts = self.stats.timeouts,
            "[REQREP] io loop end"
        );
        result
    }

    fn next_wait(&self) -> Duration {
        match self.state {
            ReqRepState::AwaitingReply(pending) if self.tracks_liveness() => self
                .tick
                .min(self.reply_timeout.saturating_sub(pending.elapsed())),
            _ => self.tick,
        }
    }

    fn on_server_ready(&mut self) -> Result<()> {
        if self.state.is_idle() {
            warn!(server = %self.server.kind(), "[REQREP] reply with no request outstanding");
            if self.tracks_liveness() {
                let stray = self.server.read(self.read_buffer_size)?;
                if stray.is_empty() {
                    return Err(BridgeError::EndOfStream);
                }
                debug!(bytes = stray.len(), "[REQREP] discarded unsolicited reply");
                self.stats.dropped += 1;
                return Ok(());
            }
        }

        let transfer = transfer_one(
            &mut self.server,
            &mut self.client,
            &mut self.reply_segmenter,
            self.read_buffer_size,
            &mut self.stats,
        )?;
        if let Transfer::Forwarded = transfer {
            self.stats.replies += 1;
            self.state = ReqRepState::Idle;
        }
        Ok(())
    }

    fn on_client_ready(&mut self) -> Result<()> {
        if !self.state.is_idle() {
            warn!(client = %self.client.kind(), "[REQREP] new request before reply");
            if self.server.kind().is_messaging() {
                self.server.restart()?;
                self.stats.restarts += 1;
                debug!(server = %self.server.kind(), "[REQREP] abandoned outstanding request");
                self.state = ReqRepState::Idle;
            }
        }

        let transfer = transfer_one(
            &mut self.client,
            &mut self.server,
            &mut self.request_segmenter,
            self.read_buffer_size,
            &mut self.stats,
        )?;
        if let Transfer::Forwarded = transfer {
            self.stats.requests += 1;
            self.state = ReqRepState::AwaitingReply(PendingReply::now());
        }
        Ok(())
    }

    fn check_reply_timeout(&mut self) -> Result<()> {
        let ReqRepState::AwaitingReply(pending) = self.state else {
            return Ok(());
        };
        if !self.tracks_liveness() || pending.elapsed() < self.reply_timeout {
            return Ok(());
        }

        warn!(
            timeout_ms = self.reply_timeout.as_millis() as u64,
            client = %self.client.kind(),
            "[REQREP] reply timed out, resetting socket"
        );
        self.stats.timeouts += 1;
        self.client.restart()?;
        self.stats.restarts += 1;
        self.state = ReqRepState::Idle;
        Ok(())
    }

    pub fn state(&self) -> ReqRepState {
        self.state
    }

    pub fn stats(&self) -> ReqRepStats {
        self.stats
    }

    pub fn client(&self) -> &E {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut E {
        &mut self.client
    }

    pub fn server(&self) -> &E {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut E {
        &mut self.server
    }
}

/// Read one chunk from `from` and write at most one frame to `to`.
fn transfer_one<E: Endpoint>(
    from: &mut E,
    to: &mut E,
    segmenter: &mut FrameSegmenter,
    max_len: usize,
    stats: &mut ReqRepStats,
) -> Result<Transfer> {
    let chunk = from.read(max_len)?;
    if chunk.is_empty() {
        return Err(BridgeError::EndOfStream);
    }
    trace!(bytes = chunk.len(), from = %from.kind(), "[REQREP] read");

    let mut frames = segmenter.frames(chunk);
    let Some(frame) = frames.next() else {
        return Ok(Transfer::Incomplete);
    };
    let leftover = frames.remaining();
    if leftover > 0 {
        warn!(
            leftover,
            "[REQREP] data after first frame dropped, stream may be out of sync"
        );
        stats.dropped += 1;
    }

    let written = to.write_all(&frame)?;
    trace!(bytes = written, to = %to.kind(), "[REQREP] wrote frame");
    Ok(Transfer::Forwarded)
}
