//! Shutdown broadcast.
//!
//! A single [`ShutdownTrigger`] fans out to any number of cloned
//! [`ShutdownSignal`]s. Firing the trigger drops the only sender of a `flume`
//! channel and every receiver observes the disconnection. Nothing is ever
//! sent on the channel; disconnection is the message.
//!
//! ```
//! use zbridge_core::shutdown::Shutdown;
//!
//! let (trigger, signal) = Shutdown::pair();
//! let unit = signal.clone();
//! assert!(!unit.is_triggered());
//!
//! trigger.fire();
//! assert!(unit.is_triggered());
//! assert!(signal.is_triggered());
//! ```

use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Constructor namespace for trigger/signal pairs.
pub struct Shutdown;

impl Shutdown {
    /// Create a connected trigger and signal.
    #[must_use]
    pub fn pair() -> (ShutdownTrigger, ShutdownSignal) {
        let (tx, rx) = flume::bounded(0);
        (ShutdownTrigger { _tx: tx }, ShutdownSignal { rx })
    }
}

/// Firing side of the broadcast. Dropping it fires as well.
#[derive(Debug)]
pub struct ShutdownTrigger {
    _tx: Sender<()>,
}

impl ShutdownTrigger {
    /// Fire the broadcast.
    pub fn fire(self) {
        drop(self);
    }
}

/// Receiving side of the broadcast. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: Receiver<()>,
}

impl ShutdownSignal {
    /// Whether the broadcast has fired.
    pub fn is_triggered(&self) -> bool {
        matches!(self.rx.try_recv(), Ok(()) | Err(TryRecvError::Disconnected))
    }

    /// Wait up to `timeout` for the broadcast; returns `true` if it fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        !matches!(self.rx.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }

    /// Block until the broadcast fires.
    pub fn wait(&self) {
        let _ = self.rx.recv();
    }
}
