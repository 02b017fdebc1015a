//! Termination signals feeding the shutdown broadcast.

use std::io;
use std::thread;

use signal_hook::consts::signal::{SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use tracing::info;
use zbridge_core::shutdown::ShutdownTrigger;

pub const TERMINATION_SIGNALS: [i32; 3] = [SIGINT, SIGTERM, SIGQUIT];

/// Fire `trigger` on the first SIGINT, SIGTERM or SIGQUIT.
///
/// The returned handle stops the listener thread when closed; closing it
/// also fires the trigger.
pub fn install(trigger: ShutdownTrigger) -> io::Result<Handle> {
    let mut signals = Signals::new(TERMINATION_SIGNALS)?;
    let handle = signals.handle();

    thread::Builder::new()
        .name("zbridge-signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(signal, "[SUPERVISOR] termination signal, shutting down");
            }
            trigger.fire();
        })?;

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use zbridge_core::shutdown::Shutdown;

    #[test]
    fn test_raised_signal_fires_shutdown() {
        let (trigger, shutdown) = Shutdown::pair();
        let _handle = install(trigger).unwrap();

        signal_hook::low_level::raise(SIGQUIT).unwrap();
        assert!(shutdown.wait_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_closed_handle_fires_shutdown() {
        let (trigger, shutdown) = Shutdown::pair();
        let handle = install(trigger).unwrap();

        handle.close();
        assert!(shutdown.wait_timeout(Duration::from_secs(5)));
    }
}
