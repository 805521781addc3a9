//! Auto-stop timer
//!
//! A one-shot deadline bound to a session: if the session is still alive
//! when the timeout elapses, the armed action force-stops it and raises the
//! completion notification. Cancellation is a signal, not a join — the fire
//! path re-validates the session against the registry before acting, so a
//! signal that loses the race is still harmless.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};

/// Handle to an armed one-shot timer.
pub struct AutoStopTimer {
    cancel_tx: Sender<()>,
}

impl AutoStopTimer {
    /// Arm a timer that runs `action` once after `timeout`, unless cancelled
    /// first.
    pub fn arm<F>(timeout: Duration, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = unbounded();

        thread::spawn(move || match cancel_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => action(),
        });

        Self { cancel_tx }
    }

    /// Prevent the timer from firing. Safe to call from the armed action
    /// itself and after the timer has already fired or been cancelled.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(());
    }
}
