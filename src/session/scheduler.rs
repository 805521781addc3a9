//! Fade scheduler
//!
//! Drives one session's fade curve: a dedicated thread wakes at the
//! configured tick interval, computes the volume for the elapsed time and
//! pushes it into the playback handle. The thread ends on its own when the
//! curve completes or the handle stops playing; `cancel` ends it from
//! outside and does not return until the thread is joined, so no tick can
//! run after cancellation.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};

use super::fade::{FadeCurve, FadeLevel};
use crate::playback::engine::PlaybackHandle;

/// Handle to a running fade tick thread.
pub struct FadeScheduler {
    cancel_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl FadeScheduler {
    /// Start driving `curve` into `handle` every `tick`.
    pub fn spawn(handle: Arc<dyn PlaybackHandle>, curve: FadeCurve, tick: Duration) -> Self {
        let (cancel_tx, cancel_rx) = unbounded();

        let thread = thread::spawn(move || {
            let started = Instant::now();

            loop {
                match cancel_rx.recv_timeout(tick) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {
                        // A handle that stopped playing no longer gets volume
                        // updates; the session owner cleans up the rest.
                        if !handle.is_playing() {
                            tracing::debug!("Fade tick found handle idle, ending fade");
                            break;
                        }

                        match curve.volume_at(started.elapsed()) {
                            FadeLevel::Ramping(gain) => handle.set_volume(gain),
                            FadeLevel::Done(gain) => {
                                handle.set_volume(gain);
                                tracing::debug!("Fade complete at gain {}", gain);
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self {
            cancel_tx,
            thread: Some(thread),
        }
    }

    /// Stop ticking. Blocks until the tick thread has exited; after this
    /// returns the playback handle will not be touched again by the fade.
    pub fn cancel(mut self) {
        let _ = self.cancel_tx.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
